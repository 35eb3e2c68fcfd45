//! Command-line client and demo worker for courier queues on Redis.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod capitalize;

use capitalize::Capitalize;

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use courier_queue::{Payload, Queue, QueueBackend, ReceiveOptions, WireFormat};
use courier_queue_redis::{DEFAULT_MAX_CONNECTIONS, DEFAULT_URL, RedisBackend, RedisQueueOptions};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
enum Error {
    /// Invalid JSON input
    #[error("invalid JSON on stdin: {0}")]
    Input(#[from] serde_json::Error),

    /// Reading stdin or writing stdout failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing to receive
    #[error("no message received before the timeout")]
    NoMessage,

    /// Text input that is not UTF-8
    #[error("stdin is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// The query was not answered
    #[error("no reply received before the timeout")]
    NoReply,

    /// Queue error
    #[error(transparent)]
    Queue(#[from] courier_queue::Error),

    /// Redis configuration error
    #[error(transparent)]
    Redis(#[from] courier_queue_redis::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Cbor,
}

impl From<Format> for WireFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Self::Json,
            Format::Cbor => Self::Cbor,
        }
    }
}

/// How stdin becomes a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Input {
    /// Parse stdin as JSON
    Json,
    /// Send stdin as a JSON string
    Text,
    /// Send stdin as opaque bytes
    Raw,
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Redis URL
    #[arg(long, default_value = DEFAULT_URL, env = "COURIER_REDIS_URL", global = true)]
    redis_url: String,

    /// Maximum number of pooled Redis connections
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "COURIER_REDIS_MAX_CONNECTIONS",
        global = true
    )]
    max_connections: usize,

    /// Envelope wire format
    #[arg(
        long,
        value_enum,
        default_value_t = Format::Json,
        env = "COURIER_WIRE_FORMAT",
        global = true
    )]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Send stdin as a request and print the reply
    Query {
        /// Queue name
        queue: String,

        /// How to read stdin
        #[arg(long, value_enum, default_value_t = Input::Json, env = "COURIER_INPUT")]
        input: Input,

        /// Seconds to wait for the reply (0 waits forever)
        #[arg(long, default_value_t = 30, env = "COURIER_TIMEOUT")]
        timeout: u64,
    },

    /// Send stdin without waiting for a reply and print the message id
    Send {
        /// Queue name
        queue: String,

        /// How to read stdin
        #[arg(long, value_enum, default_value_t = Input::Json, env = "COURIER_INPUT")]
        input: Input,
    },

    /// Receive one message and print its payload
    Receive {
        /// Queue name
        queue: String,

        /// Seconds to wait (0 waits forever)
        #[arg(long, default_value_t = 30, env = "COURIER_TIMEOUT")]
        timeout: u64,
    },

    /// Print how many messages are waiting
    Count {
        /// Queue name
        queue: String,
    },

    /// Answer requests with their text capitalized
    Serve {
        /// Queue name
        queue: String,

        /// Stop after this many idle seconds (0 serves until interrupted)
        #[arg(long, default_value_t = 0, env = "COURIER_IDLE_TIMEOUT")]
        idle_timeout: u64,
    },
}

async fn read_payload(input: Input) -> Result<Payload, Error> {
    let mut buf = Vec::new();
    tokio::io::stdin().read_to_end(&mut buf).await?;

    parse_input(input, buf)
}

fn parse_input(input: Input, buf: Vec<u8>) -> Result<Payload, Error> {
    Ok(match input {
        Input::Json => Payload::Structured(serde_json::from_slice(&buf)?),
        Input::Text => Payload::Structured(Value::String(String::from_utf8(buf)?)),
        Input::Raw => Payload::Opaque(Bytes::from(buf)),
    })
}

fn write_payload(payload: &Payload) -> Result<(), Error> {
    let mut stdout = std::io::stdout().lock();

    match payload {
        Payload::Structured(Value::String(text)) => writeln!(stdout, "{text}")?,
        Payload::Structured(value) => writeln!(stdout, "{value}")?,
        Payload::Opaque(bytes) => stdout.write_all(bytes)?,
    }
    stdout.flush()?;

    Ok(())
}

async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal"),
        Err(error) => {
            warn!(%error, "cannot listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn serve<B, F>(queue: Queue<B>, idle_timeout: u64, shutdown: F) -> Result<(), Error>
where
    B: QueueBackend,
    F: Future<Output = ()>,
{
    let options = ReceiveOptions::timeout_secs(idle_timeout);
    let mut answered = 0;

    tokio::pin!(shutdown);
    info!(queue = %queue.name(), key = %queue.key(), "serving");

    loop {
        tokio::select! {
            result = queue.serve(options, &Capitalize) => answered += result?,
            () = &mut shutdown => break,
        }

        if idle_timeout > 0 {
            break;
        }

        // Waiting forever only ends on a receive failure.
        warn!(queue = %queue.name(), "listener stopped, restarting");
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(1)) => {}
            () = &mut shutdown => break,
        }
    }

    info!(queue = %queue.name(), answered, "stopped serving");
    Ok(())
}

async fn execute(command: Command, backend: &RedisBackend) -> Result<(), Error> {
    match command {
        Command::Query {
            queue,
            input,
            timeout,
        } => {
            let payload = read_payload(input).await?;
            let reply = Queue::new(queue, backend.clone())
                .query(payload, &ReceiveOptions::timeout_secs(timeout))
                .await?
                .ok_or(Error::NoReply)?;

            write_payload(reply.payload())
        }
        Command::Send { queue, input } => {
            let payload = read_payload(input).await?;
            let message = Queue::new(queue, backend.clone()).send(payload).await?;

            writeln!(std::io::stdout(), "{}", message.id())?;
            Ok(())
        }
        Command::Receive { queue, timeout } => {
            let message = Queue::new(queue, backend.clone())
                .receive(&ReceiveOptions::timeout_secs(timeout))
                .await?
                .ok_or(Error::NoMessage)?;

            write_payload(message.payload())
        }
        Command::Count { queue } => {
            let count = Queue::new(queue, backend.clone()).count().await?;

            writeln!(std::io::stdout(), "{count}")?;
            Ok(())
        }
        Command::Serve {
            queue,
            idle_timeout,
        } => serve(Queue::new(queue, backend.clone()), idle_timeout, interrupted()).await,
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let backend = RedisBackend::new(RedisQueueOptions {
        format: args.format.into(),
        max_connections: args.max_connections,
        url: args.redis_url,
    })?;

    let result = execute(args.command, &backend).await;
    backend.cleanup().await?;

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout only carries payloads.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
