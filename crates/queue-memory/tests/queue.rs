use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use courier_queue::{
    Handler, Message, Payload, Queue, QueueBackend, ReceiveOptions, WireFormat, fingerprint,
};
use courier_queue_memory::MemoryBackend;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::{Instant, timeout};

const SHORT: ReceiveOptions = ReceiveOptions::timeout(Duration::from_millis(100));

#[derive(Debug, Deserialize, Serialize)]
struct GenerateEmbeddingsRequest {
    sentences: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
struct GenerateEmbeddingsResponse {
    embeddings: Vec<Vec<f64>>,
}

#[tokio::test]
async fn test_send_then_receive_on_another_handle() {
    let backend = MemoryBackend::new();
    let producer = Queue::new("jobs", backend.clone());
    let consumer = Queue::new("jobs", backend);

    let sent = producer.send(json!({ "n": 1 })).await.unwrap();
    let received = consumer.receive(&SHORT).await.unwrap().unwrap();

    assert_eq!(received.queue_name(), "jobs");
    assert_eq!(received.id(), sent.id());
    assert_eq!(received.payload(), sent.payload());
    assert_eq!(received.timestamp(), sent.timestamp());
}

#[tokio::test]
async fn test_queue_key_uses_fingerprint() {
    let queue = Queue::new("jobs", MemoryBackend::new());

    assert_eq!(queue.key(), format!("queue:{}", fingerprint("jobs")));
}

#[tokio::test]
async fn test_fifo_and_count() {
    let queue = Queue::new("fifo", MemoryBackend::new());

    for n in 0..3 {
        queue.send(json!(n)).await.unwrap();
    }
    assert_eq!(queue.count().await.unwrap(), 3);

    for n in 0..3 {
        let message = queue.receive(&SHORT).await.unwrap().unwrap();
        assert_eq!(message.payload(), &Payload::from(json!(n)));
    }
    assert_eq!(queue.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_queues_are_isolated() {
    let backend = MemoryBackend::new();
    let a = Queue::new("a", backend.clone());
    let b = Queue::new("b", backend);

    a.send(json!("for a")).await.unwrap();

    assert_eq!(b.count().await.unwrap(), 0);
    assert!(b.receive(&SHORT).await.unwrap().is_none());
    assert_eq!(a.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_receive_times_out_after_roughly_the_timeout() {
    let queue = Queue::new("empty", MemoryBackend::new());
    let started = Instant::now();

    let received = queue
        .receive(&ReceiveOptions::timeout(Duration::from_millis(200)))
        .await
        .unwrap();

    let elapsed = started.elapsed();
    assert!(received.is_none());
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn test_wait_forever_blocks_until_a_message_arrives() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("late", backend.clone());

    let pending = tokio::spawn(async move {
        queue.receive(&ReceiveOptions::wait_forever()).await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pending.is_finished());

    Queue::new("late", backend).send(json!("hi")).await.unwrap();

    let message = timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(message.payload(), &Payload::from(json!("hi")));
}

#[tokio::test]
async fn test_query_is_answered_through_the_response_queue() {
    let backend = MemoryBackend::new();
    let client = Queue::new("generate_embedding", backend.clone());
    let worker = Queue::new("generate_embedding", backend);

    let worker_task = tokio::spawn(async move {
        let mut listener = worker.listen(SHORT);
        while let Some(message) = listener.next_message().await {
            let request: GenerateEmbeddingsRequest = message.data_as().unwrap();
            let embeddings = request
                .sentences
                .iter()
                .map(|s| vec![s.len() as f64])
                .collect();
            message
                .respond_json(&GenerateEmbeddingsResponse { embeddings })
                .await
                .unwrap();
        }
    });

    let reply = client
        .query_json(
            &GenerateEmbeddingsRequest {
                sentences: vec!["hi".to_string(), "hello".to_string()],
            },
            &ReceiveOptions::timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        reply.data_as::<GenerateEmbeddingsResponse>().unwrap(),
        GenerateEmbeddingsResponse {
            embeddings: vec![vec![2.0], vec![5.0]]
        }
    );
    assert!(reply.queue_name().starts_with("response:"));

    worker_task.await.unwrap();
}

#[tokio::test]
async fn test_response_queue_is_derived_from_the_id() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("requests", backend.clone());

    let request = queue.send(json!("ping")).await.unwrap();
    assert_eq!(request.response_queue_name(), format!("response:{}", request.id()));

    // Anyone who knows the id can answer, without the original message.
    let received = queue.receive(&SHORT).await.unwrap().unwrap();
    Queue::new(format!("response:{}", received.id()), backend)
        .send(json!("pong"))
        .await
        .unwrap();

    let reply = request.receive_response(&SHORT).await.unwrap().unwrap();
    assert_eq!(reply.payload(), &Payload::from(json!("pong")));
}

#[tokio::test]
async fn test_query_without_worker_returns_none() {
    let queue = Queue::new("nobody", MemoryBackend::new());

    let reply = queue.query(json!("anyone?"), &SHORT).await.unwrap();

    assert!(reply.is_none());
    assert_eq!(queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_queries_get_their_own_replies() {
    let backend = MemoryBackend::new();
    let worker = Queue::new("double", backend.clone());

    let worker_task = tokio::spawn(async move {
        let mut listener = worker.listen(ReceiveOptions::timeout(Duration::from_millis(300)));
        while let Some(message) = listener.next_message().await {
            let n: i64 = message.data_as().unwrap();
            message.respond(json!(n * 2)).await.unwrap();
        }
    });

    let queries = (0..10).map(|n| {
        let client = Queue::new("double", backend.clone());
        async move {
            let reply = client
                .query(json!(n), &ReceiveOptions::timeout(Duration::from_secs(2)))
                .await
                .unwrap()
                .unwrap();
            (n, reply.data_as::<i64>().unwrap())
        }
    });

    for (n, doubled) in futures::future::join_all(queries).await {
        assert_eq!(doubled, n * 2);
    }

    worker_task.await.unwrap();
}

#[tokio::test]
async fn test_listener_yields_exactly_three() {
    let queue = Queue::new("three", MemoryBackend::new());
    for n in 0..3 {
        queue.send(json!(n)).await.unwrap();
    }

    let mut listener = queue.listen(SHORT);
    let mut seen = Vec::new();
    while let Some(message) = listener.next_message().await {
        seen.push(message.data_as::<i64>().unwrap());
    }

    assert_eq!(seen, vec![0, 1, 2]);
    assert!(listener.is_finished());

    // Ended listeners stay ended, even once new messages arrive.
    queue.send(json!(3)).await.unwrap();
    assert!(listener.next_message().await.is_none());
    assert_eq!(queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_listener_as_stream() {
    let queue = Queue::new("stream", MemoryBackend::new());
    for n in 0..3 {
        queue.send(json!(n)).await.unwrap();
    }

    let messages: Vec<Message<MemoryBackend>> = queue.listen(SHORT).into_stream().collect().await;

    assert_eq!(messages.len(), 3);
}

#[tokio::test]
async fn test_listener_stops_on_corrupt_entry() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("corrupt", backend.clone());
    queue.send(json!("good")).await.unwrap();
    backend
        .push_raw("corrupt", Bytes::from_static(b"{\"id\":\"trunc"))
        .await;
    queue.send(json!("after")).await.unwrap();

    let mut listener = queue.listen(SHORT);

    assert!(listener.next_message().await.is_some());
    assert!(listener.next_message().await.is_none());
    assert!(listener.is_finished());
    assert_eq!(queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_try_next_message_surfaces_the_error() {
    let backend = MemoryBackend::new();
    backend
        .push_raw("corrupt", Bytes::from_static(b"not an envelope"))
        .await;

    let mut listener = Queue::new("corrupt", backend).listen(SHORT);

    assert!(listener.try_next_message().await.unwrap_err().is_serialization());
    assert!(listener.try_next_message().await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_entry_is_serialization_error() {
    let backend = MemoryBackend::new();
    backend
        .push_raw("corrupt", Bytes::from_static(b"\xff\x00garbage"))
        .await;

    let err = Queue::new("corrupt", backend)
        .receive(&SHORT)
        .await
        .unwrap_err();

    assert!(err.is_serialization());
}

#[tokio::test]
async fn test_unsupported_payload_is_serialization_error() {
    let queue = Queue::new("bad", MemoryBackend::new());
    let mut map = HashMap::new();
    map.insert(vec![1_u8], "non-string key");

    let err = queue.send_json(&map).await.unwrap_err();

    assert!(err.is_serialization());
    assert_eq!(queue.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_typed_timestamps_round_trip() {
    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Scheduled {
        at: DateTime<Utc>,
    }

    let queue = Queue::new("scheduled", MemoryBackend::new());
    let original = Scheduled { at: Utc::now() };

    queue.send_json(&original).await.unwrap();
    let received = queue.receive(&SHORT).await.unwrap().unwrap();

    assert_eq!(received.data_as::<Scheduled>().unwrap(), original);
}

#[tokio::test]
async fn test_opaque_payloads_in_both_formats() {
    for format in [WireFormat::Json, WireFormat::Cbor] {
        let backend = MemoryBackend::with_format(format);
        let queue = Queue::new("opaque", backend);
        let bytes = Bytes::from_static(&[0, 1, 2, 254, 255]);

        queue.send(bytes.clone()).await.unwrap();
        let received = queue.receive(&SHORT).await.unwrap().unwrap();

        assert_eq!(received.payload().as_opaque(), Some(&bytes));
    }
}

#[derive(Debug, thiserror::Error)]
#[error("cannot shout {0}")]
struct ShoutError(String);

struct Shout;

#[async_trait]
impl Handler<MemoryBackend> for Shout {
    type Error = ShoutError;

    async fn handle(&self, request: &Message<MemoryBackend>) -> Result<Payload, Self::Error> {
        let text: String = request
            .data_as()
            .map_err(|_| ShoutError("non-text".to_string()))?;
        if text.is_empty() {
            return Err(ShoutError("nothing".to_string()));
        }

        Ok(Payload::from(json!(text.to_uppercase())))
    }
}

#[tokio::test]
async fn test_serve_answers_and_skips_failures() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("shout", backend.clone());

    let ok = queue.send(json!("hey")).await.unwrap();
    let empty = queue.send(json!("")).await.unwrap();
    let not_text = queue.send(json!(42)).await.unwrap();

    let answered = queue.serve(SHORT, &Shout).await.unwrap();

    assert_eq!(answered, 1);
    assert_eq!(
        ok.receive_response(&SHORT).await.unwrap().unwrap().payload(),
        &Payload::from(json!("HEY"))
    );
    assert!(empty.receive_response(&SHORT).await.unwrap().is_none());
    assert!(not_text.receive_response(&SHORT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cleanup_discards_everything_and_is_idempotent() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("doomed", backend.clone());
    queue.send(json!(1)).await.unwrap();

    backend.cleanup().await.unwrap();
    backend.cleanup().await.unwrap();

    assert_eq!(queue.count().await.unwrap(), 0);
    queue.send(json!(2)).await.unwrap();
    assert_eq!(queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_cleanup_ends_receive_waiting_forever() {
    let backend = MemoryBackend::new();
    let queue = Queue::new("idle", backend.clone());

    let pending = tokio::spawn({
        let queue = queue.clone();
        async move { queue.receive(&ReceiveOptions::wait_forever()).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    backend.cleanup().await.unwrap();

    let received = timeout(Duration::from_millis(500), pending)
        .await
        .expect("receive still blocked after cleanup")
        .unwrap()
        .unwrap();
    assert!(received.is_none());

    queue.send(json!("again")).await.unwrap();
    let received = queue.receive(&SHORT).await.unwrap().unwrap();
    assert_eq!(received.payload(), &Payload::from(json!("again")));
}
