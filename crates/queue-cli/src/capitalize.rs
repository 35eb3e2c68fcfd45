use async_trait::async_trait;
use bytes::Bytes;
use courier_queue::{Handler, Message, Payload, QueueBackend};
use serde_json::Value;

/// Errors from [`Capitalize`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request payload is neither a JSON string nor UTF-8 bytes.
    #[error("expected a text request")]
    NotText,
}

/// Demo worker that answers each text request with the text capitalized.
#[derive(Clone, Copy, Debug, Default)]
pub struct Capitalize;

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}

#[async_trait]
impl<B> Handler<B> for Capitalize
where
    B: QueueBackend,
{
    type Error = Error;

    async fn handle(&self, request: &Message<B>) -> Result<Payload, Self::Error> {
        match request.payload() {
            Payload::Structured(Value::String(text)) => {
                Ok(Payload::Structured(Value::String(capitalize(text))))
            }
            Payload::Opaque(bytes) => std::str::from_utf8(bytes)
                .map(|text| Payload::Opaque(Bytes::from(capitalize(text))))
                .map_err(|_| Error::NotText),
            Payload::Structured(_) => Err(Error::NotText),
        }
    }
}
