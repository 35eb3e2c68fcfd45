use crate::error::{Error, Result};

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The body of a message.
///
/// A payload is either a structured JSON value tree or an opaque byte
/// sequence the queue never looks inside. Never both.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A JSON value tree.
    Structured(Value),

    /// Bytes produced by some external encoding.
    Opaque(Bytes),
}

impl Payload {
    /// Converts any serializable value into a structured payload.
    ///
    /// Timestamps (`chrono` types) become RFC 3339 strings. Values with no
    /// JSON representation, such as maps keyed by non-strings, are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `value` cannot be represented as JSON.
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(Self::Structured)
            .map_err(|e| Error::Serialization(format!("unsupported payload value: {e}")))
    }

    /// Decodes a structured payload into an application type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the payload is opaque or does not
    /// match the shape of `T`.
    pub fn decode<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Structured(value) => T::deserialize(value)
                .map_err(|e| Error::Serialization(format!("payload does not match: {e}"))),
            Self::Opaque(_) => Err(Error::Serialization(
                "expected a structured payload, found opaque bytes".to_string(),
            )),
        }
    }

    /// The JSON tree, if structured.
    #[must_use]
    pub const fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Opaque(_) => None,
        }
    }

    /// The raw bytes, if opaque.
    #[must_use]
    pub const fn as_opaque(&self) -> Option<&Bytes> {
        match self {
            Self::Opaque(bytes) => Some(bytes),
            Self::Structured(_) => None,
        }
    }

    /// Whether this payload is opaque.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Opaque(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Opaque(Bytes::from(bytes))
    }
}
