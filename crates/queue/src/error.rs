use thiserror::Error;

/// Errors that can occur while working with queues.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not be reached or rejected the operation.
    #[error("connection error: {0}")]
    Connection(String),

    /// A payload could not be encoded, or wire data could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An invariant was violated.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether this is a [`Error::Connection`].
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether this is a [`Error::Serialization`].
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    /// Whether this is a [`Error::Unexpected`].
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(error: base64::DecodeError) -> Self {
        Self::Serialization(format!("invalid base64 payload: {error}"))
    }
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for Error {
    fn from(error: ciborium::de::Error<T>) -> Self {
        Self::Serialization(format!("invalid cbor envelope: {error:?}"))
    }
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for Error {
    fn from(error: ciborium::ser::Error<T>) -> Self {
        Self::Serialization(format!("failed to encode cbor envelope: {error:?}"))
    }
}

/// Result alias for queue operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
