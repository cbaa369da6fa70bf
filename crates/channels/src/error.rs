use std::error::Error as StdError;

/// Crate-wide result type for chat platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed platform errors shared by every `ChatPlatform` implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid platform input: {message}")]
    InvalidInput { message: String },

    /// The platform answered, but with `ok: false`.
    #[error("{method} returned not ok: {error}")]
    NotOk { method: String, error: String },

    /// Operation is currently unavailable (not connected / not ready).
    #[error("platform operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("platform operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_ok(method: impl Into<String>, error: Option<String>) -> Self {
        Self::NotOk {
            method: method.into(),
            error: error.unwrap_or_else(|| "unknown error".into()),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
