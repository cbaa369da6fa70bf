use slackntell_channels::MessageEvent;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Conditions that stop the relay. Everything else is absorbed where it is
/// detected.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform rejected the handshake or the event stream failed to open.
    #[error("handshake with {platform} failed: {source}")]
    Handshake {
        platform: String,
        #[source]
        source: slackntell_channels::Error,
    },

    /// A bulk directory listing failed; no partial directory is published.
    #[error("directory load failed: {source}")]
    Directory {
        #[source]
        source: slackntell_channels::Error,
    },

    /// A message event is missing data the pipeline cannot do without.
    #[error("malformed message event: {reason} (data: {data})")]
    MalformedEvent { reason: String, data: String },

    /// A connection attempt finished after shutdown and was torn down.
    #[error("connection attempt abandoned: supervisor shut down")]
    ShutDown,

    /// Settings derived from the configuration are unusable.
    #[error("invalid settings: {message}")]
    Settings { message: String },
}

impl Error {
    #[must_use]
    pub fn malformed(reason: impl Into<String>, event: &MessageEvent) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
            data: serde_json::to_string_pretty(event).unwrap_or_else(|_| format!("{event:?}")),
        }
    }

    #[must_use]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }
}
