use {slack_morphism::errors::SlackClientError, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    /// A Web API call failed, either in transport or with `ok: false`.
    #[error("{method} failed: {source}")]
    Api {
        method: &'static str,
        #[source]
        source: SlackClientError,
    },

    #[error(transparent)]
    Channel(#[from] slackntell_channels::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn api(method: &'static str, source: SlackClientError) -> Self {
        Self::Api { method, source }
    }
}

impl From<Error> for slackntell_channels::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Api {
                method,
                source: SlackClientError::ApiError(reply),
            } => Self::not_ok(method, Some(reply.code)),
            Error::Channel(inner) => inner,
            other => Self::external("slack", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
