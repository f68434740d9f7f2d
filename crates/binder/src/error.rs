use shared::error::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("endpoint returned non-success status {0}")]
    Status(u16),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FetchError {
    /// Text written to the page when errors are shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEndpoint { .. } | Self::Transport(_) => {
                "Die Temperatur konnte nicht abgerufen werden.".to_string()
            }
            Self::Status(code) => format!("Der Server antwortete mit Status {code}."),
            Self::Decode(_) => "Die Antwort des Servers war unverständlich.".to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("no trigger with id '{0}'")]
    UnknownTrigger(String),
    #[error("no trigger at position {0}")]
    NoTriggerAt(usize),
    #[error("no display surface with id '{0}'")]
    UnknownSurface(String),
    #[error("element id '{0}' is already in use")]
    DuplicateId(String),
}
