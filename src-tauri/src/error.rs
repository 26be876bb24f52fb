use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("failed to launch backend with {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("backend probe failed: {0}")]
    Probe(String),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("autostart registration failed: {0}")]
    Autostart(String),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

pub type DeckResult<T> = Result<T, DeckError>;

impl From<reqwest::Error> for DeckError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::Probe(error.to_string())
        }
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(error: serde_json::Error) -> Self {
        Self::MalformedResponse(error.to_string())
    }
}
