use chainscout_api::FetchError;
use thiserror::Error;

/// All the ways a run can go wrong.
///
/// Only `TransportError` is ever recovered from, and only at page or query
/// granularity. The rest end the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    TransportError(#[from] FetchError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::TransportError(_))
    }
}
