/*
src/error.rs

The four error kinds the protocol distinguishes: configuration errors
(bad input), transport-init errors (the backend couldn't be built),
output errors (tolerated, logged, and skipped), and protocol violations
(fatal, since the source leaves them undefined behavior and this crate
fails fast instead).
*/

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SwarmError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport initialization failed: {0}")]
    TransportInit(String),

    #[error("failed to write output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<crate::net::TransportError> for SwarmError {
    fn from(err: crate::net::TransportError) -> Self {
        SwarmError::TransportInit(err.to_string())
    }
}
