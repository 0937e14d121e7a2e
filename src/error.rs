use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Expected {expected} agent states, got {actual}")]
    AgentCountMismatch { expected: usize, actual: usize },

    #[error("Service response carried no state group")]
    MissingStates,

    #[error("Invalid service address: {0}")]
    InvalidAddress(String),

    #[cfg(feature = "rpc")]
    #[error("Service call failed: {0}")]
    Rpc(Box<tonic::Status>),

    #[cfg(feature = "rpc")]
    #[error("Service at {address} did not come up within {waited:?}")]
    ServiceUnavailable {
        address: String,
        waited: std::time::Duration,
        /// The last failed connection attempt
        #[source]
        source: tonic::transport::Error,
    },

    #[cfg(feature = "torch")]
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("Policy produced {actual} action values, expected {expected}")]
    PolicyOutput { expected: usize, actual: usize },

    #[error("Malformed output file: {0}")]
    Malformed(&'static str),
}

#[cfg(feature = "rpc")]
impl From<tonic::Status> for EvalError {
    fn from(status: tonic::Status) -> Self {
        EvalError::Rpc(Box::new(status))
    }
}
