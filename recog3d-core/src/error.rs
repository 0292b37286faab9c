//! Error types for recog3d

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which of the two recognition inputs an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudRole {
    Model,
    Scene,
}

impl fmt::Display for CloudRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudRole::Model => write!(f, "model"),
            CloudRole::Scene => write!(f, "scene"),
        }
    }
}

/// Main error type for recog3d operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("{role} cloud is empty")]
    EmptyCloud { role: CloudRole },

    #[error("{role} cloud unavailable: {reason}")]
    InputUnavailable { role: CloudRole, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for recog3d operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_cloud() {
        let err = Error::EmptyCloud { role: CloudRole::Model };
        assert_eq!(err.to_string(), "model cloud is empty");

        let err = Error::InputUnavailable {
            role: CloudRole::Scene,
            reason: "no such file".to_string(),
        };
        assert_eq!(err.to_string(), "scene cloud unavailable: no such file");
    }
}
