//! Failure taxonomy shared by the source adapters and transforms.
//!
//! Name-matching misses are not errors; they surface as
//! [`crate::terminus::Resolution::Unresolved`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Non-2xx response, transport failure, or exhausted retries.
    #[error("retrieval of {url} failed: {reason}")]
    Retrieval { url: String, reason: String },

    /// An expected member is missing from a downloaded archive.
    #[error("{file} missing from archive {archive}")]
    Extraction { archive: String, file: String },

    /// Payload or row does not have the shape the adapter reads.
    #[error("could not parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn retrieval(url: &str, reason: impl ToString) -> Self {
        PipelineError::Retrieval {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: &str, reason: impl ToString) -> Self {
        PipelineError::Parse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
