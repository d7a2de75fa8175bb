use claims_types::{RangeError, TextError};

#[derive(Debug, thiserror::Error)]
pub enum DenialError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("claim not found: {0}")]
    ClaimNotFound(String),
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
    #[error("payer connection not found: {0}")]
    PayerConnectionNotFound(String),

    #[error("claims store error: {0}")]
    Store(String),
    #[error("failed to apply corrections to claim {claim_id}: {reason}")]
    CorrectionsNotApplied { claim_id: String, reason: String },

    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("text error: {0}")]
    Text(#[from] TextError),
    #[error("range error: {0}")]
    Range(#[from] RangeError),
}

impl DenialError {
    /// Whether the error reports a missing record rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DenialError::ClaimNotFound(_)
                | DenialError::ProviderNotFound(_)
                | DenialError::PayerConnectionNotFound(_)
        )
    }
}

pub type DenialResult<T> = std::result::Result<T, DenialError>;
