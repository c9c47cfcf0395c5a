#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid input: {0}")]
    Types(#[from] moonlight_types::TypesError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Store(#[from] moonlight_store::StoreError),
    #[error("failed to serialise document: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialise document: {0}")]
    Deserialization(serde_json::Error),
}

impl CoreError {
    /// True when the request itself was at fault and retrying it unchanged
    /// cannot succeed.
    pub fn is_client_error(&self) -> bool {
        match self {
            CoreError::InvalidInput(_) | CoreError::Types(_) => true,
            CoreError::Store(e) => e.is_caller_error(),
            _ => false,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
