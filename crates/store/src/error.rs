/// All errors that can be returned by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A required entity lookup matched no rows.
    #[error("{entity} not found for '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// The device store rejected a write for shape or validity.
    #[error("invalid device: {message}")]
    InvalidDevice { message: String },

    /// A platform name outside the supported set.
    #[error("invalid platform: '{value}'")]
    InvalidPlatform { value: String },

    /// A transient backend failure (connection, timeout, etc.). The
    /// caller may retry the whole operation.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Indicates whether the error is a missing-entity lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
