use ripple_store::StoreError;

/// Errors reported by a push endpoint provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The endpoint no longer exists on the provider side. The
    /// reconciler recovers from this locally by recreating it.
    #[error("endpoint not found: {arn}")]
    EndpointNotFound { arn: String },

    /// A transient provider failure. The caller may retry the whole
    /// operation.
    #[error("push provider unavailable: {message}")]
    Unavailable { message: String },
}

impl ProviderError {
    pub fn is_endpoint_not_found(&self) -> bool {
        matches!(self, ProviderError::EndpointNotFound { .. })
    }
}

/// All errors the device operations can surface.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device store rejected the record's shape; surfaced to the
    /// client of the update operation as a validation failure.
    #[error("invalid device entity: {source}")]
    InvalidEntity { source: StoreError },

    /// An underlying store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An underlying provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The caller's cancellation token fired.
    #[error("device operation cancelled")]
    Cancelled,
}
