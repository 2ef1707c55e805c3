use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::ProviderError;

/// A registered push endpoint as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub arn: String,
    pub token: String,
}

/// The remote push endpoint registry.
///
/// Exactly the operations the reconciler consumes; everything else
/// about the provider (delivery, attributes, topics) is out of scope.
/// `EndpointNotFound` must be distinguishable from transient failures,
/// since the reconciler recovers from the former and surfaces the
/// latter.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Register a token under the platform application, returning the
    /// new endpoint.
    async fn endpoint_create(
        &self,
        platform_arn: &str,
        token: &str,
    ) -> Result<Endpoint, ProviderError>;

    /// Look up an endpoint by ARN.
    async fn endpoint_retrieve(&self, arn: &str) -> Result<Endpoint, ProviderError>;

    /// Replace the token stored under an existing endpoint.
    async fn endpoint_update(&self, arn: &str, token: &str) -> Result<(), ProviderError>;
}

#[derive(Debug, Default)]
struct MemoryProviderState {
    endpoints: HashMap<String, String>,
    minted: u64,
    create_calls: u64,
    update_calls: u64,
}

/// Deterministic in-memory `PushProvider` for tests and local wiring.
///
/// Minted ARNs are derived from the platform ARN and a counter, and
/// the per-operation call counters let tests assert on provider
/// traffic.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<MemoryProviderState>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an already-registered endpoint.
    pub fn register(&self, arn: &str, token: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.endpoints.insert(arn.to_string(), token.to_string());
    }

    /// Drop an endpoint, simulating provider-side deletion.
    pub fn remove(&self, arn: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.endpoints.remove(arn);
    }

    /// The token currently stored under an ARN, if any.
    pub fn token(&self, arn: &str) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.endpoints.get(arn).cloned()
    }

    pub fn create_calls(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.create_calls
    }

    pub fn update_calls(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.update_calls
    }
}

#[async_trait]
impl PushProvider for MemoryProvider {
    async fn endpoint_create(
        &self,
        platform_arn: &str,
        token: &str,
    ) -> Result<Endpoint, ProviderError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.create_calls += 1;
        state.minted += 1;

        let arn = format!("{platform_arn}/endpoint/{}", state.minted);
        state.endpoints.insert(arn.clone(), token.to_string());

        Ok(Endpoint {
            arn,
            token: token.to_string(),
        })
    }

    async fn endpoint_retrieve(&self, arn: &str) -> Result<Endpoint, ProviderError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.endpoints.get(arn) {
            Some(token) => Ok(Endpoint {
                arn: arn.to_string(),
                token: token.clone(),
            }),
            None => Err(ProviderError::EndpointNotFound {
                arn: arn.to_string(),
            }),
        }
    }

    async fn endpoint_update(&self, arn: &str, token: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.update_calls += 1;
        match state.endpoints.get_mut(arn) {
            Some(stored) => {
                *stored = token.to_string();
                Ok(())
            }
            None => Err(ProviderError::EndpointNotFound {
                arn: arn.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_mints_distinct_arns() {
        let provider = MemoryProvider::new();
        let first = provider.endpoint_create("arn:app", "t-1").await.unwrap();
        let second = provider.endpoint_create("arn:app", "t-2").await.unwrap();

        assert_ne!(first.arn, second.arn);
        assert_eq!(provider.token(&first.arn).as_deref(), Some("t-1"));
        assert_eq!(provider.token(&second.arn).as_deref(), Some("t-2"));
    }

    #[tokio::test]
    async fn retrieve_and_update_report_missing_endpoints() {
        let provider = MemoryProvider::new();

        let err = provider.endpoint_retrieve("arn:gone").await.unwrap_err();
        assert!(err.is_endpoint_not_found());

        let err = provider.endpoint_update("arn:gone", "t").await.unwrap_err();
        assert!(err.is_endpoint_not_found());
    }
}
