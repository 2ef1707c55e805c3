use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ripple_store::{App, Device, DeviceStore};

use crate::checkpoint;
use crate::error::DeviceError;
use crate::provider::PushProvider;

/// Keeps a device record in symmetry with its remote push endpoint.
pub struct EndpointReconciler {
    devices: Arc<dyn DeviceStore>,
    provider: Arc<dyn PushProvider>,
}

impl EndpointReconciler {
    pub fn new(devices: Arc<dyn DeviceStore>, provider: Arc<dyn PushProvider>) -> Self {
        EndpointReconciler { devices, provider }
    }

    /// Assure symmetry between the device record and the provider:
    ///
    /// * no endpoint yet: create one, persist the ARN;
    /// * endpoint gone on the provider side: recreate, persist;
    /// * remote token differs: push the device token to the provider;
    /// * tokens equal: nothing to do.
    ///
    /// On success the remote endpoint's token equals `device.token`.
    /// `deleted` and `disabled` are never touched. The
    /// retrieve-then-write sequence is not atomic: two concurrent
    /// reconciles for one device may both create an endpoint, the
    /// later persist wins, and the orphan is cleaned up through the
    /// provider's endpoint-disable path.
    pub async fn reconcile(
        &self,
        app: &App,
        platform_arn: &str,
        device: Device,
        cancel: &CancellationToken,
    ) -> Result<Device, DeviceError> {
        let Some(arn) = device.endpoint_arn.clone() else {
            return self.register(app, platform_arn, device, cancel).await;
        };

        checkpoint(cancel)?;
        let endpoint = match self.provider.endpoint_retrieve(&arn).await {
            Ok(endpoint) => endpoint,
            Err(err) if err.is_endpoint_not_found() => {
                tracing::warn!(arn = %arn, "push endpoint gone, recreating");
                return self.register(app, platform_arn, device, cancel).await;
            }
            Err(err) => return Err(err.into()),
        };

        if device.token != endpoint.token {
            checkpoint(cancel)?;
            self.provider.endpoint_update(&arn, &device.token).await?;
        }

        Ok(device)
    }

    async fn register(
        &self,
        app: &App,
        platform_arn: &str,
        mut device: Device,
        cancel: &CancellationToken,
    ) -> Result<Device, DeviceError> {
        checkpoint(cancel)?;
        let endpoint = self
            .provider
            .endpoint_create(platform_arn, &device.token)
            .await?;
        device.endpoint_arn = Some(endpoint.arn);

        checkpoint(cancel)?;
        Ok(self.devices.put(app.namespace(), device).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{Endpoint, MemoryProvider};
    use crate::testutil::CountingDeviceStore;
    use async_trait::async_trait;
    use ripple_store::{DeviceQueryOptions, Platform};

    const PLATFORM_ARN: &str = "arn:app/ios";

    fn app() -> App {
        App {
            id: 1,
            namespace: "app_1_1".to_string(),
        }
    }

    fn device(token: &str, endpoint_arn: Option<&str>) -> Device {
        Device {
            device_id: "d-1".to_string(),
            user_id: 7,
            platform: Platform::Ios,
            token: token.to_string(),
            language: "en".to_string(),
            endpoint_arn: endpoint_arn.map(str::to_string),
            deleted: false,
            disabled: false,
        }
    }

    async fn stored_device(store: &CountingDeviceStore, app: &App) -> Device {
        let mut devices = store
            .query(app.namespace(), DeviceQueryOptions::default())
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        devices.swap_remove(0)
    }

    #[tokio::test]
    async fn creates_and_persists_endpoint_for_new_device() {
        let store = Arc::new(CountingDeviceStore::new());
        let provider = Arc::new(MemoryProvider::new());
        let reconciler = EndpointReconciler::new(store.clone(), provider.clone());

        let out = reconciler
            .reconcile(&app(), PLATFORM_ARN, device("t-1", None), &CancellationToken::new())
            .await
            .unwrap();

        let arn = out.endpoint_arn.clone().expect("arn assigned");
        // Symmetry: the provider now stores the device token.
        assert_eq!(provider.token(&arn).as_deref(), Some("t-1"));
        assert_eq!(stored_device(&store, &app()).await, out);
    }

    #[tokio::test]
    async fn recreates_endpoint_when_provider_lost_it() {
        let store = Arc::new(CountingDeviceStore::new());
        let provider = Arc::new(MemoryProvider::new());
        let reconciler = EndpointReconciler::new(store.clone(), provider.clone());

        // "arn:x" was registered once but is gone on the provider side.
        provider.register("arn:x", "t-1");
        provider.remove("arn:x");

        let out = reconciler
            .reconcile(
                &app(),
                PLATFORM_ARN,
                device("t-1", Some("arn:x")),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let arn = out.endpoint_arn.clone().expect("arn assigned");
        assert_ne!(arn, "arn:x");
        assert_eq!(provider.token(&arn).as_deref(), Some("t-1"));
        assert_eq!(provider.create_calls(), 1);
        assert_eq!(stored_device(&store, &app()).await.endpoint_arn, Some(arn));
    }

    #[tokio::test]
    async fn rotates_token_without_rewriting_the_device() {
        let store = Arc::new(CountingDeviceStore::new());
        let provider = Arc::new(MemoryProvider::new());
        provider.register("arn:y", "t-1");
        let reconciler = EndpointReconciler::new(store.clone(), provider.clone());

        let input = device("t-2", Some("arn:y"));
        let out = reconciler
            .reconcile(&app(), PLATFORM_ARN, input.clone(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, input);
        assert_eq!(provider.update_calls(), 1);
        assert_eq!(provider.token("arn:y").as_deref(), Some("t-2"));
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn equal_tokens_touch_nothing() {
        let store = Arc::new(CountingDeviceStore::new());
        let provider = Arc::new(MemoryProvider::new());
        provider.register("arn:y", "t-1");
        let reconciler = EndpointReconciler::new(store.clone(), provider.clone());

        let input = device("t-1", Some("arn:y"));
        let out = reconciler
            .reconcile(&app(), PLATFORM_ARN, input.clone(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, input);
        assert_eq!(provider.update_calls(), 0);
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn transient_retrieve_failures_surface() {
        struct FlakyProvider;

        #[async_trait]
        impl PushProvider for FlakyProvider {
            async fn endpoint_create(
                &self,
                _platform_arn: &str,
                _token: &str,
            ) -> Result<Endpoint, ProviderError> {
                unreachable!("create must not be called");
            }

            async fn endpoint_retrieve(&self, _arn: &str) -> Result<Endpoint, ProviderError> {
                Err(ProviderError::Unavailable {
                    message: "throttled".to_string(),
                })
            }

            async fn endpoint_update(
                &self,
                _arn: &str,
                _token: &str,
            ) -> Result<(), ProviderError> {
                unreachable!("update must not be called");
            }
        }

        let store = Arc::new(CountingDeviceStore::new());
        let reconciler = EndpointReconciler::new(store.clone(), Arc::new(FlakyProvider));

        let err = reconciler
            .reconcile(
                &app(),
                PLATFORM_ARN,
                device("t-1", Some("arn:y")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeviceError::Provider(ProviderError::Unavailable { .. })
        ));
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_call() {
        let store = Arc::new(CountingDeviceStore::new());
        let provider = Arc::new(MemoryProvider::new());
        let reconciler = EndpointReconciler::new(store.clone(), provider.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = reconciler
            .reconcile(&app(), PLATFORM_ARN, device("t-1", None), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DeviceError::Cancelled));
        assert_eq!(provider.create_calls(), 0);
        assert_eq!(store.puts(), 0);
    }
}
