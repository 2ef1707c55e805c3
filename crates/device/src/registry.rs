use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ripple_store::{
    App, Device, DeviceQueryOptions, DeviceStore, Origin, Platform, StoreError,
};

use crate::checkpoint;
use crate::error::DeviceError;

/// The device registry operations the transport layer calls.
pub struct DeviceRegistry {
    devices: Arc<dyn DeviceStore>,
}

impl DeviceRegistry {
    pub fn new(devices: Arc<dyn DeviceStore>) -> Self {
        DeviceRegistry { devices }
    }

    /// Record a token or language update for the origin's device,
    /// creating the record on first sight and reanimating a disabled
    /// one. An update carrying the stored token writes nothing.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        app: &App,
        origin: Origin,
        device_id: &str,
        platform: Platform,
        token: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceError> {
        checkpoint(cancel)?;
        let existing = self
            .devices
            .query(
                app.namespace(),
                DeviceQueryOptions {
                    deleted: Some(false),
                    device_ids: vec![device_id.to_string()],
                    user_ids: vec![origin.user_id],
                    ..Default::default()
                },
            )
            .await?;

        let device = match existing.into_iter().next() {
            Some(device) if device.token == token => return Ok(()),
            Some(mut device) => {
                device.disabled = false;
                device.token = token.to_string();
                device
            }
            None => Device {
                device_id: device_id.to_string(),
                user_id: origin.user_id,
                platform,
                token: token.to_string(),
                language: language.to_string(),
                endpoint_arn: None,
                deleted: false,
                disabled: false,
            },
        };

        checkpoint(cancel)?;
        match self.devices.put(app.namespace(), device).await {
            Ok(_) => Ok(()),
            Err(err @ StoreError::InvalidDevice { .. }) => {
                Err(DeviceError::InvalidEntity { source: err })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Soft-delete the origin's device. Succeeds silently when the
    /// device does not exist.
    pub async fn delete(
        &self,
        app: &App,
        origin: Origin,
        device_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceError> {
        checkpoint(cancel)?;
        let existing = self
            .devices
            .query(
                app.namespace(),
                DeviceQueryOptions {
                    deleted: Some(false),
                    device_ids: vec![device_id.to_string()],
                    user_ids: vec![origin.user_id],
                    ..Default::default()
                },
            )
            .await?;

        let Some(mut device) = existing.into_iter().next() else {
            return Ok(());
        };
        device.deleted = true;

        checkpoint(cancel)?;
        self.devices.put(app.namespace(), device).await?;
        Ok(())
    }

    /// Disable the device registered under an endpoint ARN. Called by
    /// the delivery layer when the provider reports the endpoint
    /// permanently invalid. Succeeds silently when no device matches.
    pub async fn disable(
        &self,
        app: &App,
        endpoint_arn: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceError> {
        checkpoint(cancel)?;
        let existing = self
            .devices
            .query(
                app.namespace(),
                DeviceQueryOptions {
                    deleted: Some(false),
                    endpoint_arns: vec![endpoint_arn.to_string()],
                    ..Default::default()
                },
            )
            .await?;

        let Some(mut device) = existing.into_iter().next() else {
            return Ok(());
        };
        tracing::debug!(arn = %endpoint_arn, "disabling device for dead endpoint");
        device.disabled = true;

        checkpoint(cancel)?;
        self.devices.put(app.namespace(), device).await?;
        Ok(())
    }

    /// All deliverable devices of a user: not deleted, not disabled,
    /// on a supported platform.
    pub async fn list(
        &self,
        app: &App,
        user_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Device>, DeviceError> {
        checkpoint(cancel)?;
        Ok(self
            .devices
            .query(
                app.namespace(),
                DeviceQueryOptions {
                    deleted: Some(false),
                    disabled: Some(false),
                    platforms: Platform::ALL.to_vec(),
                    user_ids: vec![user_id],
                    ..Default::default()
                },
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::CountingDeviceStore;

    const NS: &str = "app_1_1";
    const DEVICE_ID: &str = "d-1";

    fn app() -> App {
        App {
            id: 1,
            namespace: NS.to_string(),
        }
    }

    fn origin() -> Origin {
        Origin { user_id: 7 }
    }

    fn registry() -> (Arc<CountingDeviceStore>, DeviceRegistry) {
        let store = Arc::new(CountingDeviceStore::new());
        let registry = DeviceRegistry::new(store.clone());
        (store, registry)
    }

    async fn update(registry: &DeviceRegistry, token: &str) -> Result<(), DeviceError> {
        registry
            .update(
                &app(),
                origin(),
                DEVICE_ID,
                Platform::Android,
                token,
                "en",
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn update_creates_then_skips_same_token() {
        let (store, registry) = registry();

        update(&registry, "t-1").await.unwrap();
        assert_eq!(store.puts(), 1);

        // Same token again: no write at all.
        update(&registry, "t-1").await.unwrap();
        assert_eq!(store.puts(), 1);

        let devices = registry
            .list(&app(), origin().user_id, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].token, "t-1");
    }

    #[tokio::test]
    async fn update_rotates_token_and_reenables() {
        let (store, registry) = registry();
        update(&registry, "t-1").await.unwrap();

        // Simulate the delivery layer disabling the device.
        let mut device = store
            .query(NS, DeviceQueryOptions::default())
            .await
            .unwrap()
            .remove(0);
        device.disabled = true;
        store.inner.put(NS, device).await.unwrap();

        update(&registry, "t-2").await.unwrap();

        let devices = registry
            .list(&app(), origin().user_id, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].token, "t-2");
        assert!(!devices[0].disabled);
    }

    #[tokio::test]
    async fn update_rejects_invalid_records() {
        let (_store, registry) = registry();

        let err = update(&registry, "").await.unwrap_err();
        assert!(matches!(err, DeviceError::InvalidEntity { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_hides_the_device() {
        let (_store, registry) = registry();
        update(&registry, "t-1").await.unwrap();

        registry
            .delete(&app(), origin(), DEVICE_ID, &CancellationToken::new())
            .await
            .unwrap();
        registry
            .delete(&app(), origin(), DEVICE_ID, &CancellationToken::new())
            .await
            .unwrap();

        let devices = registry
            .list(&app(), origin().user_id, &CancellationToken::new())
            .await
            .unwrap();
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn update_after_delete_reanimates_the_device() {
        let (_store, registry) = registry();
        update(&registry, "t-1").await.unwrap();
        registry
            .delete(&app(), origin(), DEVICE_ID, &CancellationToken::new())
            .await
            .unwrap();

        // Same token as the deleted record: still a fresh create,
        // since deleted devices are invisible to update.
        update(&registry, "t-1").await.unwrap();

        let devices = registry
            .list(&app(), origin().user_id, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert!(!devices[0].deleted);
    }

    #[tokio::test]
    async fn disable_is_idempotent_and_hides_the_device() {
        let (store, registry) = registry();
        update(&registry, "t-1").await.unwrap();

        // Attach an endpoint ARN the delivery layer would report.
        let mut device = store
            .query(NS, DeviceQueryOptions::default())
            .await
            .unwrap()
            .remove(0);
        device.endpoint_arn = Some("arn:dead".to_string());
        store.inner.put(NS, device).await.unwrap();

        registry
            .disable(&app(), "arn:dead", &CancellationToken::new())
            .await
            .unwrap();
        registry
            .disable(&app(), "arn:dead", &CancellationToken::new())
            .await
            .unwrap();

        let devices = registry
            .list(&app(), origin().user_id, &CancellationToken::new())
            .await
            .unwrap();
        assert!(devices.is_empty());
    }

    #[tokio::test]
    async fn disable_on_unknown_arn_is_a_no_op() {
        let (store, registry) = registry();

        registry
            .disable(&app(), "arn:unknown", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_call() {
        let (store, registry) = registry();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = registry
            .update(
                &app(),
                origin(),
                DEVICE_ID,
                Platform::Android,
                "t-1",
                "en",
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Cancelled));
        assert_eq!(store.puts(), 0);
    }
}
