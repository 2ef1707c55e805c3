//! Push device lifecycle for the ripple core.
//!
//! Two concerns live here: the [`EndpointReconciler`], which keeps a
//! local device record in symmetry with its remote push endpoint
//! (create, recreate-on-gone, token rotation), and the
//! [`DeviceRegistry`], the update/delete/disable/list operations the
//! transport layer calls against the device store.
//!
//! The remote registry is abstracted behind [`PushProvider`]; a
//! deterministic [`MemoryProvider`] ships for tests and local wiring.

mod error;
mod provider;
mod reconcile;
mod registry;

pub use error::{DeviceError, ProviderError};
pub use provider::{Endpoint, MemoryProvider, PushProvider};
pub use reconcile::EndpointReconciler;
pub use registry::DeviceRegistry;

use tokio_util::sync::CancellationToken;

/// Returns `Cancelled` once the caller's token has fired. Placed
/// before every store or provider call.
pub(crate) fn checkpoint(cancel: &CancellationToken) -> Result<(), DeviceError> {
    if cancel.is_cancelled() {
        return Err(DeviceError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;

    use ripple_store::{
        Device, DeviceQueryOptions, DeviceStore, MemoryDeviceStore, StoreError,
    };

    /// Device store wrapper counting writes, for no-op assertions.
    #[derive(Default)]
    pub struct CountingDeviceStore {
        pub inner: MemoryDeviceStore,
        puts: AtomicU64,
    }

    impl CountingDeviceStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn puts(&self) -> u64 {
            self.puts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeviceStore for CountingDeviceStore {
        async fn query(
            &self,
            namespace: &str,
            opts: DeviceQueryOptions,
        ) -> Result<Vec<Device>, StoreError> {
            self.inner.query(namespace, opts).await
        }

        async fn put(&self, namespace: &str, device: Device) -> Result<Device, StoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(namespace, device).await
        }
    }
}
