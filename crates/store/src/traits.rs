use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::{DeviceQueryOptions, ObjectQueryOptions, UserQueryOptions};
use crate::record::{Device, Object, User};

/// Store of user records.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// concurrent dispatches. `fetch` and `many` are provided on top of
/// `query` and give the lookup semantics every caller needs: a missing
/// required user is a `NotFound`, and bulk materialisation is
/// deduplicated and deterministically ordered.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return all users in the namespace matching the options.
    async fn query(&self, namespace: &str, opts: UserQueryOptions) -> Result<Vec<User>, StoreError>;

    /// Fetch exactly one user by id. Anything other than a single
    /// match is a `NotFound`.
    async fn fetch(&self, namespace: &str, id: u64) -> Result<User, StoreError> {
        let mut users = self
            .query(namespace, UserQueryOptions { ids: vec![id] })
            .await?;
        if users.len() == 1 {
            Ok(users.swap_remove(0))
        } else {
            Err(StoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            })
        }
    }

    /// Materialise user records for an id list.
    ///
    /// The id list is deduplicated by first occurrence and the result
    /// follows the deduplicated order; ids with no backing user are
    /// dropped silently.
    async fn many(&self, namespace: &str, ids: &[u64]) -> Result<Vec<User>, StoreError> {
        let mut seen = HashSet::new();
        let wanted: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let users = self
            .query(
                namespace,
                UserQueryOptions {
                    ids: wanted.clone(),
                },
            )
            .await?;
        let mut by_id: HashMap<u64, User> = users.into_iter().map(|user| (user.id, user)).collect();

        Ok(wanted
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }
}

/// Store of content objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Return all objects in the namespace matching the options.
    async fn query(
        &self,
        namespace: &str,
        opts: ObjectQueryOptions,
    ) -> Result<Vec<Object>, StoreError>;

    /// Fetch exactly one object by id. Anything other than a single
    /// match is a `NotFound`.
    async fn fetch(&self, namespace: &str, id: u64) -> Result<Object, StoreError> {
        let mut objects = self
            .query(
                namespace,
                ObjectQueryOptions {
                    ids: vec![id],
                    ..Default::default()
                },
            )
            .await?;
        if objects.len() == 1 {
            Ok(objects.swap_remove(0))
        } else {
            Err(StoreError::NotFound {
                entity: "object",
                id: id.to_string(),
            })
        }
    }
}

/// Store of social connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Ids of the user's mutual (confirmed friend) connection
    /// partners, in store iteration order.
    async fn friend_ids(&self, namespace: &str, user_id: u64) -> Result<Vec<u64>, StoreError>;
}

/// Store of push device records.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Return all devices in the namespace matching the options.
    async fn query(
        &self,
        namespace: &str,
        opts: DeviceQueryOptions,
    ) -> Result<Vec<Device>, StoreError>;

    /// Upsert a device, keyed by (namespace, device_id, user_id).
    /// Shape violations are reported as `InvalidDevice`.
    async fn put(&self, namespace: &str, device: Device) -> Result<Device, StoreError>;
}
