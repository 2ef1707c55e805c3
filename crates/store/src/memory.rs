//! In-memory store backends for tests and local wiring.
//!
//! All four stores are namespace-keyed and insertion-ordered, which
//! gives callers the deterministic iteration order the pipeline's
//! ordering contract relies on.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::query::{DeviceQueryOptions, ObjectQueryOptions, UserQueryOptions};
use crate::record::{Connection, ConnectionKind, ConnectionState, Device, Object, User};
use crate::traits::{ConnectionStore, DeviceStore, ObjectStore, UserStore};

/// In-memory `UserStore`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, Vec<User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, namespace: &str, user: User) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.entry(namespace.to_string()).or_default().push(user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn query(&self, namespace: &str, opts: UserQueryOptions) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .get(namespace)
            .map(|users| {
                users
                    .iter()
                    .filter(|user| opts.matches(user))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory `ObjectStore`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<Object>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, namespace: &str, object: Object) {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects
            .entry(namespace.to_string())
            .or_default()
            .push(object);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn query(
        &self,
        namespace: &str,
        opts: ObjectQueryOptions,
    ) -> Result<Vec<Object>, StoreError> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .get(namespace)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|object| opts.matches(object))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory `ConnectionStore`.
#[derive(Debug, Default)]
pub struct MemoryConnectionStore {
    connections: Mutex<HashMap<String, Vec<Connection>>>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, namespace: &str, connection: Connection) {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections
            .entry(namespace.to_string())
            .or_default()
            .push(connection);
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn friend_ids(&self, namespace: &str, user_id: u64) -> Result<Vec<u64>, StoreError> {
        let connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(connections) = connections.get(namespace) else {
            return Ok(Vec::new());
        };

        Ok(connections
            .iter()
            .filter(|connection| {
                connection.kind == ConnectionKind::Friend
                    && connection.state == ConnectionState::Confirmed
            })
            .filter_map(|connection| {
                if connection.from_id == user_id {
                    Some(connection.to_id)
                } else if connection.to_id == user_id {
                    Some(connection.from_id)
                } else {
                    None
                }
            })
            .collect())
    }
}

/// In-memory `DeviceStore`. Upserts are keyed by
/// (namespace, device_id, user_id).
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    devices: Mutex<HashMap<String, Vec<Device>>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn query(
        &self,
        namespace: &str,
        opts: DeviceQueryOptions,
    ) -> Result<Vec<Device>, StoreError> {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(devices
            .get(namespace)
            .map(|devices| {
                devices
                    .iter()
                    .filter(|device| opts.matches(device))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, namespace: &str, device: Device) -> Result<Device, StoreError> {
        if device.device_id.is_empty() {
            return Err(StoreError::InvalidDevice {
                message: "device_id must not be empty".to_string(),
            });
        }
        if device.token.is_empty() {
            return Err(StoreError::InvalidDevice {
                message: "token must not be empty".to_string(),
            });
        }

        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        let devices = devices.entry(namespace.to_string()).or_default();

        match devices.iter_mut().find(|existing| {
            existing.device_id == device.device_id && existing.user_id == device.user_id
        }) {
            Some(existing) => *existing = device.clone(),
            None => devices.push(device.clone()),
        }

        Ok(device)
    }
}
