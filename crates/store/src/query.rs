use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Device, Object, Platform, User};

/// Filter options for user lookups. Empty fields are not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQueryOptions {
    #[serde(default)]
    pub ids: Vec<u64>,
}

impl UserQueryOptions {
    pub fn matches(&self, user: &User) -> bool {
        self.ids.is_empty() || self.ids.contains(&user.id)
    }
}

/// Filter options for object lookups. Empty fields are not applied.
///
/// This is also the JSON shape an `objectOwner` rule condition must
/// render: e.g. `{"parent_ids": [{{object.id}}], "kinds": ["comment"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectQueryOptions {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub owner_ids: Vec<u64>,
    #[serde(default)]
    pub parent_ids: Vec<u64>,
    #[serde(default)]
    pub kinds: Vec<String>,
    /// Upper bound on `created_at`, exclusive.
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,
}

impl ObjectQueryOptions {
    pub fn matches(&self, object: &Object) -> bool {
        (self.ids.is_empty() || self.ids.contains(&object.id))
            && (self.owner_ids.is_empty() || self.owner_ids.contains(&object.owner_id))
            && (self.parent_ids.is_empty()
                || object
                    .parent_id
                    .is_some_and(|parent_id| self.parent_ids.contains(&parent_id)))
            && (self.kinds.is_empty() || self.kinds.contains(&object.kind))
            && self.before.map_or(true, |bound| object.created_at < bound)
    }
}

/// Filter options for device lookups. Empty fields are not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceQueryOptions {
    #[serde(default)]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<u64>,
    #[serde(default)]
    pub endpoint_arns: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

impl DeviceQueryOptions {
    pub fn matches(&self, device: &Device) -> bool {
        (self.device_ids.is_empty() || self.device_ids.contains(&device.device_id))
            && (self.user_ids.is_empty() || self.user_ids.contains(&device.user_id))
            && (self.endpoint_arns.is_empty()
                || device
                    .endpoint_arn
                    .as_ref()
                    .is_some_and(|arn| self.endpoint_arns.contains(arn)))
            && (self.platforms.is_empty() || self.platforms.contains(&device.platform))
            && self.deleted.map_or(true, |deleted| device.deleted == deleted)
            && self.disabled.map_or(true, |disabled| device.disabled == disabled)
    }
}
