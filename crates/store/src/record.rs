use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// An application tenant. The namespace scopes every store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: u64,
    pub namespace: String,
}

impl App {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// The acting principal of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub user_id: u64,
}

/// Push platforms a device can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    IosSandbox,
    Android,
}

impl Platform {
    /// Every platform the delivery layer supports.
    pub const ALL: [Platform; 3] = [Platform::Ios, Platform::IosSandbox, Platform::Android];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::IosSandbox => "ios_sandbox",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ios" => Ok(Platform::Ios),
            "ios_sandbox" => Ok(Platform::IosSandbox),
            "android" => Ok(Platform::Android),
            other => Err(StoreError::InvalidPlatform {
                value: other.to_string(),
            }),
        }
    }
}

/// A registered push target.
///
/// At most one non-deleted device exists per
/// (namespace, device_id, user_id). `endpoint_arn` is `Some` only after
/// an endpoint was registered with the push provider at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub user_id: u64,
    pub platform: Platform,
    pub token: String,
    pub language: String,
    pub endpoint_arn: Option<String>,
    pub deleted: bool,
    pub disabled: bool,
}

/// A member of the social graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Follow,
    Friend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Pending,
    Confirmed,
    Rejected,
}

/// A directed social connection between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from_id: u64,
    pub to_id: u64,
    pub kind: ConnectionKind,
    pub state: ConnectionState,
}

/// A user-visible activity, optionally attached to an object.
///
/// `object_id: None` means the event stands alone and no parent lookup
/// happens for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub user_id: u64,
    pub object_id: Option<u64>,
    pub kind: String,
}

/// A content object, optionally attached to a parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: u64,
    pub owner_id: u64,
    pub kind: String,
    pub parent_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// An (old, new) pair over a domain entity, emitted by an upstream
/// observer. The new side drives context construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange<T> {
    pub old: Option<T>,
    pub new: Option<T>,
}

impl<T> StateChange<T> {
    /// A change describing a freshly created entity.
    pub fn created(new: T) -> Self {
        StateChange {
            old: None,
            new: Some(new),
        }
    }

    /// A change describing an entity transition.
    pub fn updated(old: T, new: T) -> Self {
        StateChange {
            old: Some(old),
            new: Some(new),
        }
    }

    /// A change describing a removed entity.
    pub fn deleted(old: T) -> Self {
        StateChange {
            old: Some(old),
            new: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
    }

    #[test]
    fn platform_rejects_unknown_names() {
        let err = "windows_phone".parse::<Platform>().unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidPlatform {
                value: "windows_phone".to_string()
            }
        );
    }

    #[test]
    fn platform_serializes_as_snake_case() {
        let json = serde_json::to_string(&Platform::IosSandbox).unwrap();
        assert_eq!(json, "\"ios_sandbox\"");
    }
}
