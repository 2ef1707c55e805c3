//! Domain records and store abstractions for the ripple notification core.
//!
//! Everything the pipeline and device subsystems read or write lives
//! behind the traits in this crate: users, objects, connections, and
//! push devices. Records are plain serde structs; stores are
//! `async_trait` objects so backends can be swapped without touching
//! the callers. An in-memory backend ships here for tests and local
//! wiring, together with a backend-agnostic conformance suite for
//! `DeviceStore` implementations.

pub mod conformance;
mod error;
mod memory;
mod query;
mod record;
mod traits;

pub use error::StoreError;
pub use memory::{MemoryConnectionStore, MemoryDeviceStore, MemoryObjectStore, MemoryUserStore};
pub use query::{DeviceQueryOptions, ObjectQueryOptions, UserQueryOptions};
pub use record::{
    App, Connection, ConnectionKind, ConnectionState, Device, Event, Object, Origin, Platform,
    StateChange, User,
};
pub use traits::{ConnectionStore, DeviceStore, ObjectStore, UserStore};
