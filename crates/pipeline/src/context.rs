//! Change-specific records fed to templates and recipient resolvers.
//!
//! Field names are part of the rule-template contract: a template like
//! `{{from.username}}` resolves against the serialized form of these
//! structs.

use serde::Serialize;

use ripple_store::{Connection, Event, Object, User};

/// Context for a connection state change.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionContext {
    pub connection: Connection,
    pub from: User,
    pub to: User,
}

/// Context for an event state change.
#[derive(Debug, Clone, Serialize)]
pub struct EventContext {
    pub event: Event,
    pub owner: User,
    pub parent: Option<Object>,
    pub parent_owner: Option<User>,
}

/// Context for an object state change.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectContext {
    pub object: Object,
    pub owner: User,
    pub parent: Option<Object>,
    pub parent_owner: Option<User>,
}
