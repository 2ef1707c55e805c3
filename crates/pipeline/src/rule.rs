use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ripple_store::StateChange;

/// The only locale consulted when rendering message bodies. Other
/// locales may be present in a [`RecipientSpec`] for downstream use.
pub const LOCALE_ENGLISH: &str = "en";

/// Connection context: address the connection's initiating user.
pub const COND_USER_FROM: &str = "userFrom";
/// Connection context: address the connection's receiving user.
pub const COND_USER_TO: &str = "userTo";
/// Event context: address the owner of the event's parent object.
pub const COND_PARENT_OWNER: &str = "parentOwner";
/// Object context: address the owners of objects matched by the
/// condition's rendered query options.
pub const COND_OBJECT_OWNER: &str = "objectOwner";
/// Object context: address the mutual connections of the object owner.
pub const COND_OWNER_FRIENDS: &str = "ownerFriends";
/// Object context: address the owner of the parent object.
pub const COND_OWNER: &str = "owner";

/// A rule's recipient query: condition tag to template source.
///
/// Unrecognised tags are ignored so rule sets can carry conditions
/// newer than the running core. The ordered map keeps dispatch output
/// deterministic.
pub type Query = BTreeMap<String, String>;

/// The unit of addressing within a rule: a recipient query, a routing
/// URN template, and body templates keyed by locale tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSpec {
    #[serde(default)]
    pub query: Query,
    pub urn: String,
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

/// Predicate over a state change, deciding whether a rule fires.
pub trait Criteria<T>: Send + Sync {
    fn matches(&self, change: &StateChange<T>) -> bool;
}

impl<T, F> Criteria<T> for F
where
    F: Fn(&StateChange<T>) -> bool + Send + Sync,
{
    fn matches(&self, change: &StateChange<T>) -> bool {
        self(change)
    }
}

/// Criteria admitting every state change.
pub struct MatchAny;

impl<T> Criteria<T> for MatchAny {
    fn matches(&self, _change: &StateChange<T>) -> bool {
        true
    }
}

/// A triggering specification bound to an app: when the criteria
/// admit a state change, every recipient spec produces messages.
pub struct Rule<T> {
    pub criteria: Box<dyn Criteria<T>>,
    pub recipients: Vec<RecipientSpec>,
}

impl<T> Rule<T> {
    pub fn new(criteria: impl Criteria<T> + 'static, recipients: Vec<RecipientSpec>) -> Self {
        Rule {
            criteria: Box::new(criteria),
            recipients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_store::{Connection, ConnectionKind, ConnectionState};

    fn connection() -> Connection {
        Connection {
            from_id: 1,
            to_id: 2,
            kind: ConnectionKind::Friend,
            state: ConnectionState::Pending,
        }
    }

    #[test]
    fn match_any_admits_everything() {
        assert!(MatchAny.matches(&StateChange::created(connection())));
        assert!(MatchAny.matches(&StateChange::deleted(connection())));
    }

    #[test]
    fn closures_are_criteria() {
        let only_new = |change: &StateChange<Connection>| change.new.is_some();
        assert!(only_new.matches(&StateChange::created(connection())));
        assert!(!only_new.matches(&StateChange::deleted(connection())));
    }

    #[test]
    fn recipient_spec_decodes_with_defaults() {
        let spec: RecipientSpec =
            serde_json::from_str(r#"{"urn": "ripple/connection/{{connection.from_id}}"}"#).unwrap();
        assert!(spec.query.is_empty());
        assert!(spec.templates.is_empty());
    }
}
