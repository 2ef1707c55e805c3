//! The three pipeline dispatchers.
//!
//! Each dispatcher owns the store handles it needs, builds the domain
//! context for a state change, and hands rule iteration plus template
//! rendering to the shared [`apply_rules`] skeleton. Any fetch or
//! template failure aborts the dispatch without partial output;
//! non-matching rule criteria are skipped silently.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use ripple_store::{
    App, Connection, ConnectionStore, Event, Object, ObjectStore, StateChange, UserStore,
};

use crate::context::{ConnectionContext, EventContext, ObjectContext};
use crate::error::PipelineError;
use crate::recipients::{
    ConnectionRecipients, EventRecipients, ObjectRecipients, RecipientSource,
};
use crate::rule::{Rule, LOCALE_ENGLISH};
use crate::template;

/// The envelope holding one templated message together with its
/// recipient and the routing URN to deliver it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub message: String,
    pub recipient: u64,
    pub urn: String,
}

/// Ordered message collection: rule order, then recipient-spec order,
/// then resolved-recipient order.
pub type Messages = Vec<Message>;

/// Returns `Cancelled` once the caller's token has fired. Placed
/// before every store call so a cancelled dispatch stops at the next
/// suspension point.
pub(crate) fn checkpoint(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Shared dispatcher skeleton: iterate rules, resolve recipients,
/// render URN and English body per recipient.
async fn apply_rules<T, C>(
    change: &StateChange<T>,
    context: &C,
    rules: &[Rule<T>],
    recipients: &dyn RecipientSource,
) -> Result<Messages, PipelineError>
where
    T: Sync,
    C: Serialize + Sync,
{
    let mut messages = Messages::new();

    for rule in rules {
        if !rule.criteria.matches(change) {
            continue;
        }

        for spec in &rule.recipients {
            let users = recipients.resolve(&spec.query).await?;
            // A rule without an English body renders as empty.
            let body_source = spec
                .templates
                .get(LOCALE_ENGLISH)
                .map(String::as_str)
                .unwrap_or("");

            for user in users {
                let urn = template::render(&spec.urn, context)?;
                let body = template::render(body_source, context)?;

                messages.push(Message {
                    message: body,
                    recipient: user.id,
                    urn,
                });
            }
        }
    }

    tracing::debug!(count = messages.len(), "dispatch produced messages");

    Ok(messages)
}

/// Dispatcher for connection state changes.
pub struct ConnectionPipeline {
    users: Arc<dyn UserStore>,
}

impl ConnectionPipeline {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        ConnectionPipeline { users }
    }

    /// Produce the messages the rules mandate for one connection state
    /// change. A change without a new side yields no messages and
    /// touches no store.
    pub async fn dispatch(
        &self,
        app: &App,
        change: &StateChange<Connection>,
        rules: &[Rule<Connection>],
        cancel: &CancellationToken,
    ) -> Result<Messages, PipelineError> {
        let Some(connection) = change.new.clone() else {
            return Ok(Messages::new());
        };

        checkpoint(cancel)?;
        let from = self.users.fetch(app.namespace(), connection.from_id).await?;
        checkpoint(cancel)?;
        let to = self.users.fetch(app.namespace(), connection.to_id).await?;

        let context = ConnectionContext {
            connection,
            from,
            to,
        };
        let recipients = ConnectionRecipients { context: &context };

        apply_rules(change, &context, rules, &recipients).await
    }
}

/// Dispatcher for event state changes.
pub struct EventPipeline {
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserStore>,
}

impl EventPipeline {
    pub fn new(objects: Arc<dyn ObjectStore>, users: Arc<dyn UserStore>) -> Self {
        EventPipeline { objects, users }
    }

    /// Produce the messages the rules mandate for one event state
    /// change. The parent object and its owner are fetched only when
    /// the event references an object.
    pub async fn dispatch(
        &self,
        app: &App,
        change: &StateChange<Event>,
        rules: &[Rule<Event>],
        cancel: &CancellationToken,
    ) -> Result<Messages, PipelineError> {
        let Some(event) = change.new.clone() else {
            return Ok(Messages::new());
        };

        checkpoint(cancel)?;
        let owner = self.users.fetch(app.namespace(), event.user_id).await?;

        let (parent, parent_owner) = match event.object_id {
            Some(object_id) => {
                checkpoint(cancel)?;
                let parent = self.objects.fetch(app.namespace(), object_id).await?;
                checkpoint(cancel)?;
                let parent_owner = self.users.fetch(app.namespace(), parent.owner_id).await?;
                (Some(parent), Some(parent_owner))
            }
            None => (None, None),
        };

        let context = EventContext {
            event,
            owner,
            parent,
            parent_owner,
        };
        let recipients = EventRecipients { context: &context };

        apply_rules(change, &context, rules, &recipients).await
    }
}

/// Dispatcher for object state changes.
pub struct ObjectPipeline {
    connections: Arc<dyn ConnectionStore>,
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserStore>,
}

impl ObjectPipeline {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        ObjectPipeline {
            connections,
            objects,
            users,
        }
    }

    /// Produce the messages the rules mandate for one object state
    /// change. A change without a new side yields no messages and
    /// touches no store.
    pub async fn dispatch(
        &self,
        app: &App,
        change: &StateChange<Object>,
        rules: &[Rule<Object>],
        cancel: &CancellationToken,
    ) -> Result<Messages, PipelineError> {
        let Some(object) = change.new.clone() else {
            return Ok(Messages::new());
        };

        checkpoint(cancel)?;
        let owner = self.users.fetch(app.namespace(), object.owner_id).await?;

        let (parent, parent_owner) = match object.parent_id {
            Some(parent_id) => {
                checkpoint(cancel)?;
                let parent = self.objects.fetch(app.namespace(), parent_id).await?;
                checkpoint(cancel)?;
                let parent_owner = self.users.fetch(app.namespace(), parent.owner_id).await?;
                (Some(parent), Some(parent_owner))
            }
            None => (None, None),
        };

        let context = ObjectContext {
            object,
            owner,
            parent,
            parent_owner,
        };
        let recipients = ObjectRecipients {
            app,
            context: &context,
            connections: self.connections.as_ref(),
            objects: self.objects.as_ref(),
            users: self.users.as_ref(),
            cancel,
        };

        apply_rules(change, &context, rules, &recipients).await
    }
}
