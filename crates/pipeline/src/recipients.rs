//! Per-context recipient resolution.
//!
//! A resolver turns one rule [`Query`] into the user records it
//! addresses. Connection and event resolution read only the context;
//! object resolution additionally queries the object, connection, and
//! user stores.

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use ripple_store::{App, ConnectionStore, ObjectQueryOptions, ObjectStore, User, UserStore};

use crate::context::{ConnectionContext, EventContext, ObjectContext};
use crate::dispatch::checkpoint;
use crate::error::PipelineError;
use crate::rule::{
    Query, COND_OBJECT_OWNER, COND_OWNER, COND_OWNER_FRIENDS, COND_PARENT_OWNER, COND_USER_FROM,
    COND_USER_TO,
};
use crate::template;

/// Resolves one rule query into recipient user records.
#[async_trait]
pub(crate) trait RecipientSource: Send + Sync {
    async fn resolve(&self, query: &Query) -> Result<Vec<User>, PipelineError>;
}

pub(crate) struct ConnectionRecipients<'a> {
    pub context: &'a ConnectionContext,
}

#[async_trait]
impl RecipientSource for ConnectionRecipients<'_> {
    async fn resolve(&self, query: &Query) -> Result<Vec<User>, PipelineError> {
        let mut users = Vec::new();

        for cond in query.keys() {
            match cond.as_str() {
                COND_USER_FROM => users.push(self.context.from.clone()),
                COND_USER_TO => users.push(self.context.to.clone()),
                other => tracing::debug!(cond = other, "ignoring unrecognised query condition"),
            }
        }

        Ok(users)
    }
}

pub(crate) struct EventRecipients<'a> {
    pub context: &'a EventContext,
}

#[async_trait]
impl RecipientSource for EventRecipients<'_> {
    async fn resolve(&self, query: &Query) -> Result<Vec<User>, PipelineError> {
        let mut users = Vec::new();

        for cond in query.keys() {
            match cond.as_str() {
                COND_PARENT_OWNER => {
                    if let Some(parent_owner) = &self.context.parent_owner {
                        users.push(parent_owner.clone());
                    }
                }
                other => tracing::debug!(cond = other, "ignoring unrecognised query condition"),
            }
        }

        Ok(users)
    }
}

pub(crate) struct ObjectRecipients<'a> {
    pub app: &'a App,
    pub context: &'a ObjectContext,
    pub connections: &'a dyn ConnectionStore,
    pub objects: &'a dyn ObjectStore,
    pub users: &'a dyn UserStore,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
impl RecipientSource for ObjectRecipients<'_> {
    async fn resolve(&self, query: &Query) -> Result<Vec<User>, PipelineError> {
        let mut ids: Vec<u64> = Vec::new();

        for (cond, source) in query {
            match cond.as_str() {
                COND_OBJECT_OWNER => {
                    let rendered = template::render(source, self.context)?;
                    let mut opts: ObjectQueryOptions = serde_json::from_str(&rendered)?;
                    // Exclude future-timestamped objects.
                    opts.before = Some(Utc::now());

                    checkpoint(self.cancel)?;
                    let objects = self.objects.query(self.app.namespace(), opts).await?;
                    ids.extend(objects.iter().map(|object| object.owner_id));
                }
                COND_OWNER_FRIENDS => {
                    checkpoint(self.cancel)?;
                    let friend_ids = self
                        .connections
                        .friend_ids(self.app.namespace(), self.context.owner.id)
                        .await?;
                    ids.extend(friend_ids);
                }
                COND_OWNER => {
                    // Skipped when the object has no parent owner.
                    if let Some(parent_owner) = &self.context.parent_owner {
                        ids.push(parent_owner.id);
                    }
                }
                other => tracing::debug!(cond = other, "ignoring unrecognised query condition"),
            }
        }

        // Never notify the triggering actor.
        ids.retain(|id| *id != self.context.owner.id);

        checkpoint(self.cancel)?;
        Ok(self.users.many(self.app.namespace(), &ids).await?)
    }
}
