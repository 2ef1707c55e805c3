//! Rule-driven notification pipeline.
//!
//! Given a state change to a connection, event, or object, a pipeline
//! selects the matching rules, resolves each rule's recipient specs
//! against a change-specific context, renders the URN and body
//! templates, and returns the addressed [`Message`]s for downstream
//! delivery.
//!
//! The three dispatchers ([`ConnectionPipeline`], [`EventPipeline`],
//! [`ObjectPipeline`]) share one rule-iteration and rendering skeleton
//! and differ only in context construction and the query conditions
//! their resolver understands.
//!
//! Library code emits `tracing` events and never installs a global
//! subscriber; that is the embedding binary's job.

mod context;
mod dispatch;
mod error;
mod recipients;
mod rule;
mod template;

pub use context::{ConnectionContext, EventContext, ObjectContext};
pub use dispatch::{ConnectionPipeline, EventPipeline, Message, Messages, ObjectPipeline};
pub use error::PipelineError;
pub use rule::{
    Criteria, MatchAny, Query, RecipientSpec, Rule, COND_OBJECT_OWNER, COND_OWNER,
    COND_OWNER_FRIENDS, COND_PARENT_OWNER, COND_USER_FROM, COND_USER_TO, LOCALE_ENGLISH,
};
pub use template::render;
