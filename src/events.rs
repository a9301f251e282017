use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReplyError;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona prompt, never shown in the transcript
    System,
    User,
    Assistant,
}

/// A single conversation entry. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Identifies one dispatched request.
///
/// `session` changes on every `initialize()`, `seq` grows with every dispatch
/// (and on `clear()`). A reply is applied only while its ticket is the
/// controller's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub session: Uuid,
    pub seq: u64,
}

/// Deferred effects posted back to the controller by its spawned tasks
#[derive(Debug)]
pub enum ControllerEvent {
    /// A completion call resolved and its minimum display delay has elapsed
    Reply {
        ticket: Ticket,
        outcome: Result<String, ReplyError>,
    },

    /// The one-shot clear affordance timer fired
    ClearAffordanceReady { session: Uuid },
}

/// What applying a `ControllerEvent` did to the visible state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerUpdate {
    /// An assistant message (reply or fallback) was appended
    ReplyApplied(Ticket),

    /// The reply belonged to a superseded ticket and was dropped
    ReplyDiscarded(Ticket),

    /// The clear affordance became visible
    ClearAffordanceShown,

    /// Timer from an earlier session, or the affordance was already shown
    Ignored,
}
