//! Mutation audit trail. Every facade mutation appends one entry;
//! append failures are logged and never fail the mutation itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::Result;

/// One audited mutation. `detail` carries action-specific fields, e.g.
/// `from`/`to` states for transitions or the discarded id for advisory
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// User id of the acting principal.
    pub actor: String,
    /// Dotted action name, e.g. "appointment.transition".
    pub action: String,
    /// Entity kind the action touched, e.g. "appointment".
    pub subject_kind: String,
    /// Entity id, rendered to string (user ids are not uuids).
    pub subject_id: String,
    pub detail: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        subject_kind: impl Into<String>,
        subject_id: impl ToString,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action: action.into(),
            subject_kind: subject_kind.into(),
            subject_id: subject_id.to_string(),
            detail,
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Entries for one subject id, oldest first.
    async fn for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>>;
}
