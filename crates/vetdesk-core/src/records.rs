//! Clinical record rules: veterinarian assignment and mutation gates.
//!
//! Assignment is lenient for veterinarians: a conflicting id in the
//! request is overridden to the caller, and the override is surfaced as
//! an advisory on the result, never as an error.

use serde::{Deserialize, Serialize};

use crate::error::VetdeskError;
use crate::principal::{Principal, Role};
use crate::types::ClinicalRecord;

/// Non-fatal note attached to a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub code: String,
    pub message: String,
}

impl Advisory {
    pub fn assignment_overridden(requested: &str, forced: &str) -> Self {
        Self {
            code: "veterinarian_assignment_overridden".into(),
            message: format!(
                "requested veterinarian {requested} replaced by the authenticated veterinarian {forced}"
            ),
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// A record mutation result: the row plus any advisories raised while
/// normalising the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub record: ClinicalRecord,
    pub advisories: Vec<Advisory>,
}

/// What a delete request actually did. A veterinarian's delete archives
/// the row; an admin's removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Archived(ClinicalRecord),
    Deleted,
}

/// Resolve the assigned veterinarian for a new record. Creators holding
/// VETERINARIAN are always assigned to themselves, whatever the draft
/// says; other staff must name an assignee.
pub fn resolve_create_assignment(
    principal: &Principal,
    requested: Option<String>,
) -> Result<(String, Vec<Advisory>), VetdeskError> {
    if principal.has_role(Role::Veterinarian) {
        let mut advisories = Vec::new();
        if let Some(req) = requested.as_deref() {
            if req != principal.user_id {
                advisories.push(Advisory::assignment_overridden(req, &principal.user_id));
            }
        }
        return Ok((principal.user_id.clone(), advisories));
    }
    match requested {
        Some(vet) => Ok((vet, Vec::new())),
        None => Err(VetdeskError::Validation(
            "a veterinarian assignment is required".into(),
        )),
    }
}

/// Resolve a reassignment attempt on an existing record. ADMIN and
/// RECEPTIONIST reassign freely; a plain veterinarian's attempt keeps
/// the current assignee and raises an advisory.
pub fn resolve_edit_assignment(
    principal: &Principal,
    current: &str,
    requested: Option<String>,
) -> (String, Vec<Advisory>) {
    let Some(req) = requested else {
        return (current.to_string(), Vec::new());
    };
    if req == current {
        return (current.to_string(), Vec::new());
    }
    if principal.is_admin() || principal.has_role(Role::Receptionist) {
        return (req, Vec::new());
    }
    (
        current.to_string(),
        vec![Advisory::assignment_overridden(&req, current)],
    )
}

/// Edit gate: clinic staff edit anything in scope; a veterinarian only
/// their own records.
pub fn may_edit(principal: &Principal, record: &ClinicalRecord) -> bool {
    principal.is_admin()
        || principal.has_role(Role::Receptionist)
        || (principal.has_role(Role::Veterinarian)
            && principal.is_self(&record.veterinarian_id))
}

/// Archive gate: ADMIN, or the assigned veterinarian retiring their own
/// record. Receptionists edit but never archive or delete.
pub fn may_archive(principal: &Principal, record: &ClinicalRecord) -> bool {
    principal.is_admin()
        || (principal.has_role(Role::Veterinarian)
            && principal.is_self(&record.veterinarian_id))
}

/// Unarchive is ADMIN only. Archived rows sit outside a vet's
/// visibility, so recovery cannot run through the vet who archived.
pub fn may_unarchive(principal: &Principal) -> bool {
    principal.is_admin()
}
