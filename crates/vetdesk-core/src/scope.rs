//! Visibility scopes: what slice of each table a principal may read.
//!
//! A scope is a union of independently-sufficient clauses. Multi-role
//! principals merge by clause union, so every role's access survives the
//! merge and the result is the most permissive combination. Backends
//! interpret clauses against their own tables; this module only carries
//! the rule algebra.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope over one resource table. `Unscoped` admits every row, `Empty`
/// admits none, `Any` admits a row matching at least one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule<C> {
    Unscoped,
    Empty,
    Any(Vec<C>),
}

impl<C> ScopeRule<C> {
    /// Build from a clause list, normalising the empty list to `Empty`.
    pub fn any(clauses: Vec<C>) -> Self {
        if clauses.is_empty() {
            ScopeRule::Empty
        } else {
            ScopeRule::Any(clauses)
        }
    }

    /// Union of two scopes. `Unscoped` absorbs everything; `Empty` is
    /// the identity; clause lists concatenate.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (ScopeRule::Unscoped, _) | (_, ScopeRule::Unscoped) => ScopeRule::Unscoped,
            (ScopeRule::Empty, rhs) => rhs,
            (lhs, ScopeRule::Empty) => lhs,
            (ScopeRule::Any(mut a), ScopeRule::Any(b)) => {
                a.extend(b);
                ScopeRule::Any(a)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScopeRule::Empty)
    }

    pub fn is_unscoped(&self) -> bool {
        matches!(self, ScopeRule::Unscoped)
    }

    /// Clauses of an `Any` scope; empty slice for the two degenerate
    /// forms.
    pub fn clauses(&self) -> &[C] {
        match self {
            ScopeRule::Any(cs) => cs,
            _ => &[],
        }
    }
}

// ── Per-resource clauses ──────────────────────────────────────
// Each variant is atomic; set-valued access (an admin's several clinics)
// becomes several clauses.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicClause {
    /// Clinics created by this admin.
    CreatedBy(String),
    /// One specific clinic (a staff member's affiliation).
    Id(Uuid),
    /// Any active clinic (the client browse rule).
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserClause {
    /// Exactly one user row (a client reading themselves).
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetClause {
    /// Pets whose owner's home clinic is this one.
    OwnerClinic(Uuid),
    /// Pets owned by this user.
    Owner(String),
    /// An explicit pet-id set, materialised from a vet's treated
    /// appointments by the ownership graph.
    IdIn(Vec<Uuid>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentClause {
    /// Appointments hosted at this clinic. Rows without a clinic never
    /// match.
    Clinic(Uuid),
    /// Appointments assigned to this veterinarian.
    Vet(String),
    /// Appointments belonging to this client.
    Client(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClause {
    /// Records reachable through this clinic: the linked appointment's
    /// clinic or the assigned vet's affiliation, either edge. Archived
    /// rows included.
    Clinic(Uuid),
    /// Active records assigned to this veterinarian. Archived rows fall
    /// out of a vet's default view.
    VetActive(String),
    /// Records about pets owned by this client.
    PetOwner(String),
}

pub type ClinicScope = ScopeRule<ClinicClause>;
pub type UserScope = ScopeRule<UserClause>;
pub type PetScope = ScopeRule<PetClause>;
pub type AppointmentScope = ScopeRule<AppointmentClause>;
pub type RecordScope = ScopeRule<RecordClause>;
