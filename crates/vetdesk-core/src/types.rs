//! Core domain types for the clinic system.
//! These are pure value types with no backend or storage dependencies.

// Status enums intentionally use `from_str() -> Option<Self>` instead of
// `FromStr` because they return None for unknown values rather than an error.
#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::RoleSet;

// ── Appointment status ────────────────────────────────────────

/// Appointment lifecycle state. The forward chain is
/// SCHEDULED → CONFIRMED → IN_PROGRESS → COMPLETED; CANCELLED and
/// NO_SHOW are alternate terminals reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(Self::Scheduled),
            "CONFIRMED" => Some(Self::Confirmed),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            "NO_SHOW" => Some(Self::NoShow),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Whether a row in this state still holds its time slot for
    /// double-booking purposes. Completed visits keep their slot in the
    /// ledger; only cancellations and no-shows free it.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::NoShow)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Record lifecycle ──────────────────────────────────────────

/// Derived lifecycle of a clinical record. Deleted rows do not appear
/// here because deletion removes the row outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordLifecycle {
    Active,
    Archived,
}

// ── Entities ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    /// User id of the ADMIN who created the clinic; anchors the admin's
    /// visibility scope.
    pub created_by: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Clinic {
    pub fn new(draft: NewClinic, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            address: draft.address,
            phone: draft.phone,
            created_by: created_by.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// External identity key from the token `sub` claim. Also the
    /// ownership key referenced by pets, appointments, and records.
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub roles: RoleSet,
    /// Staff affiliation, or a client's home clinic. Staff without a
    /// clinic participate in no clinic-scoped visibility rule.
    pub clinic_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(draft: NewUser) -> Self {
        Self {
            user_id: draft.user_id,
            display_name: draft.display_name,
            email: draft.email,
            roles: draft.roles,
            clinic_id: draft.clinic_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// User id of the owning client.
    pub owner_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    pub fn new(draft: NewPet, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            species: draft.species,
            breed: draft.breed,
            birth_date: draft.birth_date,
            owner_id: owner_id.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Clinic hosting the visit. Optional; an unset clinic never enters
    /// the clinic-dimension conflict check.
    pub clinic_id: Option<Uuid>,
    pub pet_id: Uuid,
    /// Owning client's user id.
    pub client_id: String,
    /// Assigned veterinarian's user id. Optional; forced to the creator
    /// when a veterinarian books.
    pub veterinarian_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// `client_id` and `veterinarian_id` arrive already normalised by the
    /// facade (creator forcing applied).
    pub fn new(
        draft: NewAppointment,
        client_id: impl Into<String>,
        veterinarian_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            clinic_id: draft.clinic_id,
            pet_id: draft.pet_id,
            client_id: client_id.into(),
            veterinarian_id,
            scheduled_at: draft.scheduled_at,
            reason: draft.reason,
            status: AppointmentStatus::Scheduled,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    /// Assigned veterinarian's user id. A record has no clinic of its
    /// own; clinic scoping derives through the appointment's clinic or
    /// the vet's affiliation.
    pub veterinarian_id: String,
    /// One-to-one, optionally-null link to the appointment this record
    /// came out of. Cleared before a hard delete.
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub treatment: String,
    /// Consultation vitals, opaque to the policy core.
    pub vitals: Option<String>,
    /// Tri-state lifecycle flag: absent or true means active, false means
    /// archived. Legacy rows predate the flag, hence the Option.
    pub active: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalRecord {
    pub fn new(draft: NewRecord, veterinarian_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pet_id: draft.pet_id,
            veterinarian_id: veterinarian_id.into(),
            appointment_id: draft.appointment_id,
            diagnosis: draft.diagnosis,
            treatment: draft.treatment,
            vitals: draft.vitals,
            active: Some(true),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lifecycle(&self) -> RecordLifecycle {
        match self.active {
            Some(false) => RecordLifecycle::Archived,
            _ => RecordLifecycle::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle() == RecordLifecycle::Active
    }
}

// ── Input drafts ──────────────────────────────────────────────
// Facade operations take these; the facade resolves identity-derived
// fields (creator forcing, clinic defaulting) before rows are built.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClinic {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub roles: RoleSet,
    pub clinic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPet {
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Required for staff callers; ignored for clients, who always own
    /// the pets they register.
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    /// Optional host clinic; validated for existence and activity when
    /// supplied.
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub pet_id: Uuid,
    /// Required for staff callers; forced to self for client callers.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Optional assignment; any value here is discarded in favour of the
    /// creator when a veterinarian books.
    #[serde(default)]
    pub veterinarian_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub pet_id: Uuid,
    /// Required for ADMIN/RECEPTIONIST callers; veterinarians are always
    /// assigned to records they create.
    #[serde(default)]
    pub veterinarian_id: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default)]
    pub vitals: Option<String>,
}

/// Partial update for a clinical record. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub vitals: Option<String>,
    /// Reassignment; honoured for ADMIN/RECEPTIONIST, advisory-overridden
    /// for veterinarians.
    #[serde(default)]
    pub veterinarian_id: Option<String>,
}

// ── Listing filters ───────────────────────────────────────────
// Applied after the visibility scope, never instead of it.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetFilter {
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Include deactivated pets. Off by default.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub veterinarian_id: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub pet_id: Option<Uuid>,
    #[serde(default)]
    pub veterinarian_id: Option<String>,
    /// Keep archived rows in the listing when the scope admits them.
    /// On by default so clinic-wide scopes see their full history.
    pub include_archived: bool,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            pet_id: None,
            veterinarian_id: None,
            include_archived: true,
        }
    }
}
