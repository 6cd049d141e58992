//! Storage port traits for the clinic core.
//! Implemented by vetdesk-store; core logic depends only on these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VetdeskError;
use crate::scope::{AppointmentScope, ClinicScope, PetScope, RecordScope, UserScope};
use crate::types::*;

pub type Result<T> = std::result::Result<T, VetdeskError>;

/// Scoped reads return `None` both when the row is absent and when the
/// scope rejects it; callers surface that as NotFound without learning
/// which case they hit.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn insert(&self, clinic: Clinic) -> Result<Clinic>;

    /// Full-row save; the caller loads, mutates, and writes back.
    async fn update(&self, clinic: Clinic) -> Result<Clinic>;

    async fn find(&self, id: Uuid) -> Result<Option<Clinic>>;

    async fn find_scoped(&self, id: Uuid, scope: &ClinicScope) -> Result<Option<Clinic>>;

    async fn list(&self, scope: &ClinicScope) -> Result<Vec<Clinic>>;

    /// Ids of clinics this admin created. Anchors admin scope derivation.
    async fn created_by(&self, user_id: &str) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert; rejects a duplicate user id with Conflict.
    async fn insert(&self, user: User) -> Result<User>;

    async fn find(&self, user_id: &str) -> Result<Option<User>>;

    async fn find_scoped(&self, user_id: &str, scope: &UserScope) -> Result<Option<User>>;

    async fn list(&self, scope: &UserScope) -> Result<Vec<User>>;
}

#[async_trait]
pub trait PetStore: Send + Sync {
    async fn insert(&self, pet: Pet) -> Result<Pet>;

    async fn update(&self, pet: Pet) -> Result<Pet>;

    async fn find(&self, id: Uuid) -> Result<Option<Pet>>;

    async fn find_scoped(&self, id: Uuid, scope: &PetScope) -> Result<Option<Pet>>;

    async fn list(&self, scope: &PetScope, filter: &PetFilter) -> Result<Vec<Pet>>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Slot check and insert as one atomic unit. A slot is taken when any
    /// slot-occupying row shares `scheduled_at` with the same veterinarian
    /// or the same clinic; violations return Conflict and of two racing
    /// writers exactly one succeeds.
    async fn insert(&self, appt: Appointment) -> Result<Appointment>;

    /// Move an appointment to a new time, under the same atomic slot
    /// check as `insert`.
    async fn reschedule(&self, id: Uuid, at: DateTime<Utc>) -> Result<Appointment>;

    /// Persist a status already validated by the lifecycle table.
    async fn set_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment>;

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>>;

    async fn find_scoped(&self, id: Uuid, scope: &AppointmentScope)
        -> Result<Option<Appointment>>;

    async fn list(
        &self,
        scope: &AppointmentScope,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: ClinicalRecord) -> Result<ClinicalRecord>;

    async fn update(&self, record: ClinicalRecord) -> Result<ClinicalRecord>;

    async fn find(&self, id: Uuid) -> Result<Option<ClinicalRecord>>;

    async fn find_scoped(&self, id: Uuid, scope: &RecordScope) -> Result<Option<ClinicalRecord>>;

    async fn list(&self, scope: &RecordScope, filter: &RecordFilter)
        -> Result<Vec<ClinicalRecord>>;

    /// Hard delete. Refuses with Conflict while the appointment link is
    /// still set; callers clear the link first.
    async fn delete(&self, id: Uuid) -> Result<()>;
}
