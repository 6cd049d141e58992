//! In-memory backend: one `MemoryStore` implements every core port.
//!
//! Tables are `tokio::sync::RwLock<HashMap>` keyed by row id (users by
//! their external id string). Scope clauses are evaluated here, against
//! join maps built per call, which keeps the core free of table
//! knowledge. Uniqueness rules that must hold under concurrency (the
//! appointment slot, the record-appointment link) are checked inside the
//! table's write lock, so of two racing writers exactly one succeeds.
//!
//! Lock order is clinics, users, pets, appointments, records, audit;
//! join maps are built and released before the main table is locked.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use vetdesk_core::audit::{AuditEntry, AuditStore};
use vetdesk_core::error::VetdeskError;
use vetdesk_core::ports::{
    AppointmentStore, ClinicStore, PetStore, RecordStore, Result, UserStore,
};
use vetdesk_core::scope::{
    AppointmentClause, AppointmentScope, ClinicClause, ClinicScope, PetClause, PetScope,
    RecordClause, RecordScope, ScopeRule, UserClause, UserScope,
};
use vetdesk_core::types::{
    Appointment, AppointmentFilter, AppointmentStatus, Clinic, ClinicalRecord, Pet, PetFilter,
    RecordFilter, User,
};

#[derive(Default)]
pub struct MemoryStore {
    clinics: RwLock<HashMap<Uuid, Clinic>>,
    users: RwLock<HashMap<String, User>>,
    pets: RwLock<HashMap<Uuid, Pet>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    records: RwLock<HashMap<Uuid, ClinicalRecord>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staff affiliation map: user id to home clinic, for users that
    /// have one.
    async fn home_clinics(&self) -> HashMap<String, Uuid> {
        let users = self.users.read().await;
        users
            .values()
            .filter_map(|u| u.clinic_id.map(|c| (u.user_id.clone(), c)))
            .collect()
    }

    /// Join context for record scoping. Built fresh per call; tables are
    /// read and released one at a time.
    async fn record_join(&self) -> RecordJoin {
        let home_clinics = self.home_clinics().await;
        let pet_owners = {
            let pets = self.pets.read().await;
            pets.values().map(|p| (p.id, p.owner_id.clone())).collect()
        };
        let appointment_clinics = {
            let appts = self.appointments.read().await;
            appts
                .values()
                .filter_map(|a| a.clinic_id.map(|c| (a.id, c)))
                .collect()
        };
        RecordJoin {
            home_clinics,
            pet_owners,
            appointment_clinics,
        }
    }
}

// ── Scope evaluation ──────────────────────────────────────────

fn admitted<C>(scope: &ScopeRule<C>, matches: impl Fn(&C) -> bool) -> bool {
    match scope {
        ScopeRule::Unscoped => true,
        ScopeRule::Empty => false,
        ScopeRule::Any(clauses) => clauses.iter().any(matches),
    }
}

fn clinic_admitted(clinic: &Clinic, scope: &ClinicScope) -> bool {
    admitted(scope, |clause| match clause {
        ClinicClause::CreatedBy(user_id) => clinic.created_by == *user_id,
        ClinicClause::Id(id) => clinic.id == *id,
        ClinicClause::Active => clinic.active,
    })
}

fn user_admitted(user: &User, scope: &UserScope) -> bool {
    admitted(scope, |clause| match clause {
        UserClause::Id(user_id) => user.user_id == *user_id,
    })
}

fn pet_admitted(pet: &Pet, scope: &PetScope, home_clinics: &HashMap<String, Uuid>) -> bool {
    admitted(scope, |clause| match clause {
        PetClause::OwnerClinic(clinic_id) => {
            home_clinics.get(&pet.owner_id) == Some(clinic_id)
        }
        PetClause::Owner(user_id) => pet.owner_id == *user_id,
        PetClause::IdIn(ids) => ids.contains(&pet.id),
    })
}

fn appointment_admitted(appt: &Appointment, scope: &AppointmentScope) -> bool {
    admitted(scope, |clause| match clause {
        AppointmentClause::Clinic(clinic_id) => appt.clinic_id == Some(*clinic_id),
        AppointmentClause::Vet(vet_id) => {
            appt.veterinarian_id.as_deref() == Some(vet_id.as_str())
        }
        AppointmentClause::Client(user_id) => appt.client_id == *user_id,
    })
}

struct RecordJoin {
    home_clinics: HashMap<String, Uuid>,
    pet_owners: HashMap<Uuid, String>,
    appointment_clinics: HashMap<Uuid, Uuid>,
}

impl RecordJoin {
    /// Clinic membership for scoping: the linked appointment's clinic
    /// and the assigned vet's affiliation both count; either edge
    /// admits the row.
    fn in_clinic(&self, record: &ClinicalRecord, clinic_id: Uuid) -> bool {
        let via_appointment = record
            .appointment_id
            .and_then(|appt_id| self.appointment_clinics.get(&appt_id))
            == Some(&clinic_id);
        let via_vet = self.home_clinics.get(&record.veterinarian_id) == Some(&clinic_id);
        via_appointment || via_vet
    }
}

fn record_admitted(record: &ClinicalRecord, scope: &RecordScope, join: &RecordJoin) -> bool {
    admitted(scope, |clause| match clause {
        RecordClause::Clinic(clinic_id) => join.in_clinic(record, *clinic_id),
        RecordClause::VetActive(vet_id) => {
            record.veterinarian_id == *vet_id && record.is_active()
        }
        RecordClause::PetOwner(user_id) => {
            join.pet_owners.get(&record.pet_id) == Some(user_id)
        }
    })
}

// ── Slot conflicts ────────────────────────────────────────────

/// First slot-occupying row colliding with the candidate: same instant
/// and the same veterinarian or the same clinic, either dimension only
/// when set on the candidate. The candidate's own id is skipped so a
/// reschedule does not collide with itself.
fn slot_conflict<'a>(
    rows: impl Iterator<Item = &'a Appointment>,
    candidate: &Appointment,
) -> Option<Uuid> {
    rows.filter(|row| row.id != candidate.id && row.status.occupies_slot())
        .filter(|row| row.scheduled_at == candidate.scheduled_at)
        .find(|row| {
            let same_vet =
                candidate.veterinarian_id.is_some() && row.veterinarian_id == candidate.veterinarian_id;
            let same_clinic =
                candidate.clinic_id.is_some() && row.clinic_id == candidate.clinic_id;
            same_vet || same_clinic
        })
        .map(|row| row.id)
}

// ── Port implementations ──────────────────────────────────────

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn insert(&self, clinic: Clinic) -> Result<Clinic> {
        let mut clinics = self.clinics.write().await;
        clinics.insert(clinic.id, clinic.clone());
        Ok(clinic)
    }

    async fn update(&self, clinic: Clinic) -> Result<Clinic> {
        let mut clinics = self.clinics.write().await;
        if !clinics.contains_key(&clinic.id) {
            return Err(VetdeskError::not_found("clinic", clinic.id));
        }
        clinics.insert(clinic.id, clinic.clone());
        Ok(clinic)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Clinic>> {
        let clinics = self.clinics.read().await;
        Ok(clinics.get(&id).cloned())
    }

    async fn find_scoped(&self, id: Uuid, scope: &ClinicScope) -> Result<Option<Clinic>> {
        let clinics = self.clinics.read().await;
        Ok(clinics
            .get(&id)
            .filter(|c| clinic_admitted(c, scope))
            .cloned())
    }

    async fn list(&self, scope: &ClinicScope) -> Result<Vec<Clinic>> {
        let clinics = self.clinics.read().await;
        let mut rows: Vec<Clinic> = clinics
            .values()
            .filter(|c| clinic_admitted(c, scope))
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn created_by(&self, user_id: &str) -> Result<Vec<Uuid>> {
        let clinics = self.clinics.read().await;
        let mut ids: Vec<Uuid> = clinics
            .values()
            .filter(|c| c.created_by == user_id)
            .map(|c| c.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.user_id) {
            return Err(VetdeskError::Conflict(format!(
                "user '{}' already exists",
                user.user_id
            )));
        }
        users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn find(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn find_scoped(&self, user_id: &str, scope: &UserScope) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .filter(|u| user_admitted(u, scope))
            .cloned())
    }

    async fn list(&self, scope: &UserScope) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut rows: Vec<User> = users
            .values()
            .filter(|u| user_admitted(u, scope))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(rows)
    }
}

#[async_trait]
impl PetStore for MemoryStore {
    async fn insert(&self, pet: Pet) -> Result<Pet> {
        let mut pets = self.pets.write().await;
        pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn update(&self, pet: Pet) -> Result<Pet> {
        let mut pets = self.pets.write().await;
        if !pets.contains_key(&pet.id) {
            return Err(VetdeskError::not_found("pet", pet.id));
        }
        pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Pet>> {
        let pets = self.pets.read().await;
        Ok(pets.get(&id).cloned())
    }

    async fn find_scoped(&self, id: Uuid, scope: &PetScope) -> Result<Option<Pet>> {
        let home_clinics = self.home_clinics().await;
        let pets = self.pets.read().await;
        Ok(pets
            .get(&id)
            .filter(|p| pet_admitted(p, scope, &home_clinics))
            .cloned())
    }

    async fn list(&self, scope: &PetScope, filter: &PetFilter) -> Result<Vec<Pet>> {
        let home_clinics = self.home_clinics().await;
        let pets = self.pets.read().await;
        let mut rows: Vec<Pet> = pets
            .values()
            .filter(|p| pet_admitted(p, scope, &home_clinics))
            .filter(|p| filter.include_inactive || p.active)
            .filter(|p| {
                filter
                    .owner_id
                    .as_deref()
                    .map_or(true, |owner| p.owner_id == owner)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|p| (p.created_at, p.id));
        Ok(rows)
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert(&self, appt: Appointment) -> Result<Appointment> {
        let mut appts = self.appointments.write().await;
        if let Some(existing) = slot_conflict(appts.values(), &appt) {
            debug!("Slot conflict: {} collides with {}", appt.id, existing);
            return Err(VetdeskError::Conflict(format!(
                "slot {} is already booked by appointment {existing}",
                appt.scheduled_at
            )));
        }
        appts.insert(appt.id, appt.clone());
        Ok(appt)
    }

    async fn reschedule(&self, id: Uuid, at: DateTime<Utc>) -> Result<Appointment> {
        let mut appts = self.appointments.write().await;
        let mut moved = appts
            .get(&id)
            .cloned()
            .ok_or_else(|| VetdeskError::not_found("appointment", id))?;
        moved.scheduled_at = at;
        if let Some(existing) = slot_conflict(appts.values(), &moved) {
            debug!("Slot conflict: {} collides with {}", id, existing);
            return Err(VetdeskError::Conflict(format!(
                "slot {at} is already booked by appointment {existing}"
            )));
        }
        appts.insert(id, moved.clone());
        Ok(moved)
    }

    async fn set_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment> {
        let mut appts = self.appointments.write().await;
        let appt = appts
            .get_mut(&id)
            .ok_or_else(|| VetdeskError::not_found("appointment", id))?;
        appt.status = status;
        Ok(appt.clone())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Appointment>> {
        let appts = self.appointments.read().await;
        Ok(appts.get(&id).cloned())
    }

    async fn find_scoped(
        &self,
        id: Uuid,
        scope: &AppointmentScope,
    ) -> Result<Option<Appointment>> {
        let appts = self.appointments.read().await;
        Ok(appts
            .get(&id)
            .filter(|a| appointment_admitted(a, scope))
            .cloned())
    }

    async fn list(
        &self,
        scope: &AppointmentScope,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        let appts = self.appointments.read().await;
        let mut rows: Vec<Appointment> = appts
            .values()
            .filter(|a| appointment_admitted(a, scope))
            .filter(|a| {
                filter
                    .clinic_id
                    .map_or(true, |clinic| a.clinic_id == Some(clinic))
            })
            .filter(|a| {
                filter
                    .veterinarian_id
                    .as_deref()
                    .map_or(true, |vet| a.veterinarian_id.as_deref() == Some(vet))
            })
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            // Half-open window: from inclusive, to exclusive.
            .filter(|a| filter.from.map_or(true, |from| a.scheduled_at >= from))
            .filter(|a| filter.to.map_or(true, |to| a.scheduled_at < to))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.scheduled_at, a.created_at, a.id));
        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: ClinicalRecord) -> Result<ClinicalRecord> {
        let mut records = self.records.write().await;
        if let Some(appt_id) = record.appointment_id {
            if let Some(dup) = records
                .values()
                .find(|r| r.appointment_id == Some(appt_id))
            {
                debug!("Record link conflict: appointment {} already has {}", appt_id, dup.id);
                return Err(VetdeskError::Conflict(format!(
                    "appointment {appt_id} already has record {}",
                    dup.id
                )));
            }
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: ClinicalRecord) -> Result<ClinicalRecord> {
        let mut records = self.records.write().await;
        if !records.contains_key(&record.id) {
            return Err(VetdeskError::not_found("record", record.id));
        }
        if let Some(appt_id) = record.appointment_id {
            if let Some(dup) = records
                .values()
                .find(|r| r.id != record.id && r.appointment_id == Some(appt_id))
            {
                return Err(VetdeskError::Conflict(format!(
                    "appointment {appt_id} already has record {}",
                    dup.id
                )));
            }
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ClinicalRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn find_scoped(&self, id: Uuid, scope: &RecordScope) -> Result<Option<ClinicalRecord>> {
        let join = self.record_join().await;
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .filter(|r| record_admitted(r, scope, &join))
            .cloned())
    }

    async fn list(
        &self,
        scope: &RecordScope,
        filter: &RecordFilter,
    ) -> Result<Vec<ClinicalRecord>> {
        let join = self.record_join().await;
        let records = self.records.read().await;
        let mut rows: Vec<ClinicalRecord> = records
            .values()
            .filter(|r| record_admitted(r, scope, &join))
            .filter(|r| filter.include_archived || r.is_active())
            .filter(|r| filter.pet_id.map_or(true, |pet| r.pet_id == pet))
            .filter(|r| {
                filter
                    .veterinarian_id
                    .as_deref()
                    .map_or(true, |vet| r.veterinarian_id == vet)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get(&id)
            .ok_or_else(|| VetdeskError::not_found("record", id))?;
        if let Some(appt_id) = record.appointment_id {
            return Err(VetdeskError::Conflict(format!(
                "record {id} is still linked to appointment {appt_id}"
            )));
        }
        records.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        let mut audit = self.audit.write().await;
        audit.push(entry);
        Ok(())
    }

    async fn for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .cloned()
            .collect())
    }
}
