//! Policy facade: the operations the (external) HTTP layer calls.
//!
//! Every method takes the acting `Principal` explicitly. Reads resolve a
//! visibility scope and let the store evaluate it; mutations load the
//! row through the same scope first, so an out-of-scope id reads as
//! NotFound before any gate can say Forbidden.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditStore};
use crate::error::VetdeskError;
use crate::lifecycle::{self, TransitionAction};
use crate::ownership::OwnershipGraph;
use crate::ports::{
    AppointmentStore, ClinicStore, PetStore, RecordStore, Result, UserStore,
};
use crate::principal::{Principal, Role};
use crate::records::{
    self, DeleteOutcome, RecordOutcome,
};
use crate::types::*;
use crate::visibility::ScopeResolver;

pub struct ClinicService {
    pub clinics: Arc<dyn ClinicStore>,
    pub users: Arc<dyn UserStore>,
    pub pets: Arc<dyn PetStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub records: Arc<dyn RecordStore>,
    pub audit: Arc<dyn AuditStore>,
    resolver: ScopeResolver,
    graph: OwnershipGraph,
}

impl ClinicService {
    pub fn new(
        clinics: Arc<dyn ClinicStore>,
        users: Arc<dyn UserStore>,
        pets: Arc<dyn PetStore>,
        appointments: Arc<dyn AppointmentStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let graph = OwnershipGraph::new(
            users.clone(),
            clinics.clone(),
            pets.clone(),
            appointments.clone(),
        );
        Self {
            clinics,
            users,
            pets,
            appointments,
            records,
            audit: Arc::new(NoopAuditStore),
            resolver: ScopeResolver::new(graph.clone()),
            graph,
        }
    }

    /// Set the audit store (builder pattern).
    pub fn with_audit(mut self, audit: Arc<dyn AuditStore>) -> Self {
        self.audit = audit;
        self
    }

    // ── Reads ──────────────────────────────────────────────────

    pub async fn list_clinics(&self, principal: &Principal) -> Result<Vec<Clinic>> {
        let scope = self.resolver.clinic_scope(principal).await?;
        self.clinics.list(&scope).await
    }

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>> {
        let scope = self.resolver.user_scope(principal).await?;
        self.users.list(&scope).await
    }

    pub async fn list_pets(&self, principal: &Principal, filter: PetFilter) -> Result<Vec<Pet>> {
        let scope = self.resolver.pet_scope(principal).await?;
        self.pets.list(&scope, &filter).await
    }

    pub async fn list_appointments(
        &self,
        principal: &Principal,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        let scope = self.resolver.appointment_scope(principal).await?;
        self.appointments.list(&scope, &filter).await
    }

    pub async fn list_records(
        &self,
        principal: &Principal,
        filter: RecordFilter,
    ) -> Result<Vec<ClinicalRecord>> {
        let scope = self.resolver.record_scope(principal).await?;
        self.records.list(&scope, &filter).await
    }

    /// No self-ownership override here: clinics have no owning client.
    pub async fn get_clinic(&self, principal: &Principal, id: Uuid) -> Result<Clinic> {
        let scope = self.resolver.clinic_scope(principal).await?;
        self.clinics
            .find_scoped(id, &scope)
            .await?
            .ok_or_else(|| VetdeskError::not_found("clinic", id))
    }

    pub async fn get_user(&self, principal: &Principal, user_id: &str) -> Result<User> {
        let scope = self.resolver.user_scope(principal).await?;
        if let Some(user) = self.users.find_scoped(user_id, &scope).await? {
            return Ok(user);
        }
        if principal.has_role(Role::Client) && principal.is_self(user_id) {
            if let Some(user) = self.users.find(user_id).await? {
                return Ok(user);
            }
        }
        Err(VetdeskError::not_found("user", user_id))
    }

    pub async fn get_pet(&self, principal: &Principal, id: Uuid) -> Result<Pet> {
        let scope = self.resolver.pet_scope(principal).await?;
        if let Some(pet) = self.pets.find_scoped(id, &scope).await? {
            return Ok(pet);
        }
        if principal.has_role(Role::Client) {
            if let Some(pet) = self.pets.find(id).await? {
                if principal.is_self(&pet.owner_id) {
                    return Ok(pet);
                }
            }
        }
        Err(VetdeskError::not_found("pet", id))
    }

    pub async fn get_appointment(&self, principal: &Principal, id: Uuid) -> Result<Appointment> {
        self.visible_appointment(principal, id).await
    }

    pub async fn get_record(&self, principal: &Principal, id: Uuid) -> Result<ClinicalRecord> {
        self.visible_record(principal, id).await
    }

    // ── Clinic and user management ─────────────────────────────

    pub async fn create_clinic(&self, principal: &Principal, draft: NewClinic) -> Result<Clinic> {
        principal.require_admin()?;
        let clinic = self
            .clinics
            .insert(Clinic::new(draft, principal.user_id.clone()))
            .await?;
        info!("Created clinic {} '{}'", clinic.id, clinic.name);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "clinic.create",
            "clinic",
            clinic.id,
            json!({ "name": clinic.name }),
        ))
        .await;
        Ok(clinic)
    }

    pub async fn deactivate_clinic(&self, principal: &Principal, id: Uuid) -> Result<Clinic> {
        let scope = self.resolver.clinic_scope(principal).await?;
        let mut clinic = self
            .clinics
            .find_scoped(id, &scope)
            .await?
            .ok_or_else(|| VetdeskError::not_found("clinic", id))?;
        principal.require_admin()?;
        clinic.active = false;
        let clinic = self.clinics.update(clinic).await?;
        info!("Deactivated clinic {}", clinic.id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "clinic.deactivate",
            "clinic",
            clinic.id,
            json!({}),
        ))
        .await;
        Ok(clinic)
    }

    pub async fn register_user(&self, principal: &Principal, draft: NewUser) -> Result<User> {
        principal.require_admin()?;
        if draft.user_id.is_empty() {
            return Err(VetdeskError::Validation("user id must not be empty".into()));
        }
        if draft.roles.is_empty() {
            return Err(VetdeskError::Validation(
                "a user needs at least one role".into(),
            ));
        }
        if let Some(clinic_id) = draft.clinic_id {
            self.clinics
                .find(clinic_id)
                .await?
                .ok_or_else(|| VetdeskError::Validation(format!("clinic {clinic_id} not found")))?;
        }
        let user = self.users.insert(User::new(draft)).await?;
        info!("Registered user '{}'", user.user_id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "user.register",
            "user",
            &user.user_id,
            json!({ "roles": user.roles }),
        ))
        .await;
        Ok(user)
    }

    pub async fn create_pet(&self, principal: &Principal, draft: NewPet) -> Result<Pet> {
        if !(principal.is_admin()
            || principal.has_role(Role::Receptionist)
            || principal.has_role(Role::Client))
        {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not register pets",
                principal.user_id
            )));
        }
        let owner_id = self.resolve_subject_user(principal, draft.owner_id.clone(), "owner")?;
        let owner = self
            .users
            .find(&owner_id)
            .await?
            .ok_or_else(|| VetdeskError::Validation(format!("owner '{owner_id}' not found")))?;
        if !owner.roles.has(Role::Client) {
            return Err(VetdeskError::Validation(format!(
                "owner '{owner_id}' does not hold CLIENT"
            )));
        }
        let pet = self.pets.insert(Pet::new(draft, owner_id)).await?;
        info!("Registered pet {} '{}' for '{}'", pet.id, pet.name, pet.owner_id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "pet.create",
            "pet",
            pet.id,
            json!({ "owner": pet.owner_id }),
        ))
        .await;
        Ok(pet)
    }

    pub async fn deactivate_pet(&self, principal: &Principal, id: Uuid) -> Result<Pet> {
        let scope = self.resolver.pet_scope(principal).await?;
        let mut pet = match self.pets.find_scoped(id, &scope).await? {
            Some(pet) => pet,
            None => {
                let owned = match self.pets.find(id).await? {
                    Some(pet)
                        if principal.has_role(Role::Client)
                            && principal.is_self(&pet.owner_id) =>
                    {
                        Some(pet)
                    }
                    _ => None,
                };
                owned.ok_or_else(|| VetdeskError::not_found("pet", id))?
            }
        };
        let allowed = principal.roles.is_staff()
            || (principal.has_role(Role::Client) && principal.is_self(&pet.owner_id));
        if !allowed {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not deactivate pet {}",
                principal.user_id, id
            )));
        }
        pet.active = false;
        let pet = self.pets.update(pet).await?;
        info!("Deactivated pet {}", pet.id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "pet.deactivate",
            "pet",
            pet.id,
            json!({}),
        ))
        .await;
        Ok(pet)
    }

    // ── Appointments ───────────────────────────────────────────

    pub async fn create_appointment(
        &self,
        principal: &Principal,
        draft: NewAppointment,
    ) -> Result<Appointment> {
        if principal.roles.is_empty() {
            return Err(VetdeskError::Forbidden(
                "appointment creation requires a role".into(),
            ));
        }
        let client_id =
            self.resolve_subject_user(principal, draft.client_id.clone(), "client")?;
        // A veterinarian books themselves, whatever the draft says.
        let veterinarian_id = if principal.has_role(Role::Veterinarian) {
            Some(principal.user_id.clone())
        } else {
            draft.veterinarian_id.clone()
        };

        let pet = self
            .pets
            .find(draft.pet_id)
            .await?
            .ok_or_else(|| VetdeskError::Validation(format!("pet {} not found", draft.pet_id)))?;
        if pet.owner_id != client_id {
            return Err(VetdeskError::Validation(format!(
                "pet {} does not belong to client '{client_id}'",
                pet.id
            )));
        }
        let client = self
            .users
            .find(&client_id)
            .await?
            .ok_or_else(|| VetdeskError::Validation(format!("client '{client_id}' not found")))?;
        if !client.roles.has(Role::Client) {
            return Err(VetdeskError::Validation(format!(
                "'{client_id}' does not hold CLIENT"
            )));
        }
        if let Some(clinic_id) = draft.clinic_id {
            let clinic = self.clinics.find(clinic_id).await?.ok_or_else(|| {
                VetdeskError::Validation(format!("clinic {clinic_id} not found"))
            })?;
            if !clinic.active {
                return Err(VetdeskError::Validation(format!(
                    "clinic {clinic_id} is not active"
                )));
            }
        }
        if let Some(vet_id) = veterinarian_id.as_deref() {
            self.require_veterinarian(vet_id).await?;
        }

        let appt = self
            .appointments
            .insert(Appointment::new(draft, client_id, veterinarian_id))
            .await?;
        info!(
            "Created appointment {} at {} for client '{}'",
            appt.id, appt.scheduled_at, appt.client_id
        );
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "appointment.create",
            "appointment",
            appt.id,
            json!({
                "scheduled_at": appt.scheduled_at,
                "veterinarian": appt.veterinarian_id,
                "clinic": appt.clinic_id,
            }),
        ))
        .await;
        Ok(appt)
    }

    pub async fn transition_appointment(
        &self,
        principal: &Principal,
        id: Uuid,
        action: TransitionAction,
    ) -> Result<Appointment> {
        let appt = self.visible_appointment(principal, id).await?;
        let to = lifecycle::apply(principal, &appt, action)?;
        let from = appt.status;
        let updated = self.appointments.set_status(id, to).await?;
        info!("Appointment {} moved {} -> {}", id, from, to);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            format!("appointment.{}", action.name()),
            "appointment",
            id,
            json!({ "from": from, "to": to }),
        ))
        .await;
        Ok(updated)
    }

    pub async fn reschedule_appointment(
        &self,
        principal: &Principal,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Appointment> {
        let appt = self.visible_appointment(principal, id).await?;
        if !principal.roles.is_staff() {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not reschedule appointments",
                principal.user_id
            )));
        }
        if appt.status.is_terminal() {
            return Err(VetdeskError::Validation(format!(
                "appointment {} is {} and cannot move",
                id, appt.status
            )));
        }
        let previous = appt.scheduled_at;
        let updated = self.appointments.reschedule(id, at).await?;
        info!("Rescheduled appointment {} from {} to {}", id, previous, at);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "appointment.reschedule",
            "appointment",
            id,
            json!({ "from": previous, "to": at }),
        ))
        .await;
        Ok(updated)
    }

    // ── Clinical records ───────────────────────────────────────

    pub async fn create_record(
        &self,
        principal: &Principal,
        draft: NewRecord,
    ) -> Result<RecordOutcome> {
        if !principal.roles.is_staff() {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not create clinical records",
                principal.user_id
            )));
        }
        let (veterinarian_id, advisories) =
            records::resolve_create_assignment(principal, draft.veterinarian_id.clone())?;
        self.pets
            .find(draft.pet_id)
            .await?
            .ok_or_else(|| VetdeskError::Validation(format!("pet {} not found", draft.pet_id)))?;
        self.require_veterinarian(&veterinarian_id).await?;
        if let Some(appt_id) = draft.appointment_id {
            let appt = self.appointments.find(appt_id).await?.ok_or_else(|| {
                VetdeskError::Validation(format!("appointment {appt_id} not found"))
            })?;
            if appt.pet_id != draft.pet_id {
                return Err(VetdeskError::Validation(format!(
                    "appointment {appt_id} is for a different pet"
                )));
            }
        }

        let record = self
            .records
            .insert(ClinicalRecord::new(draft, veterinarian_id))
            .await?;
        for advisory in &advisories {
            warn!("Record {}: {}", record.id, advisory);
        }
        info!(
            "Created record {} for pet {} by '{}'",
            record.id, record.pet_id, record.veterinarian_id
        );
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "record.create",
            "record",
            record.id,
            json!({ "pet": record.pet_id, "advisories": advisories }),
        ))
        .await;
        Ok(RecordOutcome { record, advisories })
    }

    pub async fn update_record(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: RecordPatch,
    ) -> Result<RecordOutcome> {
        let mut record = self.visible_record(principal, id).await?;
        if !records::may_edit(principal, &record) {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not edit record {id}",
                principal.user_id
            )));
        }
        if !record.is_active() {
            return Err(VetdeskError::Validation(format!(
                "record {id} is archived and read-only"
            )));
        }
        let (assigned, advisories) = records::resolve_edit_assignment(
            principal,
            &record.veterinarian_id,
            patch.veterinarian_id.clone(),
        );
        if assigned != record.veterinarian_id {
            self.require_veterinarian(&assigned).await?;
        }
        if let Some(diagnosis) = patch.diagnosis {
            record.diagnosis = diagnosis;
        }
        if let Some(treatment) = patch.treatment {
            record.treatment = treatment;
        }
        if let Some(vitals) = patch.vitals {
            record.vitals = Some(vitals);
        }
        record.veterinarian_id = assigned;
        record.updated_at = Utc::now();
        let record = self.records.update(record).await?;
        for advisory in &advisories {
            warn!("Record {}: {}", record.id, advisory);
        }
        info!("Updated record {}", record.id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "record.update",
            "record",
            record.id,
            json!({ "advisories": advisories }),
        ))
        .await;
        Ok(RecordOutcome { record, advisories })
    }

    pub async fn archive_record(&self, principal: &Principal, id: Uuid) -> Result<ClinicalRecord> {
        let record = self.visible_record(principal, id).await?;
        if !records::may_archive(principal, &record) {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not archive record {id}",
                principal.user_id
            )));
        }
        let record = self.set_record_lifecycle(principal, record, false).await?;
        Ok(record)
    }

    pub async fn unarchive_record(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ClinicalRecord> {
        let record = self.visible_record(principal, id).await?;
        if !records::may_unarchive(principal) {
            return Err(VetdeskError::Forbidden(format!(
                "{} may not unarchive record {id}",
                principal.user_id
            )));
        }
        let record = self.set_record_lifecycle(principal, record, true).await?;
        Ok(record)
    }

    /// Delete per the role's meaning: archive for a veterinarian, hard
    /// delete (with link cleanup) for an admin. Nobody else deletes.
    pub async fn delete_record(&self, principal: &Principal, id: Uuid) -> Result<DeleteOutcome> {
        let record = self.visible_record(principal, id).await?;
        if principal.has_role(Role::Veterinarian) && !principal.is_admin() {
            if !records::may_archive(principal, &record) {
                return Err(VetdeskError::Forbidden(format!(
                    "{} may not archive record {id}",
                    principal.user_id
                )));
            }
            let archived = self.set_record_lifecycle(principal, record, false).await?;
            return Ok(DeleteOutcome::Archived(archived));
        }
        principal.require_admin()?;
        if record.appointment_id.is_some() {
            // Clear the appointment back-link before the row goes.
            let mut unlinked = record.clone();
            unlinked.appointment_id = None;
            unlinked.updated_at = Utc::now();
            self.records.update(unlinked).await?;
        }
        self.records.delete(id).await?;
        info!("Deleted record {}", id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            "record.delete",
            "record",
            id,
            json!({}),
        ))
        .await;
        Ok(DeleteOutcome::Deleted)
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn visible_appointment(&self, principal: &Principal, id: Uuid) -> Result<Appointment> {
        let scope = self.resolver.appointment_scope(principal).await?;
        if let Some(appt) = self.appointments.find_scoped(id, &scope).await? {
            return Ok(appt);
        }
        if principal.has_role(Role::Client) {
            if let Some(appt) = self.appointments.find(id).await? {
                if principal.is_self(&appt.client_id) {
                    return Ok(appt);
                }
            }
        }
        Err(VetdeskError::not_found("appointment", id))
    }

    async fn visible_record(&self, principal: &Principal, id: Uuid) -> Result<ClinicalRecord> {
        let scope = self.resolver.record_scope(principal).await?;
        if let Some(record) = self.records.find_scoped(id, &scope).await? {
            return Ok(record);
        }
        if principal.has_role(Role::Client) {
            if let Some(record) = self.records.find(id).await? {
                if let Some(owner) = self.graph.pet_owner(record.pet_id).await? {
                    if principal.is_self(&owner) {
                        return Ok(record);
                    }
                }
            }
        }
        Err(VetdeskError::not_found("record", id))
    }

    async fn set_record_lifecycle(
        &self,
        principal: &Principal,
        mut record: ClinicalRecord,
        active: bool,
    ) -> Result<ClinicalRecord> {
        record.active = Some(active);
        record.updated_at = Utc::now();
        let record = self.records.update(record).await?;
        let action = if active {
            "record.unarchive"
        } else {
            "record.archive"
        };
        info!("{} {}", action, record.id);
        self.append_audit(AuditEntry::new(
            &principal.user_id,
            action,
            "record",
            record.id,
            json!({}),
        ))
        .await;
        Ok(record)
    }

    /// Who the operation is about: clients act on themselves, staff must
    /// name the subject.
    fn resolve_subject_user(
        &self,
        principal: &Principal,
        requested: Option<String>,
        field: &str,
    ) -> Result<String> {
        if principal.has_role(Role::Client) && !principal.roles.is_staff() {
            return Ok(principal.user_id.clone());
        }
        requested.ok_or_else(|| VetdeskError::Validation(format!("a {field} id is required")))
    }

    async fn require_veterinarian(&self, vet_id: &str) -> Result<()> {
        let user = self
            .users
            .find(vet_id)
            .await?
            .ok_or_else(|| VetdeskError::Validation(format!("veterinarian '{vet_id}' not found")))?;
        if !user.roles.has(Role::Veterinarian) {
            return Err(VetdeskError::Validation(format!(
                "'{vet_id}' does not hold VETERINARIAN"
            )));
        }
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.append(entry).await {
            warn!("Audit append failed: {}", err);
        }
    }
}

/// No-op audit store for callers that do not wire one.
struct NoopAuditStore;

#[async_trait::async_trait]
impl AuditStore for NoopAuditStore {
    async fn append(&self, _entry: AuditEntry) -> Result<()> {
        Ok(())
    }

    async fn for_subject(&self, _subject_id: &str) -> Result<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}
