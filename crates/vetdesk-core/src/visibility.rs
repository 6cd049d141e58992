//! Visibility resolver: principal roles to per-resource scope rules.
//!
//! The clause builders are pure; the resolver fetches the two derived
//! sets (an admin's created clinics, a vet's treated pets) through the
//! ownership graph and hands them in. Each role contributes clauses
//! independently and the union is the principal's scope, so multi-role
//! principals always get the most permissive combination.

use uuid::Uuid;

use crate::ownership::OwnershipGraph;
use crate::ports::Result;
use crate::principal::{Principal, Role};
use crate::scope::{
    AppointmentClause, AppointmentScope, ClinicClause, ClinicScope, PetClause, PetScope,
    RecordClause, RecordScope, ScopeRule, UserClause, UserScope,
};

pub struct ScopeResolver {
    graph: OwnershipGraph,
}

impl ScopeResolver {
    pub fn new(graph: OwnershipGraph) -> Self {
        Self { graph }
    }

    pub async fn clinic_scope(&self, principal: &Principal) -> Result<ClinicScope> {
        Ok(clinic_clauses(principal))
    }

    pub async fn user_scope(&self, principal: &Principal) -> Result<UserScope> {
        Ok(user_clauses(principal))
    }

    pub async fn pet_scope(&self, principal: &Principal) -> Result<PetScope> {
        let created = self.created_clinics(principal).await?;
        let treated = self.treated_pets(principal).await?;
        Ok(pet_clauses(principal, &created, &treated))
    }

    pub async fn appointment_scope(&self, principal: &Principal) -> Result<AppointmentScope> {
        let created = self.created_clinics(principal).await?;
        Ok(appointment_clauses(principal, &created))
    }

    pub async fn record_scope(&self, principal: &Principal) -> Result<RecordScope> {
        let created = self.created_clinics(principal).await?;
        Ok(record_clauses(principal, &created))
    }

    async fn created_clinics(&self, principal: &Principal) -> Result<Vec<Uuid>> {
        if principal.has_role(Role::Admin) {
            self.graph.clinics_created_by(&principal.user_id).await
        } else {
            Ok(Vec::new())
        }
    }

    async fn treated_pets(&self, principal: &Principal) -> Result<Vec<Uuid>> {
        if principal.has_role(Role::Veterinarian) {
            self.graph.appointments_treated_by(&principal.user_id).await
        } else {
            Ok(Vec::new())
        }
    }
}

// ── Pure clause builders, one per resource ────────────────────
// A staff role with no affiliation contributes nothing to clinic-scoped
// rules; it never widens to "all".

fn clinic_clauses(p: &Principal) -> ClinicScope {
    let mut clauses = Vec::new();
    if p.has_role(Role::Admin) {
        clauses.push(ClinicClause::CreatedBy(p.user_id.clone()));
    }
    if p.has_role(Role::Receptionist) || p.has_role(Role::Veterinarian) {
        if let Some(clinic) = p.clinic_id {
            clauses.push(ClinicClause::Id(clinic));
        }
    }
    if p.has_role(Role::Client) {
        clauses.push(ClinicClause::Active);
    }
    ScopeRule::any(clauses)
}

fn user_clauses(p: &Principal) -> UserScope {
    // The staff directory is global. Deliberately unscoped for every
    // staff role, unlike all other resources.
    if p.roles.is_staff() {
        return ScopeRule::Unscoped;
    }
    let mut clauses = Vec::new();
    if p.has_role(Role::Client) {
        clauses.push(UserClause::Id(p.user_id.clone()));
    }
    ScopeRule::any(clauses)
}

fn pet_clauses(p: &Principal, created: &[Uuid], treated: &[Uuid]) -> PetScope {
    let mut clauses = Vec::new();
    if p.has_role(Role::Admin) {
        clauses.extend(created.iter().map(|c| PetClause::OwnerClinic(*c)));
    }
    if p.has_role(Role::Receptionist) {
        if let Some(clinic) = p.clinic_id {
            clauses.push(PetClause::OwnerClinic(clinic));
        }
    }
    if p.has_role(Role::Veterinarian) && !treated.is_empty() {
        clauses.push(PetClause::IdIn(treated.to_vec()));
    }
    if p.has_role(Role::Client) {
        clauses.push(PetClause::Owner(p.user_id.clone()));
    }
    ScopeRule::any(clauses)
}

fn appointment_clauses(p: &Principal, created: &[Uuid]) -> AppointmentScope {
    let mut clauses = Vec::new();
    if p.has_role(Role::Admin) {
        clauses.extend(created.iter().map(|c| AppointmentClause::Clinic(*c)));
    }
    if p.has_role(Role::Receptionist) {
        if let Some(clinic) = p.clinic_id {
            clauses.push(AppointmentClause::Clinic(clinic));
        }
    }
    if p.has_role(Role::Veterinarian) {
        clauses.push(AppointmentClause::Vet(p.user_id.clone()));
    }
    if p.has_role(Role::Client) {
        clauses.push(AppointmentClause::Client(p.user_id.clone()));
    }
    ScopeRule::any(clauses)
}

fn record_clauses(p: &Principal, created: &[Uuid]) -> RecordScope {
    let mut clauses = Vec::new();
    if p.has_role(Role::Admin) {
        clauses.extend(created.iter().map(|c| RecordClause::Clinic(*c)));
    }
    if p.has_role(Role::Receptionist) {
        if let Some(clinic) = p.clinic_id {
            clauses.push(RecordClause::Clinic(clinic));
        }
    }
    if p.has_role(Role::Veterinarian) {
        clauses.push(RecordClause::VetActive(p.user_id.clone()));
    }
    if p.has_role(Role::Client) {
        clauses.push(RecordClause::PetOwner(p.user_id.clone()));
    }
    ScopeRule::any(clauses)
}
