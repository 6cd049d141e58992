//! Ownership graph: pure reads over the store ports.
//!
//! No side effects; absence comes back as `None` or an empty set rather
//! than an error, so callers decide what missing means.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::ports::{AppointmentStore, ClinicStore, PetStore, Result, UserStore};
use crate::scope::{AppointmentClause, ScopeRule};
use crate::types::AppointmentFilter;

#[derive(Clone)]
pub struct OwnershipGraph {
    users: Arc<dyn UserStore>,
    clinics: Arc<dyn ClinicStore>,
    pets: Arc<dyn PetStore>,
    appointments: Arc<dyn AppointmentStore>,
}

impl OwnershipGraph {
    pub fn new(
        users: Arc<dyn UserStore>,
        clinics: Arc<dyn ClinicStore>,
        pets: Arc<dyn PetStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            users,
            clinics,
            pets,
            appointments,
        }
    }

    /// The clinic a staff member is affiliated to.
    pub async fn staff_clinic(&self, user_id: &str) -> Result<Option<Uuid>> {
        Ok(self.users.find(user_id).await?.and_then(|u| u.clinic_id))
    }

    /// Clinics whose creator is this admin.
    pub async fn clinics_created_by(&self, admin_id: &str) -> Result<Vec<Uuid>> {
        self.clinics.created_by(admin_id).await
    }

    /// The owning client of a pet.
    pub async fn pet_owner(&self, pet_id: Uuid) -> Result<Option<String>> {
        Ok(self.pets.find(pet_id).await?.map(|p| p.owner_id))
    }

    /// Distinct pet ids appearing on any appointment assigned to this
    /// veterinarian ("my patients").
    pub async fn appointments_treated_by(&self, vet_id: &str) -> Result<Vec<Uuid>> {
        let scope = ScopeRule::any(vec![AppointmentClause::Vet(vet_id.to_string())]);
        let appts = self
            .appointments
            .list(&scope, &AppointmentFilter::default())
            .await?;
        let mut seen = HashSet::new();
        Ok(appts
            .into_iter()
            .map(|a| a.pet_id)
            .filter(|id| seen.insert(*id))
            .collect())
    }
}
