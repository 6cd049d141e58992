//! Clinic management core: role-scoped visibility, appointment
//! lifecycle, and clinical records behind one policy facade.
//!
//! The root crate wires the pieces together:
//!
//! - `vetdesk-core`: pure domain logic and store ports
//! - `vetdesk-store`: the in-memory backend and token provider
//! - this crate: composition, env configuration, telemetry
//!
//! # Example
//!
//! ```ignore
//! use vetdesk::{Principal, RoleSet, Vetdesk};
//!
//! let app = Vetdesk::in_memory();
//! let admin = Principal::in_process("admin-1", RoleSet::ADMIN);
//! let clinics = app.service.list_clinics(&admin).await?;
//! ```

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use vetdesk_store::{MemoryStore, StaticTokenProvider};

pub use vetdesk_core::{
    Advisory, Appointment, AppointmentFilter, AppointmentScope, AppointmentStatus,
    AppointmentStore, AuditEntry, AuditStore, AuthError, Claims, Clinic, ClinicScope,
    ClinicService, ClinicStore, ClinicalRecord, DeleteOutcome, NewAppointment, NewClinic, NewPet,
    NewRecord, NewUser, OwnershipGraph, Pet, PetFilter, PetScope, PetStore, Principal,
    PrincipalProvider, RecordFilter, RecordOutcome, RecordPatch, RecordScope, RecordStore, Result,
    Role, RoleSet, ScopeRule, TransitionAction, User, UserScope, UserStore, VetdeskError,
};
pub use vetdesk_store::{MemoryStore as Store, StaticTokenProvider as TokenProvider};

/// A fully wired application: one in-memory store backing the policy
/// facade, the audit trail, and the token provider.
pub struct Vetdesk {
    pub service: ClinicService,
    pub provider: Arc<StaticTokenProvider>,
    pub store: Arc<MemoryStore>,
}

impl Vetdesk {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = ClinicService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )
        .with_audit(store.clone());
        let provider = Arc::new(StaticTokenProvider::new(store.clone()));
        Self {
            service,
            provider,
            store,
        }
    }
}

impl Default for Vetdesk {
    fn default() -> Self {
        Self::in_memory()
    }
}
