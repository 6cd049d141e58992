//! Core domain for the clinic platform: who may see and do what.
//!
//! This crate provides:
//!
//! - **Principal / RoleSet**: the authenticated caller and their roles
//! - **ScopeRule**: a visibility scope as data, merged across roles
//! - **ScopeResolver**: role x resource scope resolution over the ownership graph
//! - **ClinicService**: the policy facade every operation goes through
//! - **Store ports**: async traits a backend implements to persist rows
//!
//! # Architecture
//!
//! ```text
//! Principal ──► ScopeResolver ──► ScopeRule ──► Store (evaluates clauses)
//!                    │
//!                    ▼
//!              ClinicService ──► lifecycle / records (pure rules)
//!                    │
//!                    ▼
//!               AuditStore
//! ```
//!
//! Scoping is deny-by-default: a role with no applicable clause sees
//! nothing, and an out-of-scope id is indistinguishable from a missing
//! one (both read as NotFound).

pub mod audit;
pub mod error;
pub mod lifecycle;
pub mod ownership;
pub mod ports;
pub mod principal;
pub mod records;
pub mod scope;
pub mod service;
pub mod types;
pub mod visibility;

pub use audit::{AuditEntry, AuditStore};
pub use error::{AuthError, VetdeskError};
pub use lifecycle::TransitionAction;
pub use ownership::OwnershipGraph;
pub use ports::{
    AppointmentStore, ClinicStore, PetStore, RecordStore, Result, UserStore,
};
pub use principal::{Claims, Principal, PrincipalProvider, Role, RoleSet};
pub use records::{Advisory, DeleteOutcome, RecordOutcome};
pub use scope::{
    AppointmentClause, AppointmentScope, ClinicClause, ClinicScope, PetClause, PetScope,
    RecordClause, RecordScope, ScopeRule, UserClause, UserScope,
};
pub use service::ClinicService;
pub use types::{
    Appointment, AppointmentFilter, AppointmentStatus, Clinic, ClinicalRecord, NewAppointment,
    NewClinic, NewPet, NewRecord, NewUser, Pet, PetFilter, RecordFilter, RecordLifecycle,
    RecordPatch, User,
};
pub use visibility::ScopeResolver;
