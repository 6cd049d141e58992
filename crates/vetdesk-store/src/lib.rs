//! Storage backends for the clinic core.
//!
//! This crate provides:
//!
//! - **MemoryStore**: one struct implementing every core port over
//!   `tokio::sync::RwLock` tables, with scope clauses evaluated here
//! - **StaticTokenProvider**: bearer-token resolution against a
//!   registered claims map, joining clinic affiliation from user rows
//!
//! Uniqueness rules that must survive races (appointment slots, the
//! record-appointment link) are enforced inside the table write lock.

pub mod auth;
pub mod memory;

pub use auth::StaticTokenProvider;
pub use memory::MemoryStore;
