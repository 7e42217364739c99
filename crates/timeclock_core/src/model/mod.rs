//! Time-tracking domain model.
//!
//! # Responsibility
//! - Define the canonical records persisted by core: jobs, customers, pays.
//! - Provide builders that validate records before they reach storage.
//!
//! # Invariants
//! - An entity without an identity (`None` id) has never been persisted.
//! - Persisted entities start at version 1; version 0 means transient.
//! - Every entity embeds an `Audit` record populated by storage hooks.

pub mod audit;
pub mod customer;
pub mod job;
pub mod pay;
pub mod validation;
