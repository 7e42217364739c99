//! Repository layer: generic CRUD plus entity-specific lookups.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from the service layer.
//!
//! # Invariants
//! - Repository writes validate entities before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `NonUnique`,
//!   `Conflict`, `ConstraintViolation`) in addition to storage errors.

pub mod crud_repo;
pub mod customer_repo;
pub mod entity;
pub mod job_repo;
pub mod pay_repo;

pub use crud_repo::{
    CrudRepository, NamedQuery, RepoError, RepoErrorKind, RepoResult, SqliteCrudRepository,
};
pub use customer_repo::{CustomerRepository, SqliteCustomerRepository};
pub use entity::Entity;
pub use job_repo::{JobRepository, SqliteJobRepository};
pub use pay_repo::SqlitePayRepository;
