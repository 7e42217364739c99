//! Core domain logic for TimeClock.
//!
//! Jobs, customers and pays are persisted through a generic CRUD repository
//! and exposed through a transactional service layer.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, Profile};
pub use db::{open_db, open_db_in_memory, DbError, Session};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::audit::{Audit, AuditHook, ClockAuditHook};
pub use model::customer::{Customer, CustomerBuilder, CustomerId};
pub use model::job::{Job, JobBuilder, JobId};
pub use model::pay::{Pay, PayBuilder, PayId};
pub use model::validation::ModelValidationError;
pub use repo::{
    CrudRepository, CustomerRepository, Entity, JobRepository, NamedQuery, RepoError,
    RepoErrorKind, RepoResult, SqliteCrudRepository, SqliteCustomerRepository,
    SqliteJobRepository, SqlitePayRepository,
};
pub use service::{CrudService, CustomerService, JobService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
