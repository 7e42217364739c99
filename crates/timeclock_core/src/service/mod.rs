//! Core use-case services.
//!
//! # Responsibility
//! - Wrap repository calls in one transaction per call.
//! - Keep callers decoupled from storage details.

pub mod crud_service;
pub mod customer_service;
pub mod job_service;

pub use crud_service::CrudService;
pub use customer_service::CustomerService;
pub use job_service::JobService;
