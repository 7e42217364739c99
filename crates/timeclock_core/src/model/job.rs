//! Job domain model and builder.
//!
//! # Responsibility
//! - Describe one unit of tracked work for a developer and a customer.
//! - Own the customer/pay associations that are inserted together with it.
//!
//! # Invariants
//! - `project_name` and `status` are mandatory.
//! - Associated customer/pay are persisted on insert when still transient;
//!   removing a job never removes them.

use crate::model::audit::Audit;
use crate::model::customer::Customer;
use crate::model::pay::Pay;
use crate::model::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Storage-generated job identity.
pub type JobId = i32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Option<JobId>,
    pub developer_id: i32,
    pub order_number: i32,
    pub project_name: String,
    /// Source branch the work happens on, e.g. a GitHub branch.
    pub branch_name: Option<String>,
    pub package_name: Option<String>,
    pub class_name: Option<String>,
    pub status: String,
    pub comment: Option<String>,
    pub customer: Option<Customer>,
    pub pay: Option<Pay>,
    pub audit: Audit,
    pub version: i32,
}

impl Job {
    /// Checks mandatory fields of the job and of its associations.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("project_name", &self.project_name)?;
        require_text("status", &self.status)?;
        if let Some(customer) = &self.customer {
            customer.validate()?;
        }
        if let Some(pay) = &self.pay {
            pay.validate()?;
        }
        Ok(())
    }
}

/// Fluent builder for [`Job`].
#[derive(Debug, Clone, Default)]
pub struct JobBuilder {
    entity: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn developer_id(mut self, developer_id: i32) -> Self {
        self.entity.developer_id = developer_id;
        self
    }

    pub fn order_number(mut self, order_number: i32) -> Self {
        self.entity.order_number = order_number;
        self
    }

    pub fn project_name(mut self, project_name: impl Into<String>) -> Self {
        self.entity.project_name = project_name.into();
        self
    }

    pub fn branch_name(mut self, branch_name: impl Into<String>) -> Self {
        self.entity.branch_name = Some(branch_name.into());
        self
    }

    pub fn package_name(mut self, package_name: impl Into<String>) -> Self {
        self.entity.package_name = Some(package_name.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.entity.class_name = Some(class_name.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.entity.status = status.into();
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.entity.comment = Some(comment.into());
        self
    }

    pub fn customer(mut self, customer: Customer) -> Self {
        self.entity.customer = Some(customer);
        self
    }

    pub fn pay(mut self, pay: Pay) -> Self {
        self.entity.pay = Some(pay);
        self
    }

    /// Returns the built job after validating it and its associations.
    pub fn build(self) -> Result<Job, ModelValidationError> {
        self.entity.validate()?;
        Ok(self.entity)
    }
}

impl From<Job> for JobBuilder {
    fn from(entity: Job) -> Self {
        Self { entity }
    }
}
