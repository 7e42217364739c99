//! Customer domain model and builder.
//!
//! # Invariants
//! - `name` is mandatory; names are not unique across customers.
//! - `customer_id` is assigned by storage on first save and never changes.

use crate::model::audit::Audit;
use crate::model::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Storage-generated customer identity.
pub type CustomerId = i64;

/// A customer a job is billed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// `None` until the customer has been saved.
    pub customer_id: Option<CustomerId>,
    pub name: String,
    /// Contact person at the customer.
    pub contact: Option<String>,
    pub audit: Audit,
    /// Optimistic concurrency counter. `0` while transient.
    pub version: i32,
}

impl Customer {
    /// Checks mandatory fields before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        Ok(())
    }
}

/// Fluent builder for [`Customer`].
///
/// Starting from an existing customer keeps identity, audit and version, so
/// the built value can be written back through `update`.
#[derive(Debug, Clone, Default)]
pub struct CustomerBuilder {
    entity: Customer,
}

impl CustomerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.entity.name = name.into();
        self
    }

    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.entity.contact = Some(contact.into());
        self
    }

    pub fn clear_contact(mut self) -> Self {
        self.entity.contact = None;
        self
    }

    /// Returns the built customer after validating mandatory fields.
    pub fn build(self) -> Result<Customer, ModelValidationError> {
        self.entity.validate()?;
        Ok(self.entity)
    }
}

impl From<Customer> for CustomerBuilder {
    fn from(entity: Customer) -> Self {
        Self { entity }
    }
}
