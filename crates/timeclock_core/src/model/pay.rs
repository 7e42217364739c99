//! Pay domain model and builder.
//!
//! A pay record holds the billing terms of one job: an hourly rate in minor
//! currency units and the minutes worked so far.

use crate::model::audit::Audit;
use crate::model::validation::{require_non_negative, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Storage-generated pay identity.
pub type PayId = i64;

/// Currency used when a builder does not set one.
pub const DEFAULT_CURRENCY: &str = "HUF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pay {
    pub pay_id: Option<PayId>,
    /// Rate per hour in minor currency units.
    pub hourly_rate: i64,
    /// Three letter uppercase currency code.
    pub currency: String,
    pub worked_minutes: i64,
    pub paid: bool,
    pub audit: Audit,
    pub version: i32,
}

impl Default for Pay {
    fn default() -> Self {
        Self {
            pay_id: None,
            hourly_rate: 0,
            currency: DEFAULT_CURRENCY.to_string(),
            worked_minutes: 0,
            paid: false,
            audit: Audit::default(),
            version: 0,
        }
    }
}

impl Pay {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_negative("hourly_rate", self.hourly_rate)?;
        require_non_negative("worked_minutes", self.worked_minutes)?;
        let valid_currency =
            self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_uppercase());
        if !valid_currency {
            return Err(ModelValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }

    /// Amount owed for the worked minutes, in minor currency units.
    ///
    /// Partial minutes of an hour are billed pro rata and rounded down.
    pub fn amount_due(&self) -> i64 {
        self.hourly_rate.saturating_mul(self.worked_minutes) / 60
    }
}

/// Fluent builder for [`Pay`].
#[derive(Debug, Clone, Default)]
pub struct PayBuilder {
    entity: Pay,
}

impl PayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hourly_rate(mut self, hourly_rate: i64) -> Self {
        self.entity.hourly_rate = hourly_rate;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.entity.currency = currency.into();
        self
    }

    pub fn worked_minutes(mut self, worked_minutes: i64) -> Self {
        self.entity.worked_minutes = worked_minutes;
        self
    }

    pub fn paid(mut self, paid: bool) -> Self {
        self.entity.paid = paid;
        self
    }

    pub fn build(self) -> Result<Pay, ModelValidationError> {
        self.entity.validate()?;
        Ok(self.entity)
    }
}

impl From<Pay> for PayBuilder {
    fn from(entity: Pay) -> Self {
        Self { entity }
    }
}

#[cfg(test)]
mod tests {
    use super::{Pay, PayBuilder};
    use crate::model::validation::ModelValidationError;

    #[test]
    fn amount_due_is_pro_rata() {
        let pay = Pay {
            hourly_rate: 6_000,
            worked_minutes: 90,
            ..Pay::default()
        };
        assert_eq!(pay.amount_due(), 9_000);
    }

    #[test]
    fn builder_rejects_lowercase_currency() {
        let err = PayBuilder::new().currency("eur").build().unwrap_err();
        assert_eq!(err, ModelValidationError::InvalidCurrency("eur".to_string()));
    }
}
