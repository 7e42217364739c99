//! Embedded audit record and the lifecycle hook that fills it.
//!
//! # Responsibility
//! - Hold creation/modification metadata embedded in every entity row.
//! - Define the explicit hook invoked by the data-access layer on insert,
//!   update and removal.
//!
//! # Invariants
//! - `created_at`/`created_by` are written once, on insert.
//! - `modified_at`/`modified_by` stay `None` until the first update.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Actor recorded when no explicit actor is configured.
pub const DEFAULT_ACTOR: &str = "system";

/// Audit metadata embedded in every persisted entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    /// Unix epoch milliseconds of the insert. `0` while transient.
    pub created_at: i64,
    /// Actor that inserted the row. Empty while transient.
    pub created_by: String,
    /// Unix epoch milliseconds of the last update.
    pub modified_at: Option<i64>,
    /// Actor that last updated the row.
    pub modified_by: Option<String>,
}

impl Audit {
    /// Returns whether insert metadata has been populated.
    pub fn is_populated(&self) -> bool {
        self.created_at > 0 && !self.created_by.is_empty()
    }
}

/// Lifecycle hook called by the data-access layer around row mutations.
///
/// Implementations must not touch storage; they only stamp the audit record
/// or observe the event.
pub trait AuditHook {
    /// Called before a new row is inserted.
    fn on_insert(&self, audit: &mut Audit);
    /// Called before an existing row is updated.
    fn on_update(&self, audit: &mut Audit);
    /// Called after one row has been deleted.
    fn on_remove(&self, _entity: &'static str, _key: &str) {}
}

/// Default hook stamping wall-clock time and a fixed actor.
#[derive(Debug, Clone)]
pub struct ClockAuditHook {
    actor: String,
}

impl ClockAuditHook {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl Default for ClockAuditHook {
    fn default() -> Self {
        Self::new(DEFAULT_ACTOR)
    }
}

impl AuditHook for ClockAuditHook {
    fn on_insert(&self, audit: &mut Audit) {
        audit.created_at = now_epoch_ms();
        audit.created_by = self.actor.clone();
        audit.modified_at = None;
        audit.modified_by = None;
    }

    fn on_update(&self, audit: &mut Audit) {
        audit.modified_at = Some(now_epoch_ms());
        audit.modified_by = Some(self.actor.clone());
    }
}

fn now_epoch_ms() -> i64 {
    // Clocks set before 1970 collapse to 1 so the stamp still reads as populated.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(1)
        .max(1)
}
