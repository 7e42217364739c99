//! Pay persistence descriptor.
//!
//! Pays have no lookups beyond the generic repository; jobs reach them
//! through their `pay_id` reference.

use crate::model::audit::Audit;
use crate::model::pay::{Pay, PayId};
use crate::model::validation::ModelValidationError;
use crate::repo::crud_repo::{RepoError, RepoResult, SqliteCrudRepository};
use crate::repo::entity::{read_audit, AuditColumns, Entity, AUDIT_COLUMNS};
use rusqlite::{params, Connection, Row};

const PAY_SELECT_SQL: &str = "SELECT
    pay_id,
    hourly_rate,
    currency,
    worked_minutes,
    paid,
    created_at,
    created_by,
    modified_at,
    modified_by,
    version
FROM pays";

/// SQLite repository for pays.
pub type SqlitePayRepository<'s> = SqliteCrudRepository<'s, Pay>;

pub(crate) struct PayColumns {
    pub pay_id: &'static str,
    pub hourly_rate: &'static str,
    pub currency: &'static str,
    pub worked_minutes: &'static str,
    pub paid: &'static str,
    pub audit: AuditColumns,
    pub version: &'static str,
}

const PAY_COLUMNS: PayColumns = PayColumns {
    pay_id: "pay_id",
    hourly_rate: "hourly_rate",
    currency: "currency",
    worked_minutes: "worked_minutes",
    paid: "paid",
    audit: AUDIT_COLUMNS,
    version: "version",
};

pub(crate) fn read_pay(row: &Row<'_>, columns: &PayColumns) -> RepoResult<Pay> {
    let paid = match row.get::<_, i64>(columns.paid)? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid paid value `{other}` in pays.paid"
            )));
        }
    };

    Ok(Pay {
        pay_id: Some(row.get(columns.pay_id)?),
        hourly_rate: row.get(columns.hourly_rate)?,
        currency: row.get(columns.currency)?,
        worked_minutes: row.get(columns.worked_minutes)?,
        paid,
        audit: read_audit(row, &columns.audit)?,
        version: row.get(columns.version)?,
    })
}

impl Entity for Pay {
    type Key = PayId;

    const NAME: &'static str = "pay";
    const TABLE: &'static str = "pays";
    const KEY_COLUMN: &'static str = "pay_id";
    const SELECT_SQL: &'static str = PAY_SELECT_SQL;
    const KEY_FILTER: &'static str = "pay_id";

    fn key(&self) -> Option<PayId> {
        self.pay_id
    }

    fn set_key(&mut self, key: PayId) {
        self.pay_id = Some(key);
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        Pay::validate(self)
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        read_pay(row, &PAY_COLUMNS)
    }

    fn insert_row(&self, conn: &Connection) -> RepoResult<PayId> {
        let key = conn.query_row(
            "INSERT INTO pays (
                hourly_rate,
                currency,
                worked_minutes,
                paid,
                created_at,
                created_by,
                modified_at,
                modified_by,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING pay_id;",
            params![
                self.hourly_rate,
                self.currency.as_str(),
                self.worked_minutes,
                bool_to_int(self.paid),
                self.audit.created_at,
                self.audit.created_by.as_str(),
                self.audit.modified_at,
                self.audit.modified_by.as_deref(),
                self.version,
            ],
            |row| row.get(0),
        )?;
        Ok(key)
    }

    fn update_row(&self, conn: &Connection, key: PayId) -> RepoResult<usize> {
        let changed = conn.execute(
            "UPDATE pays
             SET
                hourly_rate = ?1,
                currency = ?2,
                worked_minutes = ?3,
                paid = ?4,
                modified_at = ?5,
                modified_by = ?6,
                version = version + 1
             WHERE pay_id = ?7
               AND version = ?8;",
            params![
                self.hourly_rate,
                self.currency.as_str(),
                self.worked_minutes,
                bool_to_int(self.paid),
                self.audit.modified_at,
                self.audit.modified_by.as_deref(),
                key,
                self.version,
            ],
        )?;
        Ok(changed)
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
