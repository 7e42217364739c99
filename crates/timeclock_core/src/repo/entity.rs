//! Persistence descriptors for entity types.
//!
//! # Responsibility
//! - Describe, per entity type, its table, key column, row mapping and write
//!   statements, so the generic repository never inspects types at runtime.
//! - Implement the insert path shared by direct saves and cascades.
//!
//! # Invariants
//! - `insert_row` receives an entity whose audit and version are already set.
//! - `update_row` only touches the row whose key and version both match, and
//!   bumps the stored version by one.

use crate::db::Session;
use crate::model::audit::Audit;
use crate::model::validation::ModelValidationError;
use crate::repo::crud_repo::{RepoError, RepoResult};
use rusqlite::types::{FromSql, ToSql};
use rusqlite::{Connection, Row};
use std::fmt::{Debug, Display};

/// Version assigned to a row by its first insert.
pub const INITIAL_VERSION: i32 = 1;

/// Static persistence description of one entity type.
pub trait Entity: Clone + PartialEq {
    /// Primary key type.
    type Key: Copy + Eq + Debug + Display + ToSql + FromSql;

    /// Human-readable entity name used in errors and logs.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Unqualified primary key column.
    const KEY_COLUMN: &'static str;
    /// `SELECT ... FROM ...` statement without filter or ordering.
    const SELECT_SQL: &'static str;
    /// Primary key column as referenced inside `SELECT_SQL`.
    const KEY_FILTER: &'static str;

    fn key(&self) -> Option<Self::Key>;
    fn set_key(&mut self, key: Self::Key);
    fn version(&self) -> i32;
    fn set_version(&mut self, version: i32);
    fn audit_mut(&mut self) -> &mut Audit;
    fn validate(&self) -> Result<(), ModelValidationError>;

    /// Maps one row of `SELECT_SQL` to an entity.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Inserts the entity and returns the generated key.
    fn insert_row(&self, conn: &Connection) -> RepoResult<Self::Key>;

    /// Writes mutable columns where key and version match, bumping version.
    ///
    /// Returns the number of changed rows.
    fn update_row(&self, conn: &Connection, key: Self::Key) -> RepoResult<usize>;

    /// Persists transient associations before this entity is inserted.
    fn cascade_persist(&mut self, _cascade: &Cascade<'_>) -> RepoResult<()> {
        Ok(())
    }
}

/// Insert context handed to `Entity::cascade_persist`.
pub struct Cascade<'a> {
    session: &'a Session,
    conn: &'a Connection,
}

impl Cascade<'_> {
    /// Inserts `associated` when it has no identity yet; persisted associations
    /// are left untouched.
    pub fn persist<A: Entity>(&self, associated: &mut A) -> RepoResult<()> {
        if associated.key().is_some() {
            return Ok(());
        }
        persist_new(self.session, self.conn, associated)
    }
}

/// Inserts a transient entity, running cascades and the insert hook.
///
/// `entity` is only modified when the insert succeeds. Callers run this inside
/// a transaction so a failed insert also discards the cascaded rows.
pub(crate) fn persist_new<E: Entity>(
    session: &Session,
    conn: &Connection,
    entity: &mut E,
) -> RepoResult<()> {
    entity.validate()?;
    if let Some(key) = entity.key() {
        return Err(RepoError::ConstraintViolation(format!(
            "{} {key} is already persisted",
            E::NAME
        )));
    }

    let mut staged = entity.clone();
    staged.cascade_persist(&Cascade { session, conn })?;
    session.audit_hook().on_insert(staged.audit_mut());
    staged.set_version(INITIAL_VERSION);

    let key = staged.insert_row(conn)?;
    staged.set_key(key);
    session.manage(E::TABLE, &key);
    *entity = staged;
    Ok(())
}

/// Column names of an embedded audit record inside one result set.
pub(crate) struct AuditColumns {
    pub created_at: &'static str,
    pub created_by: &'static str,
    pub modified_at: &'static str,
    pub modified_by: &'static str,
}

pub(crate) const AUDIT_COLUMNS: AuditColumns = AuditColumns {
    created_at: "created_at",
    created_by: "created_by",
    modified_at: "modified_at",
    modified_by: "modified_by",
};

pub(crate) fn read_audit(row: &Row<'_>, columns: &AuditColumns) -> rusqlite::Result<Audit> {
    Ok(Audit {
        created_at: row.get(columns.created_at)?,
        created_by: row.get(columns.created_by)?,
        modified_at: row.get(columns.modified_at)?,
        modified_by: row.get(columns.modified_by)?,
    })
}

/// Returns the key of a persisted association, or `None` when absent.
///
/// # Errors
/// - `RepoError::TransientAssociation` when the association was never saved.
pub(crate) fn association_key<A: Entity>(
    owner: &'static str,
    associated: Option<&A>,
) -> RepoResult<Option<A::Key>> {
    match associated {
        None => Ok(None),
        Some(value) => value
            .key()
            .map(Some)
            .ok_or(RepoError::TransientAssociation {
                entity: owner,
                association: A::NAME,
            }),
    }
}
