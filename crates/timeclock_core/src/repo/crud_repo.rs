//! Generic CRUD repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide uniform persistence operations for every `Entity` type.
//! - Run named single-result and list queries for entity-specific extensions.
//! - Invoke the session audit hook on insert, update and per-row removal.
//!
//! # Invariants
//! - Write paths validate entities before any SQL mutation.
//! - `update` and `remove` compare versions; a mismatch is a `Conflict`.
//! - `save` is atomic, cascades included.
//! - `remove_all` deletes row by row so every removal fires the hook.
//! - Absence is `None` for `get`, and `NotFound` everywhere else.

use crate::db::{DbError, Session};
use crate::model::validation::ModelValidationError;
use crate::repo::entity::{persist_new, Entity};
use log::info;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed model validation before reaching storage.
    Validation(ModelValidationError),
    /// Storage rejected a NOT NULL, UNIQUE, CHECK or FOREIGN KEY rule.
    ConstraintViolation(String),
    /// An association that must already be persisted has no identity.
    TransientAssociation {
        entity: &'static str,
        association: &'static str,
    },
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// A single-result query matched more than one row.
    NonUnique {
        entity: &'static str,
        query: &'static str,
        count: usize,
    },
    /// The stored version differs from the one carried by the caller.
    Conflict {
        entity: &'static str,
        key: String,
        expected_version: i32,
        actual_version: i32,
    },
    Db(DbError),
    InvalidData(String),
}

/// Coarse classification of `RepoError` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    NotFound,
    NonUnique,
    ConstraintViolation,
    Conflict,
    Storage,
    InvalidData,
}

impl RepoError {
    pub fn kind(&self) -> RepoErrorKind {
        match self {
            Self::Validation(_)
            | Self::ConstraintViolation(_)
            | Self::TransientAssociation { .. } => RepoErrorKind::ConstraintViolation,
            Self::NotFound { .. } => RepoErrorKind::NotFound,
            Self::NonUnique { .. } => RepoErrorKind::NonUnique,
            Self::Conflict { .. } => RepoErrorKind::Conflict,
            Self::Db(_) => RepoErrorKind::Storage,
            Self::InvalidData(_) => RepoErrorKind::InvalidData,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::TransientAssociation {
                entity,
                association,
            } => write!(f, "{entity} references a {association} that was never saved"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::NonUnique {
                entity,
                query,
                count,
            } => write!(f, "{query} expected one {entity}, found {count}"),
            Self::Conflict {
                entity,
                key,
                expected_version,
                actual_version,
            } => write!(
                f,
                "{entity} {key} was modified concurrently: expected version {expected_version}, found {actual_version}"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(message.unwrap_or_else(|| err.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// A predefined lookup over one entity type.
///
/// `filter` is appended to the entity `SELECT_SQL` as its `WHERE` clause and
/// uses positional parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: &'static str,
    pub filter: &'static str,
}

/// Generic CRUD contract over one entity type.
pub trait CrudRepository<E: Entity> {
    /// Session this repository reads and writes through.
    fn session(&self) -> &Session;
    /// Inserts a transient entity, populating identity, audit and version.
    fn save(&self, entity: &mut E) -> RepoResult<()>;
    fn get(&self, key: E::Key) -> RepoResult<Option<E>>;
    fn get_all(&self) -> RepoResult<Vec<E>>;
    /// Merges entity state into storage and returns the stored instance.
    ///
    /// Transient entities are inserted, as a merge of new state would.
    fn update(&self, entity: &E) -> RepoResult<E>;
    fn remove(&self, entity: &E) -> RepoResult<()>;
    /// Removes every entity one row at a time; returns the removed count.
    fn remove_all(&self) -> RepoResult<usize>;
    fn is_exist(&self, key: E::Key) -> RepoResult<bool>;
    /// Value-equality membership in `get_all()`.
    fn is_exist_entity(&self, entity: &E) -> RepoResult<bool>;
    /// Detaches all managed instances without touching storage.
    fn clear(&self);
    fn close(&self) -> RepoResult<()>;
}

/// SQLite-backed generic repository.
pub struct SqliteCrudRepository<'s, E: Entity> {
    session: &'s Session,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity> SqliteCrudRepository<'s, E> {
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// Runs a named query that must match exactly one row.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no row matches; `argument` names the
    ///   lookup value in the message.
    /// - `RepoError::NonUnique` when more than one row matches.
    pub fn single_result(
        &self,
        query: NamedQuery,
        params: impl Params,
        argument: impl Display,
    ) -> RepoResult<E> {
        let mut rows = self.result_list(query, params)?;
        match rows.len() {
            0 => Err(RepoError::NotFound {
                entity: E::NAME,
                key: format!("{}({argument})", query.name),
            }),
            1 => rows.pop().ok_or_else(|| {
                RepoError::InvalidData(format!("{} lost its only row", query.name))
            }),
            count => Err(RepoError::NonUnique {
                entity: E::NAME,
                query: query.name,
                count,
            }),
        }
    }

    /// Runs a named query returning every matching row ordered by key.
    pub fn result_list(&self, query: NamedQuery, params: impl Params) -> RepoResult<Vec<E>> {
        let sql = format!(
            "{} WHERE {} ORDER BY {};",
            E::SELECT_SQL,
            query.filter,
            E::KEY_FILTER
        );
        self.session
            .with_conn(|conn| load_many::<E>(self.session, conn, &sql, params))
    }
}

impl<E: Entity> CrudRepository<E> for SqliteCrudRepository<'_, E> {
    fn session(&self) -> &Session {
        self.session
    }

    fn save(&self, entity: &mut E) -> RepoResult<()> {
        // Cascaded inserts and the entity insert land together or not at all.
        self.session.in_transaction(|| {
            self.session
                .with_conn(|conn| persist_new(self.session, conn, entity))
        })
    }

    fn get(&self, key: E::Key) -> RepoResult<Option<E>> {
        self.session
            .with_conn(|conn| load_one::<E>(self.session, conn, key))
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        let sql = format!("{} ORDER BY {};", E::SELECT_SQL, E::KEY_FILTER);
        self.session
            .with_conn(|conn| load_many::<E>(self.session, conn, &sql, []))
    }

    fn update(&self, entity: &E) -> RepoResult<E> {
        entity.validate()?;
        let Some(key) = entity.key() else {
            let mut inserted = entity.clone();
            self.save(&mut inserted)?;
            return Ok(inserted);
        };

        self.session.with_conn(|conn| {
            let mut staged = entity.clone();
            self.session.audit_hook().on_update(staged.audit_mut());
            if staged.update_row(conn, key)? == 0 {
                return Err(stale_or_missing::<E>(conn, key, staged.version())?);
            }
            load_one::<E>(self.session, conn, key)?.ok_or_else(|| not_found::<E>(key))
        })
    }

    fn remove(&self, entity: &E) -> RepoResult<()> {
        let Some(key) = entity.key() else {
            return Err(RepoError::NotFound {
                entity: E::NAME,
                key: "transient instance".to_string(),
            });
        };

        self.session.with_conn(|conn| {
            let changed = conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND version = ?2;",
                    E::TABLE,
                    E::KEY_COLUMN
                ),
                params![key, entity.version()],
            )?;
            if changed == 0 {
                return Err(stale_or_missing::<E>(conn, key, entity.version())?);
            }
            Ok(())
        })?;

        self.session.detach(E::TABLE, &key);
        self.session
            .audit_hook()
            .on_remove(E::NAME, &key.to_string());
        Ok(())
    }

    fn remove_all(&self) -> RepoResult<usize> {
        let entities = self.get_all()?;
        for entity in &entities {
            self.remove(entity)?;
        }
        info!(
            "event=remove_all module=repo status=ok entity={} removed={}",
            E::NAME,
            entities.len()
        );
        Ok(entities.len())
    }

    fn is_exist(&self, key: E::Key) -> RepoResult<bool> {
        self.session.with_conn(|conn| {
            let exists: i64 = conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                    E::TABLE,
                    E::KEY_COLUMN
                ),
                [key],
                |row| row.get(0),
            )?;
            Ok(exists == 1)
        })
    }

    fn is_exist_entity(&self, entity: &E) -> RepoResult<bool> {
        Ok(self.get_all()?.contains(entity))
    }

    fn clear(&self) {
        self.session.clear();
    }

    fn close(&self) -> RepoResult<()> {
        self.session.close()?;
        Ok(())
    }
}

fn load_one<E: Entity>(
    session: &Session,
    conn: &Connection,
    key: E::Key,
) -> RepoResult<Option<E>> {
    let sql = format!("{} WHERE {} = ?1;", E::SELECT_SQL, E::KEY_FILTER);
    Ok(load_many::<E>(session, conn, &sql, [key])?.pop())
}

fn load_many<E: Entity>(
    session: &Session,
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> RepoResult<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        let entity = E::from_row(row)?;
        if let Some(key) = entity.key() {
            session.manage(E::TABLE, &key);
        }
        entities.push(entity);
    }
    Ok(entities)
}

/// Explains why a versioned write changed no row.
fn stale_or_missing<E: Entity>(
    conn: &Connection,
    key: E::Key,
    expected_version: i32,
) -> RepoResult<RepoError> {
    let actual_version: Option<i32> = conn
        .query_row(
            &format!(
                "SELECT version FROM {} WHERE {} = ?1;",
                E::TABLE,
                E::KEY_COLUMN
            ),
            [key],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match actual_version {
        Some(actual_version) => RepoError::Conflict {
            entity: E::NAME,
            key: key.to_string(),
            expected_version,
            actual_version,
        },
        None => not_found::<E>(key),
    })
}

fn not_found<E: Entity>(key: E::Key) -> RepoError {
    RepoError::NotFound {
        entity: E::NAME,
        key: key.to_string(),
    }
}
