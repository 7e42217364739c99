//! Persistence context: one connection plus the set of managed instances.
//!
//! # Responsibility
//! - Own the connection for one unit of work.
//! - Track which entity rows have been loaded or written through it.
//! - Provide the transaction boundary used by the service layer.
//!
//! # Invariants
//! - A session is single-threaded; it is neither `Send`-shared nor `Sync`.
//! - After `close()` every operation fails with `DbError::SessionClosed`.
//! - A failed nested call rolls back to its own savepoint; the outer
//!   transaction keeps only the work of calls that succeeded.
//! - A rolled back transaction or savepoint detaches every managed instance.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{DbError, DbResult};
use crate::model::audit::{AuditHook, ClockAuditHook};
use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Display;

type ManagedKey = (&'static str, String);

/// Unit of work over one SQLite connection.
pub struct Session {
    conn: RefCell<Option<Connection>>,
    managed: RefCell<HashSet<ManagedKey>>,
    audit_hook: Box<dyn AuditHook>,
    savepoint_depth: Cell<u32>,
}

impl Session {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `DbError::UninitializedConnection` when the schema version is not the
    ///   latest one known by this binary.
    pub fn try_new(conn: Connection) -> DbResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(DbError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        Ok(Self {
            conn: RefCell::new(Some(conn)),
            managed: RefCell::default(),
            audit_hook: Box::new(ClockAuditHook::default()),
            savepoint_depth: Cell::new(0),
        })
    }

    /// Replaces the audit hook invoked on insert, update and removal.
    pub fn with_audit_hook(mut self, hook: impl AuditHook + 'static) -> Self {
        self.audit_hook = Box::new(hook);
        self
    }

    pub fn audit_hook(&self) -> &dyn AuditHook {
        self.audit_hook.as_ref()
    }

    /// Runs `work` against the open connection.
    pub fn with_conn<T, E>(&self, work: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let guard = self.conn.try_borrow().map_err(|_| DbError::SessionBusy)?;
        let conn = guard.as_ref().ok_or(DbError::SessionClosed)?;
        work(conn)
    }

    /// Runs `work` inside a transaction.
    ///
    /// Begins a transaction when none is active, commits when `work` succeeds
    /// and rolls back otherwise. When a transaction is already active the call
    /// runs under a savepoint of it: success releases the savepoint, failure
    /// rolls back to it, and the final commit stays with the outermost caller.
    pub fn in_transaction<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError> + Display,
    {
        let guard = self.conn.try_borrow().map_err(|_| DbError::SessionBusy)?;
        let conn = guard.as_ref().ok_or(DbError::SessionClosed)?;
        if !conn.is_autocommit() {
            return self.in_savepoint(conn, work);
        }

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        match work() {
            Ok(value) => {
                if let Err(err) = tx.commit() {
                    self.clear();
                    return Err(DbError::from(err).into());
                }
                debug!("event=tx_commit module=session status=ok");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=session status=error error={rollback_err}"
                    );
                }
                self.clear();
                debug!("event=tx_rollback module=session status=ok cause={err}");
                Err(err)
            }
        }
    }

    fn in_savepoint<T, E>(
        &self,
        conn: &Connection,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError> + Display,
    {
        let depth = self.savepoint_depth.get() + 1;
        let name = format!("timeclock_sp_{depth}");
        conn.execute_batch(&format!("SAVEPOINT {name};"))
            .map_err(DbError::from)?;

        self.savepoint_depth.set(depth);
        let result = work();
        self.savepoint_depth.set(depth - 1);

        match result {
            Ok(value) => {
                conn.execute_batch(&format!("RELEASE {name};"))
                    .map_err(DbError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) =
                    conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
                {
                    warn!(
                        "event=savepoint_rollback module=session status=error savepoint={name} error={rollback_err}"
                    );
                }
                self.clear();
                debug!(
                    "event=savepoint_rollback module=session status=ok savepoint={name} cause={err}"
                );
                Err(err)
            }
        }
    }

    /// Records an entity row as managed by this session.
    pub fn manage(&self, table: &'static str, key: &dyn Display) {
        self.managed.borrow_mut().insert((table, key.to_string()));
    }

    /// Forgets one entity row, typically after it was removed.
    pub fn detach(&self, table: &'static str, key: &dyn Display) {
        self.managed.borrow_mut().remove(&(table, key.to_string()));
    }

    /// Returns whether the entity row is managed by this session.
    pub fn contains(&self, table: &'static str, key: &dyn Display) -> bool {
        self.managed.borrow().contains(&(table, key.to_string()))
    }

    pub fn managed_count(&self) -> usize {
        self.managed.borrow().len()
    }

    /// Detaches every managed instance. Storage is not touched.
    pub fn clear(&self) {
        self.managed.borrow_mut().clear();
    }

    /// Closes the connection and detaches every managed instance.
    ///
    /// Closing an already closed session is a no-op.
    pub fn close(&self) -> DbResult<()> {
        let mut guard = self
            .conn
            .try_borrow_mut()
            .map_err(|_| DbError::SessionBusy)?;
        if let Some(conn) = guard.take() {
            if let Err((conn, err)) = conn.close() {
                *guard = Some(conn);
                return Err(err.into());
            }
        }
        drop(guard);
        self.clear();
        debug!("event=session_close module=session status=ok");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.borrow().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::db::{open_db_in_memory, DbError};
    use rusqlite::Connection;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        match Session::try_new(conn) {
            Err(DbError::UninitializedConnection {
                expected_version,
                actual_version: 0,
            }) => assert!(expected_version > 0),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected uninitialized connection error"),
        }
    }

    #[test]
    fn managed_registry_tracks_and_clears_keys() {
        let session = Session::try_new(open_db_in_memory().unwrap()).unwrap();
        session.manage("customers", &1_i64);
        session.manage("jobs", &1_i32);

        assert!(session.contains("customers", &1_i64));
        assert_eq!(session.managed_count(), 2);

        session.detach("jobs", &1_i32);
        assert!(!session.contains("jobs", &1_i32));

        session.clear();
        assert_eq!(session.managed_count(), 0);
    }

    #[test]
    fn closed_session_rejects_work() {
        let session = Session::try_new(open_db_in_memory().unwrap()).unwrap();
        session.close().unwrap();
        session.close().unwrap();

        assert!(session.is_closed());
        let err = session
            .with_conn(|conn| conn.execute_batch("SELECT 1;").map_err(DbError::from))
            .unwrap_err();
        assert!(matches!(err, DbError::SessionClosed));
    }

    #[test]
    fn outer_rollback_discards_released_nested_writes() {
        let session = Session::try_new(open_db_in_memory().unwrap()).unwrap();

        let result: Result<(), DbError> = session.in_transaction(|| {
            session.in_transaction::<(), DbError>(|| {
                session.with_conn(|conn| {
                    conn.execute(
                        "INSERT INTO customers (name, created_at, created_by) VALUES ('a', 1, 't');",
                        [],
                    )?;
                    Ok(())
                })
            })?;
            Err(DbError::SessionBusy)
        });
        assert!(result.is_err());

        let count: i64 = session
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM customers;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn failed_nested_call_rolls_back_only_its_own_writes() {
        let session = Session::try_new(open_db_in_memory().unwrap()).unwrap();
        let insert = |name: &str| {
            session.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO customers (name, created_at, created_by) VALUES (?1, 1, 't');",
                    [name],
                )
                .map_err(DbError::from)
            })
        };

        session
            .in_transaction::<(), DbError>(|| {
                insert("kept")?;
                let nested = session.in_transaction::<(), DbError>(|| {
                    insert("discarded")?;
                    Err(DbError::SessionBusy)
                });
                assert!(nested.is_err());
                insert("kept too")?;
                Ok(())
            })
            .unwrap();

        let names: Vec<String> = session
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT name FROM customers ORDER BY customer_id;")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok::<_, DbError>(names)
            })
            .unwrap();
        assert_eq!(names, vec!["kept".to_string(), "kept too".to_string()]);
    }
}
