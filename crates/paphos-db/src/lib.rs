pub mod migrations;
pub mod models;
pub mod policy;
pub mod queries;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

/// One storage transaction spanning a single logical operation.
///
/// Created by [`Database::unit_of_work`]. Every query that belongs to the
/// operation runs through it; the work is committed only when the closure
/// returns `Ok`, and rolled back otherwise.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl UnitOfWork<'_> {
    pub(crate) fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::init(conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    ///
    /// The connection lock is held for the whole closure, so partial writes of
    /// one operation are never observable by another.
    pub fn unit_of_work<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;
        let uow = UnitOfWork { tx };

        let value = f(&uow)?;

        uow.tx.commit().map_err(anyhow::Error::from)?;
        Ok(value)
    }
}

/// True when `err` was caused by a UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_of_work_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.unit_of_work(|uow| -> Result<()> {
            uow.conn().execute("CREATE TABLE t (v INTEGER)", [])?;
            uow.conn().execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .unit_of_work(|uow| -> Result<i64> {
                Ok(uow.conn().query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unit_of_work_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        db.unit_of_work(|uow| -> Result<()> {
            uow.conn().execute("CREATE TABLE t (v INTEGER)", [])?;
            Ok(())
        })
        .unwrap();

        let result = db.unit_of_work(|uow| -> Result<()> {
            uow.conn().execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(anyhow!("boom"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .unit_of_work(|uow| -> Result<i64> {
                Ok(uow.conn().query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn detects_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .unit_of_work(|uow| -> Result<()> {
                uow.conn().execute("CREATE TABLE t (v TEXT UNIQUE)", [])?;
                uow.conn().execute("INSERT INTO t (v) VALUES ('a')", [])?;
                uow.conn().execute("INSERT INTO t (v) VALUES ('a')", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow!("other")));
    }
}
