//! Scoped storage sessions
//!
//! A [`Session`] owns one pooled connection for its lifetime. Writes open a
//! transaction on demand; [`Session::commit`] ends it. Dropping a session
//! rolls back whatever is still open and hands the connection back to the
//! pool, so every exit path (success, error, panic) cleans up.

use r2d2::PooledConnection;

use super::backend::{BackendManager, StorePool};
use super::connection::SqlConnection;
use super::dialect::Dialect;
use crate::Result;

pub struct Session {
    conn: PooledConnection<BackendManager>,
    in_transaction: bool,
}

impl Session {
    /// Check a connection out of the pool
    pub fn new(pool: &StorePool) -> Result<Self> {
        Ok(Self {
            conn: pool.get()?,
            in_transaction: false,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    /// Connection for reads; does not open a transaction
    pub fn connection(&mut self) -> &mut dyn SqlConnection {
        &mut **self.conn
    }

    /// Connection for writes, inside the session's open transaction
    pub(crate) fn writer(&mut self) -> Result<&mut dyn SqlConnection> {
        if !self.in_transaction {
            let begin = self.conn.dialect().begin_write();
            self.conn.execute_batch(begin)?;
            self.in_transaction = true;
        }
        Ok(&mut **self.conn)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Commit pending writes (no-op when nothing was written)
    pub fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Discard pending writes
    pub fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.rollback() {
            tracing::warn!("Failed to roll back abandoned session: {}", e);
        }
    }
}

/// Run `f` inside a fresh session.
///
/// On `Err` the open transaction is rolled back before the error is
/// returned. The connection is released on every path.
pub fn session_scope<T, F>(pool: &StorePool, f: F) -> Result<T>
where
    F: FnOnce(&mut Session) -> Result<T>,
{
    let mut session = Session::new(pool)?;
    match f(&mut session) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::debug!("Rolling back session: {}", e);
            if let Err(rollback_err) = session.rollback() {
                tracing::warn!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}
