//! Storage backends
//!
//! A backend knows how to make its database exist and how to open
//! connections to it. The backend is selected by the scheme of the
//! connection string; pooling is the same for every engine.

use std::sync::Arc;
use std::time::Duration;

use super::connection::SqlConnection;
use super::dialect::Dialect;
use super::server::ServerBackend;
use super::sqlite::SqliteBackend;
use super::url::DatabaseUrl;
use crate::{Error, Result};

/// Whether opening a connection may create the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the database if it does not exist
    Create,
    /// Fail if the database does not exist yet
    Existing,
}

/// Capability set every storage engine has to provide
pub trait StorageBackend: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Make sure the named database exists (no-op when it does)
    fn create_if_missing(&self) -> Result<()>;

    /// Open a bare, unpooled connection
    fn open_connection(&self, mode: OpenMode) -> Result<Box<dyn SqlConnection>>;
}

/// Pick the backend for a connection string
pub fn backend_for(url: &DatabaseUrl, busy_timeout: Duration) -> Result<Arc<dyn StorageBackend>> {
    match url.dialect() {
        Dialect::Sqlite => {
            let path = url
                .sqlite_path()
                .ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
            Ok(Arc::new(SqliteBackend::new(path, busy_timeout)))
        }
        Dialect::Postgresql | Dialect::Mysql => Ok(Arc::new(ServerBackend::new(url.clone())?)),
    }
}

/// `r2d2` manager handing out backend connections
pub struct BackendManager {
    backend: Arc<dyn StorageBackend>,
    mode: OpenMode,
}

impl BackendManager {
    pub fn new(backend: Arc<dyn StorageBackend>, mode: OpenMode) -> Self {
        Self { backend, mode }
    }
}

impl r2d2::ManageConnection for BackendManager {
    type Connection = Box<dyn SqlConnection>;
    type Error = Error;

    fn connect(&self) -> Result<Self::Connection> {
        self.backend.open_connection(self.mode)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<()> {
        conn.ping()
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Connection pool shared by all ingestion workers
pub type StorePool = r2d2::Pool<BackendManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_follows_url_scheme() {
        let timeout = Duration::from_secs(1);
        let sqlite = DatabaseUrl::parse("sqlite:///nmbrs.db").unwrap();
        assert_eq!(backend_for(&sqlite, timeout).unwrap().dialect(), Dialect::Sqlite);

        let pg = DatabaseUrl::parse("postgresql+psycopg2://u:p@localhost/nmbrs").unwrap();
        assert_eq!(backend_for(&pg, timeout).unwrap().dialect(), Dialect::Postgresql);

        let my = DatabaseUrl::parse("mysql://root@localhost/nmbrs").unwrap();
        assert_eq!(backend_for(&my, timeout).unwrap().dialect(), Dialect::Mysql);
    }

    #[test]
    fn test_pool_checks_out_pinged_connections() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> =
            Arc::new(SqliteBackend::new(dir.path().join("pool.db"), Duration::from_secs(1)));
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .build(BackendManager::new(backend, OpenMode::Create))
            .unwrap();

        let mut conn = pool.get().unwrap();
        assert_eq!(conn.dialect(), Dialect::Sqlite);
        assert_eq!(conn.query_i64("SELECT 40 + 2", &[]).unwrap(), Some(42));
    }
}
