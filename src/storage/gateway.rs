//! Storage gateway: connection pool, schema migration and raw queries

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::backend::{backend_for, BackendManager, OpenMode, StorageBackend, StorePool};
use super::connection::{QueryRows, SqlConnection};
use super::dialect::Dialect;
use super::schema;
use super::session::Session;
use super::url::DatabaseUrl;
use crate::Result;

/// Pool and connection tuning
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Maximum pooled connections
    pub pool_size: u32,
    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
    /// How long a worker waits for a free pooled connection
    pub connection_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            pool_size: u32::try_from(workers + 1).unwrap_or(u32::MAX),
            busy_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a connectivity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Unreachable(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "Database connected successfully"),
            ConnectionStatus::Unreachable(reason) => {
                write!(f, "Database does not exist or could not be connected to: {}", reason)
            }
        }
    }
}

/// Owns the backend, the schema and the shared connection pool
pub struct Gateway {
    url: DatabaseUrl,
    backend: Arc<dyn StorageBackend>,
    pool: StorePool,
}

impl Gateway {
    /// Open a store for writing, creating database and tables as needed.
    ///
    /// With `delete` set every known table is dropped first. Fails if the
    /// URL is malformed or the store cannot be opened.
    pub fn open(url: &str, delete: bool, options: &GatewayOptions) -> Result<Self> {
        let url = DatabaseUrl::parse(url)?;
        let backend = backend_for(&url, options.busy_timeout)?;

        backend.create_if_missing()?;
        let mut conn = backend.open_connection(OpenMode::Create)?;
        if delete {
            tracing::info!("Dropping existing tables in {}", url);
            drop_tables(conn.as_mut())?;
        }
        create_tables(conn.as_mut(), url.dialect())?;
        drop(conn);

        let pool = r2d2::Pool::builder()
            .max_size(options.pool_size.max(1))
            .connection_timeout(options.connection_timeout)
            .build(BackendManager::new(Arc::clone(&backend), OpenMode::Create))?;

        tracing::debug!("Opened {} with a pool of {}", url, options.pool_size.max(1));
        Ok(Self { url, backend, pool })
    }

    /// Attach to an existing store without touching its schema.
    ///
    /// Connections are opened lazily, so an unreachable store surfaces on
    /// first use (see [`Gateway::initialize`]).
    pub fn connect_existing(url: &str, options: &GatewayOptions) -> Result<Self> {
        let url = DatabaseUrl::parse(url)?;
        let backend = backend_for(&url, options.busy_timeout)?;
        let pool = r2d2::Pool::builder()
            .max_size(options.pool_size.max(1))
            .min_idle(Some(0))
            .connection_timeout(options.connection_timeout)
            .build_unchecked(BackendManager::new(Arc::clone(&backend), OpenMode::Existing));
        Ok(Self { url, backend, pool })
    }

    /// Ping the store. Never fails; the outcome is reported and logged.
    pub fn initialize(&self) -> ConnectionStatus {
        let ping = self.bare_connection().and_then(|mut conn| conn.ping());
        match ping {
            Ok(()) => {
                tracing::info!("Database {} connected successfully", self.url);
                ConnectionStatus::Connected
            }
            Err(e) => {
                tracing::warn!("Database {} could not be connected to: {}", self.url, e);
                ConnectionStatus::Unreachable(e.to_string())
            }
        }
    }

    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    pub fn pool(&self) -> &StorePool {
        &self.pool
    }

    /// Check a session out of the shared pool
    pub fn session(&self) -> Result<Session> {
        Session::new(&self.pool)
    }

    fn bare_connection(&self) -> Result<Box<dyn SqlConnection>> {
        self.backend.open_connection(OpenMode::Existing)
    }

    /// Execute literal SQL on a bare connection and return every row.
    ///
    /// No parameter binding happens here; callers must only pass SQL they
    /// trust.
    pub fn query(&self, sql: &str) -> Result<QueryRows> {
        self.bare_connection()?.query_rows(sql)
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<StoreStats> {
        let mut conn = self.bare_connection()?;
        let mut count = |table: &str| -> Result<usize> {
            let n = conn.query_i64(&format!("SELECT COUNT(*) FROM {}", table), &[])?;
            Ok(n.unwrap_or(0) as usize)
        };
        Ok(StoreStats {
            debtors: count("debtors")?,
            tags: count("tags")?,
            debtor_tags: count("debtors_tags_association")?,
            companies: count("companies")?,
            employee_types: count("employee_types")?,
            employees: count("employees")?,
        })
    }
}

fn create_tables(conn: &mut dyn SqlConnection, dialect: Dialect) -> Result<()> {
    for stmt in schema::create_statements(dialect) {
        conn.execute_batch(&stmt)?;
    }
    Ok(())
}

fn drop_tables(conn: &mut dyn SqlConnection) -> Result<()> {
    for stmt in schema::drop_statements() {
        conn.execute_batch(&stmt)?;
    }
    Ok(())
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub debtors: usize,
    pub tags: usize,
    pub debtor_tags: usize,
    pub companies: usize,
    pub employee_types: usize,
    pub employees: usize,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Debtors: {}", self.debtors)?;
        writeln!(f, "  Tags: {} ({} links)", self.tags, self.debtor_tags)?;
        writeln!(f, "  Companies: {}", self.companies)?;
        writeln!(f, "  Employee types: {}", self.employee_types)?;
        writeln!(f, "  Employees: {}", self.employees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqlValue;
    use crate::Error;

    fn url_in(dir: &tempfile::TempDir, name: &str) -> String {
        DatabaseUrl::sqlite(&dir.path().join(name)).as_str().to_string()
    }

    #[test]
    fn test_open_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Gateway::open(&url_in(&dir, "a.db"), false, &GatewayOptions::default()).unwrap();

        let tables = gateway
            .query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names: Vec<String> = tables.rows.iter().map(|r| r[0].to_string()).collect();
        for table in schema::TABLES {
            assert!(names.contains(&table.to_string()), "missing {}", table);
        }
        assert_eq!(gateway.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn test_open_is_idempotent_and_delete_drops_rows() {
        let dir = tempfile::tempdir().unwrap();
        let url = url_in(&dir, "b.db");
        let options = GatewayOptions::default();

        let gateway = Gateway::open(&url, false, &options).unwrap();
        gateway
            .query("INSERT INTO debtors (id, name) VALUES (1, 'Debtor 1')")
            .unwrap();
        drop(gateway);

        let reopened = Gateway::open(&url, false, &options).unwrap();
        assert_eq!(reopened.stats().unwrap().debtors, 1);
        drop(reopened);

        let wiped = Gateway::open(&url, true, &options).unwrap();
        assert_eq!(wiped.stats().unwrap().debtors, 0);
    }

    #[test]
    fn test_query_returns_typed_cells() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Gateway::open(&url_in(&dir, "c.db"), false, &GatewayOptions::default()).unwrap();

        let rows = gateway
            .query("SELECT 1 AS one, 2.5 AS half, 'x' AS txt, NULL AS \"nothing\"")
            .unwrap();
        assert_eq!(rows.columns, vec!["one", "half", "txt", "nothing"]);
        assert_eq!(
            rows.rows,
            vec![vec![
                SqlValue::Integer(1),
                SqlValue::Real(2.5),
                SqlValue::Text("x".to_string()),
                SqlValue::Null,
            ]]
        );
    }

    #[test]
    fn test_query_propagates_engine_errors() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Gateway::open(&url_in(&dir, "d.db"), false, &GatewayOptions::default()).unwrap();

        let err = gateway.query("SELECT * FROM no_such_table").unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_open_rejects_bad_urls() {
        let options = GatewayOptions::default();
        assert!(matches!(
            Gateway::open("not a url", false, &options),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Gateway::open("oracle://scott@localhost/nmbrs", false, &options),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_server_urls_reach_for_the_server() {
        // Nothing listens on the discard port
        let options = GatewayOptions {
            connection_timeout: Duration::from_secs(1),
            ..GatewayOptions::default()
        };
        for url in [
            "postgresql://nmbrs@127.0.0.1:9/payroll",
            "mysql+pymysql://root@127.0.0.1:9/payroll",
        ] {
            assert!(matches!(
                Gateway::open(url, false, &options),
                Err(Error::Server(_))
            ));
            let lazy = Gateway::connect_existing(url, &options).unwrap();
            assert!(lazy.url().dialect() != Dialect::Sqlite);
            assert!(!lazy.initialize().is_connected());
        }
    }

    #[test]
    fn test_initialize_reports_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let options = GatewayOptions::default();

        let url = url_in(&dir, "e.db");
        Gateway::open(&url, false, &options).unwrap();
        let existing = Gateway::connect_existing(&url, &options).unwrap();
        assert_eq!(existing.initialize(), ConnectionStatus::Connected);

        let missing = Gateway::connect_existing(&url_in(&dir, "missing.db"), &options).unwrap();
        let status = missing.initialize();
        assert!(!status.is_connected());
        assert!(!dir.path().join("missing.db").exists());
    }
}
