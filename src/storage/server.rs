//! PostgreSQL and MySQL through `sqlx`
//!
//! The ingestion workers are plain threads, so every connection drives its
//! futures to completion on a runtime shared by the whole backend.

use std::sync::Arc;

use sqlx::AnyConnection;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Connection, Row};
use tokio::runtime::Runtime;

use super::backend::{OpenMode, StorageBackend};
use super::connection::{Param, QueryRows, SqlConnection, SqlValue};
use super::dialect::Dialect;
use super::url::DatabaseUrl;
use crate::{Error, Result};

pub struct ServerBackend {
    url: DatabaseUrl,
    runtime: Arc<Runtime>,
}

impl ServerBackend {
    pub fn new(url: DatabaseUrl) -> Result<Self> {
        if url.dialect() == Dialect::Sqlite {
            return Err(Error::UnsupportedDialect(format!("{} is not a server", url)));
        }
        sqlx::any::install_default_drivers();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("nmbrs-db-io")
            .enable_all()
            .build()?;
        Ok(Self {
            url,
            runtime: Arc::new(runtime),
        })
    }

    fn connect(&self, url: &str) -> Result<ServerConnection> {
        let conn = self.runtime.block_on(AnyConnection::connect(url))?;
        Ok(ServerConnection {
            conn,
            dialect: self.url.dialect(),
            runtime: Arc::clone(&self.runtime),
        })
    }
}

impl StorageBackend for ServerBackend {
    fn dialect(&self) -> Dialect {
        self.url.dialect()
    }

    /// Create the named database through the server's maintenance connection
    fn create_if_missing(&self) -> Result<()> {
        let name = self
            .url
            .database_name()
            .ok_or_else(|| Error::InvalidUrl(format!("{} (missing database name)", self.url)))?;
        let dialect = self.dialect();
        let mut admin = self.connect(&self.url.maintenance_url())?;

        match create_database_sql(dialect, name, &mut admin)? {
            Some(sql) => {
                admin.execute_batch(&sql)?;
                tracing::info!("Created {} database {}", dialect, name);
            }
            None => tracing::debug!("{} database {} already exists", dialect, name),
        }
        Ok(())
    }

    /// Server databases are never created on connect, whatever the mode
    fn open_connection(&self, _mode: OpenMode) -> Result<Box<dyn SqlConnection>> {
        Ok(Box::new(self.connect(&self.url.driver_url())?))
    }
}

/// Statement creating `name`, or `None` when it already exists
fn create_database_sql(
    dialect: Dialect,
    name: &str,
    admin: &mut dyn SqlConnection,
) -> Result<Option<String>> {
    let quoted = dialect.quote_identifier(name);
    match dialect {
        Dialect::Postgresql => {
            // No IF NOT EXISTS for databases; look it up first
            let found = admin
                .query_i64(
                    "SELECT COUNT(*) FROM pg_database WHERE datname = ?",
                    &[Param::from(name)],
                )?
                .unwrap_or(0);
            Ok((found == 0).then(|| format!("CREATE DATABASE {}", quoted)))
        }
        Dialect::Mysql => Ok(Some(format!("CREATE DATABASE IF NOT EXISTS {}", quoted))),
        Dialect::Sqlite => Err(Error::UnsupportedDialect(name.to_string())),
    }
}

/// One server connection plus the runtime that drives it
pub struct ServerConnection {
    // Dropped before the runtime handle
    conn: AnyConnection,
    dialect: Dialect,
    runtime: Arc<Runtime>,
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Param<'q>],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match *param {
            Param::Int(value) => query.bind(value),
            Param::Text(value) => query.bind(value),
        };
    }
    query
}

/// Decode one cell without knowing its column type up front
fn decode_cell(row: &AnyRow, index: usize) -> SqlValue {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Integer);
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return value.map_or(SqlValue::Null, |v| SqlValue::Integer(i64::from(v)));
    }
    if let Ok(value) = row.try_get::<Option<i16>, _>(index) {
        return value.map_or(SqlValue::Null, |v| SqlValue::Integer(i64::from(v)));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map_or(SqlValue::Null, |v| SqlValue::Integer(i64::from(v)));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Real);
    }
    if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
        return value.map_or(SqlValue::Null, |v| SqlValue::Real(f64::from(v)));
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Text);
    }
    match row.try_get::<Option<Vec<u8>>, _>(index) {
        Ok(value) => value.map_or(SqlValue::Null, SqlValue::Blob),
        Err(_) => SqlValue::Null,
    }
}

impl SqlConnection for ServerConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn ping(&mut self) -> Result<()> {
        self.runtime.block_on(self.conn.ping())?;
        Ok(())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.runtime.block_on(sqlx::raw_sql(sql).execute(&mut self.conn))?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64> {
        let sql = self.dialect.bind_markers(sql);
        let query = bind_all(sqlx::query(&sql), params);
        let done = self.runtime.block_on(query.execute(&mut self.conn))?;
        Ok(done.rows_affected())
    }

    fn query_i64(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<i64>> {
        let sql = self.dialect.bind_markers(sql);
        let query = bind_all(sqlx::query(&sql), params);
        let row = self.runtime.block_on(query.fetch_optional(&mut self.conn))?;
        match row {
            Some(row) => Ok(Some(row.try_get::<i64, _>(0)?)),
            None => Ok(None),
        }
    }

    fn query_rows(&mut self, sql: &str) -> Result<QueryRows> {
        let rows = self.runtime.block_on(sqlx::raw_sql(sql).fetch_all(&mut self.conn))?;
        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| decode_cell(row, i)).collect())
            .collect();
        Ok(QueryRows { columns, rows })
    }
}
