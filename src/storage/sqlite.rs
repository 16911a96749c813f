//! File-backed SQLite

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, ToSql};

use super::backend::{OpenMode, StorageBackend};
use super::connection::{Param, QueryRows, SqlConnection, SqlValue};
use super::dialect::Dialect;
use crate::Result;

pub struct SqliteBackend {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    fn flags(mode: OpenMode) -> OpenFlags {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match mode {
            OpenMode::Create => flags | OpenFlags::SQLITE_OPEN_CREATE,
            OpenMode::Existing => flags,
        }
    }
}

impl StorageBackend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn create_if_missing(&self) -> Result<()> {
        // The file itself appears on first open; only the directory can be missing
        crate::config::ensure_db_dir(&self.path)?;
        Ok(())
    }

    fn open_connection(&self, mode: OpenMode) -> Result<Box<dyn SqlConnection>> {
        let conn = Connection::open_with_flags(&self.path, Self::flags(mode))?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        // Readers keep working while a worker holds the write lock
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

pub struct SqliteConnection {
    conn: Connection,
}

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Int(value) => value.to_sql(),
            Param::Text(value) => value.to_sql(),
        }
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl SqlConnection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn ping(&mut self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let changed = stmt.execute(params_from_iter(params))?;
        Ok(changed as u64)
    }

    fn query_i64(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let value = stmt
            .query_row(params_from_iter(params), |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn query_rows(&mut self, sql: &str) -> Result<QueryRows> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(SqlValue::from(row.get_ref(i)?));
            }
            out.push(values);
        }

        Ok(QueryRows { columns, rows: out })
    }
}
