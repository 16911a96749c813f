//! Storage Layer - relational mirror of the payroll hierarchy
//!
//! Tables:
//! - debtors(id, name, number)
//! - tags(id, number, hex_color, label), unique on the triple
//! - debtors_tags_association(debtor_id, tag_id)
//! - companies(id, debtor_id, number, name, contact and filing columns)
//! - employee_types(id, description)
//! - employees(id, company_id, type_id, number, name)
//!
//! SQLite files go through `rusqlite`; PostgreSQL and MySQL servers go
//! through `sqlx`. Both sit behind [`SqlConnection`] and share one pool type.

pub mod backend;
pub mod connection;
pub mod dialect;
pub mod gateway;
pub mod schema;
pub mod server;
pub mod session;
pub mod sqlite;
pub mod tables;
pub mod url;

pub use backend::{backend_for, BackendManager, OpenMode, StorageBackend, StorePool};
pub use connection::{Param, QueryRows, SqlConnection, SqlValue};
pub use dialect::Dialect;
pub use gateway::{ConnectionStatus, Gateway, GatewayOptions, StoreStats};
pub use server::ServerBackend;
pub use session::{session_scope, Session};
pub use sqlite::SqliteBackend;
pub use url::DatabaseUrl;
