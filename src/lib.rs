//! # nmbrs-db - Offline mirror of Nmbrs payroll data
//!
//! Pulls the debtor → company → employee hierarchy (plus debtor tags and
//! employee types) from the payroll provider and persists it into a local
//! relational store for offline querying.
//!
//! nmbrs-db provides:
//! - Typed rows for every mirrored entity
//! - A storage gateway owning the connection pool and schema
//! - A concurrent ingestion pipeline fanning debtors out over worker threads
//! - A facade combining both behind `initialize_basic` / `create_basic`

pub mod api;
pub mod config;
pub mod facade;
pub mod ingest;
pub mod model;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use api::{ApiError, InMemoryApi, NmbrsApi};
pub use facade::NmbrsDatabase;
pub use ingest::{IngestEvent, IngestReport, IngestionFailure, Pipeline, PipelineOptions};
pub use model::{Company, Debtor, Employee, EmployeeType, Tag, EMPLOYEE_TYPE_CODES};
pub use storage::{ConnectionStatus, Gateway, GatewayOptions, QueryRows, SqlValue, StoreStats};

/// Result type alias for nmbrs-db operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for nmbrs-db operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Database server error: {0}")]
    Server(#[from] sqlx::Error),

    #[error("Expected row is missing: {0}")]
    RowNotFound(String),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database has not been initialized or created yet")]
    NotInitialized,

    #[error(transparent)]
    Ingestion(#[from] IngestionFailure),
}
