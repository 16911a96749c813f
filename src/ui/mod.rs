//! Terminal rendering for the CLI

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{connection_status, header, info, ingest_summary, success, timing};
pub use progress::{IngestProgress, ProgressTally};
pub use table::{query_table, stats_table};
pub use theme::{theme, Theme};
