//! Snapshots
//!
//! - **query**: live or historical reserve query for a list
//! - **view**: fetch and render snapshots
//! - **export**: the two-table CSV download

mod export;
mod query;
mod view;

pub use export::{export_csv, file_name, snapshot_date, write_csv};
pub use query::{DateFormat, DatePolicy, MaxDate, QueryOutcome, QueryTrigger};
pub use view::{list_snapshots, load_snapshot, render_snapshot};
