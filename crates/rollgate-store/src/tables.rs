//! redb table definitions for the Rollgate job store.
//!
//! A single table maps job id (`&str`, uuid v4) to the JSON-serialized
//! `JobRecord`.

use redb::TableDefinition;

/// Job records keyed by `{job_id}`.
pub const JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");
