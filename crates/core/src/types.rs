use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Segregation groups are identified by their code (e.g. `SGG1a`).
pub type GroupCode = String;

/// UN numbers are stored in their canonical `UN####` form.
pub type UnNumber = String;

/// What an idempotent upsert did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}
