//! Persistence port for named runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DcaBenchError;
use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategySpec;

/// A run as stored: its label, parameters and full result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRun {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub saved_at: DateTime<Utc>,
    pub spec: StrategySpec,
    pub result: StrategyResult,
}

/// Listing row, without the series payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRunSummary {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub strategy: String,
    pub saved_at: DateTime<Utc>,
    pub total_return: f64,
}

pub trait RunStorePort {
    /// Persist a run and return its id.
    fn save(
        &self,
        name: &str,
        symbol: &str,
        spec: &StrategySpec,
        result: &StrategyResult,
    ) -> Result<i64, DcaBenchError>;

    /// Most recent first.
    fn list(&self) -> Result<Vec<SavedRunSummary>, DcaBenchError>;

    fn get(&self, id: i64) -> Result<Option<SavedRun>, DcaBenchError>;

    /// Returns whether a run was removed.
    fn delete(&self, id: i64) -> Result<bool, DcaBenchError>;
}
