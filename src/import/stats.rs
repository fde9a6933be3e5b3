//! Import statistics tracking.
//!
//! Counts records attempted, created and rejected by the catalog service.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Serialize;

/// Statistics for a batch or a whole import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ImportStats {
    /// Number of records sent to the catalog service
    pub attempted: usize,
    /// Number of records the service accepted
    pub imported: usize,
    /// Number of records whose create call failed
    pub failed: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    ///
    /// Used to fold per-batch statistics into the run total.
    pub fn merge(&mut self, other: ImportStats) {
        self.attempted += other.attempted;
        self.imported += other.imported;
        self.failed += other.failed;
    }
}
