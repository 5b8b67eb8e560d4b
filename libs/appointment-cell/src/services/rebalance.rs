// libs/appointment-cell/src/services/rebalance.rs
use tracing::info;

use crate::models::{RebalanceOutcome, SchedulingError};

/// Trigger point for a system-wide reallocation pass (for example after a
/// doctor cancels a day). No reallocation strategy exists yet, so a trigger
/// is acknowledged and nothing moves.
#[derive(Debug, Default)]
pub struct RebalanceService;

impl RebalanceService {
    pub fn new() -> Self {
        Self
    }

    pub async fn rebalance(&self) -> Result<RebalanceOutcome, SchedulingError> {
        info!("Rebalance requested; no reallocation strategy configured");
        Ok(RebalanceOutcome::ok())
    }
}
