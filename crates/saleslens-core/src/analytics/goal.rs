//! Average ticket goal
//!
//! Goals are read and written straight through to the store, never cached,
//! so an update is visible on the very next read.

use std::sync::Arc;

use tracing::info;

use super::models::AverageTicketGoal;
use crate::error::{LensError, Result};
use crate::metrics;
use crate::query::GoalStore;

/// Name of the goal row holding the average ticket target
pub const AVERAGE_TICKET_GOAL: &str = "average_ticket_goal";

/// Reads and updates the average ticket goal
#[derive(Clone)]
pub struct GoalService {
    store: Arc<dyn GoalStore>,
}

impl GoalService {
    /// Create a service over `store`
    pub fn new(store: Arc<dyn GoalStore>) -> Self {
        Self { store }
    }

    /// Current goal; 0.0 when none has been set
    pub fn average_ticket_goal(&self) -> Result<AverageTicketGoal> {
        let goal_value = self.store.read_goal(AVERAGE_TICKET_GOAL)?.unwrap_or(0.0);
        Ok(AverageTicketGoal { goal_value })
    }

    /// Replace the goal and commit immediately
    pub fn update_average_ticket_goal(&self, goal_value: f64) -> Result<AverageTicketGoal> {
        validate_goal(goal_value)?;
        self.store.update_goal(AVERAGE_TICKET_GOAL, goal_value)?;
        self.store.commit()?;

        metrics::record_goal_update();
        info!(goal = AVERAGE_TICKET_GOAL, goal_value, "goal updated");
        Ok(AverageTicketGoal { goal_value })
    }
}

impl std::fmt::Debug for GoalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalService").finish_non_exhaustive()
    }
}

/// Goals must be finite and non-negative
pub fn validate_goal(goal_value: f64) -> Result<()> {
    if !goal_value.is_finite() || goal_value < 0.0 {
        return Err(LensError::validation(format!(
            "goal value must be a finite, non-negative number, got {goal_value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Dataset, MemoryExecutor};

    #[test]
    fn test_missing_goal_reads_zero() {
        let service = GoalService::new(Arc::new(MemoryExecutor::new(Dataset::default())));
        assert_eq!(service.average_ticket_goal().unwrap().goal_value, 0.0);
    }

    #[test]
    fn test_update_is_committed() {
        let store = Arc::new(MemoryExecutor::new(Dataset::default()));
        let service = GoalService::new(store.clone());

        service.update_average_ticket_goal(72.5).unwrap();
        assert_eq!(service.average_ticket_goal().unwrap().goal_value, 72.5);
        assert_eq!(store.snapshot().goals[0].goal_value, 72.5);
    }

    #[test]
    fn test_invalid_goal_rejected() {
        let service = GoalService::new(Arc::new(MemoryExecutor::new(Dataset::default())));
        assert!(service.update_average_ticket_goal(-1.0).unwrap_err().is_validation());
        assert!(service.update_average_ticket_goal(f64::NAN).unwrap_err().is_validation());
        assert!(service.update_average_ticket_goal(f64::INFINITY).is_err());
        assert_eq!(service.average_ticket_goal().unwrap().goal_value, 0.0);
    }
}
