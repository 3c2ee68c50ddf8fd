//! Once command handler
//!
//! Executes a single poll cycle and prints its report as JSON.

use jiff::Timestamp;

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::{CycleOutcome, CycleReport};
use crate::state::AppState;

pub struct OnceCommandHandler {
    config: Settings,
}

impl OnceCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs one cycle. A failed or timed out cycle is returned as an error
    /// after the report is printed.
    pub async fn execute(self) -> AppResult<()> {
        let state = AppState::from_settings(self.config).await?;
        let poller = state.poller();

        let report = poller.tick(Timestamp::now()).await;

        let rendered = serde_json::to_string_pretty(&report).map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        println!("{}", rendered);

        cycle_result(&report)
    }
}

fn cycle_result(report: &CycleReport) -> AppResult<()> {
    match &report.outcome {
        CycleOutcome::Failed(error) => Err(AppError::Internal {
            source: anyhow::anyhow!("Poll cycle {} failed: {}", report.cycle, error),
        }),
        CycleOutcome::TimedOut => Err(AppError::Internal {
            source: anyhow::anyhow!("Poll cycle {} timed out", report.cycle),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: CycleOutcome) -> CycleReport {
        CycleReport::new(1, outcome)
    }

    #[test]
    fn test_completed_and_empty_cycles_succeed() {
        assert!(cycle_result(&report(CycleOutcome::Completed)).is_ok());
        assert!(cycle_result(&report(CycleOutcome::EmptyFetch)).is_ok());
    }

    #[test]
    fn test_failed_cycle_is_an_error() {
        let result = cycle_result(&report(CycleOutcome::Failed("store down".to_string())));
        assert!(format!("{:?}", result.unwrap_err()).contains("store down"));

        let result = cycle_result(&report(CycleOutcome::TimedOut));
        assert!(format!("{:?}", result.unwrap_err()).contains("timed out"));
    }
}
