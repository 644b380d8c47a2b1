//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Commit coordination for accepted simulations."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use edc_model::CommitRecord;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use tracing::{info, warn};

use crate::backend::CommitSink;
use crate::controller::SimulationController;
use crate::errors::{Result, SimError};

static COMMITS_UNACKNOWLEDGED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "edc_commits_unacknowledged_total",
        "Action commits whose remote acknowledgment failed"
    )
    .expect("metric registration to succeed")
});

/// What happened to a committed action.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The durable-actions collaborator acknowledged the record.
    Acknowledged(CommitRecord),
    /// The record was sent but not acknowledged. Local state is already
    /// reset; the user must re-select and re-simulate to retry.
    Unacknowledged { record: CommitRecord, error: String },
}

/// Finalizes an active simulation into a durable action record.
///
/// The controller's active-simulation slot is owned by the controller; this
/// coordinator only transitions it through the defined commit operation.
#[derive(Debug, Default)]
pub struct CommitCoordinator;

impl CommitCoordinator {
    /// Capture the active simulation as a durable record and reset the
    /// controller to idle, synchronously.
    ///
    /// Valid only while a suggestion is active. The reset happens here,
    /// before anything is sent — the optimistic local reset — so callers may
    /// submit the record from a separate task without holding the controller.
    pub fn begin(controller: &mut SimulationController) -> Result<CommitRecord> {
        let Some(active) = controller.active() else {
            return Err(SimError::NotSimulating);
        };
        let record = CommitRecord {
            action_title: active.title.clone(),
            savings_inr: controller.savings(),
        };
        controller.finish_commit();
        Ok(record)
    }

    /// Fold the remote acknowledgment into the final outcome.
    pub fn finish(record: CommitRecord, submitted: anyhow::Result<()>) -> CommitOutcome {
        match submitted {
            Ok(()) => {
                info!(action = %record.action_title, savings = record.savings_inr, "action committed");
                CommitOutcome::Acknowledged(record)
            }
            Err(err) => {
                COMMITS_UNACKNOWLEDGED_TOTAL.inc();
                warn!(action = %record.action_title, error = %err, "commit not acknowledged");
                CommitOutcome::Unacknowledged {
                    record,
                    error: err.to_string(),
                }
            }
        }
    }

    /// Commit the active simulation: begin, submit, finish.
    pub async fn commit<S: CommitSink>(
        controller: &mut SimulationController,
        sink: &S,
    ) -> Result<CommitOutcome> {
        let record = Self::begin(controller)?;
        let submitted = sink.submit(&record).await;
        Ok(Self::finish(record, submitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use edc_model::{BaselineForecastPoint, Severity, SimulationResult, Suggestion};

    struct Sink {
        fail: bool,
    }

    #[async_trait]
    impl CommitSink for Sink {
        async fn submit(&self, _record: &CommitRecord) -> anyhow::Result<()> {
            if self.fail {
                Err(anyhow!("backend rejected commit"))
            } else {
                Ok(())
            }
        }
    }

    fn simulating_controller() -> SimulationController {
        let mut controller = SimulationController::new();
        let baseline = vec![BaselineForecastPoint {
            hour: "00:00".into(),
            load_kw: 2.0,
        }];
        controller.set_baseline(baseline.clone());
        let suggestion = Suggestion {
            id: "a".into(),
            title: "Shift laundry".into(),
            message: String::new(),
            severity: Severity::Low,
            affected_appliance: "Washing Machine".into(),
        };
        let ticket = controller.begin_select(&suggestion).unwrap();
        controller.resolve(
            ticket,
            Ok(SimulationResult {
                suggestion_id: "a".into(),
                modified_forecast: vec![BaselineForecastPoint {
                    hour: "00:00".into(),
                    load_kw: 1.5,
                }],
                savings_amount: 42.5,
            }),
        );
        assert!(!controller.is_idle());
        controller
    }

    #[tokio::test]
    async fn commit_resets_state_on_success() {
        let mut controller = simulating_controller();
        let outcome = CommitCoordinator::commit(&mut controller, &Sink { fail: false })
            .await
            .unwrap();
        let CommitOutcome::Acknowledged(record) = outcome else {
            panic!("expected acknowledgment");
        };
        assert_eq!(record.action_title, "Shift laundry");
        assert_eq!(record.savings_inr, 42.5);
        assert!(controller.is_idle());
        assert_eq!(controller.savings(), 0.0);
        assert_eq!(controller.displayed(), controller.baseline());
    }

    #[tokio::test]
    async fn commit_resets_state_even_when_unacknowledged() {
        let mut controller = simulating_controller();
        let outcome = CommitCoordinator::commit(&mut controller, &Sink { fail: true })
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Unacknowledged { .. }));
        assert!(controller.is_idle());
        assert_eq!(controller.savings(), 0.0);
        assert_eq!(controller.displayed(), controller.baseline());
    }

    #[test]
    fn begin_resets_the_controller_before_any_submission() {
        let mut controller = simulating_controller();
        let record = CommitCoordinator::begin(&mut controller).unwrap();
        // The reset is synchronous; nothing has been sent yet.
        assert!(controller.is_idle());
        assert_eq!(controller.savings(), 0.0);
        assert_eq!(controller.displayed(), controller.baseline());
        assert_eq!(record.action_title, "Shift laundry");
        assert_eq!(record.savings_inr, 42.5);

        let outcome = CommitCoordinator::finish(record.clone(), Err(anyhow!("socket hang up")));
        assert_eq!(
            outcome,
            CommitOutcome::Unacknowledged {
                record,
                error: "socket hang up".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn commit_while_idle_is_an_error() {
        let mut controller = SimulationController::new();
        let err = CommitCoordinator::commit(&mut controller, &Sink { fail: false })
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::NotSimulating));
    }
}
