//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Single-active-suggestion simulation state machine."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use edc_model::{BaselineForecastPoint, SimulationResult, Suggestion};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use tracing::{debug, info, warn};

use crate::backend::SimulationBackend;

static STALE_RESPONSES_DISCARDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "edc_stale_simulation_responses_discarded_total",
        "Simulation responses discarded because a newer selection superseded them"
    )
    .expect("metric registration to succeed")
});

/// Correlation ticket for one in-flight simulation request.
///
/// Carries the epoch current at selection time; a response is only applied
/// when its ticket still matches the controller epoch, so the last
/// user-initiated selection always wins over a slower earlier request.
#[derive(Debug, Clone)]
pub struct SelectionTicket {
    epoch: u64,
    suggestion: Suggestion,
}

impl SelectionTicket {
    /// Suggestion this request was issued for.
    #[must_use]
    pub fn suggestion(&self) -> &Suggestion {
        &self.suggestion
    }
}

/// Outcome of resolving an in-flight simulation response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The result was applied; the suggestion is now active.
    Applied { savings: f64 },
    /// A newer selection superseded this request; nothing changed.
    Stale,
    /// The backend call failed; the controller stayed idle.
    Failed,
    /// The result was malformed or baseline-inconsistent; stayed idle.
    Inconsistent,
}

/// Outcome of a complete select call.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// Re-selecting the active suggestion cancelled it.
    ToggledOff,
    /// The simulation was applied with the given savings.
    Applied { savings: f64 },
    /// The request failed or produced an unusable result; still idle.
    Rejected,
}

/// Owner of the active-simulation slot.
///
/// States: idle (no active suggestion) or simulating exactly one. The slot
/// is transitioned only through [`SimulationController::begin_select`] /
/// [`SimulationController::resolve`] and the commit coordinator.
#[derive(Debug, Default)]
pub struct SimulationController {
    baseline: Vec<BaselineForecastPoint>,
    displayed: Vec<BaselineForecastPoint>,
    savings: f64,
    active: Option<Suggestion>,
    epoch: u64,
}

impl SimulationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the baseline forecast and revert any live simulation.
    pub fn set_baseline(&mut self, baseline: Vec<BaselineForecastPoint>) {
        self.baseline = baseline;
        self.reset_to_baseline();
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// The untouched "what would have happened with no action" series.
    #[must_use]
    pub fn baseline(&self) -> &[BaselineForecastPoint] {
        &self.baseline
    }

    /// The series currently shown: baseline when idle, modified forecast
    /// while simulating.
    #[must_use]
    pub fn displayed(&self) -> &[BaselineForecastPoint] {
        &self.displayed
    }

    /// Savings of the active simulation, zero when idle.
    #[must_use]
    pub fn savings(&self) -> f64 {
        self.savings
    }

    /// The active suggestion, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Suggestion> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Start a selection. Returns `None` when this was a toggle-off of the
    /// already-active suggestion; otherwise reverts the display to baseline,
    /// invalidates older in-flight requests, and returns the ticket the
    /// caller must pass back to [`resolve`](Self::resolve).
    pub fn begin_select(&mut self, suggestion: &Suggestion) -> Option<SelectionTicket> {
        self.epoch = self.epoch.wrapping_add(1);
        let toggling_off = self
            .active
            .as_ref()
            .is_some_and(|active| active.id == suggestion.id);
        self.reset_to_baseline();
        if toggling_off {
            info!(suggestion = %suggestion.id, "simulation toggled off");
            return None;
        }
        debug!(suggestion = %suggestion.id, epoch = self.epoch, "simulation requested");
        Some(SelectionTicket {
            epoch: self.epoch,
            suggestion: suggestion.clone(),
        })
    }

    /// Resolve an in-flight request. Stale, failed, and inconsistent
    /// responses all leave the controller idle on baseline.
    pub fn resolve(
        &mut self,
        ticket: SelectionTicket,
        result: anyhow::Result<SimulationResult>,
    ) -> ResolveOutcome {
        if ticket.epoch != self.epoch {
            STALE_RESPONSES_DISCARDED_TOTAL.inc();
            debug!(
                suggestion = %ticket.suggestion.id,
                "discarding superseded simulation response"
            );
            return ResolveOutcome::Stale;
        }

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                warn!(suggestion = %ticket.suggestion.id, error = %err, "simulation request failed");
                return ResolveOutcome::Failed;
            }
        };

        if let Err(reason) = self.check_consistency(&ticket, &result) {
            warn!(
                suggestion = %ticket.suggestion.id,
                reason,
                "rejecting baseline-inconsistent simulation result"
            );
            return ResolveOutcome::Inconsistent;
        }

        let savings = result.savings_amount;
        self.displayed = result.modified_forecast;
        self.savings = savings;
        self.active = Some(ticket.suggestion);
        info!(
            suggestion = %self.active.as_ref().map(|s| s.id.as_str()).unwrap_or_default(),
            savings,
            "simulation applied"
        );
        ResolveOutcome::Applied { savings }
    }

    /// Convenience wrapper: begin, call the backend, resolve.
    pub async fn select<B: SimulationBackend>(
        &mut self,
        suggestion: &Suggestion,
        backend: &B,
    ) -> SelectOutcome {
        let Some(ticket) = self.begin_select(suggestion) else {
            return SelectOutcome::ToggledOff;
        };
        let result = backend.simulate(&self.baseline, ticket.suggestion()).await;
        match self.resolve(ticket, result) {
            ResolveOutcome::Applied { savings } => SelectOutcome::Applied { savings },
            ResolveOutcome::Stale | ResolveOutcome::Failed | ResolveOutcome::Inconsistent => {
                SelectOutcome::Rejected
            }
        }
    }

    fn check_consistency(
        &self,
        ticket: &SelectionTicket,
        result: &SimulationResult,
    ) -> std::result::Result<(), &'static str> {
        if result.suggestion_id != ticket.suggestion.id {
            return Err("result is keyed to a different suggestion");
        }
        if result.modified_forecast.is_empty() {
            return Err("modified forecast is missing");
        }
        if result.modified_forecast.len() != self.baseline.len() {
            return Err("modified forecast has a different bucket count");
        }
        if result
            .modified_forecast
            .iter()
            .zip(&self.baseline)
            .any(|(modified, base)| modified.hour != base.hour)
        {
            return Err("modified forecast buckets are misordered");
        }
        if !result.savings_amount.is_finite() || result.savings_amount < 0.0 {
            return Err("savings amount is not a non-negative number");
        }
        Ok(())
    }

    pub(crate) fn reset_to_baseline(&mut self) {
        self.displayed = self.baseline.clone();
        self.savings = 0.0;
        self.active = None;
    }

    // Called by the commit coordinator after it has captured the record.
    pub(crate) fn finish_commit(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.reset_to_baseline();
    }
}
