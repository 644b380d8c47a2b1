//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Backend collaborator traits for the workflow."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use async_trait::async_trait;
use edc_model::{BaselineForecastPoint, CommitRecord, SimulationResult, Suggestion};

/// Supplies the suggestion catalog for a session.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_suggestions(&self) -> anyhow::Result<Vec<Suggestion>>;
}

/// Supplies the baseline forecast, the source of truth for "no action".
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_baseline(&self) -> anyhow::Result<Vec<BaselineForecastPoint>>;
}

/// Computes the effect of applying one suggestion to the baseline.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    async fn simulate(
        &self,
        baseline: &[BaselineForecastPoint],
        suggestion: &Suggestion,
    ) -> anyhow::Result<SimulationResult>;
}

/// Durable-actions collaborator receiving committed records.
#[async_trait]
pub trait CommitSink: Send + Sync {
    async fn submit(&self, record: &CommitRecord) -> anyhow::Result<()>;
}
