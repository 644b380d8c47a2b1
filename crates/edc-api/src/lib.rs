//! ---
//! edc_section: "05-backend-api"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Typed request/response client for the backend."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
pub mod errors;

use async_trait::async_trait;
use edc_config::BackendConfig;
use edc_model::{
    BaselineForecastPoint, BudgetPlan, ChatReply, CommitRecord, HistoryPeriod, HistorySeries,
    LeaderboardEntry, SimulationResult, SolarPotential, Suggestion, UserGoals,
};
use edc_sim::{CatalogSource, CommitSink, ForecastSource, SimulationBackend};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub use errors::{ApiError, Result};

/// HTTP client for every request/response endpoint of the backend.
///
/// One shared `reqwest` client carries the configured per-request timeout;
/// a timeout is a plain transport failure, never a hang.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    tariff_inr_per_kwh: f64,
}

#[derive(Serialize)]
struct SimulateRow<'a> {
    hour: &'a str,
    load_kw: f64,
    cost: f64,
}

#[derive(Serialize)]
struct SimulateRequest<'a> {
    baseline_forecast: Vec<SimulateRow<'a>>,
    suggestion_id: &'a str,
    affected_appliance: &'a str,
}

#[derive(Deserialize)]
struct SavingsSummary {
    total_savings_amount: f64,
}

#[derive(Deserialize)]
struct SimulateResponse {
    #[serde(default)]
    modified_forecast: Option<Vec<BaselineForecastPoint>>,
    #[serde(default)]
    savings_summary: Option<SavingsSummary>,
}

impl BackendClient {
    /// Build a client from backend settings.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|source| ApiError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            tariff_inr_per_kwh: config.tariff_inr_per_kwh,
        })
    }

    fn endpoint(&self, path: &'static str) -> Result<Url> {
        self.base.join(path).map_err(|source| ApiError::InvalidBaseUrl {
            url: format!("{}{path}", self.base),
            source,
        })
    }

    async fn get_value(&self, path: &'static str) -> Result<Value> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: path,
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn decode<T: serde::de::DeserializeOwned>(path: &'static str, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|err| ApiError::MalformedPayload {
            endpoint: path,
            reason: err.to_string(),
        })
    }

    /// Consumption history for the requested aggregation window.
    pub async fn history(&self, period: HistoryPeriod) -> Result<HistorySeries> {
        let url = self.endpoint("history/data")?;
        let response = self
            .http
            .get(url)
            .query(&[("period", period.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "history/data",
                status: response.status().as_u16(),
            });
        }
        let series: HistorySeries = Self::decode("history/data", response.json().await?)?;
        if !series.is_parallel() {
            return Err(ApiError::MalformedPayload {
                endpoint: "history/data",
                reason: "kwh/cost arrays do not line up with labels".into(),
            });
        }
        Ok(series)
    }

    /// Rooftop solar recommendation.
    pub async fn solar_potential(&self) -> Result<SolarPotential> {
        let value = self.get_value("analyze/solar_potential").await?;
        Self::decode("analyze/solar_potential", value)
    }

    /// Budget health assessment.
    pub async fn budget_plan(&self) -> Result<BudgetPlan> {
        let value = self.get_value("analyze/budget_plan").await?;
        Self::decode("analyze/budget_plan", value)
    }

    /// Baseline forecast, tolerant-parsed: the endpoint may answer with a
    /// plain array or with model prose wrapping one. Parse failures degrade
    /// to an empty sequence.
    pub async fn baseline_forecast(&self) -> Result<Vec<BaselineForecastPoint>> {
        let value = self.get_value("forecast/baseline").await?;
        Ok(edc_parse::parse_typed(&value))
    }

    /// Available optimization actions, tolerant-parsed.
    pub async fn suggestions(&self) -> Result<Vec<Suggestion>> {
        let value = self.get_value("analyze/suggestions").await?;
        Ok(edc_parse::parse_typed(&value))
    }

    /// Ask the backend to apply one suggestion to the baseline forecast.
    pub async fn simulate_action(
        &self,
        baseline: &[BaselineForecastPoint],
        suggestion: &Suggestion,
    ) -> Result<SimulationResult> {
        let body = SimulateRequest {
            baseline_forecast: baseline
                .iter()
                .map(|point| SimulateRow {
                    hour: &point.hour,
                    load_kw: point.load_kw,
                    cost: point.load_kw * self.tariff_inr_per_kwh,
                })
                .collect(),
            suggestion_id: &suggestion.id,
            affected_appliance: &suggestion.affected_appliance,
        };
        let url = self.endpoint("forecast/simulate_action")?;
        let response = self.http.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "forecast/simulate_action",
                status: response.status().as_u16(),
            });
        }
        let decoded: SimulateResponse =
            Self::decode("forecast/simulate_action", response.json().await?)?;
        let Some(modified_forecast) = decoded.modified_forecast else {
            return Err(ApiError::MalformedPayload {
                endpoint: "forecast/simulate_action",
                reason: "modified forecast is missing".into(),
            });
        };
        let Some(savings) = decoded.savings_summary else {
            return Err(ApiError::MalformedPayload {
                endpoint: "forecast/simulate_action",
                reason: "savings summary is missing".into(),
            });
        };
        debug!(
            suggestion = %suggestion.id,
            savings = savings.total_savings_amount,
            "simulation response received"
        );
        Ok(SimulationResult {
            suggestion_id: suggestion.id.clone(),
            modified_forecast,
            savings_amount: savings.total_savings_amount,
        })
    }

    /// Post a durable action record. The acknowledgment body is ignored;
    /// only success or failure matters.
    pub async fn commit_action(&self, record: &CommitRecord) -> Result<()> {
        let url = self.endpoint("actions/commit")?;
        let response = self.http.post(url).json(record).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "actions/commit",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Community leaderboard rows.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let value = self.get_value("gamification/leaderboard").await?;
        Self::decode("gamification/leaderboard", value)
    }

    /// Send one chat message to the assistant.
    pub async fn chat(&self, message: &str) -> Result<ChatReply> {
        let url = self.endpoint("chat/message")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "chat/message",
                status: response.status().as_u16(),
            });
        }
        Self::decode("chat/message", response.json().await?)
    }

    /// Persist consumption goals.
    pub async fn save_goals(&self, goals: &UserGoals) -> Result<()> {
        let url = self.endpoint("config/goals")?;
        let response = self.http.post(url).json(goals).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "config/goals",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Persist the appliance roster.
    pub async fn save_appliances(&self, appliances: &[String]) -> Result<()> {
        let url = self.endpoint("config/appliances")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "appliances": appliances }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: "config/appliances",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn fetch_suggestions(&self) -> anyhow::Result<Vec<Suggestion>> {
        Ok(self.suggestions().await?)
    }
}

#[async_trait]
impl ForecastSource for BackendClient {
    async fn fetch_baseline(&self) -> anyhow::Result<Vec<BaselineForecastPoint>> {
        Ok(self.baseline_forecast().await?)
    }
}

#[async_trait]
impl SimulationBackend for BackendClient {
    async fn simulate(
        &self,
        baseline: &[BaselineForecastPoint],
        suggestion: &Suggestion,
    ) -> anyhow::Result<SimulationResult> {
        Ok(self.simulate_action(baseline, suggestion).await?)
    }
}

#[async_trait]
impl CommitSink for BackendClient {
    async fn submit(&self, record: &CommitRecord) -> anyhow::Result<()> {
        Ok(self.commit_action(record).await?)
    }
}
