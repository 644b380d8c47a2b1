//! ---
//! edc_section: "01-data-model"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Wire and domain types shared across the client."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// One decoded message from the live meter stream.
///
/// Samples are immutable once received and never persisted beyond the
/// session. A frame that fails structural validation (missing `total_kw`,
/// non-numeric numerics) fails serde decode and is dropped by the stream
/// layer without touching connection status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Backend-supplied timestamp, passed through verbatim.
    pub timestamp: String,
    /// Aggregate household load in kW.
    pub total_kw: f64,
    /// Projected cost per hour at the current load.
    pub cost_per_hour: f64,
    /// Outside temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Human-readable weather condition.
    pub weather_condition: String,
    /// Names of devices currently drawing power.
    #[serde(default)]
    pub active_devices_debug: Vec<String>,
    /// Optional alert text raised by the backend.
    #[serde(default)]
    pub alert: Option<String>,
}

/// Projection of [`TelemetrySample::total_kw`] retained by the rolling
/// history buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Timestamp of the originating sample.
    pub timestamp: String,
    /// Load value in kW.
    pub value: f64,
}

impl HistoryPoint {
    /// Project a telemetry sample onto its history representation.
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        Self {
            timestamp: sample.timestamp.clone(),
            value: sample.total_kw,
        }
    }
}

/// Severity band attached to an optimization suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

// Model-generated catalogs occasionally invent severity labels; anything
// unrecognized lands in the lowest band instead of poisoning the record.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        })
    }
}

/// One optimization action offered by the backend.
///
/// Immutable once fetched; the catalog holding these is loaded at most once
/// per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Stable identifier, also used as the simulation correlation key.
    pub id: String,
    /// Short action title shown in lists and commit records.
    pub title: String,
    /// Longer explanation of the action.
    #[serde(default)]
    pub message: String,
    /// Severity band for visual emphasis.
    #[serde(default)]
    pub severity: Severity,
    /// Appliance the action targets.
    pub affected_appliance: String,
}

/// One bucket of the representative-day load forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineForecastPoint {
    /// Hour label for the bucket.
    pub hour: String,
    /// Forecast load in kW.
    pub load_kw: f64,
}

/// Outcome of simulating one suggestion against the baseline forecast.
///
/// At most one instance is alive at any time: the active-simulation slot
/// owned by the simulation controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Identifier of the simulated suggestion.
    pub suggestion_id: String,
    /// Forecast with the action applied, same buckets as the baseline.
    pub modified_forecast: Vec<BaselineForecastPoint>,
    /// Aggregate cost reduction relative to baseline, non-negative.
    pub savings_amount: f64,
}

/// Durable action record posted on commit and discarded client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Title of the committed action.
    pub action_title: String,
    /// Savings amount in INR captured from the active simulation.
    pub savings_inr: f64,
}

/// Connection status of the live meter stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StreamStatus {
    Connecting,
    Online,
    Offline,
}

/// Typed event published by the stream session to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A decoded telemetry sample, in strict arrival order.
    Sample(TelemetrySample),
    /// A connection status transition.
    Status(StreamStatus),
}

/// Aggregation window for the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HistoryPeriod {
    Day,
    Week,
    Month,
}

/// Parallel-array consumption series returned by `history/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub labels: Vec<String>,
    pub kwh_data: Vec<f64>,
    pub cost_data: Vec<f64>,
}

impl HistorySeries {
    /// True when both data arrays line up with the labels.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.kwh_data.len() == self.labels.len() && self.cost_data.len() == self.labels.len()
    }
}

/// Rooftop-solar recommendation returned by `analyze/solar_potential`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarPotential {
    #[serde(default)]
    pub weather_adjustment: String,
    #[serde(default)]
    pub recommended_system_kw: f64,
    #[serde(default)]
    pub installation_cost: f64,
    #[serde(default)]
    pub annual_savings_inr: f64,
}

/// One step of a budget recovery plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    pub kwh_save_monthly: f64,
}

/// Budget health assessment returned by `analyze/budget_plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    /// `over_budget` or anything else meaning on track.
    pub status: String,
    #[serde(default)]
    pub gap_kwh: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub plan_steps: Vec<PlanStep>,
}

impl BudgetPlan {
    /// True when the backend flags the household as over budget.
    #[must_use]
    pub fn over_budget(&self) -> bool {
        self.status == "over_budget"
    }
}

/// One row of the community leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    pub monthly_cost_inr: f64,
    #[serde(default)]
    pub is_user: bool,
}

/// Consumption goals configured by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoals {
    /// Peak load threshold in kW.
    pub kw_limit_threshold: f64,
    /// Monthly consumption goal in kWh.
    pub monthly_kwh_goal: f64,
}

impl Default for UserGoals {
    fn default() -> Self {
        Self {
            kw_limit_threshold: 5.0,
            monthly_kwh_goal: 300.0,
        }
    }
}

/// Assistant reply returned by `chat/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sample_decodes_full_frame() {
        let sample: TelemetrySample = serde_json::from_value(json!({
            "timestamp": "2025-11-28T10:00:00",
            "total_kw": 2.41,
            "cost_per_hour": 19.3,
            "temperature_c": 31.5,
            "weather_condition": "Sunny",
            "active_devices_debug": ["Fridge", "AC"],
            "alert": null
        }))
        .unwrap();
        assert_eq!(sample.total_kw, 2.41);
        assert_eq!(sample.active_devices_debug.len(), 2);
        assert!(sample.alert.is_none());
    }

    #[test]
    fn sample_rejects_missing_load() {
        let result = serde_json::from_value::<TelemetrySample>(json!({
            "timestamp": "2025-11-28T10:00:00",
            "cost_per_hour": 19.3,
            "temperature_c": 31.5,
            "weather_condition": "Sunny"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn sample_rejects_non_numeric_load() {
        let result = serde_json::from_value::<TelemetrySample>(json!({
            "timestamp": "2025-11-28T10:00:00",
            "total_kw": "high",
            "cost_per_hour": 19.3,
            "temperature_c": 31.5,
            "weather_condition": "Sunny"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn severity_falls_back_to_low() {
        let suggestion: Suggestion = serde_json::from_value(json!({
            "id": "s1",
            "title": "Shift laundry",
            "message": "Run the washer off-peak",
            "severity": "critical",
            "affected_appliance": "Washing Machine"
        }))
        .unwrap();
        assert_eq!(suggestion.severity, Severity::Low);
    }

    #[test]
    fn severity_decodes_known_bands() {
        for (raw, expected) in [
            ("high", Severity::High),
            ("Medium", Severity::Medium),
            ("low", Severity::Low),
        ] {
            let severity: Severity = serde_json::from_value(json!(raw)).unwrap();
            assert_eq!(severity, expected);
        }
    }

    #[test]
    fn history_period_renders_as_query_value() {
        assert_eq!(HistoryPeriod::Week.to_string(), "week");
        assert_eq!(HistoryPeriod::Month.to_string(), "month");
    }

    #[test]
    fn history_series_checks_parallel_arrays() {
        let series = HistorySeries {
            labels: vec!["Mon".into(), "Tue".into()],
            kwh_data: vec![10.0, 12.0],
            cost_data: vec![80.0],
        };
        assert!(!series.is_parallel());
    }

    #[test]
    fn stream_event_round_trips_tagged() {
        let event = StreamEvent::Status(StreamStatus::Online);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "status");
        let back: StreamEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
