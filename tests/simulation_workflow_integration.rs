//! ---
//! edc_section: "09-testing-qa"
//! edc_subsection: "integration-tests"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "End-to-end checks for the select/simulate/commit workflow."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use edc_api::BackendClient;
use edc_config::BackendConfig;
use edc_model::CommitRecord;
use edc_sim::{CommitCoordinator, CommitOutcome, SelectOutcome, SimulationController, SuggestionCatalog};
use serde_json::{json, Value};

#[derive(Default)]
struct BackendState {
    suggestion_requests: AtomicUsize,
    fail_simulate: AtomicBool,
    fail_commit: AtomicBool,
    commit_delay_ms: AtomicU64,
    commits: Mutex<Vec<CommitRecord>>,
}

async fn baseline_handler() -> Json<Value> {
    // The forecaster answers in prose with a fenced block, the way a model
    // endpoint actually responds.
    Json(json!({
        "content": "Here is tomorrow's representative day:\n```json\n[\
            {\"hour\": \"00:00\", \"load_kw\": 1.2},\
            {\"hour\": \"01:00\", \"load_kw\": 0.9},\
            {\"hour\": \"02:00\", \"load_kw\": 0.8}\
        ]\n```\nStay under budget!"
    }))
}

async fn suggestions_handler(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.suggestion_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        {
            "id": "shift-laundry",
            "title": "Run laundry after 22:00",
            "message": "Off-peak tariff applies overnight.",
            "severity": "high",
            "affected_appliance": "Washing Machine"
        },
        {
            "id": "raise-ac",
            "title": "Raise AC setpoint by 2 degrees",
            "message": "",
            "severity": "extreme",
            "affected_appliance": "AC"
        }
    ]))
}

async fn simulate_handler(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if state.fail_simulate.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let suggestion_id = body["suggestion_id"].as_str().unwrap_or_default().to_owned();
    let baseline = body["baseline_forecast"].as_array().cloned().unwrap_or_default();
    let modified: Vec<Value> = baseline
        .iter()
        .map(|row| {
            json!({
                "hour": row["hour"],
                "load_kw": row["load_kw"].as_f64().unwrap_or_default() * 0.75
            })
        })
        .collect();
    Ok(Json(json!({
        "suggestion_id": suggestion_id,
        "modified_forecast": modified,
        "savings_summary": { "total_savings_amount": 18.5 }
    })))
}

async fn commit_handler(
    State(state): State<Arc<BackendState>>,
    Json(record): Json<CommitRecord>,
) -> Result<Json<Value>, StatusCode> {
    let delay = state.commit_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_commit.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    state.commits.lock().unwrap().push(record);
    Ok(Json(json!({"status": "ok"})))
}

async fn spawn_backend() -> (SocketAddr, Arc<BackendState>) {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/forecast/baseline", get(baseline_handler))
        .route("/analyze/suggestions", get(suggestions_handler))
        .route("/forecast/simulate_action", post(simulate_handler))
        .route("/actions/commit", post(commit_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

fn client_for(addr: SocketAddr) -> BackendClient {
    BackendClient::new(&BackendConfig {
        base_url: format!("http://{addr}"),
        ..BackendConfig::default()
    })
    .unwrap()
}

/// The whole happy path: a prose-wrapped baseline, a load-once catalog, an
/// applied simulation, and a commit the server acknowledges — after which
/// the controller is back on baseline.
#[tokio::test]
async fn select_simulate_commit_round_trip() {
    edc_logging::init();

    let (addr, state) = spawn_backend().await;
    let client = client_for(addr);

    let baseline = client.baseline_forecast().await.unwrap();
    assert_eq!(baseline.len(), 3, "fenced forecast must parse");
    assert_eq!(baseline[0].hour, "00:00");

    let mut catalog = SuggestionCatalog::new();
    let first = catalog.load(&client).await.to_vec();
    assert_eq!(first.len(), 2);
    // Unknown severity labels land in the lowest band.
    assert_eq!(first[1].severity, edc_model::Severity::Low);
    catalog.load(&client).await;
    assert_eq!(
        state.suggestion_requests.load(Ordering::SeqCst),
        1,
        "catalog must fetch at most once per session"
    );

    let mut controller = SimulationController::new();
    controller.set_baseline(baseline.clone());
    let outcome = controller.select(&first[0], &client).await;
    let SelectOutcome::Applied { savings } = outcome else {
        panic!("expected an applied simulation, got {outcome:?}");
    };
    assert_eq!(savings, 18.5);
    assert_eq!(controller.displayed()[0].load_kw, 1.2 * 0.75);
    assert_eq!(controller.displayed()[0].hour, baseline[0].hour);

    let committed = CommitCoordinator::commit(&mut controller, &client)
        .await
        .unwrap();
    let CommitOutcome::Acknowledged(record) = committed else {
        panic!("expected acknowledgment, got {committed:?}");
    };
    assert_eq!(record.action_title, "Run laundry after 22:00");
    assert_eq!(record.savings_inr, 18.5);

    let server_side = state.commits.lock().unwrap();
    assert_eq!(server_side.len(), 1);
    assert_eq!(server_side[0], record);
    drop(server_side);

    assert!(controller.is_idle());
    assert_eq!(controller.savings(), 0.0);
    assert_eq!(controller.displayed(), baseline.as_slice());
}

/// Selecting the active suggestion again toggles it off and the display
/// reverts to the untouched baseline.
#[tokio::test]
async fn reselect_toggles_the_simulation_off() {
    edc_logging::init();

    let (addr, _state) = spawn_backend().await;
    let client = client_for(addr);
    let baseline = client.baseline_forecast().await.unwrap();

    let mut catalog = SuggestionCatalog::new();
    let suggestion = catalog.load(&client).await[0].clone();
    let mut controller = SimulationController::new();
    controller.set_baseline(baseline.clone());

    assert!(matches!(
        controller.select(&suggestion, &client).await,
        SelectOutcome::Applied { .. }
    ));
    assert!(matches!(
        controller.select(&suggestion, &client).await,
        SelectOutcome::ToggledOff
    ));
    assert!(controller.is_idle());
    assert_eq!(controller.displayed(), baseline.as_slice());
    assert_eq!(controller.savings(), 0.0);
}

/// A backend failure during simulation leaves the controller idle on
/// baseline instead of carrying half-applied state.
#[tokio::test]
async fn simulation_failure_reverts_to_baseline() {
    edc_logging::init();

    let (addr, state) = spawn_backend().await;
    let client = client_for(addr);
    let baseline = client.baseline_forecast().await.unwrap();

    let mut catalog = SuggestionCatalog::new();
    let suggestion = catalog.load(&client).await[0].clone();
    let mut controller = SimulationController::new();
    controller.set_baseline(baseline.clone());

    state.fail_simulate.store(true, Ordering::SeqCst);
    assert!(matches!(
        controller.select(&suggestion, &client).await,
        SelectOutcome::Rejected
    ));
    assert!(controller.is_idle());
    assert_eq!(controller.displayed(), baseline.as_slice());
}

/// Commit submission is split from the local reset: `begin` releases the
/// controller synchronously, so a slow acknowledgment holds nothing — new
/// selections proceed while the record is still on the wire.
#[tokio::test]
async fn slow_commit_acknowledgment_does_not_hold_the_controller() {
    edc_logging::init();

    let (addr, state) = spawn_backend().await;
    let client = client_for(addr);
    let baseline = client.baseline_forecast().await.unwrap();

    let mut catalog = SuggestionCatalog::new();
    let entries = catalog.load(&client).await.to_vec();
    let mut controller = SimulationController::new();
    controller.set_baseline(baseline.clone());
    assert!(matches!(
        controller.select(&entries[0], &client).await,
        SelectOutcome::Applied { .. }
    ));

    state.commit_delay_ms.store(300, Ordering::SeqCst);
    let record = CommitCoordinator::begin(&mut controller).unwrap();
    assert!(controller.is_idle());
    assert_eq!(controller.displayed(), baseline.as_slice());

    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::unbounded_channel();
    let submit_client = client.clone();
    tokio::spawn(async move {
        let submitted = submit_client
            .commit_action(&record)
            .await
            .map_err(anyhow::Error::from);
        let _ = outcome_tx.send(CommitCoordinator::finish(record, submitted));
    });

    // A new simulation applies while the acknowledgment is in flight.
    assert!(matches!(
        controller.select(&entries[1], &client).await,
        SelectOutcome::Applied { .. }
    ));

    let outcome = tokio::time::timeout(Duration::from_secs(5), outcome_rx.recv())
        .await
        .expect("acknowledgment should arrive")
        .expect("submit task should report an outcome");
    let CommitOutcome::Acknowledged(record) = outcome else {
        panic!("expected acknowledgment, got {outcome:?}");
    };
    assert_eq!(record.action_title, entries[0].title);
    assert_eq!(state.commits.lock().unwrap().len(), 1);
}

/// When the commit endpoint is down the local reset still happens; the
/// outcome carries the record so the caller can surface the failure.
#[tokio::test]
async fn unacknowledged_commit_still_resets_locally() {
    edc_logging::init();

    let (addr, state) = spawn_backend().await;
    let client = client_for(addr);
    let baseline = client.baseline_forecast().await.unwrap();

    let mut catalog = SuggestionCatalog::new();
    let suggestion = catalog.load(&client).await[0].clone();
    let mut controller = SimulationController::new();
    controller.set_baseline(baseline.clone());
    assert!(matches!(
        controller.select(&suggestion, &client).await,
        SelectOutcome::Applied { .. }
    ));

    state.fail_commit.store(true, Ordering::SeqCst);
    let outcome = CommitCoordinator::commit(&mut controller, &client)
        .await
        .unwrap();
    let CommitOutcome::Unacknowledged { record, .. } = outcome else {
        panic!("expected an unacknowledged commit, got {outcome:?}");
    };
    assert_eq!(record.action_title, suggestion.title);
    assert!(state.commits.lock().unwrap().is_empty());
    assert!(controller.is_idle());
    assert_eq!(controller.displayed(), baseline.as_slice());
}
