//! ---
//! edc_section: "08-terminal-ui"
//! edc_subsection: "binary"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Terminal dashboard wiring the live feed and simulator."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use edc_api::BackendClient;
use edc_config::ClientConfig;
use edc_model::{
    BaselineForecastPoint, SimulationResult, StreamEvent, StreamStatus, Suggestion,
    TelemetrySample, UserGoals,
};
use edc_sim::{
    CommitCoordinator, CommitOutcome, ResolveOutcome, SelectionTicket, SimulationController,
    SuggestionCatalog,
};
use edc_stream::{HistoryBuffer, StreamSession};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Sparkline, Tabs};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    author,
    disable_version_flag = true,
    about = "Live energy monitoring and action simulation in a terminal UI",
    propagate_version = false
)]
struct Cli {
    /// Path to a client configuration file (defaults to ./edc.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Override the live meter stream URL
    #[arg(long)]
    ws_url: Option<String>,
    /// Redraw interval in milliseconds
    #[arg(long = "tick-ms", default_value_t = 250)]
    tick_ms: u64,

    /// Print version information and exit
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Live,
    Simulation,
}

/// Completion of a backend call spawned off the input path. Requests never
/// run inline in the key handler; the event loop stays responsive and picks
/// these up alongside keystrokes and stream events.
enum BackendEvent {
    SimulationResolved {
        ticket: SelectionTicket,
        result: anyhow::Result<SimulationResult>,
    },
    ViewActivated {
        baseline: anyhow::Result<Vec<BaselineForecastPoint>>,
        suggestions: anyhow::Result<Vec<Suggestion>>,
    },
    CommitFinished(CommitOutcome),
}

struct App {
    view: View,
    status: StreamStatus,
    latest: Option<TelemetrySample>,
    history: HistoryBuffer,
    catalog: SuggestionCatalog,
    controller: SimulationController,
    simulation_ready: bool,
    activation_pending: bool,
    selected: usize,
    notice: Option<String>,
    goals: UserGoals,
    appliances: Vec<String>,
    should_quit: bool,
}

impl App {
    fn new(config: &ClientConfig) -> Self {
        Self {
            view: View::Live,
            status: StreamStatus::Connecting,
            latest: None,
            history: HistoryBuffer::new(),
            catalog: SuggestionCatalog::new(),
            controller: SimulationController::new(),
            simulation_ready: false,
            activation_pending: false,
            selected: 0,
            notice: None,
            goals: config.goals.clone(),
            appliances: config.appliances.clone(),
            should_quit: false,
        }
    }

    fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Sample(sample) => {
                self.history.push(edc_model::HistoryPoint::from_sample(&sample));
                self.latest = Some(sample);
            }
            StreamEvent::Status(status) => self.status = status,
        }
    }

    fn selected_suggestion(&self) -> Option<Suggestion> {
        self.catalog.entries().get(self.selected).cloned()
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.catalog.entries().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let current = self.selected as isize;
        self.selected = (current + delta).rem_euclid(len as isize) as usize;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("edc-ui {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let candidates = match &cli.config {
        Some(path) => vec![path.clone()],
        None => vec![PathBuf::from("edc.toml")],
    };
    let mut config = ClientConfig::load(&candidates)?;
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    if let Some(ws_url) = cli.ws_url {
        config.stream.url = ws_url;
    }
    config.validate()?;

    let client = BackendClient::new(&config.backend)?;
    let session = StreamSession::open(config.stream.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &client, &session, &config, cli.tick_ms).await;

    // Teardown releases the stream handle before the terminal, so no
    // listeners dangle past the view.
    session.shutdown().await.ok();
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()?;

    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &BackendClient,
    session: &StreamSession,
    config: &ClientConfig,
    tick_ms: u64,
) -> Result<()> {
    let mut app = App::new(config);
    let mut stream_events = session.subscribe();
    let mut input = EventStream::new();
    let mut redraw = tokio::time::interval(std::time::Duration::from_millis(tick_ms.max(50)));
    let (backend_tx, mut backend_rx) = mpsc::unbounded_channel::<BackendEvent>();

    loop {
        terminal.draw(|frame| draw(frame, &app))?;
        if app.should_quit {
            return Ok(());
        }

        tokio::select! {
            _ = redraw.tick() => {}
            event = stream_events.recv() => {
                match event {
                    Ok(event) => app.apply_stream_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        app.status = StreamStatus::Offline;
                    }
                }
            }
            response = backend_rx.recv() => {
                if let Some(response) = response {
                    apply_backend_event(&mut app, response);
                }
            }
            maybe_event = input.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        handle_key(&mut app, key, client, &backend_tx);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                }
            }
        }
    }
}

fn handle_key(
    app: &mut App,
    key: KeyEvent,
    client: &BackendClient,
    backend_tx: &mpsc::UnboundedSender<BackendEvent>,
) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Tab => {
            app.view = match app.view {
                View::Live => View::Simulation,
                View::Simulation => View::Live,
            };
            if app.view == View::Simulation && !app.simulation_ready && !app.activation_pending {
                request_activation(app, client, backend_tx);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Enter | KeyCode::Char(' ') => {
            if app.view == View::Simulation {
                if let Some(suggestion) = app.selected_suggestion() {
                    select_suggestion(app, &suggestion, client, backend_tx);
                }
            }
        }
        KeyCode::Char('c') => {
            if app.view == View::Simulation {
                commit_active(app, client, backend_tx);
            }
        }
        KeyCode::Char('r') => {
            if app.view == View::Simulation && !app.activation_pending {
                app.catalog.reset();
                app.simulation_ready = false;
                request_activation(app, client, backend_tx);
            }
        }
        _ => {}
    }
}

fn apply_backend_event(app: &mut App, event: BackendEvent) {
    match event {
        BackendEvent::SimulationResolved { ticket, result } => {
            let id = ticket.suggestion().id.clone();
            match app.controller.resolve(ticket, result) {
                ResolveOutcome::Applied { savings } => {
                    app.notice = Some(format!("Simulating {id}: save ₹{savings:.2}"));
                }
                ResolveOutcome::Stale => {}
                ResolveOutcome::Failed => {
                    app.notice = Some(format!("Simulation of {id} failed"));
                }
                ResolveOutcome::Inconsistent => {
                    app.notice = Some(format!("Backend returned an unusable result for {id}"));
                }
            }
        }
        BackendEvent::ViewActivated {
            baseline,
            suggestions,
        } => {
            app.activation_pending = false;
            match baseline {
                Ok(baseline) if !baseline.is_empty() => app.controller.set_baseline(baseline),
                Ok(_) => app.notice = Some("Baseline forecast unavailable".to_owned()),
                Err(err) => app.notice = Some(format!("Baseline fetch failed: {err}")),
            }
            if app.catalog.install(suggestions).is_empty() {
                app.notice
                    .get_or_insert_with(|| "No suggestions available right now".to_owned());
            }
            app.selected = 0;
            app.simulation_ready = true;
        }
        BackendEvent::CommitFinished(outcome) => match outcome {
            CommitOutcome::Acknowledged(record) => {
                app.notice = Some(format!(
                    "Committed: {} (₹{:.2})",
                    record.action_title, record.savings_inr
                ));
            }
            CommitOutcome::Unacknowledged { record, error } => {
                app.notice = Some(format!(
                    "Commit of {} not acknowledged: {error}",
                    record.action_title
                ));
            }
        },
    }
}

fn request_activation(
    app: &mut App,
    client: &BackendClient,
    backend_tx: &mpsc::UnboundedSender<BackendEvent>,
) {
    app.activation_pending = true;
    let client = client.clone();
    let backend_tx = backend_tx.clone();
    tokio::spawn(async move {
        let baseline = client.baseline_forecast().await.map_err(anyhow::Error::from);
        let suggestions = client.suggestions().await.map_err(anyhow::Error::from);
        let _ = backend_tx.send(BackendEvent::ViewActivated {
            baseline,
            suggestions,
        });
    });
}

fn select_suggestion(
    app: &mut App,
    suggestion: &Suggestion,
    client: &BackendClient,
    backend_tx: &mpsc::UnboundedSender<BackendEvent>,
) {
    let Some(ticket) = app.controller.begin_select(suggestion) else {
        app.notice = Some(format!("Cancelled {}", suggestion.id));
        return;
    };
    // The request resolves through the channel; a newer selection simply
    // outruns it and the stale response is discarded on arrival.
    let baseline = app.controller.baseline().to_vec();
    let client = client.clone();
    let backend_tx = backend_tx.clone();
    tokio::spawn(async move {
        let result = client
            .simulate_action(&baseline, ticket.suggestion())
            .await
            .map_err(anyhow::Error::from);
        let _ = backend_tx.send(BackendEvent::SimulationResolved { ticket, result });
    });
}

fn commit_active(
    app: &mut App,
    client: &BackendClient,
    backend_tx: &mpsc::UnboundedSender<BackendEvent>,
) {
    let record = match CommitCoordinator::begin(&mut app.controller) {
        Ok(record) => record,
        Err(err) => {
            app.notice = Some(err.to_string());
            return;
        }
    };
    app.notice = Some(format!("Committing {}...", record.action_title));
    let client = client.clone();
    let backend_tx = backend_tx.clone();
    tokio::spawn(async move {
        let submitted = client
            .commit_action(&record)
            .await
            .map_err(anyhow::Error::from);
        let _ = backend_tx.send(BackendEvent::CommitFinished(CommitCoordinator::finish(
            record, submitted,
        )));
    });
}

fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app);
    match app.view {
        View::Live => draw_live(frame, chunks[1], app),
        View::Simulation => draw_simulation(frame, chunks[1], app),
    }
    draw_footer(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let titles = ["Live Monitor", "Action Simulator"]
        .into_iter()
        .map(Line::from);
    let selected = match app.view {
        View::Live => 0,
        View::Simulation => 1,
    };
    let (status_label, status_color) = match app.status {
        StreamStatus::Connecting => ("CONNECTING", Color::Yellow),
        StreamStatus::Online => ("ONLINE", Color::Green),
        StreamStatus::Offline => ("OFFLINE", Color::Red),
    };
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(vec![
                    Span::raw("Energy Detective ["),
                    Span::styled(status_label, Style::default().fg(status_color)),
                    Span::raw("]"),
                ])),
        );
    frame.render_widget(tabs, area);
}

fn draw_live(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(5)])
        .split(columns[0]);

    let stats = match &app.latest {
        Some(sample) => {
            let load_style = if sample.total_kw > app.goals.kw_limit_threshold {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            vec![
                Line::from(vec![
                    Span::raw("Real-time load   "),
                    Span::styled(format!("{:.2} kW", sample.total_kw), load_style),
                ]),
                Line::from(format!("Current cost     ₹{:.2}/hr", sample.cost_per_hour)),
                Line::from(format!(
                    "Temperature      {:.1}°C ({})",
                    sample.temperature_c, sample.weather_condition
                )),
                Line::from(format!(
                    "Active devices   {}",
                    sample.active_devices_debug.len()
                )),
            ]
        }
        None => vec![Line::from("Waiting for the first sample...")],
    };
    let stats = Paragraph::new(stats).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Live Operations (updates every 2s)"),
    );
    frame.render_widget(stats, left[0]);

    let series: Vec<u64> = app
        .history
        .iter()
        .map(|point| (point.value * 100.0).max(0.0) as u64)
        .collect();
    let sparkline = Sparkline::default()
        .data(&series)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Consumption feed (last {} samples)", series.len())),
        );
    frame.render_widget(sparkline, left[1]);

    let mut items: Vec<ListItem> = app
        .appliances
        .iter()
        .map(|device| {
            let active = app
                .latest
                .as_ref()
                .is_some_and(|sample| sample.active_devices_debug.iter().any(|d| d == device));
            let (marker, style) = if active {
                ("● drawing power", Style::default().fg(Color::Green))
            } else {
                ("○ standby", Style::default().fg(Color::DarkGray))
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{device:<16}")),
                Span::styled(marker, style),
            ]))
        })
        .collect();
    if let Some(alert) = app.latest.as_ref().and_then(|sample| sample.alert.as_deref()) {
        items.push(ListItem::new(Line::from(Span::styled(
            format!("⚠ {alert}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))));
    }
    let devices =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Device Status"));
    frame.render_widget(devices, columns[1]);
}

fn draw_simulation(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let items: Vec<ListItem> = if app.catalog.entries().is_empty() {
        vec![ListItem::new("No suggestions available right now.")]
    } else {
        app.catalog
            .entries()
            .iter()
            .map(|suggestion| {
                let active = app
                    .controller
                    .active()
                    .is_some_and(|a| a.id == suggestion.id);
                let marker = if active { "[x]" } else { "[ ]" };
                let severity_style = match suggestion.severity {
                    edc_model::Severity::High => Style::default().fg(Color::Red),
                    edc_model::Severity::Medium => Style::default().fg(Color::Yellow),
                    edc_model::Severity::Low => Style::default().fg(Color::Blue),
                };
                ListItem::new(vec![
                    Line::from(vec![
                        Span::raw(format!("{marker} {} ", suggestion.title)),
                        Span::styled(suggestion.severity.to_string(), severity_style),
                    ]),
                    Line::from(Span::styled(
                        format!("    targets {}", suggestion.affected_appliance),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect()
    };
    let mut state = ListState::default();
    if !app.catalog.entries().is_empty() {
        state.select(Some(app.selected));
    }
    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Available Optimization Actions"),
        );
    frame.render_stateful_widget(list, columns[0], &mut state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(columns[1]);

    let series: Vec<u64> = app
        .controller
        .displayed()
        .iter()
        .map(|point| (point.load_kw * 100.0).max(0.0) as u64)
        .collect();
    let title = if app.controller.is_idle() {
        "Projected usage (baseline)"
    } else {
        "Projected usage (simulated)"
    };
    let chart = Sparkline::default()
        .data(&series)
        .style(Style::default().fg(Color::Magenta))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(chart, right[0]);

    let savings = app.controller.savings();
    let summary = Paragraph::new(vec![
        Line::from(format!("Potential savings   -₹{savings:.2}")),
        Line::from(match app.controller.active() {
            Some(active) => format!("Active action       {}", active.title),
            None => "Active action       none".to_owned(),
        }),
        Line::from(Span::styled(
            if app.controller.is_idle() {
                "Select an action to simulate its impact"
            } else {
                "Press c to commit this action"
            },
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Simulation Summary"),
    );
    frame.render_widget(summary, right[1]);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help = "q quit · Tab switch view · ↑/↓ move · Enter toggle · c commit · r reload";
    let line = match &app.notice {
        Some(notice) => Line::from(vec![
            Span::styled(notice.clone(), Style::default().fg(Color::Yellow)),
            Span::raw("  |  "),
            Span::styled(help, Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::from(Span::styled(help, Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line), area);
}
