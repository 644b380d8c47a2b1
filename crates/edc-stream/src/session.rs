//! ---
//! edc_section: "06-live-stream"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Connection lifecycle for the live meter feed."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use edc_config::StreamConfig;
use edc_model::{StreamEvent, StreamStatus, TelemetrySample};
use futures_util::{SinkExt, StreamExt};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Fan-out capacity for subscribed consumers.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

static SAMPLES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "edc_stream_samples_received_total",
        "Telemetry samples decoded from the live meter feed"
    )
    .expect("metric registration to succeed")
});

static MALFORMED_FRAMES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "edc_stream_malformed_frames_dropped_total",
        "Inbound frames dropped for failing structural validation"
    )
    .expect("metric registration to succeed")
});

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One live-feed connection with typed event fan-out.
///
/// A single spawned task owns the socket and the dial loop, so duplicate
/// concurrent connections cannot occur even across reconnect attempts.
/// Consumers subscribe to [`StreamEvent`]s and never poll.
pub struct StreamSession {
    events: broadcast::Sender<StreamEvent>,
    status: watch::Receiver<StreamStatus>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamSession {
    /// Establish the session and start the connection task.
    pub fn open(config: StreamConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(StreamStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(session_loop(
            config,
            events_tx.clone(),
            status_tx,
            shutdown_rx,
        ));
        Self {
            events: events_tx,
            status: status_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Subscribe to decoded samples and status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    /// Observable connection status.
    pub fn status(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Snapshot of the current connection status.
    #[must_use]
    pub fn current_status(&self) -> StreamStatus {
        *self.status.borrow()
    }

    /// Signal the session to release its connection. Safe to call multiple
    /// times; the owning task drops the socket unconditionally.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Close and wait for the connection task to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.close();
        self.task.await.map_err(|err| anyhow::anyhow!(err))
    }
}

enum LoopExit {
    /// `close()` was requested; stop for good.
    Closed,
    /// The transport dropped; the dial loop decides whether to retry.
    Disconnected,
}

async fn session_loop(
    config: StreamConfig,
    events: broadcast::Sender<StreamEvent>,
    status: watch::Sender<StreamStatus>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = config.initial_backoff;
    let mut attempts: u32 = 0;

    loop {
        publish_status(&events, &status, StreamStatus::Connecting);
        let connect = tokio::select! {
            _ = shutdown.changed() => break,
            result = connect_async(config.url.as_str()) => result,
        };

        match connect {
            Ok((socket, _response)) => {
                info!(url = %config.url, "live meter stream connected");
                publish_status(&events, &status, StreamStatus::Online);
                backoff = config.initial_backoff;
                attempts = 0;
                match read_frames(socket, &events, &mut shutdown).await {
                    LoopExit::Closed => break,
                    LoopExit::Disconnected => {
                        warn!(url = %config.url, "live meter stream disconnected");
                        publish_status(&events, &status, StreamStatus::Offline);
                    }
                }
            }
            Err(err) => {
                warn!(url = %config.url, error = %err, "live meter connection failed");
                publish_status(&events, &status, StreamStatus::Offline);
            }
        }

        if !config.reconnect {
            break;
        }
        attempts += 1;
        if let Some(max) = config.max_attempts {
            if attempts >= max {
                warn!(attempts, "reconnect attempt bound reached; giving up");
                break;
            }
        }
        debug!(delay_ms = backoff.as_millis() as u64, "scheduling reconnect");
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }

    publish_status(&events, &status, StreamStatus::Offline);
}

async fn read_frames(
    mut socket: Socket,
    events: &broadcast::Sender<StreamEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> LoopExit {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = socket.close(None).await;
                return LoopExit::Closed;
            }
            message = socket.next() => {
                let Some(Ok(message)) = message else {
                    return LoopExit::Disconnected;
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<TelemetrySample>(&text) {
                        Ok(sample) => {
                            SAMPLES_RECEIVED_TOTAL.inc();
                            let _ = events.send(StreamEvent::Sample(sample));
                        }
                        Err(err) => {
                            // Soft failure: the frame is dropped, the
                            // connection status is unaffected.
                            MALFORMED_FRAMES_DROPPED_TOTAL.inc();
                            warn!(error = %err, "dropping malformed stream frame");
                        }
                    },
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            return LoopExit::Disconnected;
                        }
                    }
                    Message::Close(_) => return LoopExit::Disconnected,
                    Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        }
    }
}

fn publish_status(
    events: &broadcast::Sender<StreamEvent>,
    status: &watch::Sender<StreamStatus>,
    next: StreamStatus,
) {
    if *status.borrow() == next {
        return;
    }
    let _ = status.send(next);
    let _ = events.send(StreamEvent::Status(next));
}
