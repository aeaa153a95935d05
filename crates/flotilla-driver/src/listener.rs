//! Inbound HTTP listener for master-pushed events.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use prost::Message;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use flotilla_core::{host, ProcessId};
use flotilla_proto::wire;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::event::Event;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared with the request handlers.
struct Shared {
    pid_prefix: String,
    events: mpsc::Sender<Event>,
    aborted: AtomicBool,
}

/// Serving half of a started listener.
struct Runtime {
    pid: ProcessId,
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    shared: Arc<Shared>,
}

enum ListenerState {
    Unstarted,
    Listening(Runtime),
    Stopped,
}

/// HTTP endpoint the master pushes scheduler events to.
///
/// A listener starts once, serves until stopped, and never restarts.
/// Accepted events are forwarded to the driver's event queue; the
/// queue's capacity is the backpressure on the master.
pub struct EventListener {
    events: mpsc::Sender<Event>,
    state: Mutex<ListenerState>,
}

impl EventListener {
    /// Create an unstarted listener forwarding into `events`.
    pub(crate) fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            events,
            state: Mutex::new(ListenerState::Unstarted),
        }
    }

    /// Process identity of a started listener.
    #[must_use]
    pub fn process_id(&self) -> Option<ProcessId> {
        match &*self.state.lock() {
            ListenerState::Listening(runtime) => Some(runtime.pid.clone()),
            _ => None,
        }
    }

    /// Bound address of a started listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock() {
            ListenerState::Listening(runtime) => Some(runtime.local_addr),
            _ => None,
        }
    }

    /// Bind a port, derive the process identity, and begin serving.
    ///
    /// The listener probes its own liveness endpoint before reporting
    /// success, so a broken socket surfaces here instead of at
    /// registration time.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ListenerStart`] if the listener is not
    /// in its initial state, cannot bind, or fails the liveness probe.
    pub async fn start(&self, config: &DriverConfig) -> Result<ProcessId> {
        {
            let state = self.state.lock();
            match &*state {
                ListenerState::Unstarted => {}
                ListenerState::Listening(_) => {
                    return Err(DriverError::ListenerStart {
                        reason: "listener is already running".to_string(),
                    });
                }
                ListenerState::Stopped => {
                    return Err(DriverError::ListenerStart {
                        reason: "listener was already stopped".to_string(),
                    });
                }
            }
        }

        let ip = config.listen_ip.unwrap_or_else(host::local_ip4);
        let tcp = TcpListener::bind((ip, 0))
            .await
            .map_err(|e| DriverError::ListenerStart {
                reason: format!("bind on {ip} failed: {e}"),
            })?;
        let local_addr = tcp.local_addr().map_err(|e| DriverError::ListenerStart {
            reason: format!("no local address: {e}"),
        })?;

        let pid = ProcessId::create(wire::SCHEDULER_KIND, local_addr.to_string());
        let shared = Arc::new(Shared {
            pid_prefix: pid.prefix(),
            events: self.events.clone(),
            aborted: AtomicBool::new(false),
        });
        let app = build_router(Arc::clone(&shared));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let serve_events = self.events.clone();
        let task = tokio::spawn(async move {
            // After a requested shutdown, serve returns cleanly; any
            // error here is a real fault and goes on the event queue.
            let result = axum::serve(tcp, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                tracing::error!(addr = %local_addr, %error, "event listener failed");
                let _ = serve_events
                    .send(Event::Failure(DriverError::ListenerServe(error)))
                    .await;
            }
        });

        if let Err(reason) = probe_liveness(local_addr).await {
            let _ = shutdown_tx.send(());
            return Err(DriverError::ListenerStart { reason });
        }

        tracing::info!(pid = %pid, "event listener started");
        *self.state.lock() = ListenerState::Listening(Runtime {
            pid: pid.clone(),
            local_addr,
            shutdown: shutdown_tx,
            task,
            shared,
        });
        Ok(pid)
    }

    /// Shut the listener down and wait for the serve task to finish.
    ///
    /// Stopping an already stopped listener is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ListenerNotRunning`] if the listener was
    /// never started.
    pub async fn stop(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, ListenerState::Stopped)
        };
        let runtime = match previous {
            ListenerState::Listening(runtime) => runtime,
            ListenerState::Stopped => return Ok(()),
            ListenerState::Unstarted => return Err(DriverError::ListenerNotRunning),
        };

        let _ = runtime.shutdown.send(());
        if let Err(error) = runtime.task.await {
            tracing::warn!(%error, "listener serve task ended abnormally");
        }
        tracing::info!("event listener stopped");
        Ok(())
    }

    /// Flag the listener as aborted; it answers 503 from then on.
    pub fn set_aborted(&self) {
        if let ListenerState::Listening(runtime) = &*self.state.lock() {
            runtime.shared.aborted.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let ListenerState::Listening(runtime) =
            std::mem::replace(&mut *state, ListenerState::Stopped)
        {
            let _ = runtime.shutdown.send(());
        }
    }
}

fn build_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route(wire::LIVENESS_PATH, get(liveness))
        .route("/:pid/:message", post(serve_event))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

async fn serve_event(
    State(shared): State<Arc<Shared>>,
    Path((pid, message)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if shared.aborted.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if pid != shared.pid_prefix {
        tracing::debug!(%pid, "event addressed to an unknown process");
        return StatusCode::NOT_FOUND.into_response();
    }

    // The final path segment has the form flotilla.internal.<EventName>.
    let Some(name) = wire::parse_event_name(&message) else {
        let error = DriverError::MalformedEventPath {
            path: format!("/{pid}/{message}"),
        };
        tracing::warn!(%error, "rejecting inbound event");
        let reply = reply_for(&error);
        enqueue(&shared, Event::Failure(error)).await;
        return reply;
    };

    match decode_event(name, &body) {
        Ok(Event::Unrecognized { name }) => {
            let error = DriverError::UnexpectedEvent { kind: name.clone() };
            tracing::warn!(%error, "rejecting inbound event");
            let reply = reply_for(&error);
            enqueue(&shared, Event::Unrecognized { name }).await;
            reply
        }
        Ok(event) => {
            tracing::debug!(event = event.kind(), bytes = body.len(), "event accepted");
            enqueue(&shared, event).await;
            StatusCode::ACCEPTED.into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "rejecting inbound event");
            let reply = reply_for(&error);
            enqueue(&shared, Event::Failure(error)).await;
            reply
        }
    }
}

/// Map a wire name and body to a queued event.
fn decode_event(name: &str, body: &[u8]) -> Result<Event> {
    let event = match name {
        wire::FRAMEWORK_REGISTERED => Event::Registered(decode(name, body)?),
        wire::FRAMEWORK_REREGISTERED => Event::Reregistered(decode(name, body)?),
        wire::RESOURCE_OFFERS => Event::ResourceOffers(decode(name, body)?),
        wire::RESCIND_RESOURCE_OFFER => Event::OfferRescinded(decode(name, body)?),
        wire::STATUS_UPDATE => Event::StatusUpdate(decode(name, body)?),
        wire::EXECUTOR_TO_FRAMEWORK => Event::FrameworkMessage(decode(name, body)?),
        wire::LOST_SLAVE => Event::SlaveLost(decode(name, body)?),
        other => Event::Unrecognized {
            name: other.to_string(),
        },
    };
    Ok(event)
}

fn decode<M: Message + Default>(name: &str, body: &[u8]) -> Result<M> {
    M::decode(body).map_err(|source| DriverError::EventDecode {
        event: name.to_string(),
        source,
    })
}

fn reply_for(error: &DriverError) -> Response {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, error.to_string()).into_response()
}

async fn enqueue(shared: &Shared, event: Event) {
    if shared.events.send(event).await.is_err() {
        tracing::warn!("event queue closed; dropping inbound event");
    }
}

async fn probe_liveness(addr: SocketAddr) -> std::result::Result<(), String> {
    let url = format!("http://{addr}{}", wire::LIVENESS_PATH);
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| format!("probe client setup failed: {e}"))?;
    match client.get(&url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => Ok(()),
        Ok(response) => Err(format!("liveness probe returned {}", response.status())),
        Err(e) => Err(format!("liveness probe failed: {e}")),
    }
}
