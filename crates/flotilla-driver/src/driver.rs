//! The scheduler driver: lifecycle operations and outbound calls.

use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use flotilla_core::{host, ProcessId};
use flotilla_proto::{Filters, FrameworkInfo, OfferId, TaskId, TaskInfo};

use crate::callbacks::SchedulerCallbacks;
use crate::config::DriverConfig;
use crate::dispatch;
use crate::error::{DriverError, Result};
use crate::event::Event;
use crate::lifecycle::{self, DriverState};
use crate::listener::EventListener;
use crate::master_client::MasterClient;

/// State shared by every handle to one driver.
pub(crate) struct DriverInner {
    pub(crate) framework: FrameworkInfo,
    pub(crate) callbacks: SchedulerCallbacks,
    pub(crate) client: MasterClient,
    pub(crate) listener: EventListener,
    pub(crate) config: DriverConfig,
    pub(crate) status: Mutex<DriverState>,
    pub(crate) connected: AtomicBool,
    pub(crate) failover: AtomicBool,
    pub(crate) started: AtomicBool,
    pub(crate) control: watch::Sender<DriverState>,
    pub(crate) events: mpsc::Sender<Event>,
}

/// Cheaply cloneable handle to a scheduler driver.
///
/// The driver connects a framework to a master: it registers on
/// [`start`](Self::start), receives master events through its HTTP
/// listener, dispatches them to the application's
/// [`SchedulerCallbacks`], and sends framework calls back out.
#[derive(Clone)]
pub struct SchedulerDriver {
    inner: Arc<DriverInner>,
}

impl SchedulerDriver {
    /// Create a driver with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingMaster`] when `master` is empty.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; construction spawns
    /// the event dispatcher task.
    pub fn new(
        callbacks: SchedulerCallbacks,
        framework: FrameworkInfo,
        master: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(callbacks, framework, master, DriverConfig::default())
    }

    /// Create a driver with explicit configuration.
    ///
    /// An empty framework user is filled from the current user and a
    /// missing hostname from the local host name, so the master always
    /// sees a complete descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingMaster`] when `master` is empty.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; construction spawns
    /// the event dispatcher task.
    pub fn with_config(
        callbacks: SchedulerCallbacks,
        mut framework: FrameworkInfo,
        master: impl Into<String>,
        config: DriverConfig,
    ) -> Result<Self> {
        let master = master.into();
        if master.is_empty() {
            return Err(DriverError::MissingMaster);
        }

        if framework.user.is_empty() {
            framework.user = host::current_user().unwrap_or_else(|| "unknown".to_string());
        }
        if framework.hostname.as_deref().map_or(true, str::is_empty) {
            framework.hostname =
                Some(host::local_hostname().unwrap_or_else(|| "unknown".to_string()));
        }

        let capacity = config.event_queue_capacity.max(1);
        let (events, queue) = mpsc::channel(capacity);
        let (control, _) = watch::channel(DriverState::NotStarted);

        let inner = Arc::new(DriverInner {
            client: MasterClient::new(master, &config),
            listener: EventListener::new(events.clone()),
            framework,
            callbacks,
            config,
            status: Mutex::new(DriverState::NotStarted),
            connected: AtomicBool::new(false),
            failover: AtomicBool::new(false),
            started: AtomicBool::new(false),
            control,
            events,
        });
        dispatch::spawn(Arc::downgrade(&inner), queue);

        Ok(Self { inner })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bring the listener up and register the framework.
    ///
    /// Returns [`DriverState::Running`] on success. If the listener
    /// cannot start or the master rejects the registration, the driver
    /// lands in [`DriverState::Aborted`] with the failure queued as an
    /// error event.
    pub async fn start(&self) -> DriverState {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            let state = self.state();
            tracing::warn!(%state, "start called more than once");
            return state;
        }

        tracing::info!(
            master = %self.inner.client.master(),
            framework = %self.inner.framework.name,
            "starting scheduler driver"
        );

        let pid = match self.inner.listener.start(&self.inner.config).await {
            Ok(pid) => pid,
            Err(error) => {
                tracing::error!(%error, "failed to start event listener");
                let state = self.set_state(DriverState::Aborted);
                self.enqueue(Event::Failure(error)).await;
                return state;
            }
        };

        if let Err(error) = self
            .inner
            .client
            .register_framework(&pid, &self.inner.framework)
            .await
        {
            tracing::error!(%error, "framework registration failed");
            let state = self.set_state(DriverState::Aborted);
            self.enqueue(Event::Failure(error)).await;
            return state;
        }

        self.set_state(DriverState::Running)
    }

    /// Wait until the driver leaves [`DriverState::Running`].
    ///
    /// Returns immediately with the current state if the driver is not
    /// running.
    pub async fn join(&self) -> DriverState {
        let mut control = self.inner.control.subscribe();
        let state = self.state();
        if state != DriverState::Running {
            return state;
        }
        // The sender lives inside our own inner state, so the channel
        // stays open for as long as this handle exists.
        let result = control.wait_for(|state| state.is_terminal()).await;
        match result {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    /// Start the driver and block until it terminates.
    pub async fn run(&self) -> DriverState {
        let state = self.start().await;
        if state != DriverState::Running {
            return state;
        }
        self.join().await
    }

    /// Shut the driver down.
    ///
    /// With `failover` set the framework stays registered so a
    /// successor can take over; otherwise the framework is
    /// unregistered first. A rejected unregistration lands the driver
    /// in [`DriverState::Aborted`] instead of
    /// [`DriverState::Stopped`].
    pub async fn stop(&self, failover: bool) -> DriverState {
        let current = self.state();
        if !current.can_stop() {
            tracing::warn!(state = %current, "stop ignored");
            return current;
        }

        tracing::info!(
            framework = %self.inner.framework.name,
            failover,
            "stopping scheduler driver"
        );

        let pid = self.process_id();
        let mut pending_error = None;

        if let Err(error) = self.inner.listener.stop().await {
            pending_error = Some(error);
        }

        let mut next = DriverState::Stopped;
        if self.is_connected() && !failover {
            let framework_id = self.inner.framework.id.clone().unwrap_or_default();
            if let Some(pid) = &pid {
                match self
                    .inner
                    .client
                    .unregister_framework(pid, &framework_id)
                    .await
                {
                    Ok(()) => {
                        self.inner.connected.store(false, Ordering::SeqCst);
                    }
                    Err(error) => {
                        tracing::error!(%error, "failed to unregister framework");
                        next = DriverState::Aborted;
                        pending_error = Some(error);
                    }
                }
            } else {
                tracing::warn!("connected without a process identity; skipping unregistration");
            }
        }

        // Terminal state is published before the failure event so the
        // dispatcher drops it instead of re-aborting.
        let next = self.set_state(next);
        self.inner.control.send_replace(next);
        if let Some(error) = pending_error {
            self.enqueue(Event::Failure(error)).await;
        }
        tracing::info!(state = %next, "scheduler driver stopped");
        next
    }

    /// Abort the driver after an unrecoverable failure.
    ///
    /// A connected framework is deactivated on the master, the
    /// listener starts refusing events, and anyone blocked in
    /// [`join`](Self::join) is released. Does nothing unless the
    /// driver is running.
    pub async fn abort(&self) -> DriverState {
        if !self.try_begin_abort() {
            let state = self.state();
            tracing::warn!(%state, "abort ignored; driver is not running");
            return state;
        }
        self.finish_abort().await;
        DriverState::Aborted
    }

    // ========================================================================
    // Framework calls
    // ========================================================================

    /// Ask the master to kill a task.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotConnected`] unless the driver is
    /// running with a confirmed registration, and otherwise propagates
    /// transport and rejection errors from the call.
    pub async fn kill_task(&self, task_id: &TaskId) -> Result<()> {
        let from = self.ensure_connected()?;
        self.inner.client.kill_task(&from, task_id).await
    }

    /// Launch tasks on the resources of the given offers.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotConnected`] unless the driver is
    /// running with a confirmed registration, and otherwise propagates
    /// transport and rejection errors from the call.
    pub async fn launch_tasks(
        &self,
        offer_ids: Vec<OfferId>,
        tasks: Vec<TaskInfo>,
        filters: Option<Filters>,
    ) -> Result<()> {
        let from = self.ensure_connected()?;
        let framework_id = self.inner.framework.id.clone().unwrap_or_default();
        self.inner
            .client
            .launch_tasks(&from, &framework_id, offer_ids, tasks, filters)
            .await
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        *self.inner.status.lock()
    }

    /// Whether the master has confirmed our registration.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Process identity of the started listener.
    #[must_use]
    pub fn process_id(&self) -> Option<ProcessId> {
        self.inner.listener.process_id()
    }

    /// Address the event listener is bound to.
    #[must_use]
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.inner.listener.local_addr()
    }

    /// The framework descriptor this driver registers.
    #[must_use]
    pub fn framework(&self) -> &FrameworkInfo {
        &self.inner.framework
    }

    /// The master address this driver talks to.
    #[must_use]
    pub fn master(&self) -> &str {
        self.inner.client.master()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn from_inner(inner: Arc<DriverInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn callbacks(&self) -> &SchedulerCallbacks {
        &self.inner.callbacks
    }

    /// Bookkeeping for a confirmed registration.
    pub(crate) fn mark_connected(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
        self.inner.failover.store(false, Ordering::SeqCst);
    }

    /// Put an event on the queue, applying backpressure.
    pub(crate) async fn enqueue(&self, event: Event) {
        if self.inner.events.send(event).await.is_err() {
            tracing::warn!("event queue closed; dropping event");
        }
    }

    /// Route an internal failure through the abort path.
    ///
    /// Exactly one failure wins the transition out of
    /// [`DriverState::Running`] and reaches the error callback; every
    /// later one is logged and dropped.
    pub(crate) async fn handle_error(&self, error: DriverError) {
        if !self.try_begin_abort() {
            tracing::warn!(%error, state = %self.state(), "dropping error; driver is not running");
            return;
        }
        tracing::error!(%error, "scheduler driver error");
        self.finish_abort().await;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if let Some(callback) = &self.inner.callbacks.error {
                callback(self, error);
            }
        }));
        if outcome.is_err() {
            tracing::error!("error callback panicked");
        }
    }

    /// Claim the transition from running to aborted.
    fn try_begin_abort(&self) -> bool {
        let mut status = self.inner.status.lock();
        if *status == DriverState::Running {
            *status = DriverState::Aborted;
            true
        } else {
            false
        }
    }

    async fn finish_abort(&self) {
        tracing::warn!(framework = %self.inner.framework.name, "aborting scheduler driver");

        if self.is_connected() {
            let framework_id = self.inner.framework.id.clone().unwrap_or_default();
            if let Some(pid) = self.process_id() {
                if let Err(error) = self
                    .inner
                    .client
                    .deactivate_framework(&pid, &framework_id)
                    .await
                {
                    tracing::error!(%error, "failed to deactivate framework");
                    self.enqueue(Event::Failure(error)).await;
                }
            }
        } else {
            tracing::info!("master not connected; skipping deactivation");
        }

        self.inner.listener.set_aborted();
        self.inner.control.send_replace(DriverState::Aborted);
        tracing::info!(state = %DriverState::Aborted, "scheduler driver aborted");
    }

    fn set_state(&self, to: DriverState) -> DriverState {
        let mut status = self.inner.status.lock();
        let from = *status;
        debug_assert!(
            from == to || lifecycle::is_valid_transition(from, to),
            "invalid driver transition {from} -> {to}"
        );
        *status = to;
        to
    }

    fn ensure_connected(&self) -> Result<ProcessId> {
        if self.state() != DriverState::Running || !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        self.process_id().ok_or(DriverError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use flotilla_proto::{
        FrameworkId, FrameworkRegisteredMessage, MasterInfo, StatusUpdate, StatusUpdateMessage,
        TaskState, TaskStatus,
    };

    fn test_framework() -> FrameworkInfo {
        FrameworkInfo::new("test-user", "test-framework", None)
    }

    fn test_driver(callbacks: SchedulerCallbacks) -> SchedulerDriver {
        SchedulerDriver::new(callbacks, test_framework(), "127.0.0.1:5050").unwrap()
    }

    fn registered_message() -> FrameworkRegisteredMessage {
        FrameworkRegisteredMessage {
            framework_id: FrameworkId::new("fw-1"),
            master_info: MasterInfo::new("master-1", 123_456, 12_345),
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn driver_requires_a_master_address() {
        let result = SchedulerDriver::new(SchedulerCallbacks::new(), test_framework(), "");
        assert!(matches!(result, Err(DriverError::MissingMaster)));
    }

    #[tokio::test]
    async fn framework_defaults_are_filled_in() {
        let driver = SchedulerDriver::new(
            SchedulerCallbacks::new(),
            FrameworkInfo::new("", "test-framework", None),
            "127.0.0.1:5050",
        )
        .unwrap();

        let expected_user =
            flotilla_core::host::current_user().unwrap_or_else(|| "unknown".to_string());
        assert_eq!(driver.framework().user, expected_user);
        assert!(driver
            .framework()
            .hostname
            .as_deref()
            .is_some_and(|hostname| !hostname.is_empty()));
    }

    #[tokio::test]
    async fn explicit_framework_fields_are_kept() {
        let mut framework = test_framework();
        framework.hostname = Some("machine1".to_string());
        let driver =
            SchedulerDriver::new(SchedulerCallbacks::new(), framework, "127.0.0.1:5050").unwrap();

        assert_eq!(driver.framework().user, "test-user");
        assert_eq!(driver.framework().hostname.as_deref(), Some("machine1"));
        assert_eq!(driver.master(), "127.0.0.1:5050");
    }

    #[tokio::test]
    async fn fresh_driver_is_not_started() {
        let driver = test_driver(SchedulerCallbacks::new());

        assert_eq!(driver.state(), DriverState::NotStarted);
        assert!(!driver.is_connected());
        assert!(driver.process_id().is_none());
        assert_eq!(driver.join().await, DriverState::NotStarted);
        assert_eq!(driver.stop(false).await, DriverState::NotStarted);
        assert_eq!(driver.abort().await, DriverState::NotStarted);
    }

    #[tokio::test]
    async fn calls_require_a_connection() {
        let driver = test_driver(SchedulerCallbacks::new());
        let error = driver.kill_task(&TaskId::new("test-task-1")).await;
        assert!(matches!(error, Err(DriverError::NotConnected)));

        let error = driver.launch_tasks(Vec::new(), Vec::new(), None).await;
        assert!(matches!(error, Err(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn duplicate_registration_events_are_ignored() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let callbacks = SchedulerCallbacks {
            registered: Some(Box::new(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..SchedulerCallbacks::default()
        };
        let driver = test_driver(callbacks);

        driver.enqueue(Event::Registered(registered_message())).await;
        driver.enqueue(Event::Registered(registered_message())).await;

        wait_until(|| driver.is_connected()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrecognized_event_aborts_a_running_driver() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callbacks = SchedulerCallbacks {
            error: Some(Box::new(move |_, error| {
                *sink.lock() = Some(error.to_string());
            })),
            ..SchedulerCallbacks::default()
        };
        let driver = test_driver(callbacks);
        driver.set_state(DriverState::Running);

        driver
            .enqueue(Event::Unrecognized {
                name: "MysteryMessage".to_string(),
            })
            .await;

        wait_until(|| driver.state() == DriverState::Aborted).await;
        wait_until(|| seen.lock().is_some()).await;
        let message = seen.lock().clone().unwrap();
        assert!(message.contains("MysteryMessage"), "got: {message}");
    }

    #[tokio::test]
    async fn panicking_callback_aborts_the_driver() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callbacks = SchedulerCallbacks {
            status_update: Some(Box::new(|_, _| panic!("callback exploded"))),
            error: Some(Box::new(move |_, error| {
                *sink.lock() = Some(error.to_string());
            })),
            ..SchedulerCallbacks::default()
        };
        let driver = test_driver(callbacks);
        driver.set_state(DriverState::Running);

        let update = StatusUpdate::new(
            FrameworkId::new("fw-1"),
            TaskStatus::new(TaskId::new("test-task-1"), TaskState::Running),
            1.0,
            vec![1, 2, 3],
        );
        driver
            .enqueue(Event::StatusUpdate(StatusUpdateMessage {
                update,
                pid: None,
            }))
            .await;

        wait_until(|| driver.state() == DriverState::Aborted).await;
        wait_until(|| seen.lock().is_some()).await;
        let message = seen.lock().clone().unwrap();
        assert!(message.contains("status_update"), "got: {message}");
        assert!(message.contains("callback exploded"), "got: {message}");
    }

    #[tokio::test]
    async fn second_error_does_not_reach_the_callback() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let callbacks = SchedulerCallbacks {
            error: Some(Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..SchedulerCallbacks::default()
        };
        let driver = test_driver(callbacks);
        driver.set_state(DriverState::Running);

        driver
            .handle_error(DriverError::UnexpectedEvent {
                kind: "First".to_string(),
            })
            .await;
        driver
            .handle_error(DriverError::UnexpectedEvent {
                kind: "Second".to_string(),
            })
            .await;

        assert_eq!(driver.state(), DriverState::Aborted);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn join_unblocks_when_stopped() {
        let driver = test_driver(SchedulerCallbacks::new());
        driver.set_state(DriverState::Running);

        let waiter = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.join().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        assert_eq!(driver.stop(false).await, DriverState::Stopped);
        let joined = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(joined, DriverState::Stopped);
    }
}
