//! Session lifecycle: bring the driver up, run the dispatch loop, tear down.
//!
//! The controller owns everything a session needs (directory, broadcast hub,
//! stop signal) and nothing is global, so several controllers can coexist in
//! one process. State transitions come from [`DispatchState::on_event`]; this
//! module performs the actions it returns.
//!
//! ```text
//! start():  configure -> register notifications -> open session
//!           (on failure: undo what succeeded, Idle -> Terminated)
//! run():    loop { stop? | next notification -> dispatch }
//!           then: close session -> deregister -> release driver -> release options
//!           then: clear directory
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use zwave_sync_core::{Action, DispatchState, LifecycleEvent, NodeDirectory, StopReason};
use zwave_sync_driver::{notification_channel, DeviceDriver, DriverOptions, NotificationStream};

use crate::config::Config;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{ManagerError, ProcessingError, StartupError, TeardownError, TeardownStep};
use crate::hub::BroadcastHub;
use crate::manager::NodeManager;
use crate::metrics::ManagerMetrics;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// What ended the session.
    pub reason: StopReason,
    /// Teardown steps that did not succeed.
    pub teardown_failures: Vec<TeardownError>,
}

/// Cooperative, idempotent stop signal for a running session.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Ask the session to stop. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        if !self.tx.send_replace(true) {
            info!("stop requested");
        }
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Read-only view of the session state.
#[derive(Debug, Clone)]
pub struct StateWatch {
    rx: watch::Receiver<DispatchState>,
}

impl StateWatch {
    /// The state right now.
    pub fn current(&self) -> DispatchState {
        self.rx.borrow().clone()
    }

    /// Wait until the session is running, or has ended without running.
    pub async fn running(&mut self) -> DispatchState {
        self.wait_for(|state| state.is_running() || state.is_terminated())
            .await
    }

    /// Wait until the session has fully ended.
    pub async fn terminated(&mut self) -> DispatchState {
        self.wait_for(DispatchState::is_terminated).await
    }

    async fn wait_for(&mut self, done: impl FnMut(&DispatchState) -> bool) -> DispatchState {
        let reached = self.rx.wait_for(done).await.map(|state| state.clone());
        // The controller is gone; report the last state it published.
        reached.unwrap_or_else(|_| self.rx.borrow().clone())
    }
}

struct ActiveSession {
    path: String,
    stream: NotificationStream,
}

/// Drives one driver session from start to teardown.
pub struct LifecycleController<D> {
    driver: Arc<D>,
    config: Config,
    directory: Arc<NodeDirectory>,
    metrics: Arc<ManagerMetrics>,
    hub: BroadcastHub,
    query_complete: Arc<AtomicBool>,
    dispatcher: NotificationDispatcher<D>,
    state: watch::Sender<DispatchState>,
    stop: StopHandle,
    session: Option<ActiveSession>,
    started_at: Instant,
}

impl<D> std::fmt::Debug for LifecycleController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &*self.state.borrow())
            .field("nodes", &self.directory.len())
            .field("session", &self.session.as_ref().map(|s| s.path.as_str()))
            .finish()
    }
}

impl<D: DeviceDriver + 'static> LifecycleController<D> {
    /// Create an idle controller for `driver`.
    pub fn new(driver: Arc<D>, config: Config) -> Self {
        let directory = Arc::new(NodeDirectory::new());
        let metrics = Arc::new(ManagerMetrics::default());
        let hub = BroadcastHub::new(config.broadcast.capacity, Arc::clone(&metrics));
        let query_complete = Arc::new(AtomicBool::new(false));
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&driver),
            Arc::clone(&directory),
            hub.clone(),
            Arc::clone(&metrics),
            Arc::clone(&query_complete),
            config.broadcast.clone(),
        );
        let (state, _) = watch::channel(DispatchState::new());
        let (stop, _) = watch::channel(false);

        Self {
            driver,
            config,
            directory,
            metrics,
            hub,
            query_complete,
            dispatcher,
            state,
            stop: StopHandle { tx: Arc::new(stop) },
            session: None,
            started_at: Instant::now(),
        }
    }

    /// Configure the driver, register for notifications and open a session
    /// on the controller at `session_path`.
    ///
    /// On failure every step that succeeded is undone, the controller moves
    /// to `Terminated`, and the run loop can never be entered.
    pub async fn start(&mut self, session_path: &str) -> Result<(), StartupError> {
        if !matches!(self.state(), DispatchState::Idle) {
            return Err(StartupError::AlreadyStarted);
        }

        // A stop while idle has nothing to stop; only stops from here on count.
        if self.stop.tx.send_replace(false) {
            debug!("discarding stop requested before start");
        }

        info!(path = session_path, "starting driver session");
        let (sink, stream) = notification_channel(self.config.session.notification_queue);
        let driver = Arc::clone(&self.driver);
        let options = self.config.driver.clone();
        let path = session_path.to_string();

        let brought_up =
            tokio::task::spawn_blocking(move || bring_up(&*driver, &options, sink, &path))
                .await
                .unwrap_or_else(|e| Err((StartupError::Task(e.to_string()), Vec::new())));

        match brought_up {
            Ok(()) => {
                self.session = Some(ActiveSession {
                    path: session_path.to_string(),
                    stream,
                });
                if self
                    .apply(LifecycleEvent::Registered)
                    .contains(&Action::EnterRunLoop)
                {
                    info!(path = session_path, "driver session open");
                }
                Ok(())
            }
            Err((err, undo)) => {
                error!(error = %err, "driver session failed to start");
                let actions = self.apply(LifecycleEvent::StartFailed {
                    error: err.to_string(),
                });
                if actions.contains(&Action::UndoStartup) {
                    let failures = self.run_steps(session_path, undo).await;
                    self.record_teardown_failures(&failures);
                }
                Err(err)
            }
        }
    }

    /// Process notifications until stopped or a fatal error, then tear down.
    ///
    /// A stop signal wins over a notification that is ready at the same
    /// moment; a notification already being processed is always finished.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`ProcessingError`] that ended the session, or
    /// [`ManagerError::NotRunning`] if the session was never started.
    pub async fn run(&mut self) -> Result<SessionReport, ManagerError> {
        let Some(mut session) = self.session.take().filter(|_| self.state().is_running()) else {
            return Err(ManagerError::NotRunning(self.state().label()));
        };

        let mut stop = self.stop.tx.subscribe();
        let mut fatal = None;
        loop {
            if *stop.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                _ = stop.changed() => {}
                next = session.stream.next() => {
                    let Some(event) = next else {
                        fatal = Some(ProcessingError::QueueClosed);
                        break;
                    };
                    if let Err(e) = self.dispatcher.dispatch(event).await {
                        fatal = Some(e);
                        break;
                    }
                }
            }
        }

        let event = match &fatal {
            None => LifecycleEvent::StopRequested,
            Some(e) => LifecycleEvent::FatalError {
                error: e.to_string(),
            },
        };

        // Unblock driver threads waiting for queue room before the driver is
        // asked to close.
        session.stream.close();

        let mut teardown_failures = Vec::new();
        if self.apply(event).contains(&Action::BeginTeardown) {
            teardown_failures = self.teardown(&session.path).await;
        }

        if self
            .apply(LifecycleEvent::TeardownCompleted)
            .contains(&Action::ClearDirectory)
        {
            self.directory.clear();
            self.query_complete.store(false, Ordering::Release);
        }

        match fatal {
            Some(e) => Err(e.into()),
            None => {
                info!(path = %session.path, "driver session closed");
                Ok(SessionReport {
                    reason: StopReason::Requested,
                    teardown_failures,
                })
            }
        }
    }

    /// Ask the session to stop. Idempotent; safe before `start`.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// A stop handle usable from other tasks.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatchState {
        self.state.borrow().clone()
    }

    /// A watch on the lifecycle state usable from other tasks.
    pub fn state_watch(&self) -> StateWatch {
        StateWatch {
            rx: self.state.subscribe(),
        }
    }

    /// The request facade bound to this session.
    pub fn manager(&self) -> NodeManager<D> {
        NodeManager::new(
            Arc::clone(&self.driver),
            Arc::clone(&self.directory),
            self.hub.clone(),
            Arc::clone(&self.metrics),
            Arc::clone(&self.query_complete),
            self.state_watch(),
            self.started_at,
        )
    }

    fn apply(&mut self, event: LifecycleEvent) -> Vec<Action> {
        let (next, actions) = self.state().on_event(event);
        debug!(state = %next, ?actions, "lifecycle transition");
        self.state.send_replace(next);
        actions
    }

    async fn teardown(&self, path: &str) -> Vec<TeardownError> {
        let secs = self.config.session.teardown_timeout_secs;
        info!(path, "tearing down driver session");

        let failures = match tokio::time::timeout(
            Duration::from_secs(secs),
            self.run_steps(path, TeardownStep::ORDER.to_vec()),
        )
        .await
        {
            Ok(failures) => failures,
            Err(_) => {
                error!(secs, "driver teardown timed out");
                vec![TeardownError::TimedOut { secs }]
            }
        };
        self.record_teardown_failures(&failures);
        failures
    }

    async fn run_steps(&self, path: &str, steps: Vec<TeardownStep>) -> Vec<TeardownError> {
        let driver = Arc::clone(&self.driver);
        let path = path.to_string();
        tokio::task::spawn_blocking(move || release(&*driver, &path, &steps))
            .await
            .unwrap_or_else(|e| vec![TeardownError::Task(e.to_string())])
    }

    fn record_teardown_failures(&self, failures: &[TeardownError]) {
        self.metrics
            .teardown_failures_total
            .fetch_add(failures.len() as u64, Ordering::Relaxed);
    }
}

/// Startup steps. On failure, also returns the steps that undo what succeeded.
fn bring_up<D: DeviceDriver + ?Sized>(
    driver: &D,
    options: &DriverOptions,
    sink: zwave_sync_driver::NotificationSink,
    path: &str,
) -> Result<(), (StartupError, Vec<TeardownStep>)> {
    driver
        .configure(options)
        .map_err(|e| (StartupError::Configure(e), Vec::new()))?;

    driver.register_notifications(sink).map_err(|e| {
        (
            StartupError::Register(e),
            vec![TeardownStep::ReleaseDriver, TeardownStep::ReleaseOptions],
        )
    })?;

    if !driver.open_session(path) {
        return Err((
            StartupError::OpenSession {
                path: path.to_string(),
            },
            vec![
                TeardownStep::DeregisterNotifications,
                TeardownStep::ReleaseDriver,
                TeardownStep::ReleaseOptions,
            ],
        ));
    }
    Ok(())
}

/// Run every step in order; a failing step never stops the ones after it.
fn release<D: DeviceDriver + ?Sized>(
    driver: &D,
    path: &str,
    steps: &[TeardownStep],
) -> Vec<TeardownError> {
    steps
        .iter()
        .filter_map(|&step| {
            let result = match step {
                TeardownStep::CloseSession => {
                    if driver.close_session(path) {
                        Ok(())
                    } else {
                        Err(format!("no open session on {path}"))
                    }
                }
                TeardownStep::DeregisterNotifications => {
                    driver.deregister_notifications().map_err(|e| e.to_string())
                }
                TeardownStep::ReleaseDriver => driver.release_driver().map_err(|e| e.to_string()),
                TeardownStep::ReleaseOptions => {
                    driver.release_options().map_err(|e| e.to_string())
                }
            };
            match result {
                Ok(()) => {
                    debug!(%step, "teardown step done");
                    None
                }
                Err(reason) => {
                    warn!(%step, %reason, "teardown step failed");
                    Some(TeardownError::Step { step, reason })
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_sync_driver::{DriverCall, MockDriver};
    use zwave_sync_types::{NodeKey, NotificationEvent};

    const PATH: &str = "/dev/ttyACM0";

    fn controller(driver: &MockDriver) -> LifecycleController<MockDriver> {
        LifecycleController::new(Arc::new(driver.clone()), Config::default())
    }

    #[tokio::test]
    async fn start_opens_session() {
        let driver = MockDriver::new();
        let mut controller = controller(&driver);

        controller.start(PATH).await.unwrap();

        assert!(controller.state().is_running());
        assert!(driver.is_registered());
        assert_eq!(driver.open_sessions(), vec![PATH.to_string()]);
        assert!(driver.options().is_some());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let driver = MockDriver::new();
        let mut controller = controller(&driver);
        controller.start(PATH).await.unwrap();
        assert_eq!(
            controller.start(PATH).await,
            Err(StartupError::AlreadyStarted)
        );
    }

    #[tokio::test]
    async fn refused_session_undoes_registration() {
        let driver = MockDriver::new();
        driver.refuse_next_session();
        let mut controller = controller(&driver);

        let err = controller.start(PATH).await.unwrap_err();

        assert_eq!(err, StartupError::OpenSession { path: PATH.into() });
        assert!(controller.state().is_terminated());
        assert!(!driver.is_registered());
        assert_eq!(
            driver.teardown_calls(),
            vec![
                DriverCall::DeregisterNotifications,
                DriverCall::ReleaseDriver,
                DriverCall::ReleaseOptions,
            ]
        );
        assert!(matches!(
            controller.run().await,
            Err(ManagerError::NotRunning("terminated"))
        ));
    }

    #[tokio::test]
    async fn configure_failure_undoes_nothing() {
        let driver = MockDriver::new();
        driver.fail_next_configure("missing device database");
        let mut controller = controller(&driver);

        let err = controller.start(PATH).await.unwrap_err();

        assert!(matches!(err, StartupError::Configure(_)));
        assert_eq!(driver.calls(), vec![DriverCall::Configure]);
    }

    #[tokio::test]
    async fn run_before_start_is_an_error() {
        let mut controller = controller(&MockDriver::new());
        assert!(matches!(
            controller.run().await,
            Err(ManagerError::NotRunning("idle"))
        ));
    }

    #[tokio::test]
    async fn stop_before_run_tears_down_without_processing() {
        let driver = MockDriver::new();
        let mut controller = controller(&driver);
        controller.start(PATH).await.unwrap();
        driver
            .emit(NotificationEvent::NodeAdded {
                node: NodeKey::new(1, 5),
            })
            .await
            .unwrap();

        controller.stop();
        controller.stop();
        let report = controller.run().await.unwrap();

        assert_eq!(report.reason, StopReason::Requested);
        assert!(report.teardown_failures.is_empty());
        assert!(controller.state().is_terminated());
        assert!(!driver
            .calls()
            .contains(&DriverCall::NodeQuery(NodeKey::new(1, 5))));
    }

    #[tokio::test]
    async fn timed_out_teardown_is_reported() {
        let driver = MockDriver::new();
        let mut config = Config::default();
        config.session.teardown_timeout_secs = 1;
        let mut controller = LifecycleController::new(Arc::new(driver.clone()), config);
        controller.start(PATH).await.unwrap();
        driver.delay_close(Duration::from_secs(2));

        controller.stop();
        let report = controller.run().await.unwrap();

        assert_eq!(
            report.teardown_failures,
            vec![TeardownError::TimedOut { secs: 1 }]
        );
        assert!(controller.state().is_terminated());
    }

    #[tokio::test]
    async fn blocked_callback_thread_does_not_stall_teardown() {
        let driver = MockDriver::new();
        let mut config = Config::default();
        config.session.notification_queue = 2;
        config.session.teardown_timeout_secs = 2;
        let mut controller = LifecycleController::new(Arc::new(driver.clone()), config);
        controller.start(PATH).await.unwrap();

        // Keeps the queue full until the consumer goes away.
        let sink = driver.sink().unwrap();
        driver.attach_callback_thread(std::thread::spawn(move || {
            let event = NotificationEvent::NodeAdded {
                node: NodeKey::new(1, 5),
            };
            while sink.blocking_send(event.clone()).is_ok() {}
        }));

        controller.stop();
        let started = Instant::now();
        let report = controller.run().await.unwrap();

        assert!(report.teardown_failures.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            driver.teardown_calls(),
            vec![
                DriverCall::CloseSession(PATH.into()),
                DriverCall::DeregisterNotifications,
                DriverCall::ReleaseDriver,
                DriverCall::ReleaseOptions,
            ]
        );
    }

    #[test]
    fn stop_handle_is_idempotent() {
        let controller = controller(&MockDriver::new());
        let handle = controller.stop_handle();
        assert!(!handle.is_stopped());
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        assert_eq!(controller.state(), DispatchState::Idle);
    }
}
