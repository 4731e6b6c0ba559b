//! Fixed-interval scheduler running a collector on a dedicated thread.
//!
//! The thread owns a current-thread tokio runtime whose only event sources
//! are the interval timer and the shutdown signal. Ticks are strictly
//! serialized: `collect()` runs to completion before the next event is polled.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::traits::{Collector, SchedulerError};

/// Name of the scheduler thread.
const THREAD_NAME: &str = "output-monitor";

/// Lifecycle state of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    /// Created, not yet started.
    Idle,
    /// Ticking on the scheduler thread.
    Running,
    /// Shut down; cannot be restarted.
    Stopped,
}

/// Handles to a running scheduler thread.
struct Worker {
    shutdown_tx: watch::Sender<bool>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Recurring timer that drives one [`Collector`].
pub struct Scheduler {
    interval: Duration,
    state: SchedulerState,
    worker: Option<Worker>,
}

impl Scheduler {
    /// Create an idle scheduler ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: SchedulerState::Idle,
            worker: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Start ticking `collector` on the scheduler thread.
    ///
    /// The first tick fires one interval after start.
    ///
    /// # Errors
    /// Returns `SchedulerError::InvalidState` unless the scheduler is idle,
    /// `SchedulerError::ZeroInterval` for a zero interval, or
    /// `SchedulerError::Spawn` if the thread cannot be created.
    pub fn start<C: Collector>(&mut self, collector: Arc<C>) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::InvalidState(self.state));
        }
        if self.interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let interval = self.interval;
        let name = collector.name().to_string();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                run_loop(collector.as_ref(), interval, shutdown_rx);
                let _ = done_tx.send(());
            })
            .map_err(SchedulerError::Spawn)?;

        self.worker = Some(Worker {
            shutdown_tx,
            done_rx,
            handle,
        });
        self.state = SchedulerState::Running;

        tracing::info!(collector = %name, interval = ?interval, "Scheduler started");
        Ok(())
    }

    /// Stop scheduling and wait for any in-flight tick to finish.
    ///
    /// Once this returns, no collection work runs. Calling it on an idle or
    /// stopped scheduler only marks it stopped.
    pub fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.stop(None)
    }

    /// Like [`shutdown`](Self::shutdown) but waits at most `timeout`.
    ///
    /// On timeout the thread is detached and finishes its current tick on its
    /// own; no further tick is started.
    pub fn shutdown_with_timeout(&mut self, timeout: Duration) -> Result<(), SchedulerError> {
        self.stop(Some(timeout))
    }

    fn stop(&mut self, timeout: Option<Duration>) -> Result<(), SchedulerError> {
        self.state = SchedulerState::Stopped;
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // The receiver is gone only if the thread already exited.
        let _ = worker.shutdown_tx.send(true);

        if let Some(timeout) = timeout {
            match worker.done_rx.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(timeout = ?timeout, "Scheduler shutdown timed out");
                    return Err(SchedulerError::ShutdownTimeout(timeout));
                }
            }
        }

        worker
            .handle
            .join()
            .map_err(|_| SchedulerError::Panicked)?;
        tracing::info!("Scheduler shutdown complete");
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Scheduler shutdown on drop failed");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Body of the scheduler thread.
fn run_loop<C: Collector>(collector: &C, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(
                error = %e,
                backtrace = %Backtrace::capture(),
                "Scheduler loop failed to start"
            );
            return;
        }
    };

    runtime.block_on(async {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // Only `true` is ever sent; a dropped sender also means stop.
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => run_tick(collector),
            }
        }
    });

    tracing::debug!(collector = %collector.name(), "Scheduler loop stopped");
}

/// Execute a single collection cycle, containing any failure.
fn run_tick<C: Collector>(collector: &C) {
    let name = collector.name();
    let start = Instant::now();
    tracing::debug!(collector = %name, "Running collection");

    match panic::catch_unwind(AssertUnwindSafe(|| collector.collect())) {
        Ok(Ok(())) => {
            let duration_ms = start.elapsed().as_millis();
            tracing::debug!(collector = %name, duration_ms, "Collection succeeded");
        }
        Ok(Err(e)) => {
            tracing::error!(
                collector = %name,
                error = %e,
                backtrace = %Backtrace::capture(),
                "Collection failed"
            );
        }
        Err(payload) => {
            tracing::error!(
                collector = %name,
                panic = %panic_message(payload.as_ref()),
                backtrace = %Backtrace::capture(),
                "Collection panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorError;
    use crate::introspect::IntrospectionError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(20);

    /// What the mock collector does on each tick.
    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Sleep(Duration),
    }

    struct MockCollector {
        behavior: Behavior,
        calls: AtomicUsize,
        in_flight: AtomicBool,
        finished: AtomicUsize,
    }

    impl MockCollector {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                in_flight: AtomicBool::new(false),
                finished: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Collector for MockCollector {
        fn name(&self) -> &str {
            "mock"
        }

        fn collect(&self) -> Result<(), CollectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(IntrospectionError::Unavailable("mock".into()).into()),
                Behavior::Panic => panic!("mock collector panic"),
                Behavior::Sleep(d) => {
                    self.in_flight.store(true, Ordering::SeqCst);
                    thread::sleep(d);
                    self.in_flight.store(false, Ordering::SeqCst);
                    self.finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        }
    }

    /// Poll `cond` until it holds or `limit` elapses.
    fn wait_until(limit: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_scheduler_lifecycle() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(TICK);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.interval(), TICK);

        scheduler.start(Arc::clone(&collector)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);

        assert!(wait_until(Duration::from_secs(2), || collector.calls() >= 3));

        scheduler.shutdown().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_no_tick_after_shutdown() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || collector.calls() >= 1));

        scheduler.shutdown().unwrap();
        let calls = collector.calls();
        thread::sleep(TICK * 5);
        assert_eq!(collector.calls(), calls);
    }

    #[test]
    fn test_failing_tick_keeps_schedule() {
        let collector = MockCollector::new(Behavior::Fail);
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || collector.calls() >= 3));
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn test_panicking_tick_keeps_schedule() {
        let collector = MockCollector::new(Behavior::Panic);
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || collector.calls() >= 3));
        // The thread itself never panics, so shutdown joins cleanly.
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_waits_for_in_flight_tick() {
        let collector = MockCollector::new(Behavior::Sleep(Duration::from_millis(200)));
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            collector.in_flight.load(Ordering::SeqCst)
        }));
        scheduler.shutdown().unwrap();

        assert!(!collector.in_flight.load(Ordering::SeqCst));
        assert_eq!(collector.finished.load(Ordering::SeqCst), collector.calls());
    }

    #[test]
    fn test_shutdown_with_timeout_expires() {
        let collector = MockCollector::new(Behavior::Sleep(Duration::from_millis(500)));
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            collector.in_flight.load(Ordering::SeqCst)
        }));
        let err = scheduler
            .shutdown_with_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::ShutdownTimeout(_)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_shutdown_with_timeout_completes() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        scheduler
            .shutdown_with_timeout(Duration::from_secs(2))
            .unwrap();
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(TICK);
        scheduler.start(Arc::clone(&collector)).unwrap();

        let err = scheduler.start(Arc::clone(&collector)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState(SchedulerState::Running)));

        scheduler.shutdown().unwrap();
        let err = scheduler.start(collector).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidState(SchedulerState::Stopped)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(Duration::ZERO);

        let err = scheduler.start(Arc::clone(&collector)).unwrap_err();
        assert!(matches!(err, SchedulerError::ZeroInterval));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.shutdown().unwrap();
        assert_eq!(collector.calls(), 0);
    }

    #[test]
    fn test_shutdown_without_start() {
        let mut scheduler = Scheduler::new(TICK);
        scheduler.shutdown().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        // Idempotent.
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn test_first_tick_waits_one_interval() {
        let collector = MockCollector::new(Behavior::Succeed);
        let mut scheduler = Scheduler::new(Duration::from_secs(60));
        scheduler.start(Arc::clone(&collector)).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(collector.calls(), 0);
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
