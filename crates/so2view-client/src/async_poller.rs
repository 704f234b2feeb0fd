//! Poll scheduler for callers already running a tokio runtime.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::poller::{PollerState, MIN_POLL_INTERVAL};

type Pass = Arc<dyn Fn() + Send + Sync>;

struct Run {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// [`Poller`](crate::Poller) counterpart driven by `tokio::time::interval`.
///
/// Passes are blocking, so each one runs on the blocking pool. As with
/// `Poller`, passes from successive runs never overlap.
pub struct AsyncPoller {
    interval: Duration,
    pass: Pass,
    gate: Arc<Mutex<()>>,
    run: Mutex<Option<Run>>,
}

impl AsyncPoller {
    pub fn new<F>(interval: Duration, pass: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            pass: Arc::new(pass),
            gate: Arc::new(Mutex::new(())),
            run: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        match &*self.lock() {
            Some(run) if !run.task.is_finished() => PollerState::Running,
            _ => PollerState::Stopped,
        }
    }

    /// Start on the current runtime. A no-op while already running.
    pub fn start(&self) -> Result<(), TryCurrentError> {
        let handle = Handle::try_current()?;
        self.start_on(&handle);
        Ok(())
    }

    /// Start on an explicit runtime handle.
    pub fn start_on(&self, handle: &Handle) {
        let mut run = self.lock();
        if run.as_ref().is_some_and(|r| !r.task.is_finished()) {
            debug!("async poller already running");
            return;
        }

        let token = CancellationToken::new();
        let task = handle.spawn(tick(
            token.clone(),
            self.interval,
            Arc::clone(&self.gate),
            Arc::clone(&self.pass),
        ));
        info!(interval = ?self.interval, "async poller started");
        *run = Some(Run { token, task });
    }

    /// Cancel the ticker. A pass already on the blocking pool completes.
    pub fn stop(&self) {
        if let Some(run) = self.lock().take() {
            run.token.cancel();
            info!("async poller stopped");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AsyncPoller {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            run.token.cancel();
        }
    }
}

async fn tick(token: CancellationToken, period: Duration, gate: Arc<Mutex<()>>, pass: Pass) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if token.is_cancelled() {
            break;
        }

        let pass = Arc::clone(&pass);
        let gate = Arc::clone(&gate);
        let cancelled = token.clone();
        let blocking = tokio::task::spawn_blocking(move || {
            let _pass = gate.lock().unwrap_or_else(PoisonError::into_inner);
            if !cancelled.is_cancelled() {
                pass();
            }
        });
        if let Err(err) = blocking.await {
            error!(error = %err, "dispatch pass aborted");
        }
    }
    debug!("async ticker exited");
}
