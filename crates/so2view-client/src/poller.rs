use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Stopped,
    Running,
}

/// Cancellation flag a sleeping ticker can be woken by.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep until `deadline` or cancellation. Returns true if cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let (flag, wake) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = wake
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Shortest interval a poller ticks at; shorter ones are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

type Pass = Arc<dyn Fn() + Send + Sync>;

struct Run {
    token: CancelToken,
    handle: JoinHandle<()>,
}

/// Runs a pass immediately on `start`, then once per interval until `stop`.
///
/// The ticker lives on its own thread. `start` while running does nothing, so
/// there is never more than one ticker per poller. Passes from successive runs
/// share one gate, so a restart never overlaps a pass left over from the
/// previous run.
pub struct Poller {
    interval: Duration,
    pass: Pass,
    gate: Arc<Mutex<()>>,
    run: Mutex<Option<Run>>,
}

impl Poller {
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
            Some(run) if !run.handle.is_finished() => PollerState::Running,
            _ => PollerState::Stopped,
        }
    }

    /// Stopped → Running. A no-op while already running.
    pub fn start(&self) {
        let mut run = self.lock();
        if run.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("poller already running");
            return;
        }

        let token = CancelToken::new();
        let ticker = token.clone();
        let pass = Arc::clone(&self.pass);
        let gate = Arc::clone(&self.gate);
        let interval = self.interval;
        let handle = thread::spawn(move || tick(&ticker, interval, &gate, &*pass));

        info!(?interval, "poller started");
        *run = Some(Run { token, handle });
    }

    /// Running → Stopped without waiting.
    ///
    /// A pass already executing runs to completion. At most one pass that was
    /// already due when this was called may still start; none after that.
    pub fn stop(&self) {
        if let Some(run) = self.lock().take() {
            run.token.cancel();
            info!("poller stopped");
        }
    }

    /// Stop and wait for an in-flight pass to finish.
    ///
    /// Does not wait when called from within a pass.
    pub fn stop_and_join(&self) {
        let Some(run) = self.lock().take() else {
            return;
        };
        run.token.cancel();
        if run.handle.thread().id() != thread::current().id() {
            let _ = run.handle.join();
        }
        info!("poller stopped");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            run.token.cancel();
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}

fn tick(
    token: &CancelToken,
    interval: Duration,
    gate: &Mutex<()>,
    pass: &(dyn Fn() + Send + Sync),
) {
    let mut next = Instant::now();
    loop {
        if token.wait_until(next) {
            break;
        }
        let started = Instant::now();
        {
            let _pass = gate.lock().unwrap_or_else(PoisonError::into_inner);
            if token.is_cancelled() {
                break;
            }
            pass();
        }
        // Fixed rate; a slow pass pushes the next one out instead of bunching.
        next = (started + interval).max(Instant::now());
    }
    debug!("ticker exited");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting(interval: Duration) -> (Poller, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let poller = Poller::new(interval, move || {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (poller, count)
    }

    fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn first_pass_runs_immediately() {
        let (poller, count) = counting(Duration::from_secs(60));
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 1));
        assert_eq!(poller.state(), PollerState::Running);
        poller.stop();
        assert_eq!(poller.state(), PollerState::Stopped);
    }

    #[test]
    fn passes_repeat_on_the_interval() {
        let (poller, count) = counting(Duration::from_millis(20));
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) >= 4));
        poller.stop();
    }

    #[test]
    fn start_twice_keeps_one_ticker() {
        let (poller, count) = counting(Duration::from_secs(60));
        poller.start();
        poller.start();
        poller.start();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        poller.stop();
    }

    #[test]
    fn no_pass_begins_after_stop() {
        let interval = Duration::from_millis(30);
        let (poller, count) = counting(interval);
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) >= 2));

        poller.stop();
        let at_stop = count.load(Ordering::SeqCst);
        // A pass that was already under way may still land.
        thread::sleep(interval);
        let settled = count.load(Ordering::SeqCst);
        assert!(settled <= at_stop + 1);

        thread::sleep(interval * 3);
        assert_eq!(count.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn in_flight_pass_finishes_after_stop() {
        let entered = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (e, f) = (Arc::clone(&entered), Arc::clone(&finished));
        let poller = Poller::new(Duration::from_millis(10), move || {
            e.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(80));
            f.fetch_add(1, Ordering::SeqCst);
        });

        poller.start();
        assert!(wait_for(Duration::from_secs(2), || entered.load(Ordering::SeqCst) == 1));
        poller.stop_and_join();

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restart_after_stop() {
        let (poller, count) = counting(Duration::from_secs(60));
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 1));
        poller.stop();
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 2));
        poller.stop();
    }

    #[test]
    fn restart_never_overlaps_a_pass_from_the_previous_run() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let passes = Arc::new(AtomicUsize::new(0));
        let (a, p, n) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&passes));
        let poller = Poller::new(Duration::from_millis(20), move || {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(300));
            a.fetch_sub(1, Ordering::SeqCst);
            n.fetch_add(1, Ordering::SeqCst);
        });

        poller.start();
        thread::sleep(Duration::from_millis(50));
        poller.stop();
        poller.start();
        assert_eq!(poller.state(), PollerState::Running);

        assert!(wait_for(Duration::from_secs(3), || passes.load(Ordering::SeqCst) >= 2));
        poller.stop_and_join();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_interval_is_raised_to_the_minimum() {
        let (poller, count) = counting(Duration::ZERO);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);
        poller.start();
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) >= 3));
        poller.stop_and_join();
    }

    #[test]
    fn token_wakes_a_long_wait() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait_until(Instant::now() + Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
