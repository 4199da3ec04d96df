use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep_until(&self, deadline: Instant);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline.into()).await
    }
}

/// Measures test durations and signals time limits.
#[derive(Clone)]
pub struct Stopwatch {
    tl: Duration,
    clock: Arc<dyn Clock>,
}

impl Stopwatch {
    pub fn new(tl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { tl, clock }
    }

    pub fn with_system_clock(tl: Duration) -> Self {
        Self::new(tl, Arc::new(SystemClock))
    }

    pub fn tl(&self) -> Duration {
        self.tl
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Time passed since `since`, or zero when absent.
    pub fn elapsed(&self, since: Option<Instant>) -> Duration {
        since
            .map(|since| self.clock.now().saturating_duration_since(since))
            .unwrap_or_default()
    }

    /// Resolves with the time limit once it has passed since `since`.
    ///
    /// Never resolves when `since` is absent or the limit is zero.
    pub async fn time_limit(&self, since: Option<Instant>) -> Duration {
        match since {
            Some(since) if !self.tl.is_zero() => {
                self.clock.sleep_until(since + self.tl).await;
                self.tl
            }
            _ => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch").field("tl", &self.tl).finish()
    }
}

/// Manually driven clock. Time only moves on [`advance`](FakeClock::advance).
#[derive(Debug)]
pub struct FakeClock {
    state: Mutex<FakeClockState>,
    blockers_changed: Notify,
}

#[derive(Debug)]
struct FakeClockState {
    now: Instant,
    sleepers: Vec<Sleeper>,
}

#[derive(Debug)]
struct Sleeper {
    deadline: Instant,
    wake: oneshot::Sender<()>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeClockState {
                now: Instant::now(),
                sleepers: Vec::new(),
            }),
            blockers_changed: Notify::new(),
        }
    }

    /// Moves time forward and wakes every sleeper whose deadline has been reached.
    pub fn advance(&self, d: Duration) {
        let due: Vec<Sleeper> = {
            let mut state = self.lock();
            state.now += d;
            let now = state.now;
            let (due, pending) = std::mem::take(&mut state.sleepers)
                .into_iter()
                .partition(|s| s.deadline <= now);
            state.sleepers = pending;
            due
        };
        for sleeper in due {
            let _ = sleeper.wake.send(());
        }
    }

    /// Number of callers currently suspended in [`Clock::sleep_until`].
    pub fn blocker_count(&self) -> usize {
        self.lock()
            .sleepers
            .iter()
            .filter(|s| !s.wake.is_closed())
            .count()
    }

    /// Waits until at least `n` callers are sleeping on this clock.
    pub async fn block_until(&self, n: usize) {
        loop {
            let changed = self.blockers_changed.notified();
            if self.blocker_count() >= n {
                return;
            }
            changed.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    async fn sleep_until(&self, deadline: Instant) {
        let woken = {
            let mut state = self.lock();
            if deadline <= state.now {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.sleepers.push(Sleeper { deadline, wake: tx });
            rx
        };
        self.blockers_changed.notify_waiters();
        let _ = woken.await;
    }
}
