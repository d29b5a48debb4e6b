//! FIFO admission gate for compression jobs.
//!
//! Unlike `tokio::sync::Semaphore`, the capacity can be changed while jobs are
//! queued and "no limit" is an explicit policy rather than a huge permit count.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// How many jobs may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    /// Maps the `threads` setting: 0 means no limit.
    pub fn from_threads(threads: u32) -> Self {
        match threads {
            0 => Self::Unbounded,
            n => Self::Bounded(n as usize),
        }
    }

    fn admits(&self, running: usize) -> bool {
        match self {
            Self::Bounded(max) => running < *max,
            Self::Unbounded => true,
        }
    }
}

struct LimiterState {
    running: usize,
    capacity: Capacity,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl LimiterState {
    /// Hands free slots to queued callers in arrival order. Waiters whose
    /// acquire future was dropped are skipped.
    fn admit_waiters(&mut self) {
        while self.capacity.admits(self.running) {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            self.running += 1;
            if waiter.send(()).is_err() {
                self.running -= 1;
            }
        }
    }
}

#[derive(Clone)]
pub struct ConcurrencyLimiter {
    state: Arc<Mutex<LimiterState>>,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: Capacity) -> Self {
        debug!("Creating concurrency limiter with capacity {:?}", capacity);
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                running: 0,
                capacity,
                waiters: VecDeque::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // The state stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for a free slot. Callers are admitted in the order they called
    /// `acquire`. The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> Permit {
        let rx = {
            let mut state = self.lock();
            if state.waiters.is_empty() && state.capacity.admits(state.running) {
                state.running += 1;
                return Permit::new(self.clone());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!("Limiter full ({} running), {} queued", state.running, state.waiters.len());
            rx
        };

        let mut pending = PendingAdmission { rx: Some(rx), limiter: self };
        if let Some(rx) = pending.rx.as_mut() {
            // Senders are only dropped after a successful send or when the
            // waiter itself went away, so an error cannot reach this point.
            let _ = rx.await;
        }
        pending.rx = None;
        Permit::new(self.clone())
    }

    /// Frees one slot and admits the next queued caller, if any.
    pub fn release(&self) {
        let mut state = self.lock();
        state.running = state.running.saturating_sub(1);
        state.admit_waiters();
    }

    /// Changes the capacity. Growing it admits queued callers right away;
    /// shrinking it lets running jobs finish.
    pub fn set_capacity(&self, capacity: Capacity) {
        let mut state = self.lock();
        if state.capacity == capacity {
            return;
        }
        debug!("Limiter capacity {:?} -> {:?}", state.capacity, capacity);
        state.capacity = capacity;
        state.admit_waiters();
    }

    pub fn capacity(&self) -> Capacity {
        self.lock().capacity
    }

    /// Jobs currently holding a slot.
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Callers waiting for a slot.
    pub fn queued(&self) -> usize {
        self.lock().waiters.iter().filter(|w| !w.is_closed()).count()
    }
}

/// A held slot. Dropping it releases the slot.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    limiter: Option<ConcurrencyLimiter>,
}

impl Permit {
    fn new(limiter: ConcurrencyLimiter) -> Self {
        Self { limiter: Some(limiter) }
    }

    pub fn release(mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.release();
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.release();
        }
    }
}

/// Cleans up after an `acquire` future dropped while queued: a slot that was
/// handed over but never observed is given back.
struct PendingAdmission<'a> {
    rx: Option<oneshot::Receiver<()>>,
    limiter: &'a ConcurrencyLimiter,
}

impl Drop for PendingAdmission<'_> {
    fn drop(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        rx.close();
        if rx.try_recv().is_ok() {
            self.limiter.release();
        }
    }
}
