//! Coalesces bursts of settings edits into one durable write.
//!
//! Callers only mark the state dirty with [`SaveDebouncer::touch`]. A
//! background task owns the deadline: each touch pushes it back by the
//! configured window, and only that task's timer performs the write. The write
//! callback reads the current state when it fires, so the last edit wins.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::utils::OptimizerResult;

#[derive(Debug, Clone)]
pub struct DebouncerConfig {
    /// Quiet period after the last edit before writing
    pub window: Duration,
}

impl Default for DebouncerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(500),
        }
    }
}

enum Signal {
    Touch,
    Flush(oneshot::Sender<()>),
}

/// Counts touches and how many of them a finished write has covered.
#[derive(Default)]
struct Progress {
    touched: AtomicU64,
    written: AtomicU64,
}

pub struct SaveDebouncer {
    signals: mpsc::UnboundedSender<Signal>,
    progress: Arc<Progress>,
}

impl SaveDebouncer {
    /// Spawns the timer task. `write` is called once per quiet period that
    /// followed at least one touch. Must be called from within a runtime.
    pub fn start<F, Fut>(config: DebouncerConfig, write: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = OptimizerResult<()>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Arc::new(Progress::default());
        tokio::spawn(run(config.window, rx, progress.clone(), write));
        Self {
            signals: tx,
            progress,
        }
    }

    /// Marks the state dirty and restarts the quiet period.
    pub fn touch(&self) {
        self.progress.touched.fetch_add(1, Ordering::SeqCst);
        if self.signals.send(Signal::Touch).is_err() {
            self.progress.touched.fetch_sub(1, Ordering::SeqCst);
            warn!("Save debouncer stopped, dropping pending write");
        }
    }

    /// True from the first touch until a write that started after it has
    /// finished.
    pub fn is_pending(&self) -> bool {
        let touched = self.progress.touched.load(Ordering::SeqCst);
        self.progress.written.load(Ordering::SeqCst) < touched
    }

    /// Performs a pending write now instead of waiting for the deadline.
    /// Returns once the write (if any) has finished.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.signals.send(Signal::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn run<F, Fut>(
    window: Duration,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    progress: Arc<Progress>,
    write: F,
)
where
    F: Fn() -> Fut,
    Fut: Future<Output = OptimizerResult<()>>,
{
    let mut deadline: Option<Instant> = None;

    loop {
        let signal = match deadline {
            None => signals.recv().await,
            Some(at) => tokio::select! {
                signal = signals.recv() => signal,
                _ = sleep_until(at) => {
                    deadline = None;
                    persist(&progress, &write).await;
                    continue;
                }
            },
        };

        match signal {
            Some(Signal::Touch) => {
                deadline = Some(Instant::now() + window);
            }
            Some(Signal::Flush(ack)) => {
                if deadline.take().is_some() {
                    persist(&progress, &write).await;
                }
                let _ = ack.send(());
            }
            None => {
                // Owner dropped: don't lose the last edit.
                if deadline.is_some() {
                    persist(&progress, &write).await;
                }
                debug!("Save debouncer shutting down");
                break;
            }
        }
    }
}

async fn persist<F, Fut>(progress: &Progress, write: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = OptimizerResult<()>>,
{
    let covers = progress.touched.load(Ordering::SeqCst);
    debug!("Writing debounced settings");
    // No retry: a failed write is reported and dropped.
    if let Err(e) = write().await {
        warn!("Debounced settings save failed: {}", e);
    }
    progress.written.store(covers, Ordering::SeqCst);
}
