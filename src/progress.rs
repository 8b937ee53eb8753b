//! Progress presenter
//!
//! While a generation request is in flight a fixed list of nostalgia facts is
//! cycled on a timer. The timer lives exactly as long as the [`ProgressGuard`]
//! returned by [`ProgressPresenter::start`]; dropping the guard stops it on
//! every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// Time each fact stays on screen.
pub const FACT_INTERVAL: Duration = Duration::from_millis(4000);

pub const NOSTALGIA_FACTS: [&str; 7] = [
    "Nostalgia can counteract loneliness and anxiety, making you feel more connected and optimistic.",
    "The term 'nostalgia' was coined in 1688 to describe intense homesickness felt by soldiers.",
    "Listening to old music is a powerful trigger for vivid nostalgic memories, often bringing back rich emotions.",
    "Smell is the sense most closely linked to memory, which is why a scent can instantly transport you back in time.",
    "Engaging with your 'inner child' through play is linked to improved problem-solving skills and reduced stress.",
    "Sharing nostalgic stories with loved ones can strengthen relationships and create a sense of shared history.",
    "The brain often edits memories, making nostalgic moments feel even more perfect and meaningful than they actually were.",
];

/// Zero-based index that wraps from `len - 1` back to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactCycle {
    len: usize,
    index: usize,
}

impl FactCycle {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn advance(&mut self) -> usize {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
        self.index
    }
}

pub struct ProgressPresenter {
    facts: Arc<Vec<String>>,
    interval: Duration,
    index: Arc<watch::Sender<usize>>,
    active: Arc<AtomicBool>,
}

impl ProgressPresenter {
    pub fn new(facts: Vec<String>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            facts: Arc::new(facts),
            interval,
            index: Arc::new(tx),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The built-in nostalgia facts at the default interval.
    pub fn nostalgia() -> Self {
        Self::with_interval(FACT_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(
            NOSTALGIA_FACTS.iter().map(|f| f.to_string()).collect(),
            interval,
        )
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }

    pub fn index(&self) -> usize {
        *self.index.borrow()
    }

    pub fn current_fact(&self) -> Option<&str> {
        self.facts.get(self.index()).map(String::as_str)
    }

    /// Receiver that observes every index change.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.index.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Reset to the first fact and start the timer. Must run inside a tokio runtime.
    pub fn start(&self) -> ProgressGuard {
        self.index.send_replace(0);
        self.active.store(true, Ordering::SeqCst);

        let index = Arc::clone(&self.index);
        let len = self.facts.len();
        let period = self.interval;
        let first_tick = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut cycle = FactCycle::new(len);
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let next = cycle.advance();
                trace!(index = next, "Advancing progress fact");
                index.send_replace(next);
            }
        });

        ProgressGuard {
            handle,
            active: Arc::clone(&self.active),
        }
    }
}

impl Default for ProgressPresenter {
    fn default() -> Self {
        Self::nostalgia()
    }
}

/// Scope of a running fact timer.
pub struct ProgressGuard {
    handle: JoinHandle<()>,
    active: Arc<AtomicBool>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.handle.abort();
        self.active.store(false, Ordering::SeqCst);
    }
}
