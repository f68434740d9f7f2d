use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{domain::SurfaceMode, protocol::click_message};
use tracing::debug;

use crate::page::DisplaySurface;

/// Click count shared by the handlers that own it. Starts at 0 and never
/// decreases.
#[derive(Debug, Default)]
pub struct ClickCounter {
    clicks: AtomicU64,
}

impl ClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one activation and returns the new count.
    pub fn increment(&self) -> u64 {
        let previous = self
            .clicks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(1))
            })
            .unwrap_or_else(|n| n);
        previous.saturating_add(1)
    }

    pub fn get(&self) -> u64 {
        self.clicks.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
pub struct ClickCounterHandler {
    counter: Arc<ClickCounter>,
    display: Arc<dyn DisplaySurface>,
    mode: SurfaceMode,
}

impl ClickCounterHandler {
    pub fn new(
        counter: Arc<ClickCounter>,
        display: Arc<dyn DisplaySurface>,
        mode: SurfaceMode,
    ) -> Self {
        Self {
            counter,
            display,
            mode,
        }
    }

    pub fn counter(&self) -> &Arc<ClickCounter> {
        &self.counter
    }

    pub fn on_activation(&self) -> u64 {
        let clicks = self.counter.increment();
        debug!(clicks, mode = ?self.mode, "click counter activated");
        self.display.write(self.mode, &click_message(clicks));
        clicks
    }
}
