//! Binds page triggers to handlers that update a display surface: a click
//! counter and an asynchronous temperature fetch.

use std::sync::Arc;

use shared::domain::SurfaceMode;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

pub mod counter;
pub mod error;
pub mod fetch;
pub mod page;
pub mod sequencer;
pub mod source;

pub use counter::{ClickCounter, ClickCounterHandler};
pub use error::{FetchError, PageError};
pub use fetch::{
    ErrorDisplay, FetchOptions, FetchOutcome, FetchResult, StatusPolicy, TemperatureFetchHandler,
};
pub use page::{Activation, DisplaySurface, Page, SurfaceSnapshot, TextSurface, Trigger};
pub use sequencer::{RequestSequencer, WritePolicy};
pub use source::{Endpoint, HttpTemperatureSource, SourceResponse, TemperatureSource};

/// A handler registered on a trigger.
///
/// Every handled activation produces one report of type `T`. Dropping the
/// binding (or calling [`Binding::unbind`]) stops listening; requests that
/// are already in flight still run to completion.
pub struct Binding<T> {
    trigger_id: String,
    listener: JoinHandle<()>,
    reports: mpsc::UnboundedReceiver<T>,
}

impl<T> Binding<T> {
    pub fn trigger_id(&self) -> &str {
        &self.trigger_id
    }

    /// Waits for the next handled activation. Reports arrive in completion
    /// order, which for fetches need not match activation order.
    pub async fn next_report(&mut self) -> Option<T> {
        self.reports.recv().await
    }

    pub fn unbind(self) {
        debug!(trigger = %self.trigger_id, "handler unbound");
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Registers a click counter on `trigger`. Each activation increments
/// `counter` and writes `Clicked {n} time(s)!` to `display` using `mode`.
/// Reports carry the new count.
///
/// Must be called inside a tokio runtime.
pub fn bind_click_counter(
    trigger: &Trigger,
    display: Arc<dyn DisplaySurface>,
    counter: Arc<ClickCounter>,
    mode: SurfaceMode,
) -> Binding<u64> {
    let handler = ClickCounterHandler::new(counter, display, mode);
    let mut activations = trigger.listen();
    let (reports_tx, reports) = mpsc::unbounded_channel();

    let listener = tokio::spawn(async move {
        while let Some(activation) = activations.recv().await {
            let clicks = handler.on_activation();
            debug!(trigger = %activation.trigger_id, activation = %activation.seq, clicks, "click handled");
            let _ = reports_tx.send(clicks);
        }
    });

    Binding {
        trigger_id: trigger.id().to_string(),
        listener,
        reports,
    }
}

/// Registers a temperature fetch against `endpoint` on `trigger`.
///
/// Must be called inside a tokio runtime.
pub fn bind_temperature_fetch(
    trigger: &Trigger,
    display: Arc<dyn DisplaySurface>,
    endpoint: Endpoint,
    options: FetchOptions,
) -> Binding<FetchResult> {
    let source = Arc::new(HttpTemperatureSource::new(endpoint));
    bind_fetch_handler(trigger, TemperatureFetchHandler::new(source, display, options))
}

/// Registers an already built fetch handler on `trigger`. Every activation
/// spawns its own request; none is deduplicated, queued or cancelled.
pub fn bind_fetch_handler(
    trigger: &Trigger,
    handler: TemperatureFetchHandler,
) -> Binding<FetchResult> {
    let mut activations = trigger.listen();
    let (reports_tx, reports) = mpsc::unbounded_channel();

    let listener = tokio::spawn(async move {
        while let Some(activation) = activations.recv().await {
            let task = handler.on_activation();
            let reports_tx = reports_tx.clone();
            tokio::spawn(async move {
                match task.await {
                    Ok(result) => {
                        let _ = reports_tx.send(result);
                    }
                    Err(error) => {
                        warn!(trigger = %activation.trigger_id, %error, "fetch task aborted");
                    }
                }
            });
        }
    });

    Binding {
        trigger_id: trigger.id().to_string(),
        listener,
        reports,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
