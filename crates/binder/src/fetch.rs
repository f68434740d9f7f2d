use std::sync::Arc;

use shared::{
    domain::{RequestSeq, ResponseShape, DEFAULT_SITE},
    protocol::{decode_reading, TemperatureReading},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    error::FetchError,
    page::DisplaySurface,
    sequencer::{RequestSequencer, WritePolicy},
    source::TemperatureSource,
};

/// Whether the response status is consulted before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Non-success responses are not decoded and never reach the display.
    #[default]
    CheckStatus,
    /// The body is decoded whatever the status.
    IgnoreStatus,
}

/// What the display shows when a fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDisplay {
    /// Leave the display as it was; the failure is only logged.
    #[default]
    Silent,
    /// Replace the display text with a short error message.
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub site: String,
    pub shape: ResponseShape,
    pub status_policy: StatusPolicy,
    pub error_display: ErrorDisplay,
    pub write_policy: WritePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            site: DEFAULT_SITE.to_string(),
            shape: ResponseShape::Flat,
            status_policy: StatusPolicy::CheckStatus,
            error_display: ErrorDisplay::Silent,
            write_policy: WritePolicy::LatestTriggered,
        }
    }
}

impl FetchOptions {
    /// Checks the status and reads `becken.<site>.temp`.
    pub fn checked_nested() -> Self {
        Self {
            shape: ResponseShape::Nested,
            status_policy: StatusPolicy::CheckStatus,
            ..Self::default()
        }
    }

    /// Decodes unconditionally and reads a top-level `temp`.
    pub fn unchecked_flat() -> Self {
        Self {
            shape: ResponseShape::Flat,
            status_policy: StatusPolicy::IgnoreStatus,
            ..Self::default()
        }
    }

    pub fn with_error_display(mut self, error_display: ErrorDisplay) -> Self {
        self.error_display = error_display;
        self
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The reading was written to the display.
    Displayed {
        seq: RequestSeq,
        reading: TemperatureReading,
    },
    /// A later request had already written; this reading was dropped.
    Stale {
        seq: RequestSeq,
        reading: TemperatureReading,
    },
}

impl FetchOutcome {
    pub fn seq(&self) -> RequestSeq {
        match self {
            Self::Displayed { seq, .. } | Self::Stale { seq, .. } => *seq,
        }
    }

    pub fn reading(&self) -> &TemperatureReading {
        match self {
            Self::Displayed { reading, .. } | Self::Stale { reading, .. } => reading,
        }
    }
}

pub type FetchResult = Result<FetchOutcome, FetchError>;

/// Starts one independent request per activation and writes the decoded
/// temperature into the display.
#[derive(Clone)]
pub struct TemperatureFetchHandler {
    source: Arc<dyn TemperatureSource>,
    display: Arc<dyn DisplaySurface>,
    sequencer: Arc<RequestSequencer>,
    options: Arc<FetchOptions>,
}

impl TemperatureFetchHandler {
    pub fn new(
        source: Arc<dyn TemperatureSource>,
        display: Arc<dyn DisplaySurface>,
        options: FetchOptions,
    ) -> Self {
        Self {
            source,
            display,
            sequencer: Arc::new(RequestSequencer::new(options.write_policy)),
            options: Arc::new(options),
        }
    }

    pub fn sequencer(&self) -> &Arc<RequestSequencer> {
        &self.sequencer
    }

    /// Spawns the request for one activation. Earlier requests still in
    /// flight are neither cancelled nor awaited. Must be called inside a
    /// tokio runtime.
    pub fn on_activation(&self) -> JoinHandle<FetchResult> {
        let seq = self.sequencer.issue();
        let handler = self.clone();
        tokio::spawn(async move { handler.run(seq).await })
    }

    async fn run(&self, seq: RequestSeq) -> FetchResult {
        match self.fetch_reading(seq).await {
            Ok(reading) => Ok(self.display_reading(seq, reading)),
            Err(error) => {
                warn!(%seq, source = %self.source.describe(), %error, "temperature fetch failed");
                let message = match self.options.error_display {
                    ErrorDisplay::Message => Some(error.user_message()),
                    ErrorDisplay::Silent => None,
                };
                // A failed request still completes, so older readings that
                // resolve later stay stale.
                self.sequencer.complete(seq, || {
                    if let Some(message) = &message {
                        self.display.replace_text(message);
                    }
                });
                Err(error)
            }
        }
    }

    async fn fetch_reading(&self, seq: RequestSeq) -> Result<TemperatureReading, FetchError> {
        debug!(%seq, source = %self.source.describe(), "temperature fetch started");
        let response = self.source.get().await?;

        if self.options.status_policy == StatusPolicy::CheckStatus && !response.is_success() {
            return Err(FetchError::Status(response.status));
        }

        let reading = decode_reading(self.options.shape, &self.options.site, &response.body)?;
        Ok(reading)
    }

    fn display_reading(&self, seq: RequestSeq, reading: TemperatureReading) -> FetchOutcome {
        let message = reading.message();
        let written = self
            .sequencer
            .complete(seq, || self.display.replace_text(&message));

        if written {
            info!(%seq, temp = reading.temp, "temperature displayed");
            FetchOutcome::Displayed { seq, reading }
        } else {
            debug!(%seq, "discarding stale temperature reading");
            FetchOutcome::Stale { seq, reading }
        }
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
