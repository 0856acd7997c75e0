//! Ingestion of upstream sensor readings.
//!
//! [`Fetcher::poll`] runs one cycle: GET the feed with a bounded timeout,
//! decode the envelope, then upsert every row independently. Rows that fail
//! to decode or to store are logged and counted, never fatal to the batch.
//! [`run_periodic`] drives `poll` on a fixed period until shutdown.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{AppError, AppResult};
use crate::models::{ApiEnvelope, RawSensorReading};
use crate::store::SensorStore;

// ---

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub processed: usize,
    pub failed: usize,
}

/// Default cap on a single upstream response body.
pub const DEFAULT_MAX_FEED_BYTES: usize = 32 * 1024 * 1024;

pub struct Fetcher {
    client: reqwest::Client,
    store: Arc<dyn SensorStore>,
    max_body_bytes: usize,
}

impl Fetcher {
    // ---
    /// Build a fetcher whose HTTP requests give up after `timeout`.
    pub fn new(store: Arc<dyn SensorStore>, timeout: Duration) -> AppResult<Self> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            store,
            max_body_bytes: DEFAULT_MAX_FEED_BYTES,
        })
    }

    /// Reject upstream bodies larger than `max` bytes.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Run one ingestion cycle against `source_url`.
    ///
    /// Fails only when the fetch, the body size check or the envelope decode
    /// fails. Per-row failures are reported in [`PollReport::failed`].
    pub async fn poll(&self, source_url: &str) -> AppResult<PollReport> {
        // ---
        debug!(url = %source_url, "fetching sensor feed");

        let response = self
            .client
            .get(source_url)
            .send()
            .await?
            .error_for_status()?;
        let body = self.read_body(response).await?;

        let envelope: ApiEnvelope = serde_json::from_slice(&body)?;
        if !envelope.error.is_null() {
            warn!(
                status = %envelope.status,
                error = %envelope.error,
                "upstream reported an error alongside its payload"
            );
        }

        let total = envelope.response.len();
        let mut report = PollReport::default();

        for (i, item) in envelope.response.into_iter().enumerate() {
            let reading = match serde_json::from_value::<RawSensorReading>(item)
                .map_err(Into::into)
                .and_then(RawSensorReading::to_reading)
            {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(row = i, error = %e, "skipping malformed reading");
                    report.failed += 1;
                    continue;
                }
            };

            match self.store.upsert_reading(&reading).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!(
                        row = i,
                        deviceid = %reading.deviceid,
                        timestamp = reading.timestamp,
                        error = %e,
                        "failed to upsert reading"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            total,
            processed = report.processed,
            failed = report.failed,
            "poll cycle complete"
        );
        Ok(report)
    }

    /// Collect the response body, giving up once it exceeds the cap.
    async fn read_body(&self, mut response: reqwest::Response) -> AppResult<Vec<u8>> {
        // ---
        let max = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max as u64 {
                return Err(AppError::Upstream(format!(
                    "feed body of {len} bytes exceeds limit of {max}"
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max {
                return Err(AppError::Upstream(format!(
                    "feed body exceeds limit of {max} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Poll `source_url` every `period` until `shutdown` flips to `true`.
///
/// The first cycle starts immediately. Each cycle runs to completion before
/// the next tick is taken; ticks missed during a slow cycle are delayed, not
/// replayed in a burst. Cycle errors are logged and retried next tick.
pub async fn run_periodic(
    fetcher: Arc<Fetcher>,
    source_url: String,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                info!("ingestion loop stopping");
                return;
            }
        }
        if *shutdown.borrow() {
            return;
        }

        cycle += 1;
        let span = info_span!("poll", cycle, url = %source_url);
        if let Err(e) = fetcher.poll(&source_url).instrument(span).await {
            error!(cycle, error = %e, "ingestion cycle aborted");
        }
    }
}
