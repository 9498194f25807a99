//! Relay metrics tracking using OpenTelemetry.

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector for the relay and dashboard loops.
///
/// Cheap to clone; clones report into the same instruments.
///
/// # Examples
///
/// ```rust,no_run
/// use log_relay::metrics::RelayMetrics;
/// use opentelemetry::global;
/// use std::time::Instant;
///
/// let metrics = RelayMetrics::new(global::meter("log-relay"));
///
/// metrics.record_event();
/// let started = Instant::now();
/// // ... publish ...
/// metrics.record_published(started);
/// ```
#[derive(Clone)]
pub struct RelayMetrics {
    events: Counter<u64>,
    published: Counter<u64>,
    extract_failures: Counter<u64>,
    publish_failures: Counter<u64>,
    publish_duration: Histogram<f64>,
    since_last_publish: Gauge<i64>,
    received: Counter<u64>,
    decode_failures: Counter<u64>,
    last_publish: Arc<parking_lot::Mutex<Instant>>,
}

impl RelayMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let events = meter
            .u64_counter("log_relay.relay.events")
            .with_description("Change events received by the relay loop")
            .build();

        let published = meter
            .u64_counter("log_relay.relay.published")
            .with_description("Payloads handed to the bus")
            .build();

        let extract_failures = meter
            .u64_counter("log_relay.relay.extract_failures")
            .with_description("Change events whose log read failed")
            .build();

        let publish_failures = meter
            .u64_counter("log_relay.relay.publish_failures")
            .with_description("Payloads that could not be published")
            .build();

        let publish_duration = meter
            .f64_histogram("log_relay.relay.publish_duration")
            .with_description("Duration of publish operations in seconds")
            .with_unit("s")
            .build();

        let since_last_publish = meter
            .i64_gauge("log_relay.relay.since_last_publish")
            .with_description("Time since the last successful publish in seconds")
            .with_unit("s")
            .build();

        let received = meter
            .u64_counter("log_relay.dashboard.received")
            .with_description("Payloads received by the dashboard loop")
            .build();

        let decode_failures = meter
            .u64_counter("log_relay.dashboard.decode_failures")
            .with_description("Malformed signals skipped by the dashboard loop")
            .build();

        Self {
            events,
            published,
            extract_failures,
            publish_failures,
            publish_duration,
            since_last_publish,
            received,
            decode_failures,
            last_publish: Arc::new(parking_lot::Mutex::new(Instant::now())),
        }
    }

    /// Record a change event.
    pub fn record_event(&self) {
        self.events.add(1, &[]);
    }

    /// Record a successful publish that started at `start`.
    pub fn record_published(&self, start: Instant) {
        self.published.add(1, &[]);
        self.publish_duration
            .record(start.elapsed().as_secs_f64(), &[]);
        *self.last_publish.lock() = Instant::now();
    }

    /// Record a failed log read.
    pub fn record_extract_failure(&self) {
        self.extract_failures.add(1, &[]);
    }

    /// Record a failed publish.
    pub fn record_publish_failure(&self) {
        self.publish_failures.add(1, &[]);
    }

    /// Record a payload received by the dashboard.
    pub fn record_received(&self) {
        self.received.add(1, &[]);
    }

    /// Record a malformed signal skipped by the dashboard.
    pub fn record_decode_failure(&self) {
        self.decode_failures.add(1, &[]);
    }

    /// Update the time-since-last-publish gauge.
    ///
    /// Meant to be called periodically; a relay whose log has gone quiet
    /// shows up as a growing value.
    pub fn update_since_last_publish(&self) {
        let age_secs = self.last_publish.lock().elapsed().as_secs() as i64;
        self.since_last_publish.record(age_secs, &[]);
    }
}
