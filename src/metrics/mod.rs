//! Built-in metrics for the relay and dashboard loops.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Change events seen by the relay
//! - Publishes and their duration
//! - Extraction and publish failures
//! - Payloads received and decode failures on the dashboard
//! - Time since the last successful publish
//!
//! # Examples
//!
//! ```rust,no_run
//! use log_relay::bus::{LocalBus, SignalPublisher};
//! use log_relay::core::ChannelIdentity;
//! use log_relay::extract::ContentExtractor;
//! use log_relay::metrics::RelayMetrics;
//! use log_relay::relay::RelayLoop;
//! use opentelemetry::global;
//!
//! # async fn example(changes: tokio::sync::mpsc::Receiver<log_relay::watch::ChangeEvent>) {
//! let bus = LocalBus::default();
//! let relay = RelayLoop::new(
//!     changes,
//!     ContentExtractor::new("logs/log.txt", 1024),
//!     SignalPublisher::new(bus.sink(), ChannelIdentity::default()),
//! )
//! .with_metrics(RelayMetrics::new(global::meter("log-relay")));
//! relay.run().await;
//! # }
//! ```

mod relay_metrics;

pub use relay_metrics::RelayMetrics;
