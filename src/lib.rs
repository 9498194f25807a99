//! # log-relay
//!
//! Relay the content of a watched log file to local subscribers as bus signals.
//!
//! ## Overview
//!
//! `log-relay` wires three small stages into a long-lived loop:
//! - A file-change watcher that emits "may have changed" events
//! - A bounded, lock-aware extractor that snapshots the file's current content
//! - A publisher that broadcasts the snapshot as a one-way signal
//!
//! On the other side, a subscriber polls the bus and hands each decoded
//! payload to a consumer. Every change publishes the latest state of the file
//! (up to the size bound), not a diff.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use log_relay::prelude::*;
//!
//! # async fn example() -> log_relay::error::Result<()> {
//! let settings = SettingsLoader::new().with_file("relay.toml").load()?;
//! let bus = LocalBus::default();
//!
//! let dashboard = DashboardLoop::new(
//!     SignalSubscriber::new(bus.subscribe(&settings.channel), settings.channel.clone()),
//!     |payload: &str| println!("Received message: {}", payload),
//! );
//! tokio::spawn(dashboard.run());
//!
//! let relay = RelayLoop::new(
//!     ChangeWatcher::watch(&settings.log_path)?,
//!     ContentExtractor::new(&settings.log_path, settings.max_payload),
//!     SignalPublisher::new(bus.sink(), settings.channel.clone()),
//! );
//! relay.run().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): notify-backed [`watch::ChangeWatcher`]
//! - `dbus` (default): D-Bus transport in [`bus::dbus`]
//! - `cli` (default): the `log-relay` binary
//! - `metrics`: OpenTelemetry instruments for both loops

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod bus;
pub mod core;
pub mod error;
pub mod extract;
pub mod relay;
pub mod settings;
pub mod watch;
pub mod writer;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::bus::{LocalBus, SignalPublisher, SignalSink, SignalSource, SignalSubscriber};
    pub use crate::core::{ChannelIdentity, LogPayload, Validate};
    pub use crate::error::{RelayError, Result, ValidationError};
    pub use crate::extract::ContentExtractor;
    pub use crate::relay::{DashboardLoop, RelayLoop};
    pub use crate::settings::{RelaySettings, SettingsLoader};
    pub use crate::watch::{ChangeEvent, ChangeSource};

    #[cfg(feature = "file-watch")]
    pub use crate::watch::ChangeWatcher;
}
