//! FRITZ!Box call monitor and traffic statistics integration
//!
//! This crate connects to an AVM FRITZ!Box router and publishes what it
//! sees to a home automation hub:
//!
//! - Call events from the router's call monitor socket (TCP port 1012) as a
//!   text sensor plus a "Call" switch that is on while a call is connected
//! - WAN traffic counters and rates from the UPnP control service
//!   (port 49000) as meter and custom sensors
//!
//! The hub is abstracted behind [`hub::SensorSink`] and
//! [`hub::SwitchRegistry`]; [`hub::InMemoryHub`] is the bundled
//! implementation.

// Core modules
pub mod callmonitor;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod session;
pub mod statistics;
pub mod transport;

// Re-export main types for convenience
pub use callmonitor::CallEvent;
pub use config::MonitorConfig;
pub use error::{FritzboxError, Result};
pub use hub::InMemoryHub;
pub use session::{ConnectionState, RouterSession};
pub use statistics::{StatisticsPoller, TrafficStatistics};
