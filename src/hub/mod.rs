//! Home automation hub interface
//!
//! The monitor never owns device records. It reports readings through a
//! [`SensorSink`] and toggles the call indicator through a
//! [`SwitchRegistry`], which also answers what was last written so redundant
//! writes can be skipped.

pub mod memory;

pub use memory::{InMemoryHub, SensorReading, SensorRecord};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Battery level reported for mains powered sensors
pub const BATTERY_LEVEL_MAINS: u8 = 255;

/// Highest dimmer level a switch understands
pub const MAX_SWITCH_LEVEL: u8 = 15;

/// Address of a sensor on the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorAddress {
    pub node_id: u8,
    pub child_id: u8,
    pub battery_level: u8,
}

impl SensorAddress {
    /// Address a mains powered sensor
    pub const fn new(node_id: u8, child_id: u8) -> Self {
        Self {
            node_id,
            child_id,
            battery_level: BATTERY_LEVEL_MAINS,
        }
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node_id, self.child_id)
    }
}

/// Identity of a switch device record
///
/// Derived from a numeric index and a sub unit so that repeated updates
/// always land on the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchId {
    pub index: u8,
    pub unit: u8,
}

impl SwitchId {
    pub const fn new(index: u8, unit: u8) -> Self {
        Self { index, unit }
    }

    /// Device id as stored by the hub
    pub fn device_id(&self) -> String {
        format!("{:X}{:02X}{:02X}{:02X}", 0, 0, 0, self.index)
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_id(), self.unit)
    }
}

/// On/off state and dimmer level of a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchValue {
    pub on: bool,
    pub level: u8,
}

impl SwitchValue {
    /// Build a value from a percentage, truncating onto `0..=MAX_SWITCH_LEVEL`
    pub fn from_percent(on: bool, percent: f64) -> Self {
        let scaled = (f64::from(MAX_SWITCH_LEVEL) / 100.0) * percent;
        Self {
            on,
            level: scaled.clamp(0.0, f64::from(MAX_SWITCH_LEVEL)) as u8,
        }
    }

    /// Whether writing `self` over `previous` would change nothing
    pub fn is_redundant_after(&self, previous: &SwitchValue) -> bool {
        match (self.on, previous.on) {
            (false, false) => true,
            (true, true) => self.level == previous.level,
            _ => false,
        }
    }
}

/// Sink for sensor readings
#[async_trait]
pub trait SensorSink: Send + Sync {
    /// Publish a free text reading
    async fn send_text_sensor(&self, address: SensorAddress, text: &str, name: &str) -> Result<()>;

    /// Publish a counter reading
    async fn send_meter_sensor(&self, address: SensorAddress, value: f64, name: &str)
        -> Result<()>;

    /// Publish a reading with a custom unit label
    async fn send_custom_sensor(
        &self,
        address: SensorAddress,
        value: f64,
        name: &str,
        unit: &str,
    ) -> Result<()>;
}

/// Read/write access to persisted switch state
#[async_trait]
pub trait SwitchRegistry: Send + Sync {
    /// Last value stored for a switch, `None` if the record does not exist
    async fn last_value(&self, id: &SwitchId) -> Option<SwitchValue>;

    /// Store a new switch value, creating the record if needed
    async fn write_value(&self, id: &SwitchId, value: SwitchValue, name: &str) -> Result<()>;
}
