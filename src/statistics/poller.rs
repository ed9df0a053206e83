//! WAN traffic statistics
//!
//! Reads the cumulative byte counters and the current byte rates from the
//! router's `WANCommonInterfaceConfig` service and publishes them as four
//! sensors.

use super::soap::{extract_value, SoapClient};
use crate::error::{FritzboxError, Result};
use crate::hub::{SensorAddress, SensorSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const WAN_COMMON_IFC_ENDPOINT: &str = "igdupnp/control/WANCommonIFC1";
pub const WAN_COMMON_IFC_URN: &str = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";
pub const GET_ADDON_INFOS: &str = "GetAddonInfos";

/// Preferred and fallback element name for the sent byte counter
pub const BYTES_SENT_KEYS: [&str; 2] = ["NewX_AVM_DE_TotalBytesSent64", "NewTotalBytesSent"];
/// Preferred and fallback element name for the received byte counter
pub const BYTES_RECEIVED_KEYS: [&str; 2] =
    ["NewX_AVM_DE_TotalBytesReceived64", "NewTotalBytesReceived"];
pub const SEND_RATE_KEY: &str = "NewByteSendRate";
pub const RECEIVE_RATE_KEY: &str = "NewByteReceiveRate";

pub const BYTES_SENT_SENSOR: SensorAddress = SensorAddress::new(1, 1);
pub const BYTES_RECEIVED_SENSOR: SensorAddress = SensorAddress::new(1, 2);
pub const SEND_RATE_SENSOR: SensorAddress = SensorAddress::new(1, 1);
pub const RECEIVE_RATE_SENSOR: SensorAddress = SensorAddress::new(1, 2);

const MEBI: f64 = 1024.0 * 1024.0;

/// Cumulative byte counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl TrafficCounters {
    pub fn sent_mb(&self) -> f64 {
        self.bytes_sent as f64 / MEBI
    }

    pub fn received_mb(&self) -> f64 {
        self.bytes_received as f64 / MEBI
    }
}

/// Instantaneous rates in bytes per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRates {
    pub send_bytes_per_sec: u64,
    pub receive_bytes_per_sec: u64,
}

impl TrafficRates {
    pub fn send_mbps(&self) -> f64 {
        bytes_per_sec_to_mbps(self.send_bytes_per_sec)
    }

    pub fn receive_mbps(&self) -> f64 {
        bytes_per_sec_to_mbps(self.receive_bytes_per_sec)
    }
}

/// One poll's worth of statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStatistics {
    pub counters: TrafficCounters,
    pub rates: TrafficRates,
}

/// Convert a byte rate into megabits per second
pub fn bytes_per_sec_to_mbps(bytes_per_sec: u64) -> f64 {
    bytes_per_sec.saturating_mul(8) as f64 / MEBI
}

fn parse_counter(xml: &str, key: &str) -> Result<u64> {
    let raw =
        extract_value(xml, key).ok_or_else(|| FritzboxError::not_found(format!("<{key}>")))?;
    raw.trim()
        .parse()
        .map_err(|e| FritzboxError::parsing(format!("<{key}> is not a counter ({raw:?}): {e}")))
}

fn parse_counter_with_fallback(xml: &str, keys: &[&str]) -> Result<u64> {
    let key = keys
        .iter()
        .find(|key| extract_value(xml, key).is_some())
        .ok_or_else(|| FritzboxError::not_found(format!("none of {keys:?}")))?;
    parse_counter(xml, key)
}

/// Read the cumulative counters from a `GetAddonInfos` response
pub fn extract_counters(xml: &str) -> Result<TrafficCounters> {
    Ok(TrafficCounters {
        bytes_sent: parse_counter_with_fallback(xml, &BYTES_SENT_KEYS)?,
        bytes_received: parse_counter_with_fallback(xml, &BYTES_RECEIVED_KEYS)?,
    })
}

/// Read the current rates from a `GetAddonInfos` response
pub fn extract_rates(xml: &str) -> Result<TrafficRates> {
    Ok(TrafficRates {
        send_bytes_per_sec: parse_counter(xml, SEND_RATE_KEY)?,
        receive_bytes_per_sec: parse_counter(xml, RECEIVE_RATE_KEY)?,
    })
}

/// Polls the router and publishes traffic sensors
#[derive(Clone)]
pub struct StatisticsPoller {
    soap: SoapClient,
    sensors: Arc<dyn SensorSink>,
    host: String,
}

impl StatisticsPoller {
    pub fn new(soap: SoapClient, sensors: Arc<dyn SensorSink>, host: impl Into<String>) -> Self {
        Self {
            soap,
            sensors,
            host: host.into(),
        }
    }

    /// Fetch statistics once and publish them
    ///
    /// The counters are published before the rates are read, so a response
    /// without rate fields still updates the counter sensors. Failures are
    /// logged here and returned for the caller to ignore or report.
    pub async fn poll(&self) -> Result<TrafficStatistics> {
        let response = match self
            .soap
            .call(WAN_COMMON_IFC_ENDPOINT, WAN_COMMON_IFC_URN, GET_ADDON_INFOS)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Can't get statistics from {}, make sure UPnP is enabled! ({})",
                    self.host, e
                );
                return Err(e);
            }
        };

        let counters = extract_counters(&response).map_err(Self::invalid_response)?;
        self.publish_meter(BYTES_SENT_SENSOR, counters.sent_mb(), "Bytes Send (MB)")
            .await;
        self.publish_meter(
            BYTES_RECEIVED_SENSOR,
            counters.received_mb(),
            "Bytes Received (MB)",
        )
        .await;

        let rates = extract_rates(&response).map_err(Self::invalid_response)?;
        self.publish_rate(SEND_RATE_SENSOR, rates.send_mbps(), "TX mbps")
            .await;
        self.publish_rate(RECEIVE_RATE_SENSOR, rates.receive_mbps(), "RX mbps")
            .await;

        debug!(?counters, ?rates, "Statistics published");
        Ok(TrafficStatistics { counters, rates })
    }

    fn invalid_response(e: FritzboxError) -> FritzboxError {
        error!("Invalid data response received! ({})", e);
        e
    }

    async fn publish_meter(&self, address: SensorAddress, value: f64, name: &str) {
        if let Err(e) = self.sensors.send_meter_sensor(address, value, name).await {
            warn!("Failed to publish {}: {}", name, e);
        }
    }

    async fn publish_rate(&self, address: SensorAddress, value: f64, name: &str) {
        if let Err(e) = self
            .sensors
            .send_custom_sensor(address, value, name, "mbps")
            .await
        {
            warn!("Failed to publish {}: {}", name, e);
        }
    }
}
