//! Router traffic statistics over UPnP/SOAP
//!
//! Requires "Allow access for applications" / UPnP status information to be
//! enabled on the router.

pub mod poller;
pub mod soap;

pub use poller::{
    bytes_per_sec_to_mbps, extract_counters, extract_rates, StatisticsPoller, TrafficCounters,
    TrafficRates, TrafficStatistics,
};
pub use soap::{build_envelope, extract_value, SoapClient, DEFAULT_SOAP_PORT};
