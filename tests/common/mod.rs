//! Common test utilities

#![allow(dead_code)]

pub mod router_mock;

use fritzbox_monitor::MonitorConfig;
use std::future::Future;
use std::time::Duration;

/// Configuration pointing at local mocks with fast cadences
pub fn test_config(soap_port: u16, call_monitor_port: u16) -> MonitorConfig {
    let mut config = MonitorConfig::for_router("127.0.0.1", call_monitor_port);
    config.router.soap_port = soap_port;
    config.router.request_timeout = Duration::from_millis(500);
    config.router.connect_timeout = Duration::from_millis(500);
    config.session.tick_interval = Duration::from_millis(20);
    config.session.statistics_interval_ticks = 3;
    config.session.heartbeat_interval_ticks = 2;
    config.session.retry_delay = Duration::from_millis(50);
    config
}

/// Poll `check` until it returns true or five seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
