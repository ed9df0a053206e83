//! Statistics polling against a mock router

mod common;

use common::router_mock::{addon_infos_response, full_response, MockRouter};
use fritzbox_monitor::error::ErrorCode;
use fritzbox_monitor::hub::{InMemoryHub, SensorAddress};
use fritzbox_monitor::statistics::{SoapClient, StatisticsPoller};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

const SENT: SensorAddress = SensorAddress::new(1, 1);
const RECEIVED: SensorAddress = SensorAddress::new(1, 2);

fn poller(router: &MockRouter, hub: &InMemoryHub) -> StatisticsPoller {
    let soap = SoapClient::new(&router.host(), router.port(), Duration::from_secs(2)).unwrap();
    StatisticsPoller::new(soap, Arc::new(hub.clone()), router.host())
}

#[tokio::test]
async fn test_poll_publishes_all_four_sensors() {
    let router = MockRouter::start().await;
    router.mock_addon_infos(full_response()).await;
    let hub = InMemoryHub::new();

    let statistics = poller(&router, &hub).poll().await.unwrap();

    assert_eq!(statistics.counters.bytes_sent, 10_485_760);
    assert_eq!(hub.last_meter(SENT).await, Some(10.0));
    assert_eq!(hub.last_meter(RECEIVED).await, Some(100.0));
    assert_eq!(hub.last_custom(SENT).await, Some(1.0));
    assert_eq!(hub.last_custom(RECEIVED).await, Some(4.0));
    assert_eq!(hub.reading_count().await, 4);
    assert_eq!(router.request_count().await, 1);
}

#[tokio::test]
async fn test_standard_counters_are_used_without_extended_ones() {
    let router = MockRouter::start().await;
    router
        .mock_addon_infos(addon_infos_response(&[
            ("NewByteSendRate", "0"),
            ("NewByteReceiveRate", "0"),
            ("NewTotalBytesSent", "3145728"),
            ("NewTotalBytesReceived", "524288"),
        ]))
        .await;
    let hub = InMemoryHub::new();

    poller(&router, &hub).poll().await.unwrap();

    assert_eq!(hub.last_meter(SENT).await, Some(3.0));
    assert_eq!(hub.last_meter(RECEIVED).await, Some(0.5));
    assert_eq!(hub.last_custom(SENT).await, Some(0.0));
}

#[tokio::test]
async fn test_missing_rates_keep_published_counters() {
    let router = MockRouter::start().await;
    router
        .mock_addon_infos(addon_infos_response(&[
            ("NewTotalBytesSent", "1048576"),
            ("NewTotalBytesReceived", "2097152"),
        ]))
        .await;
    let hub = InMemoryHub::new();

    let err = poller(&router, &hub).poll().await.unwrap_err();

    assert_eq!(err.to_error_code(), ErrorCode::FieldMissing);
    assert_eq!(hub.last_meter(SENT).await, Some(1.0));
    assert_eq!(hub.last_meter(RECEIVED).await, Some(2.0));
    assert_eq!(hub.last_custom(SENT).await, None);
    assert_eq!(hub.reading_count().await, 2);
}

#[tokio::test]
async fn test_missing_counters_publish_nothing() {
    let router = MockRouter::start().await;
    router
        .mock_addon_infos(addon_infos_response(&[("NewByteSendRate", "131072")]))
        .await;
    let hub = InMemoryHub::new();

    assert!(poller(&router, &hub).poll().await.is_err());
    assert_eq!(hub.reading_count().await, 0);
}

#[rstest]
#[case(500)]
#[case(404)]
#[tokio::test]
async fn test_http_error_status_fails_the_poll(#[case] status: u16) {
    let router = MockRouter::start().await;
    router.mock_failure(status).await;
    let hub = InMemoryHub::new();

    let err = poller(&router, &hub).poll().await.unwrap_err();

    assert_eq!(err.to_error_code(), ErrorCode::ServiceUnavailable);
    assert_eq!(hub.reading_count().await, 0);
}

#[tokio::test]
async fn test_unreachable_router_fails_the_poll() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let hub = InMemoryHub::new();
    let soap = SoapClient::new("127.0.0.1", port, Duration::from_secs(1)).unwrap();
    let poller = StatisticsPoller::new(soap, Arc::new(hub.clone()), "127.0.0.1");

    assert!(poller.poll().await.is_err());
    assert_eq!(hub.reading_count().await, 0);
}
