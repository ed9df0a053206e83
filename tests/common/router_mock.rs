//! Mock FRITZ!Box endpoints
//!
//! A WireMock server stands in for the UPnP control service and a plain
//! TCP listener plays the call monitor.

#![allow(dead_code)]

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const SOAP_ACTION: &str = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1#GetAddonInfos";

/// `GetAddonInfos` response body with the given inner elements
pub fn addon_infos_response(fields: &[(&str, &str)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\"?>\n<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <s:Body><u:GetAddonInfosResponse xmlns:u=\"urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1\">\n",
    );
    for (key, value) in fields {
        body.push_str(&format!("<{key}>{value}</{key}>\n"));
    }
    body.push_str("</u:GetAddonInfosResponse></s:Body></s:Envelope>");
    body
}

/// Typical response of a router with 64 bit counters
pub fn full_response() -> String {
    addon_infos_response(&[
        ("NewByteSendRate", "131072"),
        ("NewByteReceiveRate", "524288"),
        ("NewPacketSendRate", "0"),
        ("NewPacketReceiveRate", "0"),
        ("NewTotalBytesSent", "1"),
        ("NewTotalBytesReceived", "1"),
        ("NewAutoDisconnectTime", "0"),
        ("NewIdleDisconnectTime", "1"),
        ("NewDNSServer1", "192.168.178.1"),
        ("NewX_AVM_DE_TotalBytesSent64", "10485760"),
        ("NewX_AVM_DE_TotalBytesReceived64", "104857600"),
    ])
}

/// Mock UPnP control service
pub struct MockRouter {
    pub server: MockServer,
}

impl MockRouter {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn host(&self) -> String {
        self.server.address().ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    /// Answer `GetAddonInfos` with `body`
    pub async fn mock_addon_infos(&self, body: String) {
        Mock::given(method("POST"))
            .and(path("/igdupnp/control/WANCommonIFC1"))
            .and(header("soapaction", SOAP_ACTION))
            .and(header("content-type", "text/xml"))
            .and(header("charset", "utf-8"))
            .and(body_string_contains("<u:GetAddonInfos"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Answer every request with an HTTP error status
    pub async fn mock_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Fake call monitor socket
///
/// Accepts connections one after another and writes every chunk sent
/// through [`FakeCallMonitor::send`] to the current connection.
pub struct FakeCallMonitor {
    pub port: u16,
    chunks: mpsc::UnboundedSender<Vec<u8>>,
}

impl FakeCallMonitor {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (chunks, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                while let Some(chunk) = rx.recv().await {
                    if socket.write_all(&chunk).await.is_err() {
                        break;
                    }
                }
            }
        });

        Self { port, chunks }
    }

    /// Send raw bytes to the connected client
    pub fn send(&self, data: impl Into<Vec<u8>>) {
        self.chunks.send(data.into()).unwrap();
    }

    /// Send one record terminated by CRLF, the way the router does
    pub fn send_line(&self, line: &str) {
        self.send(format!("{line}\r\n"));
    }
}
