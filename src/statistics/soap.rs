//! Minimal SOAP client for the router's UPnP control endpoint
//!
//! Only argument-less actions are sent, and only flat `<Key>value</Key>`
//! elements are read back from the response.

use crate::error::{FritzboxError, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default UPnP control port on FRITZ!Box routers
pub const DEFAULT_SOAP_PORT: u16 = 49000;

/// Build the request envelope for an argument-less action
pub fn build_envelope(urn: &str, action: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='utf-8'?>\
         <s:Envelope s:encodingStyle='http://schemas.xmlsoap.org/soap/encoding/' \
         xmlns:s='http://schemas.xmlsoap.org/soap/envelope/'>\
         <s:Body>\
         <u:{action} xmlns:u='{urn}'/>\
         </s:Body>\
         </s:Envelope>"
    )
}

/// Text between the first `<key>` and the `</key>` that follows it
pub fn extract_value<'a>(xml: &'a str, key: &str) -> Option<&'a str> {
    let open = format!("<{key}>");
    let close = format!("</{key}>");

    let start = xml.find(&open)? + open.len();
    let rest = &xml[start..];
    let end = rest.find(&close)?;
    Some(&rest[..end])
}

/// HTTP client bound to one router
#[derive(Debug, Clone)]
pub struct SoapClient {
    client: Client,
    base_url: Url,
}

impl SoapClient {
    /// Create a client for `http://{host}:{port}/`
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| FritzboxError::config(format!("Invalid router address {host}: {e}")))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(format!("fritzbox-monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FritzboxError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Invoke `action` of service `urn` at `endpoint` and return the raw body
    pub async fn call(&self, endpoint: &str, urn: &str, action: &str) -> Result<String> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| FritzboxError::config(format!("Invalid endpoint {endpoint}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml"));
        headers.insert("charset", HeaderValue::from_static("utf-8"));
        headers.insert(
            "soapaction",
            HeaderValue::from_str(&format!("{urn}#{action}"))
                .map_err(|e| FritzboxError::invalid_input(format!("Invalid SOAP action: {e}")))?,
        );

        debug!("SOAP {} -> {}", action, url);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(build_envelope(urn, action))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FritzboxError::timeout(format!("SOAP request timed out: {e}"))
                } else {
                    FritzboxError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FritzboxError::service_unavailable(format!(
                "SOAP action {action} returned HTTP {status}"
            )));
        }

        Ok(response.text().await?)
    }
}
