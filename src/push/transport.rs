// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound webhook requests.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::ProtocolError;
use crate::state::DeviceSnapshot;

/// Header carrying the address of the device a notification is about.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Body of a webhook request.
///
/// Serializes as `{"action":"deviceUpdate","data":{...}}` or
/// `{"action":"ping"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WebhookPayload {
    /// Full snapshot of a device whose state changed.
    DeviceUpdate {
        /// The snapshot at delivery time.
        data: DeviceSnapshot,
    },
    /// Liveness probe sent before accepting a subscription.
    Ping,
}

/// Sends webhook payloads to subscriber URLs.
///
/// A request counts as delivered once the endpoint answered, whatever the
/// status code; only transport failures are errors.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POSTs `payload` as JSON to `url`.
    ///
    /// `forwarded_for` is sent as the `X-Forwarded-For` header when present.
    async fn post(
        &self,
        url: &str,
        payload: &WebhookPayload,
        forwarded_for: Option<IpAddr>,
    ) -> Result<(), ProtocolError>;
}

/// [`WebhookTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpWebhookTransport {
    client: Client,
}

impl HttpWebhookTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, ProtocolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProtocolError::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(
        &self,
        url: &str,
        payload: &WebhookPayload,
        forwarded_for: Option<IpAddr>,
    ) -> Result<(), ProtocolError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(address) = forwarded_for {
            request = request.header(FORWARDED_FOR_HEADER, address.to_string());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "Webhook answered with non-success status");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceId;

    #[test]
    fn ping_payload_shape() {
        let json = serde_json::to_value(WebhookPayload::Ping).unwrap();
        assert_eq!(json, serde_json::json!({"action": "ping"}));
    }

    #[test]
    fn device_update_payload_shape() {
        let snapshot = DeviceSnapshot::new(
            "Patio",
            DeviceId::new("patio-1"),
            "192.168.4.4".parse().unwrap(),
        );
        let json = serde_json::to_value(WebhookPayload::DeviceUpdate { data: snapshot }).unwrap();

        assert_eq!(json["action"], "deviceUpdate");
        assert_eq!(json["data"]["uuid"], "patio-1");
        assert_eq!(json["data"]["status"], "CONNECTING");
    }
}
