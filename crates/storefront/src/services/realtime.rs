//! Real-time notifications to the admin dashboard.
//!
//! Events are posted to an HTTP pub/sub relay as `{ channel, event, data }`.
//! Each request carries the relay's bearer key, a unix timestamp in
//! `X-Zolar-Timestamp` and `X-Zolar-Signature: sha256=<hex>` where the MAC is
//! HMAC-SHA256 over `"{timestamp}.{body}"`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::RealtimeConfig;

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-zolar-timestamp";
/// Header carrying the HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-zolar-signature";

/// Upper bound on a single relay request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Event name for a freshly placed order.
pub const NEW_ORDER_EVENT: &str = "new-order";

/// Errors that can occur when publishing an event.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// HTTP request failed.
    #[error("Realtime request failed: {0}")]
    Request(String),

    /// The relay rejected the event.
    #[error("Realtime relay returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Signing failed.
    #[error("Realtime signing error: {0}")]
    Signing(String),
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    channel: &'a str,
    event: &'a str,
    data: &'a T,
}

/// Relay endpoint and credentials.
#[derive(Clone)]
struct Relay {
    url: String,
    key: SecretString,
    secret: SecretString,
    channel: String,
}

/// Client for the real-time relay. A client built without configuration is
/// disabled and silently drops events.
#[derive(Clone)]
pub struct RealtimeClient {
    client: Client,
    relay: Option<Relay>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("enabled", &self.relay.is_some())
            .field("channel", &self.relay.as_ref().map(|r| r.channel.as_str()))
            .finish_non_exhaustive()
    }
}

impl RealtimeClient {
    /// Create a client. `None` yields a disabled client.
    #[must_use]
    pub fn new(config: Option<&RealtimeConfig>) -> Self {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    fn with_timeout(config: Option<&RealtimeConfig>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            relay: config.map(|c| Relay {
                url: c.url.clone(),
                key: c.key.clone(),
                secret: c.secret.clone(),
                channel: c.channel.clone(),
            }),
        }
    }

    /// Whether events are actually sent.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.relay.is_some()
    }

    /// Publish an event and wait for the relay to accept it.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError` if signing, the request, or the relay fails.
    #[instrument(skip(self, data))]
    pub async fn publish<T: Serialize + Sync>(
        &self,
        event: &str,
        data: &T,
    ) -> Result<(), RealtimeError> {
        let Some(relay) = &self.relay else {
            debug!(event, "Realtime disabled, dropping event");
            return Ok(());
        };

        let body = serde_json::to_string(&Envelope {
            channel: &relay.channel,
            event,
            data,
        })
        .map_err(|e| RealtimeError::Request(e.to_string()))?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&relay.secret, &timestamp, &body)?;

        let response = self
            .client
            .post(&relay.url)
            .bearer_auth(relay.key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TIMESTAMP_HEADER, &timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| RealtimeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RealtimeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(event, channel = %relay.channel, "Realtime event published");
        Ok(())
    }

    /// Publish on a background task. Failures are logged and never reach
    /// the caller.
    pub fn notify<T: Serialize + Send + Sync + 'static>(&self, event: &'static str, data: T) {
        if !self.is_enabled() {
            debug!(event, "Realtime disabled, dropping event");
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish(event, &data).await {
                warn!(error = %e, event, "Failed to publish realtime event");
            }
        });
    }
}

/// Compute `sha256=<hex hmac(secret, "{timestamp}.{body}")>`.
///
/// # Errors
///
/// Returns `RealtimeError::Signing` if the key is rejected.
pub fn sign(secret: &SecretString, timestamp: &str, body: &str) -> Result<String, RealtimeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| RealtimeError::Signing(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_manual_hmac() {
        let secret = SecretString::from("test-signing-secret");
        let signature = sign(&secret, "1700000000", r#"{"a":1}"#).unwrap();

        let mut mac = Hmac::<Sha256>::new_from_slice(b"test-signing-secret").unwrap();
        mac.update(br#"1700000000.{"a":1}"#);
        let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert_eq!(signature, expected);
        assert_eq!(signature.len(), "sha256=".len() + 64);
    }

    #[test]
    fn test_sign_depends_on_timestamp() {
        let secret = SecretString::from("test-signing-secret");
        let a = sign(&secret, "1", "{}").unwrap();
        let b = sign(&secret, "2", "{}").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_envelope_shape() {
        let data = serde_json::json!({ "order_number": "ZLR-260101-ABCDEF" });
        let body = serde_json::to_value(Envelope {
            channel: "admin-notifications",
            event: NEW_ORDER_EVENT,
            data: &data,
        })
        .unwrap();
        assert_eq!(body["channel"], "admin-notifications");
        assert_eq!(body["event"], "new-order");
        assert_eq!(body["data"]["order_number"], "ZLR-260101-ABCDEF");
    }

    #[tokio::test]
    async fn test_disabled_client_is_noop() {
        let client = RealtimeClient::new(None);
        assert!(!client.is_enabled());
        client.publish(NEW_ORDER_EVENT, &"ignored").await.unwrap();
        client.notify(NEW_ORDER_EVENT, "ignored");
    }

    #[tokio::test]
    async fn test_publish_gives_up_on_hung_relay() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = RealtimeConfig {
            url: format!("http://{addr}/publish"),
            key: SecretString::from("relay-key-abc"),
            secret: SecretString::from("relay-secret-xyz"),
            channel: "admin-notifications".to_string(),
        };
        let client = RealtimeClient::with_timeout(Some(&config), Duration::from_millis(200));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.publish(NEW_ORDER_EVENT, &"order"),
        )
        .await
        .expect("publish should time out on its own");
        assert!(matches!(result, Err(RealtimeError::Request(_))));
        hold.abort();
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = RealtimeConfig {
            url: "https://relay.zolar.store/publish".to_string(),
            key: SecretString::from("relay-key-abc"),
            secret: SecretString::from("relay-secret-xyz"),
            channel: "admin-notifications".to_string(),
        };
        let debug = format!("{:?}", RealtimeClient::new(Some(&config)));
        assert!(debug.contains("enabled: true"));
        assert!(!debug.contains("relay-key-abc"));
        assert!(!debug.contains("relay-secret-xyz"));
    }
}
