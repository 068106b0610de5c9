//! A driver for Slack-compatible incoming webhooks.

use crate::context::Context;
use crate::core::{parse_config, Content, Driver, DriverConfig, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, instrument};

pub const DRIVER_TYPE: &str = "webhook";

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Fixed webhook URL. Without one, each message's receiver is the URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Posts messages as JSON to a webhook.
///
/// Text content is sent as `{"text": ...}`; structured content is posted
/// as-is.
#[derive(Debug)]
pub struct WebhookDriver {
    url: Option<String>,
    client: reqwest::Client,
    stopped: AtomicBool,
}

impl WebhookDriver {
    pub fn from_config(config: &DriverConfig) -> Result<Self, DispatchError> {
        let config: WebhookConfig = parse_config(DRIVER_TYPE, config)?;
        if config.timeout_secs == 0 {
            return Err(DispatchError::invalid_config(DRIVER_TYPE, "timeout_secs must be positive"));
        }
        if let Some(url) = &config.url {
            reqwest::Url::parse(url)
                .map_err(|e| DispatchError::invalid_config(DRIVER_TYPE, format!("invalid url: {}", e)))?;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::invalid_config(DRIVER_TYPE, e))?;

        Ok(Self {
            url: config.url,
            client,
            stopped: AtomicBool::new(false),
        })
    }

    fn payload(content: &Content) -> Value {
        match content {
            Content::Text(text) => json!({ "text": text }),
            Content::Structured(value) => value.clone(),
        }
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<(), DispatchError> {
        let response = self.client.post(url).json(payload).send().await.map_err(|e| {
            error!(error = %e, "HTTP request to webhook failed");
            anyhow::Error::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            info!("Successfully sent message to webhook.");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        error!(status = %status, body = %text, "Failed to send webhook notification");
        Err(anyhow::anyhow!(
            "Failed to send webhook notification: status {}, body: {}",
            status,
            text
        )
        .into())
    }
}

#[async_trait]
impl Driver for WebhookDriver {
    fn name(&self) -> &str {
        DRIVER_TYPE
    }

    fn driver_type(&self) -> &str {
        DRIVER_TYPE
    }

    #[instrument(skip_all, fields(receiver = msg.receiver()))]
    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(DispatchError::DriverStopped(DRIVER_TYPE.to_string()));
        }

        let url = match &self.url {
            Some(url) => url.as_str(),
            None if !msg.receiver().is_empty() => msg.receiver(),
            None => {
                return Err(DispatchError::InvalidReceiver {
                    receiver: String::new(),
                    reason: "no webhook url configured or given as receiver".to_string(),
                })
            }
        };

        let payload = Self::payload(msg.content());
        ctx.run(self.post(url, &payload)).await
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod webhook_driver_tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn driver_for(url: Option<String>, timeout_secs: u64) -> WebhookDriver {
        let mut config = DriverConfig::new();
        if let Some(url) = url {
            config.insert("url".into(), json!(url));
        }
        config.insert("timeout_secs".into(), json!(timeout_secs));
        WebhookDriver::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_send_success() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "text": "deploy finished" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let driver = driver_for(Some(format!("{}/hook", server.uri())), 5);

        // Act
        let result = driver
            .send(&Context::background(), &Message::new("", "deploy finished"))
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_receiver_is_url_when_unconfigured() {
        let server = MockServer::start().await;
        let card = json!({ "blocks": [{ "type": "section" }] });
        Mock::given(method("POST"))
            .and(path("/team-a"))
            .and(body_json(card.clone()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let driver = driver_for(None, 5);
        let msg = Message::new(format!("{}/team-a", server.uri()), card);
        assert!(driver.send(&Context::background(), &msg).await.is_ok());

        let no_target = driver
            .send(&Context::background(), &Message::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(no_target, DispatchError::InvalidReceiver { .. }));
    }

    #[tokio::test]
    async fn test_webhook_handles_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let driver = driver_for(Some(server.uri()), 5);
        let err = driver
            .send(&Context::background(), &Message::new("", "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_webhook_respects_context_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let driver = driver_for(Some(server.uri()), 30);
        let ctx = Context::background().with_timeout(Duration::from_millis(100));
        let err = driver.send(&ctx, &Message::new("", "hi")).await.unwrap_err();
        assert!(matches!(err, DispatchError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_send_after_stop_fails() {
        let driver = driver_for(Some("http://127.0.0.1:9/hook".to_string()), 5);
        driver.stop();
        driver.stop();

        let err = driver
            .send(&Context::background(), &Message::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DriverStopped(_)));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = DriverConfig::new();
        config.insert("url".into(), json!("not a url"));
        assert!(WebhookDriver::from_config(&config).unwrap_err().is_configuration());

        let mut config = DriverConfig::new();
        config.insert("timeout_secs".into(), json!(0));
        assert!(WebhookDriver::from_config(&config).is_err());
    }
}
