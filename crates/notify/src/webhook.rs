//! Webhook delivery with bounded retries.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use vigil_rules::schema::AlertAction;

use crate::template::TemplateRenderer;

/// Result of sending a webhook notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub attempts: u32,
}

/// Sends webhook notifications with template rendering and retry logic.
///
/// Holds a single pooled HTTP client; no per-host state. The timeout
/// applies per request, the retry budget per [`send`](Self::send) call.
#[derive(Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    retries: u32,
    renderer: TemplateRenderer,
}

impl WebhookNotifier {
    /// Create a notifier with the given per-request timeout and total
    /// attempt budget (`retries` is clamped to at least 1).
    pub fn new(timeout: Duration, retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            retries: retries.max(1),
            renderer: TemplateRenderer::new(),
        }
    }

    /// Deliver one action's webhook with the rendered body.
    ///
    /// Responses with status < 400 are success. Any non-success status or
    /// transport error is retried up to the attempt budget with
    /// exponential backoff (`2^(attempt-1)` seconds between attempts).
    pub async fn send(&self, action: &AlertAction, context: &Value) -> NotificationResult {
        let body = self.renderer.render(&action.webhook.body, context);

        let method = match action.webhook.method.to_uppercase().parse::<reqwest::Method>() {
            Ok(method) => method,
            Err(_) => {
                return NotificationResult {
                    success: false,
                    status_code: None,
                    error: Some(format!("invalid HTTP method: {}", action.webhook.method)),
                    attempts: 0,
                };
            }
        };

        for attempt in 1..=self.retries {
            let mut request = self
                .client
                .request(method.clone(), &action.webhook.url)
                .json(&body);
            for (key, value) in &action.webhook.headers {
                request = request.header(key.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) if response.status().as_u16() < 400 => {
                    info!(
                        action = %action.name,
                        status = response.status().as_u16(),
                        attempt,
                        "webhook delivered"
                    );
                    return NotificationResult {
                        success: true,
                        status_code: Some(response.status().as_u16()),
                        error: None,
                        attempts: attempt,
                    };
                }
                Ok(response) => {
                    warn!(
                        action = %action.name,
                        status = response.status().as_u16(),
                        attempt,
                        retries = self.retries,
                        "webhook returned error status"
                    );
                }
                Err(e) => {
                    warn!(
                        action = %action.name,
                        error = %e,
                        attempt,
                        retries = self.retries,
                        "webhook request failed"
                    );
                }
            }

            if attempt < self.retries {
                let backoff = Duration::from_secs(1u64 << (attempt - 1));
                tokio::time::sleep(backoff).await;
            }
        }

        NotificationResult {
            success: false,
            status_code: None,
            error: Some(format!("failed after {} attempts", self.retries)),
            attempts: self.retries,
        }
    }
}
