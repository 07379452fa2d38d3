//! Webhook notification delivery.
//!
//! Renders `{{alert.<path>}}` placeholders into action bodies and delivers
//! them over HTTP with bounded retries and exponential backoff. Delivery
//! outcomes are reported as values, never as errors: a webhook that stays
//! down after all attempts is a degraded notification, not a failed tick.

mod template;
mod webhook;

pub use template::TemplateRenderer;
pub use webhook::{NotificationResult, WebhookNotifier};
