//! Channel that POSTs each notification as JSON to a configured URL.

use crate::{NotificationFactory, NotificationInterface, NotificationRegistry, NotifyError};
use async_trait::async_trait;
use depot_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Notification, Schema, ValidationError,
};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

pub struct WebhookChannel {
	client: reqwest::Client,
	url: String,
}

impl WebhookChannel {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| NotifyError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			url: url.into(),
		})
	}
}

#[async_trait]
impl NotificationInterface for WebhookChannel {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebhookChannelSchema)
	}

	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
		let response = self
			.client
			.post(&self.url)
			.json(notification)
			.send()
			.await
			.map_err(|e| NotifyError::Delivery(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(NotifyError::Delivery(format!(
				"Webhook responded with {}",
				status
			)));
		}
		tracing::debug!(url = %self.url, notification_id = %notification.id, "Webhook delivered");
		Ok(())
	}
}

/// Requires `url` (http or https); accepts `timeout_seconds` in 1..=300.
pub struct WebhookChannelSchema;

impl ConfigSchema for WebhookChannelSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("url must start with http:// or https://".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

pub fn create_channel(config: &toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	WebhookChannelSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("url is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(WebhookChannel::new(
		url,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "webhook";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_channel
	}
}

impl NotificationRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_factory_validates_url() {
		let bad: toml::Value = toml::from_str("url = \"hooks.example.com\"").unwrap();
		assert!(create_channel(&bad).is_err());

		let missing: toml::Value = toml::from_str("timeout_seconds = 3").unwrap();
		assert!(create_channel(&missing).is_err());

		let good: toml::Value =
			toml::from_str("url = \"https://hooks.example.com/depot\"\ntimeout_seconds = 3")
				.unwrap();
		assert!(create_channel(&good).is_ok());
	}
}
