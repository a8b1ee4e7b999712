//! Notification delivery for the depot back office.
//!
//! Each configured channel implements [`NotificationInterface`]. The
//! [`NotificationService`] fans every notification out to all channels and
//! reports which ones failed; callers treat delivery as best effort.

use async_trait::async_trait;
use depot_types::{ConfigSchema, ImplementationRegistry, Notification};
use futures::future::join_all;
use thiserror::Error;

pub mod implementations {
	pub mod log;
	pub mod webhook;
}

#[derive(Debug, Error)]
pub enum NotifyError {
	#[error("Delivery failed: {0}")]
	Delivery(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Channels failed: {}", .0.join(", "))]
	ChannelsFailed(Vec<String>),
}

/// A destination for user notifications.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError>;

pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Returns `(name, factory)` for every built-in channel.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{log, webhook};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(webhook::Registry::NAME, webhook::Registry::factory()),
	]
}

/// Sends each notification to every channel concurrently.
pub struct NotificationService {
	channels: Vec<(String, Box<dyn NotificationInterface>)>,
}

impl NotificationService {
	pub fn new(channels: Vec<(String, Box<dyn NotificationInterface>)>) -> Self {
		Self { channels }
	}

	pub fn channel_names(&self) -> Vec<&str> {
		self.channels.iter().map(|(name, _)| name.as_str()).collect()
	}

	/// Delivers to all channels. Fails with the names of the channels that
	/// rejected the notification; the others still received it.
	pub async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
		let results = join_all(
			self.channels
				.iter()
				.map(|(name, channel)| async move { (name, channel.deliver(notification).await) }),
		)
		.await;

		let failed: Vec<String> = results
			.into_iter()
			.filter_map(|(name, result)| {
				result.err().map(|e| {
					tracing::warn!(channel = %name, error = %e, "Notification delivery failed");
					name.clone()
				})
			})
			.collect();

		if failed.is_empty() {
			Ok(())
		} else {
			Err(NotifyError::ChannelsFailed(failed))
		}
	}
}
