//! Channel that writes notifications to the tracing log.

use crate::{NotificationFactory, NotificationInterface, NotificationRegistry, NotifyError};
use async_trait::async_trait;
use depot_types::{
	truncate_id, ConfigSchema, ImplementationRegistry, Notification, Schema, ValidationError,
};

pub struct LogChannel;

#[async_trait]
impl NotificationInterface for LogChannel {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogChannelSchema)
	}

	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
		tracing::info!(
			recipient = %truncate_id(&notification.recipient_id),
			kind = ?notification.kind,
			entity = %notification.entity_type,
			entity_id = %truncate_id(&notification.entity_id),
			"{}",
			notification.message
		);
		Ok(())
	}
}

pub struct LogChannelSchema;

impl ConfigSchema for LogChannelSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_channel(config: &toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	LogChannelSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;
	Ok(Box::new(LogChannel))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_channel
	}
}

impl NotificationRegistry for Registry {}
