//! Builder for constructing depot engines.
//!
//! Storage backends and notification channels are created from factory
//! functions keyed by implementation name, so the binary and the tests can
//! plug in different sets.

use crate::engine::{event_bus::EventBus, DepotEngine};
use depot_config::Config;
use depot_notify::{NotificationInterface, NotificationService, NotifyError};
use depot_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by the
/// implementation name used in the configuration.
pub struct DepotFactories<SF, NF> {
	pub storage_factories: HashMap<String, SF>,
	pub notification_factories: HashMap<String, NF>,
}

pub struct DepotBuilder {
	config: Config,
}

impl DepotBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<SF, NF>(self, factories: DepotFactories<SF, NF>) -> Result<DepotEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					storage_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.storage.primary;
		let backend = storage_impls.remove(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("primary storage '{}'", primary))
		})?;
		let storage = Arc::new(StorageService::new(backend));

		let mut channels: Vec<(String, Box<dyn NotificationInterface>)> = Vec::new();
		for name in &self.config.notification.channels {
			let factory = factories.notification_factories.get(name).ok_or_else(|| {
				BuilderError::MissingComponent(format!("notification channel '{}'", name))
			})?;
			let config = self
				.config
				.notification
				.implementations
				.get(name)
				.ok_or_else(|| {
					BuilderError::Config(format!("Notification channel '{}' is not configured", name))
				})?;
			match factory(config) {
				Ok(channel) => {
					tracing::info!(component = "notification", implementation = %name, enabled = true, "Loaded");
					channels.push((name.clone(), channel));
				},
				Err(e) => {
					tracing::error!(
						component = "notification",
						implementation = %name,
						error = %e,
						"Failed to create notification channel"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create notification channel '{}': {}",
						name, e
					)));
				},
			}
		}
		if channels.is_empty() {
			tracing::warn!("No notification channels enabled - users will not be notified");
		}
		let notifications = Arc::new(NotificationService::new(channels));

		Ok(DepotEngine::new(
			self.config,
			storage,
			notifications,
			EventBus::default(),
		))
	}
}
