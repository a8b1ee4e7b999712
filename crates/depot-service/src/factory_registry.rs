//! Registry of the storage backends and notification channels this binary
//! ships with.
//!
//! Implementations announce themselves through `get_all_implementations` in
//! their crates; the registry collects them once and checks the configuration
//! against them before the engine is built.

use depot_config::Config;
use depot_core::{DepotBuilder, DepotEngine, DepotFactories};
use depot_notify::NotificationFactory;
use depot_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub notification: HashMap<String, NotificationFactory>,
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut storage = HashMap::new();
		for (name, factory) in depot_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			storage.insert(name.to_string(), factory);
		}

		let mut notification = HashMap::new();
		for (name, factory) in depot_notify::get_all_implementations() {
			tracing::debug!("Registering notification channel: {}", name);
			notification.insert(name.to_string(), factory);
		}

		FactoryRegistry {
			storage,
			notification,
		}
	})
}

/// Fails with the list of known names when `name` is not registered.
fn require_known<F>(kind: &str, name: &str, known: &HashMap<String, F>) -> Result<(), String> {
	if known.contains_key(name) {
		return Ok(());
	}
	let mut available: Vec<_> = known.keys().map(String::as_str).collect();
	available.sort_unstable();
	Err(format!(
		"Unknown {} implementation '{}'. Available: [{}]",
		kind,
		name,
		available.join(", ")
	))
}

/// Builds the engine from configuration using the registered implementations.
pub fn build_engine_from_config(config: Config) -> Result<DepotEngine, Box<dyn std::error::Error>> {
	let registry = initialize_registry();

	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		require_known("storage", name, &registry.storage)?;
		storage_factories.insert(name.clone(), registry.storage[name]);
	}

	let mut notification_factories = HashMap::new();
	for name in &config.notification.channels {
		require_known("notification", name, &registry.notification)?;
		notification_factories.insert(name.clone(), registry.notification[name]);
	}

	let factories = DepotFactories {
		storage_factories,
		notification_factories,
	};
	Ok(DepotBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use depot_config::ConfigBuilder;

	#[test]
	fn test_registry_contains_builtin_implementations() {
		let registry = initialize_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
		assert!(registry.notification.contains_key("log"));
		assert!(registry.notification.contains_key("webhook"));
	}

	#[test]
	fn test_unknown_storage_lists_available() {
		let mut config = ConfigBuilder::new().build();
		config
			.storage
			.implementations
			.insert("redis".into(), toml::Value::Table(toml::map::Map::new()));

		let err = build_engine_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown storage implementation 'redis'. Available: [file, memory]"
		);
	}

	#[tokio::test]
	async fn test_build_engine_with_file_storage() {
		let dir = tempfile::tempdir().unwrap();
		let config = ConfigBuilder::new()
			.service_id("depot-file")
			.file_storage(dir.path().to_string_lossy())
			.build();

		let engine = build_engine_from_config(config).unwrap();
		engine.initialize().await.unwrap();
		assert_eq!(engine.config().service.id, "depot-file");
		assert_eq!(engine.list_users(None).await.unwrap().len(), 1);
	}
}
