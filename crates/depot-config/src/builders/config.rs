//! Fluent builder for test and development configurations.

use crate::{
	ApiConfig, BillingConfig, Config, DispatchConfig, NotificationConfig, QueryConfig,
	ServiceConfig, StorageConfig,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Builds an in-memory `Config` without going through TOML.
///
/// Defaults to memory storage, the log channel and the standard billing
/// rules.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	cleanup_interval_seconds: u64,
	billing: BillingConfig,
	max_orders_per_trip: usize,
	query: QueryConfig,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "depot-test".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations: HashMap::from([(
				"memory".to_string(),
				toml::Value::Table(toml::map::Map::new()),
			)]),
			cleanup_interval_seconds: 60,
			billing: BillingConfig::default(),
			max_orders_per_trip: 50,
			query: QueryConfig::default(),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Uses the file backend rooted at `path` as primary storage.
	pub fn file_storage(mut self, path: impl Into<String>) -> Self {
		let mut table = toml::map::Map::new();
		table.insert("storage_path".to_string(), toml::Value::String(path.into()));
		self.storage_implementations
			.insert("file".to_string(), toml::Value::Table(table));
		self.storage_primary = "file".to_string();
		self
	}

	pub fn tax_rate(mut self, rate: Decimal) -> Self {
		self.billing.tax_rate = rate;
		self
	}

	pub fn invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.billing.invoice_prefix = prefix.into();
		self
	}

	pub fn max_orders_per_trip(mut self, max: usize) -> Self {
		self.max_orders_per_trip = max;
		self
	}

	pub fn page_sizes(mut self, default_size: u32, max_size: u32) -> Self {
		self.query = QueryConfig {
			default_page_size: default_size,
			max_page_size: max_size,
		};
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
				cleanup_interval_seconds: self.cleanup_interval_seconds,
			},
			notification: NotificationConfig::default(),
			billing: self.billing,
			dispatch: DispatchConfig {
				max_orders_per_trip: self.max_orders_per_trip,
			},
			query: self.query,
			api: self.api,
		}
	}
}
