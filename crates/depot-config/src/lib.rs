//! Configuration module for the depot back office.
//!
//! Loads the service configuration from TOML, resolves `${VAR}` and
//! `${VAR:-default}` environment references, and validates cross-section
//! references (primary storage, notification channels) before anything is
//! constructed from it.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

pub mod builders;
mod loader;

pub use builders::ConfigBuilder;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default Display dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub service: ServiceConfig,
	pub storage: StorageConfig,
	#[serde(default)]
	pub notification: NotificationConfig,
	#[serde(default)]
	pub billing: BillingConfig,
	#[serde(default)]
	pub dispatch: DispatchConfig,
	#[serde(default)]
	pub query: QueryConfig,
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier of this deployment, reported by the health endpoint.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Storage implementation name to its raw configuration table.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds between sweeps of expired entries.
	#[serde(default = "default_cleanup_interval")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval() -> u64 {
	3600
}

/// Configuration for notification delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	/// Implementations that receive every notification.
	#[serde(default = "default_channels")]
	pub channels: Vec<String>,
	/// Channel implementation name to its raw configuration table.
	#[serde(default = "default_channel_implementations")]
	pub implementations: HashMap<String, toml::Value>,
}

fn default_channels() -> Vec<String> {
	vec!["log".to_string()]
}

fn default_channel_implementations() -> HashMap<String, toml::Value> {
	HashMap::from([(
		"log".to_string(),
		toml::Value::Table(toml::map::Map::new()),
	)])
}

impl Default for NotificationConfig {
	fn default() -> Self {
		Self {
			channels: default_channels(),
			implementations: default_channel_implementations(),
		}
	}
}

/// Tax, currency and invoice numbering.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingConfig {
	/// Sales tax rate applied to order subtotals, written as a decimal string.
	#[serde(default = "default_tax_rate")]
	pub tax_rate: Decimal,
	#[serde(default = "default_currency")]
	pub currency: String,
	#[serde(default = "default_invoice_prefix")]
	pub invoice_prefix: String,
}

fn default_tax_rate() -> Decimal {
	Decimal::new(12, 2)
}

fn default_currency() -> String {
	"PHP".to_string()
}

fn default_invoice_prefix() -> String {
	"INV".to_string()
}

impl Default for BillingConfig {
	fn default() -> Self {
		Self {
			tax_rate: default_tax_rate(),
			currency: default_currency(),
			invoice_prefix: default_invoice_prefix(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
	/// Upper bound on orders assigned to one trip.
	#[serde(default = "default_max_orders_per_trip")]
	pub max_orders_per_trip: usize,
}

fn default_max_orders_per_trip() -> usize {
	50
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			max_orders_per_trip: default_max_orders_per_trip(),
		}
	}
}

/// Paging limits for list queries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
}

fn default_page_size() -> u32 {
	20
}

fn default_max_page_size() -> u32 {
	100
}

impl Default for QueryConfig {
	fn default() -> Self {
		Self {
			default_page_size: default_page_size(),
			max_page_size: default_max_page_size(),
		}
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
		}
	}
}

/// Replaces `${VAR}` with the value of VAR and `${VAR:-fallback}` with the
/// value of VAR or `fallback` when unset.
///
/// Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut output = String::with_capacity(input.len());
	let mut last_end = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(fallback)) => fallback.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		output.push_str(&input[last_end..whole.start()]);
		output.push_str(&value);
		last_end = whole.end();
	}
	output.push_str(&input[last_end..]);

	Ok(output)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Returns the API section, or the defaults when the section is absent.
	pub fn api_or_default(&self) -> ApiConfig {
		self.api.clone().unwrap_or_default()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0
			|| self.storage.cleanup_interval_seconds > 86400
		{
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be between 1 and 86400".into(),
			));
		}

		for channel in &self.notification.channels {
			if !self.notification.implementations.contains_key(channel) {
				return Err(ConfigError::Validation(format!(
					"Notification channel '{}' not found in notification.implementations",
					channel
				)));
			}
		}

		let rate = self.billing.tax_rate;
		if rate.is_sign_negative() || rate >= Decimal::ONE {
			return Err(ConfigError::Validation(format!(
				"Tax rate {} must be at least 0 and below 1",
				rate
			)));
		}
		if self.billing.currency.trim().is_empty() {
			return Err(ConfigError::Validation("Currency cannot be empty".into()));
		}
		if self.billing.invoice_prefix.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Invoice prefix cannot be empty".into(),
			));
		}

		if self.dispatch.max_orders_per_trip == 0 {
			return Err(ConfigError::Validation(
				"max_orders_per_trip must be at least 1".into(),
			));
		}

		if self.query.default_page_size == 0
			|| self.query.default_page_size > self.query.max_page_size
		{
			return Err(ConfigError::Validation(format!(
				"default_page_size must be between 1 and max_page_size ({})",
				self.query.max_page_size
			)));
		}

		Ok(())
	}
}

/// Parses and validates a configuration string, resolving environment
/// references first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
