//! In-memory storage backend.
//!
//! Nothing survives a restart. Suitable for tests and single-process demos.

use crate::{BatchOp, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use depot_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_live(&self, now: Instant) -> bool {
		self.expires_at.is_none_or(|at| now < at)
	}
}

/// Map-backed storage. A batch is applied under a single write lock, so readers
/// observe either none or all of it.
pub struct MemoryStorage {
	store: Arc<RwLock<BTreeMap<String, Entry>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(BTreeMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store
			.get(key)
			.filter(|entry| entry.is_live(Instant::now()))
			.map(|entry| entry.value.clone())
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let expires_at = ttl
			.filter(|ttl| !ttl.is_zero())
			.map(|ttl| Instant::now() + ttl);
		let mut store = self.store.write().await;
		store.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.get(key)
			.is_some_and(|entry| entry.is_live(Instant::now())))
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let now = Instant::now();
		let store = self.store.read().await;
		Ok(store
			.range(prefix.to_string()..)
			.take_while(|(key, _)| key.starts_with(prefix))
			.filter(|(_, entry)| entry.is_live(now))
			.map(|(key, _)| key.clone())
			.collect())
	}

	async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		for op in ops {
			match op {
				BatchOp::Set { key, value } => {
					store.insert(
						key,
						Entry {
							value,
							expires_at: None,
						},
					);
				},
				BatchOp::Delete { key } => {
					store.remove(&key);
				},
			}
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| entry.is_live(now));
		Ok(before - store.len())
	}
}

/// The memory backend takes no options.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();
		let key = "orders:o1";
		let value = b"{}".to_vec();

		storage.set_bytes(key, value.clone(), None).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_list_keys_by_prefix() {
		let storage = MemoryStorage::new();
		for key in ["trips:t2", "orders:o2", "orders:o1", "ordersx:o3"] {
			storage.set_bytes(key, vec![1], None).await.unwrap();
		}
		assert_eq!(
			storage.list_keys("orders:").await.unwrap(),
			vec!["orders:o1".to_string(), "orders:o2".to_string()]
		);
	}

	#[tokio::test]
	async fn test_apply_batch() {
		let storage = MemoryStorage::new();
		storage.set_bytes("orders:o1", vec![0], None).await.unwrap();
		storage
			.apply_batch(vec![
				BatchOp::Set {
					key: "trips:t1".into(),
					value: vec![1],
				},
				BatchOp::Set {
					key: "orders:o1".into(),
					value: vec![2],
				},
				BatchOp::Delete {
					key: "orders:o9".into(),
				},
			])
			.await
			.unwrap();
		assert_eq!(storage.get_bytes("trips:t1").await.unwrap(), vec![1]);
		assert_eq!(storage.get_bytes("orders:o1").await.unwrap(), vec![2]);
	}

	#[tokio::test]
	async fn test_ttl_expiry_and_cleanup() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes("audit_log:a1", vec![1], Some(Duration::from_millis(10)))
			.await
			.unwrap();
		storage.set_bytes("audit_log:a2", vec![2], None).await.unwrap();

		tokio::time::sleep(Duration::from_millis(30)).await;

		assert!(!storage.exists("audit_log:a1").await.unwrap());
		assert_eq!(
			storage.list_keys("audit_log:").await.unwrap(),
			vec!["audit_log:a2".to_string()]
		);
		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
	}

	#[test]
	fn test_factory_rejects_non_table() {
		assert!(create_storage(&toml::Value::Integer(1)).is_err());
	}
}
