//! Storage module for the depot back office.
//!
//! A byte-oriented [`StorageInterface`] is implemented by each backend; the
//! typed [`StorageService`] on top of it stores JSON documents under
//! `namespace:id` keys and commits multi-record changes as one [`WriteBatch`].

use async_trait::async_trait;
use depot_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
	Set { key: String, value: Vec<u8> },
	Delete { key: String },
}

impl BatchOp {
	pub fn key(&self) -> &str {
		match self {
			BatchOp::Set { key, .. } | BatchOp::Delete { key } => key,
		}
	}
}

/// Low-level key-value interface implemented by storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with an optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes a key. Deleting a missing key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns every live key starting with `prefix`, sorted.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Applies all operations or none of them.
	async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries and returns how many were removed.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns `(name, factory)` for every built-in storage backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Set of typed writes committed together through
/// [`StorageService::commit`].
#[derive(Debug, Default)]
pub struct WriteBatch {
	ops: Vec<BatchOp>,
}

impl WriteBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a JSON document for `namespace:id`.
	pub fn put<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<&mut Self, StorageError> {
		self.ops.push(BatchOp::Set {
			key: storage_key(namespace, id),
			value: encode(data)?,
		});
		Ok(self)
	}

	pub fn delete(&mut self, namespace: &str, id: &str) -> &mut Self {
		self.ops.push(BatchOp::Delete {
			key: storage_key(namespace, id),
		});
		self
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}
}

/// Typed storage on top of a backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value with an optional time-to-live, overwriting any previous
	/// value.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(&storage_key(namespace, id), encode(data)?, ttl)
			.await
	}

	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		decode(&bytes)
	}

	/// Like [`retrieve`](Self::retrieve) but maps `NotFound` to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Loads every record in a namespace, ordered by key.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		self.retrieve_by_prefix(namespace, "").await
	}

	/// Loads the records of a namespace whose id starts with `id_prefix`,
	/// ordered by key.
	pub async fn retrieve_by_prefix<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id_prefix: &str,
	) -> Result<Vec<T>, StorageError> {
		let prefix = storage_key(namespace, id_prefix);
		let keys = self.backend.list_keys(&prefix).await?;
		let mut records = Vec::with_capacity(keys.len());
		for key in keys {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => records.push(decode(&bytes)?),
				// Expired between listing and reading.
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(records)
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(namespace, id)).await
	}

	/// Overwrites an existing value; fails with `NotFound` if there is none.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = storage_key(namespace, id);
		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}
		self.backend.set_bytes(&key, encode(data)?, None).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(namespace, id)).await
	}

	/// Writes every queued operation atomically.
	pub async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
		if batch.is_empty() {
			return Ok(());
		}
		self.backend.apply_batch(batch.ops).await
	}

	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Crate {
		sku: String,
		on_hand: i64,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_typed_round_trip_and_find() {
		let storage = service();
		let record = Crate {
			sku: "SKU-1".into(),
			on_hand: 4,
		};
		storage.store("inventory", "w1.p1", &record).await.unwrap();

		let loaded: Crate = storage.retrieve("inventory", "w1.p1").await.unwrap();
		assert_eq!(loaded, record);
		assert!(storage
			.find::<Crate>("inventory", "missing")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_update_requires_existing() {
		let storage = service();
		let record = Crate {
			sku: "SKU-1".into(),
			on_hand: 1,
		};
		let result = storage.update("inventory", "nope", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_retrieve_all_is_namespace_scoped() {
		let storage = service();
		for (id, qty) in [("b", 2), ("a", 1)] {
			storage
				.store(
					"inventory",
					id,
					&Crate {
						sku: id.into(),
						on_hand: qty,
					},
				)
				.await
				.unwrap();
		}
		storage
			.store(
				"inventory_archive",
				"z",
				&Crate {
					sku: "z".into(),
					on_hand: 9,
				},
			)
			.await
			.unwrap();

		let all: Vec<Crate> = storage.retrieve_all("inventory").await.unwrap();
		assert_eq!(
			all.iter().map(|c| c.sku.as_str()).collect::<Vec<_>>(),
			vec!["a", "b"]
		);

		let only_b: Vec<Crate> = storage.retrieve_by_prefix("inventory", "b").await.unwrap();
		assert_eq!(only_b.len(), 1);
	}

	#[tokio::test]
	async fn test_commit_batch() {
		let storage = service();
		storage
			.store(
				"inventory",
				"old",
				&Crate {
					sku: "old".into(),
					on_hand: 0,
				},
			)
			.await
			.unwrap();

		let mut batch = WriteBatch::new();
		batch
			.put(
				"inventory",
				"new",
				&Crate {
					sku: "new".into(),
					on_hand: 3,
				},
			)
			.unwrap();
		batch.delete("inventory", "old");
		assert_eq!(batch.len(), 2);
		storage.commit(batch).await.unwrap();

		assert!(storage.exists("inventory", "new").await.unwrap());
		assert!(!storage.exists("inventory", "old").await.unwrap());
	}
}
