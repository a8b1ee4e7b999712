//! Loads depot records by id and commits batches of changes.
//!
//! Missing records become [`DepotError::NotFound`] naming the entity; any
//! other storage failure is an internal fault.

use crate::error::DepotError;
use depot_storage::{StorageService, WriteBatch};
use depot_types::{
	EntityType, Invoice, Order, Product, StorageKey, Store, Trip, User, Warehouse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct Records {
	storage: Arc<StorageService>,
}

impl Records {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Loads a record or fails with `NotFound` for `entity`.
	pub async fn load<T: DeserializeOwned>(
		&self,
		key: StorageKey,
		entity: EntityType,
		id: &str,
	) -> Result<T, DepotError> {
		self.storage
			.find(key.as_str(), id)
			.await?
			.ok_or_else(|| DepotError::not_found(entity, id))
	}

	pub async fn find<T: DeserializeOwned>(
		&self,
		key: StorageKey,
		id: &str,
	) -> Result<Option<T>, DepotError> {
		Ok(self.storage.find(key.as_str(), id).await?)
	}

	pub async fn all<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Vec<T>, DepotError> {
		Ok(self.storage.retrieve_all(key.as_str()).await?)
	}

	pub async fn with_prefix<T: DeserializeOwned>(
		&self,
		key: StorageKey,
		id_prefix: &str,
	) -> Result<Vec<T>, DepotError> {
		Ok(self.storage.retrieve_by_prefix(key.as_str(), id_prefix).await?)
	}

	pub async fn exists(&self, key: StorageKey, id: &str) -> Result<bool, DepotError> {
		Ok(self.storage.exists(key.as_str(), id).await?)
	}

	/// Writes a single record outside of a batch.
	pub async fn put<T: Serialize>(
		&self,
		key: StorageKey,
		id: &str,
		value: &T,
	) -> Result<(), DepotError> {
		Ok(self.storage.store(key.as_str(), id, value).await?)
	}

	pub async fn commit(&self, batch: Batch) -> Result<(), DepotError> {
		Ok(self.storage.commit(batch.inner).await?)
	}

	pub async fn order(&self, id: &str) -> Result<Order, DepotError> {
		self.load(StorageKey::Orders, EntityType::Order, id).await
	}

	pub async fn trip(&self, id: &str) -> Result<Trip, DepotError> {
		self.load(StorageKey::Trips, EntityType::Trip, id).await
	}

	pub async fn invoice(&self, id: &str) -> Result<Invoice, DepotError> {
		self.load(StorageKey::Invoices, EntityType::Invoice, id).await
	}

	pub async fn store(&self, id: &str) -> Result<Store, DepotError> {
		self.load(StorageKey::Stores, EntityType::Store, id).await
	}

	pub async fn warehouse(&self, id: &str) -> Result<Warehouse, DepotError> {
		self.load(StorageKey::Warehouses, EntityType::Warehouse, id).await
	}

	pub async fn product(&self, id: &str) -> Result<Product, DepotError> {
		self.load(StorageKey::Products, EntityType::Product, id).await
	}

	pub async fn user(&self, id: &str) -> Result<User, DepotError> {
		self.load(StorageKey::Users, EntityType::User, id).await
	}
}

/// Records written together by one operation.
#[derive(Debug, Default)]
pub struct Batch {
	inner: WriteBatch,
}

impl Batch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put<T: Serialize>(
		&mut self,
		key: StorageKey,
		id: &str,
		value: &T,
	) -> Result<&mut Self, DepotError> {
		self.inner.put(key.as_str(), id, value)?;
		Ok(self)
	}

	pub fn order(&mut self, order: &Order) -> Result<&mut Self, DepotError> {
		self.put(StorageKey::Orders, &order.id, order)
	}

	pub fn trip(&mut self, trip: &Trip) -> Result<&mut Self, DepotError> {
		self.put(StorageKey::Trips, &trip.id, trip)
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use depot_storage::implementations::memory::MemoryStorage;

	fn records() -> Records {
		Records::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn test_missing_record_names_entity() {
		let err = records().order("o-404").await.unwrap_err();
		assert!(matches!(
			err,
			DepotError::NotFound {
				entity: EntityType::Order,
				ref id
			} if id == "o-404"
		));
	}

	#[tokio::test]
	async fn test_batch_commit_writes_every_record() -> Result<(), DepotError> {
		let records = records();
		let mut batch = Batch::new();
		batch
			.put(StorageKey::ProductBySku, "SKU-1", &"p1".to_string())?
			.put(StorageKey::ProductBySku, "SKU-2", &"p2".to_string())?;
		assert_eq!(batch.len(), 2);
		records.commit(batch).await?;

		let ids: Vec<String> = records.all(StorageKey::ProductBySku).await?;
		assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
		Ok(())
	}
}
