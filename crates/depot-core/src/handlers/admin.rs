//! Catalog, user and inventory administration.

use super::{check_money, new_id, require_role, require_text, Outcome};
use crate::error::DepotError;
use crate::state::{Batch, Records};
use chrono::{DateTime, Utc};
use depot_types::{
	AuditAction, EntityType, EventKind, InventoryAdjustment, InventoryRecord, NewProduct,
	NewStore, NewUser, NewWarehouse, Product, RequestContext, Role, StorageKey, Store, User,
	Warehouse,
};
use rust_decimal::Decimal;
use tracing::instrument;

const CATALOG_ADMINS: &[Role] = &[Role::Admin, Role::DistributorAdmin];
const STORE_EDITORS: &[Role] = &[Role::Admin, Role::DistributorAdmin, Role::Agent];
const STOCK_KEEPERS: &[Role] = &[Role::Admin, Role::DistributorAdmin, Role::WarehouseStaff];

/// Id of the administrator created when the user table is empty.
pub const BOOTSTRAP_ADMIN_ID: &str = "admin";

pub struct AdminHandler {
	records: Records,
}

impl AdminHandler {
	pub fn new(records: Records) -> Self {
		Self { records }
	}

	/// Creates the bootstrap administrator when no users exist yet.
	pub async fn ensure_admin(&self, now: DateTime<Utc>) -> Result<Option<User>, DepotError> {
		let users: Vec<User> = self.records.all(StorageKey::Users).await?;
		if !users.is_empty() {
			return Ok(None);
		}
		let admin = User {
			id: BOOTSTRAP_ADMIN_ID.to_string(),
			name: "Administrator".to_string(),
			email: "admin@depot.local".to_string(),
			role: Role::Admin,
			active: true,
			created_at: now,
		};
		self.records.put(StorageKey::Users, &admin.id, &admin).await?;
		tracing::info!(user_id = %admin.id, "Created bootstrap administrator");
		Ok(Some(admin))
	}

	#[instrument(skip_all, fields(role = %new.role))]
	pub async fn create_user(
		&self,
		ctx: &RequestContext,
		new: NewUser,
	) -> Result<Outcome<User>, DepotError> {
		require_role(ctx, &[Role::Admin], "manage users")?;
		require_text("Name", &new.name)?;
		let email = new.email.trim().to_string();
		if !email.contains('@') {
			return Err(DepotError::Validation(format!(
				"'{}' is not a valid email address",
				email
			)));
		}
		let users: Vec<User> = self.records.all(StorageKey::Users).await?;
		if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
			return Err(DepotError::Conflict(format!(
				"A user with email {} already exists",
				email
			)));
		}

		let user = User {
			id: new_id(),
			name: new.name.trim().to_string(),
			email,
			role: new.role,
			active: true,
			created_at: ctx.now,
		};
		self.save(StorageKey::Users, EntityType::User, &user.id, &user, AuditAction::RecordCreated)
			.await?;
		Ok(record_outcome(ctx, user.clone(), EntityType::User, &user.id, AuditAction::RecordCreated))
	}

	pub async fn get_user(&self, user_id: &str) -> Result<User, DepotError> {
		self.records.user(user_id).await
	}

	pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DepotError> {
		let mut users: Vec<User> = self.records.all(StorageKey::Users).await?;
		users.retain(|u| role.is_none_or(|r| u.role == r));
		users.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(users)
	}

	pub async fn deactivate_user(
		&self,
		ctx: &RequestContext,
		user_id: &str,
	) -> Result<Outcome<User>, DepotError> {
		require_role(ctx, &[Role::Admin], "manage users")?;
		if user_id == ctx.actor_id() {
			return Err(DepotError::validation("Users cannot deactivate themselves"));
		}
		let mut user = self.records.user(user_id).await?;
		ensure_active(user.active, EntityType::User, &user.id)?;
		user.active = false;
		self.finish_deactivation(ctx, StorageKey::Users, EntityType::User, user.id.clone(), user)
			.await
	}

	pub async fn create_store(
		&self,
		ctx: &RequestContext,
		new: NewStore,
	) -> Result<Outcome<Store>, DepotError> {
		require_role(ctx, STORE_EDITORS, "register stores")?;
		require_text("Store name", &new.name)?;
		require_text("City", &new.city)?;
		require_text("Barangay", &new.barangay)?;

		let store = Store {
			id: new_id(),
			name: new.name.trim().to_string(),
			owner_name: new.owner_name,
			city: new.city.trim().to_string(),
			barangay: new.barangay.trim().to_string(),
			address_line: new.address_line,
			contact_number: new.contact_number,
			active: true,
			created_at: ctx.now,
		};
		self.save(StorageKey::Stores, EntityType::Store, &store.id, &store, AuditAction::RecordCreated)
			.await?;
		Ok(record_outcome(ctx, store.clone(), EntityType::Store, &store.id, AuditAction::RecordCreated))
	}

	pub async fn get_store(&self, store_id: &str) -> Result<Store, DepotError> {
		self.records.store(store_id).await
	}

	pub async fn list_stores(&self) -> Result<Vec<Store>, DepotError> {
		let mut stores: Vec<Store> = self.records.all(StorageKey::Stores).await?;
		stores.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(stores)
	}

	pub async fn deactivate_store(
		&self,
		ctx: &RequestContext,
		store_id: &str,
	) -> Result<Outcome<Store>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "deactivate stores")?;
		let mut store = self.records.store(store_id).await?;
		ensure_active(store.active, EntityType::Store, &store.id)?;
		store.active = false;
		self.finish_deactivation(ctx, StorageKey::Stores, EntityType::Store, store.id.clone(), store)
			.await
	}

	pub async fn create_warehouse(
		&self,
		ctx: &RequestContext,
		new: NewWarehouse,
	) -> Result<Outcome<Warehouse>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "manage warehouses")?;
		require_text("Warehouse name", &new.name)?;
		require_text("City", &new.city)?;

		let warehouse = Warehouse {
			id: new_id(),
			name: new.name.trim().to_string(),
			distributor_id: new.distributor_id,
			city: new.city.trim().to_string(),
			active: true,
			created_at: ctx.now,
		};
		self.save(
			StorageKey::Warehouses,
			EntityType::Warehouse,
			&warehouse.id,
			&warehouse,
			AuditAction::RecordCreated,
		)
		.await?;
		Ok(record_outcome(
			ctx,
			warehouse.clone(),
			EntityType::Warehouse,
			&warehouse.id,
			AuditAction::RecordCreated,
		))
	}

	pub async fn get_warehouse(&self, warehouse_id: &str) -> Result<Warehouse, DepotError> {
		self.records.warehouse(warehouse_id).await
	}

	pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, DepotError> {
		let mut warehouses: Vec<Warehouse> = self.records.all(StorageKey::Warehouses).await?;
		warehouses.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(warehouses)
	}

	pub async fn deactivate_warehouse(
		&self,
		ctx: &RequestContext,
		warehouse_id: &str,
	) -> Result<Outcome<Warehouse>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "manage warehouses")?;
		let mut warehouse = self.records.warehouse(warehouse_id).await?;
		ensure_active(warehouse.active, EntityType::Warehouse, &warehouse.id)?;
		warehouse.active = false;
		self.finish_deactivation(
			ctx,
			StorageKey::Warehouses,
			EntityType::Warehouse,
			warehouse.id.clone(),
			warehouse,
		)
		.await
	}

	/// Creates a product. SKUs are unique, compared after trimming and
	/// upper-casing.
	#[instrument(skip_all, fields(sku = %new.sku))]
	pub async fn create_product(
		&self,
		ctx: &RequestContext,
		new: NewProduct,
	) -> Result<Outcome<Product>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "manage products")?;
		require_text("SKU", &new.sku)?;
		require_text("Product name", &new.name)?;
		check_money("Unit price", new.unit_price)?;

		let sku = new.sku.trim().to_uppercase();
		if self.records.exists(StorageKey::ProductBySku, &sku).await? {
			return Err(DepotError::Conflict(format!(
				"A product with SKU {} already exists",
				sku
			)));
		}

		let product = Product {
			id: new_id(),
			sku,
			name: new.name.trim().to_string(),
			unit_price: new.unit_price,
			active: true,
			created_at: ctx.now,
			updated_at: ctx.now,
		};
		let mut batch = Batch::new();
		batch
			.put(StorageKey::Products, &product.id, &product)?
			.put(StorageKey::ProductBySku, &product.sku, &product.id)?;
		self.records.commit(batch).await?;

		tracing::info!(product_id = %product.id, "Product created");
		Ok(record_outcome(
			ctx,
			product.clone(),
			EntityType::Product,
			&product.id,
			AuditAction::RecordCreated,
		))
	}

	pub async fn get_product(&self, product_id: &str) -> Result<Product, DepotError> {
		self.records.product(product_id).await
	}

	pub async fn list_products(&self) -> Result<Vec<Product>, DepotError> {
		let mut products: Vec<Product> = self.records.all(StorageKey::Products).await?;
		products.sort_by(|a, b| a.sku.cmp(&b.sku));
		Ok(products)
	}

	/// Changes the list price. Lines already on orders keep their snapshot.
	pub async fn update_product_price(
		&self,
		ctx: &RequestContext,
		product_id: &str,
		unit_price: Decimal,
	) -> Result<Outcome<Product>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "manage products")?;
		check_money("Unit price", unit_price)?;
		let mut product = self.records.product(product_id).await?;
		product.unit_price = unit_price;
		product.updated_at = ctx.now;
		self.save(
			StorageKey::Products,
			EntityType::Product,
			&product.id,
			&product,
			AuditAction::RecordUpdated,
		)
		.await?;
		Ok(record_outcome(
			ctx,
			product.clone(),
			EntityType::Product,
			&product.id,
			AuditAction::RecordUpdated,
		))
	}

	pub async fn deactivate_product(
		&self,
		ctx: &RequestContext,
		product_id: &str,
	) -> Result<Outcome<Product>, DepotError> {
		require_role(ctx, CATALOG_ADMINS, "manage products")?;
		let mut product = self.records.product(product_id).await?;
		ensure_active(product.active, EntityType::Product, &product.id)?;
		product.active = false;
		product.updated_at = ctx.now;
		self.finish_deactivation(ctx, StorageKey::Products, EntityType::Product, product.id.clone(), product)
			.await
	}

	/// Applies a manual stock change. Stock never goes below zero.
	#[instrument(skip_all, fields(warehouse_id = %adjustment.warehouse_id, delta = adjustment.delta))]
	pub async fn adjust_inventory(
		&self,
		ctx: &RequestContext,
		adjustment: InventoryAdjustment,
	) -> Result<Outcome<InventoryRecord>, DepotError> {
		require_role(ctx, STOCK_KEEPERS, "adjust inventory")?;
		if adjustment.delta == 0 {
			return Err(DepotError::validation("Adjustment delta cannot be zero"));
		}
		require_text("Reason", &adjustment.reason)?;
		self.records.warehouse(&adjustment.warehouse_id).await?;
		self.records.product(&adjustment.product_id).await?;

		let key = InventoryRecord::key(&adjustment.warehouse_id, &adjustment.product_id);
		let current = self
			.records
			.find::<InventoryRecord>(StorageKey::Inventory, &key)
			.await?
			.map(|r| r.on_hand)
			.unwrap_or(0);
		let on_hand = current
			.checked_add(adjustment.delta)
			.filter(|q| *q >= 0)
			.ok_or_else(|| {
				DepotError::Validation(format!(
					"Adjustment would leave {} units on hand",
					current.saturating_add(adjustment.delta)
				))
			})?;

		let record = InventoryRecord {
			warehouse_id: adjustment.warehouse_id.clone(),
			product_id: adjustment.product_id.clone(),
			on_hand,
			updated_at: ctx.now,
			updated_by: ctx.actor_id().to_string(),
		};
		self.records.put(StorageKey::Inventory, &key, &record).await?;

		tracing::info!(on_hand, "Inventory adjusted");
		let kind = EventKind::InventoryAdjusted {
			warehouse_id: adjustment.warehouse_id,
			product_id: adjustment.product_id,
			delta: adjustment.delta,
			on_hand,
			reason: adjustment.reason,
		};
		Ok(Outcome::with_event(record, ctx, kind))
	}

	/// Stock levels of one warehouse, ordered by product id.
	pub async fn get_inventory(&self, warehouse_id: &str) -> Result<Vec<InventoryRecord>, DepotError> {
		self.records.warehouse(warehouse_id).await?;
		self.records
			.with_prefix(StorageKey::Inventory, &format!("{}.", warehouse_id))
			.await
	}

	async fn save<T: serde::Serialize>(
		&self,
		key: StorageKey,
		entity: EntityType,
		id: &str,
		value: &T,
		action: AuditAction,
	) -> Result<(), DepotError> {
		self.records.put(key, id, value).await?;
		tracing::info!(entity = %entity, id = %id, action = %action, "Record saved");
		Ok(())
	}

	async fn finish_deactivation<T: serde::Serialize>(
		&self,
		ctx: &RequestContext,
		key: StorageKey,
		entity: EntityType,
		id: String,
		value: T,
	) -> Result<Outcome<T>, DepotError> {
		self.save(key, entity, &id, &value, AuditAction::RecordDeactivated)
			.await?;
		Ok(record_outcome(ctx, value, entity, &id, AuditAction::RecordDeactivated))
	}
}

fn ensure_active(active: bool, entity: EntityType, id: &str) -> Result<(), DepotError> {
	if active {
		Ok(())
	} else {
		Err(DepotError::Conflict(format!("{} {} is already inactive", entity, id)))
	}
}

fn record_outcome<T>(
	ctx: &RequestContext,
	value: T,
	entity_type: EntityType,
	entity_id: &str,
	action: AuditAction,
) -> Outcome<T> {
	Outcome::with_event(
		value,
		ctx,
		EventKind::RecordChanged {
			entity_type,
			entity_id: entity_id.to_string(),
			action,
		},
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{dec, Fixture};

	#[tokio::test]
	async fn test_only_admins_manage_users() {
		let fx = Fixture::new().await;
		let new = NewUser {
			name: "Second Agent".into(),
			email: "second@depot.test".into(),
			role: Role::Agent,
		};
		let err = fx.engine.create_user(&fx.agent, new.clone()).await.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));

		fx.engine.create_user(&fx.admin, new).await.unwrap();
		let duplicate = NewUser {
			name: "Copy".into(),
			email: "SECOND@depot.test".into(),
			role: Role::Agent,
		};
		let err = fx.engine.create_user(&fx.admin, duplicate).await.unwrap_err();
		assert!(matches!(err, DepotError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_list_users_by_role_and_deactivate() {
		let fx = Fixture::new().await;
		let agents = fx.engine.list_users(Some(Role::Agent)).await.unwrap();
		assert_eq!(agents.len(), 1);

		let user = fx
			.engine
			.deactivate_user(&fx.admin, fx.agent.actor_id())
			.await
			.unwrap();
		assert!(!user.active);
		let err = fx
			.engine
			.deactivate_user(&fx.admin, fx.agent.actor_id())
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_sku_is_unique() {
		let fx = Fixture::new().await;
		let err = fx
			.engine
			.create_product(
				&fx.admin,
				NewProduct {
					sku: " sku-a ".into(),
					name: "Duplicate".into(),
					unit_price: dec("1.00"),
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_inactive_product_cannot_be_ordered() {
		let fx = Fixture::new().await;
		fx.engine
			.deactivate_product(&fx.admin, &fx.product_b)
			.await
			.unwrap();
		let err = fx
			.engine
			.create_order(&fx.agent, fx.new_order(&[(&fx.product_b, 1)]))
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));
	}

	#[tokio::test]
	async fn test_inventory_never_negative() {
		let fx = Fixture::new().await;
		let adjust = |delta: i64| InventoryAdjustment {
			warehouse_id: fx.warehouse.id.clone(),
			product_id: fx.product_a.clone(),
			delta,
			reason: "cycle count".into(),
		};

		let record = fx.engine.adjust_inventory(&fx.admin, adjust(10)).await.unwrap();
		assert_eq!(record.on_hand, 10);
		let record = fx.engine.adjust_inventory(&fx.admin, adjust(-4)).await.unwrap();
		assert_eq!(record.on_hand, 6);
		let err = fx
			.engine
			.adjust_inventory(&fx.admin, adjust(-7))
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));

		let stock = fx.engine.get_inventory(&fx.warehouse.id).await.unwrap();
		assert_eq!(stock.len(), 1);
		assert_eq!(stock[0].on_hand, 6);
	}

	#[tokio::test]
	async fn test_orders_do_not_touch_inventory() {
		let fx = Fixture::new().await;
		fx.engine
			.adjust_inventory(
				&fx.admin,
				InventoryAdjustment {
					warehouse_id: fx.warehouse.id.clone(),
					product_id: fx.product_a.clone(),
					delta: 5,
					reason: "restock".into(),
				},
			)
			.await
			.unwrap();
		let order = fx.packed_order().await;
		fx.trip_with(&[&order.id]).await;

		let stock = fx.engine.get_inventory(&fx.warehouse.id).await.unwrap();
		assert_eq!(stock[0].on_hand, 5);
	}
}
