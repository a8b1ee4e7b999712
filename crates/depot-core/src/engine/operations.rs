//! Public operations of the depot engine.
//!
//! Mutations go through `mutate`; reads go straight to the handlers.

use super::DepotEngine;
use crate::error::DepotError;
use depot_types::{
	AuditEntry, EntityType, Invoice, InventoryAdjustment, InventoryRecord, NewOrder, NewPayment,
	NewProduct, NewStore, NewTrip, NewUser, NewWarehouse, Order, OrderBalance, OrderEdit,
	OrderQuery, OrderSummary, Page, Payment, Product, QuantityAdjustments, RequestContext, Role,
	SequenceMapping, Store, StoreReceivable, Trip, TripAssign, TripStatus, User, Warehouse,
};
use rust_decimal::Decimal;

impl DepotEngine {
	// Orders

	pub async fn create_order(&self, ctx: &RequestContext, new: NewOrder) -> Result<Order, DepotError> {
		self.mutate("create_order", self.orders.create(ctx, new)).await
	}

	pub async fn edit_order(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		edit: OrderEdit,
	) -> Result<Order, DepotError> {
		self.mutate("edit_order", self.orders.edit(ctx, order_id, edit))
			.await
	}

	pub async fn confirm_order(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		adjustments: QuantityAdjustments,
	) -> Result<Order, DepotError> {
		self.mutate("confirm_order", self.orders.confirm(ctx, order_id, adjustments))
			.await
	}

	pub async fn mark_packed(&self, ctx: &RequestContext, order_id: &str) -> Result<Order, DepotError> {
		self.mutate("mark_packed", self.orders.mark_packed(ctx, order_id))
			.await
	}

	pub async fn dispatch_order(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		trip_id: &str,
	) -> Result<Order, DepotError> {
		self.mutate("dispatch_order", self.orders.dispatch(ctx, order_id, trip_id))
			.await
	}

	pub async fn mark_in_transit(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Order, DepotError> {
		self.mutate("mark_in_transit", self.orders.mark_in_transit(ctx, order_id))
			.await
	}

	pub async fn mark_at_store(&self, ctx: &RequestContext, order_id: &str) -> Result<Order, DepotError> {
		self.mutate("mark_at_store", self.orders.mark_at_store(ctx, order_id))
			.await
	}

	pub async fn mark_delivered(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Order, DepotError> {
		self.mutate("mark_delivered", self.orders.mark_delivered(ctx, order_id))
			.await
	}

	pub async fn mark_returned(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		reason: Option<String>,
	) -> Result<Order, DepotError> {
		self.mutate("mark_returned", self.orders.mark_returned(ctx, order_id, reason))
			.await
	}

	pub async fn cancel_order(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		reason: Option<String>,
	) -> Result<Order, DepotError> {
		self.mutate("cancel_order", self.orders.cancel(ctx, order_id, reason))
			.await
	}

	pub async fn get_order(&self, order_id: &str) -> Result<Order, DepotError> {
		self.orders.get(order_id).await
	}

	pub async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>, DepotError> {
		self.queries.list_orders(query).await
	}

	// Trips

	pub async fn create_trip(&self, ctx: &RequestContext, new: NewTrip) -> Result<Trip, DepotError> {
		self.mutate("create_trip", self.trips.create(ctx, new)).await
	}

	pub async fn assign_trip(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		assign: TripAssign,
	) -> Result<Trip, DepotError> {
		self.mutate("assign_trip", self.trips.assign(ctx, trip_id, assign))
			.await
	}

	pub async fn update_trip_status(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		status: TripStatus,
	) -> Result<Trip, DepotError> {
		self.mutate("update_trip_status", self.trips.update_status(ctx, trip_id, status))
			.await
	}

	pub async fn reorder_trip_assignments(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		mapping: SequenceMapping,
	) -> Result<Trip, DepotError> {
		self.mutate("reorder_trip_assignments", self.trips.reorder(ctx, trip_id, mapping))
			.await
	}

	pub async fn cancel_trip(&self, ctx: &RequestContext, trip_id: &str) -> Result<Trip, DepotError> {
		self.mutate("cancel_trip", self.trips.cancel(ctx, trip_id))
			.await
	}

	pub async fn suggest_trip_sequence(&self, order_ids: &[String]) -> Result<Vec<String>, DepotError> {
		self.trips.suggest_sequence(order_ids).await
	}

	pub async fn get_trip(&self, trip_id: &str) -> Result<Trip, DepotError> {
		self.trips.get(trip_id).await
	}

	pub async fn list_trips(
		&self,
		status: Option<TripStatus>,
		warehouse_id: Option<&str>,
	) -> Result<Vec<Trip>, DepotError> {
		self.trips.list(status, warehouse_id).await
	}

	// Payments and invoices

	pub async fn record_payment(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		payment: NewPayment,
	) -> Result<Payment, DepotError> {
		self.mutate("record_payment", self.billing.record_payment(ctx, order_id, payment))
			.await
	}

	pub async fn list_payments(&self, order_id: &str) -> Result<Vec<Payment>, DepotError> {
		self.billing.payments(order_id).await
	}

	pub async fn order_balance(&self, order_id: &str) -> Result<OrderBalance, DepotError> {
		self.billing.order_balance(order_id).await
	}

	pub async fn generate_invoice(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Invoice, DepotError> {
		self.mutate("generate_invoice", self.billing.generate_invoice(ctx, order_id))
			.await
	}

	pub async fn update_invoice_metadata(
		&self,
		ctx: &RequestContext,
		invoice_id: &str,
		url: Option<String>,
	) -> Result<Invoice, DepotError> {
		self.mutate(
			"update_invoice_metadata",
			self.billing.update_metadata(ctx, invoice_id, url),
		)
		.await
	}

	pub async fn reconcile_invoice(
		&self,
		ctx: &RequestContext,
		invoice_id: &str,
		note: Option<String>,
	) -> Result<Invoice, DepotError> {
		self.mutate("reconcile_invoice", self.billing.reconcile(ctx, invoice_id, note))
			.await
	}

	pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, DepotError> {
		self.billing.get_invoice(invoice_id).await
	}

	pub async fn accounts_receivable(
		&self,
		store_id: Option<&str>,
	) -> Result<Vec<StoreReceivable>, DepotError> {
		self.billing.accounts_receivable(store_id).await
	}

	// Users

	pub async fn create_user(&self, ctx: &RequestContext, new: NewUser) -> Result<User, DepotError> {
		self.mutate("create_user", self.admin.create_user(ctx, new))
			.await
	}

	pub async fn get_user(&self, user_id: &str) -> Result<User, DepotError> {
		self.admin.get_user(user_id).await
	}

	pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DepotError> {
		self.admin.list_users(role).await
	}

	pub async fn deactivate_user(&self, ctx: &RequestContext, user_id: &str) -> Result<User, DepotError> {
		self.mutate("deactivate_user", self.admin.deactivate_user(ctx, user_id))
			.await
	}

	// Stores, warehouses and products

	pub async fn create_store(&self, ctx: &RequestContext, new: NewStore) -> Result<Store, DepotError> {
		self.mutate("create_store", self.admin.create_store(ctx, new))
			.await
	}

	pub async fn get_store(&self, store_id: &str) -> Result<Store, DepotError> {
		self.admin.get_store(store_id).await
	}

	pub async fn list_stores(&self) -> Result<Vec<Store>, DepotError> {
		self.admin.list_stores().await
	}

	pub async fn deactivate_store(
		&self,
		ctx: &RequestContext,
		store_id: &str,
	) -> Result<Store, DepotError> {
		self.mutate("deactivate_store", self.admin.deactivate_store(ctx, store_id))
			.await
	}

	pub async fn create_warehouse(
		&self,
		ctx: &RequestContext,
		new: NewWarehouse,
	) -> Result<Warehouse, DepotError> {
		self.mutate("create_warehouse", self.admin.create_warehouse(ctx, new))
			.await
	}

	pub async fn get_warehouse(&self, warehouse_id: &str) -> Result<Warehouse, DepotError> {
		self.admin.get_warehouse(warehouse_id).await
	}

	pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, DepotError> {
		self.admin.list_warehouses().await
	}

	pub async fn deactivate_warehouse(
		&self,
		ctx: &RequestContext,
		warehouse_id: &str,
	) -> Result<Warehouse, DepotError> {
		self.mutate(
			"deactivate_warehouse",
			self.admin.deactivate_warehouse(ctx, warehouse_id),
		)
		.await
	}

	pub async fn create_product(
		&self,
		ctx: &RequestContext,
		new: NewProduct,
	) -> Result<Product, DepotError> {
		self.mutate("create_product", self.admin.create_product(ctx, new))
			.await
	}

	pub async fn get_product(&self, product_id: &str) -> Result<Product, DepotError> {
		self.admin.get_product(product_id).await
	}

	pub async fn list_products(&self) -> Result<Vec<Product>, DepotError> {
		self.admin.list_products().await
	}

	pub async fn update_product_price(
		&self,
		ctx: &RequestContext,
		product_id: &str,
		unit_price: Decimal,
	) -> Result<Product, DepotError> {
		self.mutate(
			"update_product_price",
			self.admin.update_product_price(ctx, product_id, unit_price),
		)
		.await
	}

	pub async fn deactivate_product(
		&self,
		ctx: &RequestContext,
		product_id: &str,
	) -> Result<Product, DepotError> {
		self.mutate("deactivate_product", self.admin.deactivate_product(ctx, product_id))
			.await
	}

	// Inventory

	pub async fn adjust_inventory(
		&self,
		ctx: &RequestContext,
		adjustment: InventoryAdjustment,
	) -> Result<InventoryRecord, DepotError> {
		self.mutate("adjust_inventory", self.admin.adjust_inventory(ctx, adjustment))
			.await
	}

	pub async fn get_inventory(&self, warehouse_id: &str) -> Result<Vec<InventoryRecord>, DepotError> {
		self.admin.get_inventory(warehouse_id).await
	}

	// Audit

	/// Audit entries for one entity, oldest first.
	pub async fn audit_trail(
		&self,
		entity_type: EntityType,
		entity_id: &str,
	) -> Result<Vec<AuditEntry>, DepotError> {
		self.audit.trail(entity_type, entity_id).await
	}
}
