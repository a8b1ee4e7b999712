//! Order lifecycle handler.
//!
//! Every status change is decided by [`OrderStatus::apply`] before anything is
//! written. When the order rides on a trip, the trip's stop snapshot is
//! rewritten in the same batch so the two never disagree.

use super::{event, new_id, require_role, Outcome, PACKERS, TRIP_MANAGERS};
use crate::error::DepotError;
use crate::state::{Batch, Records};
use depot_types::{
	truncate_id, EventKind, NewOrder, NewOrderLine, Order, OrderEdit, OrderItem, OrderStatus,
	OrderTransition, QuantityAdjustments, RequestContext, Role, StorageKey, Totals, Trip,
	TripAssignment, TripTransition,
};
use rust_decimal::Decimal;
use tracing::instrument;

const ORDER_CREATORS: &[Role] = &[Role::Agent, Role::DistributorAdmin, Role::Admin];

pub struct OrderHandler {
	records: Records,
	tax_rate: Decimal,
	max_orders_per_trip: usize,
}

impl OrderHandler {
	pub fn new(records: Records, tax_rate: Decimal, max_orders_per_trip: usize) -> Self {
		Self {
			records,
			tax_rate,
			max_orders_per_trip,
		}
	}

	#[instrument(skip_all, fields(store_id = %truncate_id(&new.store_id)))]
	pub async fn create(
		&self,
		ctx: &RequestContext,
		new: NewOrder,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, ORDER_CREATORS, "create orders")?;

		let store = self.records.store(&new.store_id).await?;
		if !store.active {
			return Err(DepotError::Validation(format!(
				"Store {} is inactive",
				store.id
			)));
		}
		if let Some(warehouse_id) = &new.warehouse_id {
			let warehouse = self.records.warehouse(warehouse_id).await?;
			if !warehouse.active {
				return Err(DepotError::Validation(format!(
					"Warehouse {} is inactive",
					warehouse.id
				)));
			}
		}
		let items = self.build_items(&new.items).await?;
		let totals = Totals::compute(&items, self.tax_rate)?;

		let order = Order {
			id: new_id(),
			store_id: store.id,
			distributor_id: new.distributor_id,
			warehouse_id: new.warehouse_id,
			agent_id: ctx.actor_id().to_string(),
			trip_id: None,
			status: OrderStatus::Pending,
			priority: new.priority,
			scheduled_for: new.scheduled_for,
			notes: new.notes,
			sub_total: totals.sub_total,
			tax: totals.tax,
			total: totals.total,
			items,
			payments: Vec::new(),
			created_at: ctx.now,
			updated_at: ctx.now,
			created_by: ctx.actor_id().to_string(),
			updated_by: ctx.actor_id().to_string(),
		};

		let mut batch = Batch::new();
		batch.order(&order)?;
		self.records.commit(batch).await?;

		tracing::info!(order_id = %truncate_id(&order.id), total = %order.total, "Order created");
		let kind = EventKind::OrderCreated {
			order_id: order.id.clone(),
			agent_id: order.agent_id.clone(),
			store_id: order.store_id.clone(),
			total: order.total,
		};
		Ok(Outcome::with_event(order, ctx, kind))
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn edit(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		edit: OrderEdit,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, ORDER_CREATORS, "edit orders")?;

		let mut order = self.records.order(order_id).await?;
		order.status = order.status.apply(OrderTransition::Edit)?;

		if let Some(lines) = &edit.items {
			order.items = self.build_items(lines).await?;
		}
		if let Some(scheduled_for) = edit.scheduled_for {
			order.scheduled_for = scheduled_for;
		}
		if let Some(priority) = edit.priority {
			order.priority = priority;
		}
		if let Some(notes) = edit.notes {
			order.notes = notes;
		}
		order.recompute_totals(self.tax_rate)?;
		order.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch.order(&order)?;
		self.records.commit(batch).await?;

		tracing::info!(total = %order.total, "Order edited");
		let kind = EventKind::OrderEdited {
			order_id: order.id.clone(),
			agent_id: order.agent_id.clone(),
			total: order.total,
		};
		Ok(Outcome::with_event(order, ctx, kind))
	}

	/// Confirms a pending order, applying quantity overrides to existing lines
	/// first.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn confirm(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		adjustments: QuantityAdjustments,
	) -> Result<Outcome<Order>, DepotError> {
		self.transition(ctx, order_id, OrderTransition::Confirm, None, |order| {
			apply_adjustments(&mut order.items, &adjustments)
		})
		.await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_packed(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, PACKERS, "pack orders")?;
		self.transition(ctx, order_id, OrderTransition::MarkPacked, None, |_| Ok(()))
			.await
	}

	/// Dispatches a packed order onto a trip that has not departed yet.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), trip_id = %truncate_id(trip_id)))]
	pub async fn dispatch(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		trip_id: &str,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "dispatch orders")?;
		let mut order = self.records.order(order_id).await?;
		let from = order.status;
		let to = from.apply(OrderTransition::Dispatch)?;

		let mut trip = self.records.trip(trip_id).await?;
		trip.status.apply(TripTransition::AddStop)?;
		if order.warehouse_id.as_deref() != Some(trip.warehouse_id.as_str()) {
			return Err(DepotError::Validation(format!(
				"Order {} does not ship from warehouse {}",
				order.id, trip.warehouse_id
			)));
		}
		if trip.assignments.len() >= self.max_orders_per_trip {
			return Err(DepotError::Validation(format!(
				"Trip {} already carries the maximum of {} orders",
				trip.id, self.max_orders_per_trip
			)));
		}

		trip.assignments.push(TripAssignment {
			order_id: order.id.clone(),
			sequence_no: trip.next_sequence_no(),
			order_status: to,
		});
		trip.touch(ctx.actor_id(), ctx.now);

		order.status = to;
		order.trip_id = Some(trip.id.clone());
		order.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch.order(&order)?.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!(from = %from, to = %to, "Order dispatched");
		let kind = status_changed(&order, from, None);
		Ok(Outcome::with_event(order, ctx, kind))
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_in_transit(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "mark orders in transit")?;
		self.transition(ctx, order_id, OrderTransition::MarkInTransit, None, |_| Ok(()))
			.await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_at_store(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "mark orders at the store")?;
		self.transition(ctx, order_id, OrderTransition::MarkAtStore, None, |_| Ok(()))
			.await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_delivered(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "mark orders delivered")?;
		self.transition(ctx, order_id, OrderTransition::MarkDelivered, None, |_| Ok(()))
			.await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_returned(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		reason: Option<String>,
	) -> Result<Outcome<Order>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "mark orders returned")?;
		self.transition(ctx, order_id, OrderTransition::MarkReturned, reason, |_| Ok(()))
			.await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		reason: Option<String>,
	) -> Result<Outcome<Order>, DepotError> {
		self.transition(ctx, order_id, OrderTransition::Cancel, reason, |_| Ok(()))
			.await
	}

	pub async fn get(&self, order_id: &str) -> Result<Order, DepotError> {
		self.records.order(order_id).await
	}

	/// Loads an order, applies `transition`, lets `update` adjust the order
	/// and commits it together with the trip stop snapshot.
	async fn transition<F>(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		transition: OrderTransition,
		reason: Option<String>,
		update: F,
	) -> Result<Outcome<Order>, DepotError>
	where
		F: FnOnce(&mut Order) -> Result<(), DepotError>,
	{
		let mut order = self.records.order(order_id).await?;
		let from = order.status;
		let to = from.apply(transition)?;

		update(&mut order)?;
		order.status = to;
		order.recompute_totals(self.tax_rate)?;
		order.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch.order(&order)?;
		if let Some(trip_id) = &order.trip_id {
			if let Some(mut trip) = self
				.records
				.find::<Trip>(StorageKey::Trips, trip_id)
				.await?
			{
				if let Some(stop) = trip.assignment_mut(&order.id) {
					stop.order_status = to;
					trip.touch(ctx.actor_id(), ctx.now);
					batch.trip(&trip)?;
				}
			}
		}
		self.records.commit(batch).await?;

		tracing::info!(from = %from, to = %to, "Order status changed");
		let kind = status_changed(&order, from, reason);
		Ok(Outcome::new(order, vec![event(ctx, kind)]))
	}

	/// Resolves requested lines into priced order items. Repeated products are
	/// merged into the first line that names them.
	async fn build_items(&self, lines: &[NewOrderLine]) -> Result<Vec<OrderItem>, DepotError> {
		if lines.is_empty() {
			return Err(DepotError::validation("An order needs at least one item"));
		}

		let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
		for line in lines {
			if line.quantity == 0 {
				return Err(DepotError::Validation(format!(
					"Quantity for product {} must be greater than zero",
					line.product_id
				)));
			}
			if let Some(existing) = items.iter_mut().find(|i| i.product_id == line.product_id) {
				existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
					DepotError::Validation(format!(
						"Quantity for product {} is too large",
						line.product_id
					))
				})?;
				continue;
			}

			let product = self.records.product(&line.product_id).await?;
			if !product.active {
				return Err(DepotError::Validation(format!(
					"Product {} is not available",
					product.sku
				)));
			}
			items.push(OrderItem {
				product_id: product.id,
				product_name: product.name,
				quantity: line.quantity,
				unit_price: product.unit_price,
			});
		}
		Ok(items)
	}
}

pub(crate) fn status_changed(order: &Order, from: OrderStatus, reason: Option<String>) -> EventKind {
	EventKind::OrderStatusChanged {
		order_id: order.id.clone(),
		agent_id: order.agent_id.clone(),
		from,
		to: order.status,
		trip_id: order.trip_id.clone(),
		reason,
	}
}

/// Overrides line quantities. Every adjusted product must already be on the
/// order and the new quantity must be positive.
fn apply_adjustments(
	items: &mut [OrderItem],
	adjustments: &QuantityAdjustments,
) -> Result<(), DepotError> {
	for (product_id, quantity) in adjustments {
		if *quantity == 0 {
			return Err(DepotError::Validation(format!(
				"Adjusted quantity for product {} must be greater than zero",
				product_id
			)));
		}
		if !items.iter().any(|i| &i.product_id == product_id) {
			return Err(DepotError::Validation(format!(
				"Product {} is not on this order",
				product_id
			)));
		}
	}
	for item in items.iter_mut() {
		if let Some(quantity) = adjustments.get(&item.product_id) {
			item.quantity = *quantity;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{dec, Fixture};
	use depot_types::NewProduct;

	#[tokio::test]
	async fn test_create_order_computes_totals() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 3), (&fx.product_b, 1)]).await;

		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.sub_total, dec("35.00"));
		assert_eq!(order.tax, dec("4.20"));
		assert_eq!(order.total, dec("39.20"));
		assert_eq!(order.agent_id, fx.agent.actor_id());
		assert_eq!(order.created_at, fx.agent.now);
	}

	#[tokio::test]
	async fn test_create_order_merges_repeated_products() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 1), (&fx.product_a, 2)]).await;
		assert_eq!(order.items.len(), 1);
		assert_eq!(order.items[0].quantity, 3);
		assert_eq!(order.total, dec("33.60"));
	}

	#[tokio::test]
	async fn test_create_order_rejections() {
		let fx = Fixture::new().await;

		let empty = fx
			.engine
			.create_order(&fx.agent, fx.new_order(&[]))
			.await
			.unwrap_err();
		assert!(matches!(empty, DepotError::Validation(_)));

		let zero = fx
			.engine
			.create_order(&fx.agent, fx.new_order(&[(&fx.product_a, 0)]))
			.await
			.unwrap_err();
		assert!(matches!(zero, DepotError::Validation(_)));

		let not_agent = fx
			.engine
			.create_order(&fx.dispatcher, fx.new_order(&[(&fx.product_a, 1)]))
			.await
			.unwrap_err();
		assert!(matches!(not_agent, DepotError::Validation(_)));

		let mut unknown_store = fx.new_order(&[(&fx.product_a, 1)]);
		unknown_store.store_id = "missing".into();
		let err = fx
			.engine
			.create_order(&fx.agent, unknown_store)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::NotFound { .. }));
	}

	#[tokio::test]
	async fn test_oversized_amounts_are_rejected_not_panicking() {
		let fx = Fixture::new().await;
		let huge = NewProduct {
			sku: "SKU-MAX".into(),
			name: "Too dear".into(),
			unit_price: Decimal::MAX,
		};
		let err = fx.engine.create_product(&fx.admin, huge).await.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));

		let pricey = fx
			.engine
			.create_product(
				&fx.admin,
				NewProduct {
					sku: "SKU-DEAR".into(),
					name: "Dear".into(),
					unit_price: dec("500000000000.00"),
				},
			)
			.await
			.unwrap()
			.id;

		let err = fx
			.engine
			.create_order(&fx.agent, fx.new_order(&[(&pricey, 2)]))
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));

		// Fits on its own; the confirm override would overflow.
		let order = fx
			.engine
			.create_order(
				&fx.agent,
				NewOrder {
					items: vec![NewOrderLine {
						product_id: pricey.clone(),
						quantity: 1,
					}],
					..fx.new_order(&[])
				},
			)
			.await
			.unwrap();
		assert_eq!(order.total, dec("560000000000.00"));

		let adjustments = QuantityAdjustments::from([(pricey.clone(), 2)]);
		let err = fx
			.engine
			.confirm_order(&fx.admin, &order.id, adjustments)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));
		let stored = fx.engine.get_order(&order.id).await.unwrap();
		assert_eq!(stored.status, OrderStatus::Pending);
		assert_eq!(stored.total, dec("560000000000.00"));
	}

	#[tokio::test]
	async fn test_snapshot_price_survives_price_change() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 1)]).await;
		fx.engine
			.update_product_price(&fx.admin, &fx.product_a, dec("99.00"))
			.await
			.unwrap();

		let edited = fx
			.engine
			.edit_order(
				&fx.agent,
				&order.id,
				OrderEdit {
					notes: Some(Some("ring twice".into())),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(edited.items[0].unit_price, dec("10.00"));
		assert_eq!(edited.notes.as_deref(), Some("ring twice"));
	}

	#[tokio::test]
	async fn test_edit_clears_schedule_and_notes() {
		let fx = Fixture::new().await;
		let mut new = fx.new_order(&[(&fx.product_a, 1)]);
		new.scheduled_for = Some(fx.agent.now);
		new.notes = Some("leave at the gate".into());
		let order = fx.engine.create_order(&fx.agent, new).await.unwrap();

		let untouched = fx
			.engine
			.edit_order(
				&fx.agent,
				&order.id,
				OrderEdit {
					priority: Some(true),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(untouched.scheduled_for, Some(fx.agent.now));
		assert_eq!(untouched.notes.as_deref(), Some("leave at the gate"));

		let cleared = fx
			.engine
			.edit_order(
				&fx.agent,
				&order.id,
				OrderEdit {
					scheduled_for: Some(None),
					notes: Some(None),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert!(cleared.priority);
		assert_eq!(cleared.scheduled_for, None);
		assert_eq!(cleared.notes, None);
	}

	#[tokio::test]
	async fn test_edit_only_while_pending() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 1)]).await;
		fx.engine
			.confirm_order(&fx.admin, &order.id, QuantityAdjustments::new())
			.await
			.unwrap();

		let err = fx
			.engine
			.edit_order(&fx.agent, &order.id, OrderEdit::default())
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::InvalidTransition(_)));
	}

	#[tokio::test]
	async fn test_confirm_applies_adjustments_before_totals() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 3), (&fx.product_b, 1)]).await;

		let adjustments = QuantityAdjustments::from([(fx.product_a.clone(), 1)]);
		let confirmed = fx
			.engine
			.confirm_order(&fx.admin, &order.id, adjustments)
			.await
			.unwrap();
		assert_eq!(confirmed.status, OrderStatus::Confirmed);
		assert_eq!(confirmed.sub_total, dec("15.00"));
		assert_eq!(confirmed.tax, dec("1.80"));
		assert_eq!(confirmed.total, dec("16.80"));
		assert!(confirmed.totals().is_consistent(dec("0.12")));
	}

	#[tokio::test]
	async fn test_rejected_confirm_leaves_order_untouched() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 3)]).await;

		let adjustments = QuantityAdjustments::from([("not-on-order".to_string(), 2)]);
		let err = fx
			.engine
			.confirm_order(&fx.admin, &order.id, adjustments)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));

		let stored = fx.engine.get_order(&order.id).await.unwrap();
		assert_eq!(stored, order);
	}

	#[tokio::test]
	async fn test_full_delivery_path() {
		let fx = Fixture::new().await;
		let order = fx.packed_order().await;
		let trip = fx.trip_with(&[&order.id]).await;
		let id = order.id.as_str();

		fx.start_trip(&trip.id).await;
		let at_store = fx.engine.mark_at_store(&fx.dispatcher, id).await.unwrap();
		assert_eq!(at_store.status, OrderStatus::AtStore);
		let delivered = fx.engine.mark_delivered(&fx.dispatcher, id).await.unwrap();
		assert_eq!(delivered.status, OrderStatus::Delivered);

		let trip: Trip = fx
			.engine
			.storage()
			.retrieve(StorageKey::Trips.as_str(), &trip.id)
			.await
			.unwrap();
		assert_eq!(trip.assignments[0].order_status, OrderStatus::Delivered);

		let err = fx.engine.cancel_order(&fx.admin, id, None).await.unwrap_err();
		assert!(matches!(err, DepotError::InvalidTransition(_)));
		let returned = fx
			.engine
			.mark_returned(&fx.dispatcher, id, Some("damaged".into()))
			.await
			.unwrap();
		assert_eq!(returned.status, OrderStatus::Returned);
	}

	#[tokio::test]
	async fn test_packing_and_road_steps_are_role_gated() {
		let fx = Fixture::new().await;
		let staff = fx.user_with_role("Packer", Role::WarehouseStaff).await;
		let order = fx.place_order(&[(&fx.product_a, 1)]).await;
		fx.engine
			.confirm_order(&fx.admin, &order.id, QuantityAdjustments::new())
			.await
			.unwrap();

		let err = fx.engine.mark_packed(&fx.agent, &order.id).await.unwrap_err();
		assert_eq!(err.to_string(), "Role agent is not allowed to pack orders");
		let packed = fx.engine.mark_packed(&staff, &order.id).await.unwrap();
		assert_eq!(packed.status, OrderStatus::Packed);

		let trip = fx.trip_with(&[&order.id]).await;
		fx.start_trip(&trip.id).await;
		for err in [
			fx.engine.mark_at_store(&staff, &order.id).await.unwrap_err(),
			fx.engine.mark_delivered(&fx.agent, &order.id).await.unwrap_err(),
			fx.engine.mark_returned(&staff, &order.id, None).await.unwrap_err(),
		] {
			assert!(matches!(err, DepotError::Validation(_)));
		}
		let stored = fx.engine.get_order(&order.id).await.unwrap();
		assert_eq!(stored.status, OrderStatus::InTransit);
	}

	#[tokio::test]
	async fn test_cancel_twice_fails() {
		let fx = Fixture::new().await;
		let order = fx.place_order(&[(&fx.product_a, 1)]).await;

		let cancelled = fx
			.engine
			.cancel_order(&fx.agent, &order.id, Some("store closed".into()))
			.await
			.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);
		assert_eq!(cancelled.updated_by, fx.agent.actor_id());

		let err = fx
			.engine
			.cancel_order(&fx.agent, &order.id, None)
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Delivered or cancelled orders cannot be cancelled (order is cancelled)"
		);
	}

	#[tokio::test]
	async fn test_dispatch_appends_stop() {
		let fx = Fixture::new().await;
		let first = fx.packed_order().await;
		let second = fx.packed_order().await;
		let trip = fx.trip_with(&[&first.id]).await;

		let dispatched = fx
			.engine
			.dispatch_order(&fx.dispatcher, &second.id, &trip.id)
			.await
			.unwrap();
		assert_eq!(dispatched.status, OrderStatus::Dispatched);
		assert_eq!(dispatched.trip_id.as_deref(), Some(trip.id.as_str()));

		let trip = fx.engine.get_trip(&trip.id).await.unwrap();
		assert_eq!(trip.order_ids(), vec![first.id.clone(), second.id.clone()]);
		assert_eq!(trip.assignments[1].sequence_no, 2);
	}

	#[tokio::test]
	async fn test_dispatch_requires_packed_order_and_matching_warehouse() {
		let fx = Fixture::new().await;
		let packed = fx.packed_order().await;
		let trip = fx.trip_with(&[&packed.id]).await;

		let pending = fx.place_order(&[(&fx.product_a, 1)]).await;
		let err = fx
			.engine
			.dispatch_order(&fx.dispatcher, &pending.id, &trip.id)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::InvalidTransition(_)));

		let mut elsewhere = fx.new_order(&[(&fx.product_a, 1)]);
		elsewhere.warehouse_id = None;
		let elsewhere = fx.engine.create_order(&fx.agent, elsewhere).await.unwrap();
		fx.advance_to_packed(&elsewhere.id).await;
		let err = fx
			.engine
			.dispatch_order(&fx.dispatcher, &elsewhere.id, &trip.id)
			.await
			.unwrap_err();
		assert!(matches!(err, DepotError::Validation(_)));
		let unchanged = fx.engine.get_order(&elsewhere.id).await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Packed);
	}
}
