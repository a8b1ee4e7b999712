//! Trip dispatch handler.
//!
//! Trips group packed orders from one warehouse into a delivery run. Trip
//! status drives order status (starting a trip puts its dispatched orders in
//! transit, cancelling it sends them back to packing); orders never drive the
//! trip.

use super::order::status_changed;
use super::{event, new_id, require_role, Outcome, TRIP_MANAGERS};
use crate::error::DepotError;
use crate::state::{Batch, Records};
use depot_types::{
	truncate_id, DepotEvent, EventKind, NewTrip, Order, OrderStatus, OrderTransition,
	RequestContext, Role, SequenceMapping, StorageKey, Store, Trip, TripAssign, TripAssignment,
	TripStatus, TripTransition,
};
use std::collections::HashSet;
use tracing::instrument;

pub struct TripHandler {
	records: Records,
	max_orders_per_trip: usize,
}

impl TripHandler {
	pub fn new(records: Records, max_orders_per_trip: usize) -> Self {
		Self {
			records,
			max_orders_per_trip,
		}
	}

	/// Creates a trip and dispatches every listed order onto it, or changes
	/// nothing at all.
	#[instrument(skip_all, fields(warehouse_id = %truncate_id(&new.warehouse_id), orders = new.order_ids.len()))]
	pub async fn create(
		&self,
		ctx: &RequestContext,
		new: NewTrip,
	) -> Result<Outcome<Trip>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "create trips")?;

		if new.order_ids.is_empty() {
			return Err(DepotError::validation("A trip needs at least one order"));
		}
		let mut seen = HashSet::new();
		if let Some(duplicate) = new.order_ids.iter().find(|id| !seen.insert(id.as_str())) {
			return Err(DepotError::Validation(format!(
				"Order {} is listed more than once",
				duplicate
			)));
		}
		if new.order_ids.len() > self.max_orders_per_trip {
			return Err(DepotError::Validation(format!(
				"A trip can carry at most {} orders",
				self.max_orders_per_trip
			)));
		}

		let warehouse = self.records.warehouse(&new.warehouse_id).await?;
		if !warehouse.active {
			return Err(DepotError::Validation(format!(
				"Warehouse {} is inactive",
				warehouse.id
			)));
		}
		self.check_dispatcher(&new.dispatcher_id).await?;

		let mut orders = Vec::with_capacity(new.order_ids.len());
		for order_id in &new.order_ids {
			let order = self.records.order(order_id).await?;
			let next = order.status.apply(OrderTransition::Dispatch)?;
			if order.warehouse_id.as_deref() != Some(warehouse.id.as_str()) {
				return Err(DepotError::Validation(format!(
					"Order {} does not ship from warehouse {}",
					order.id, warehouse.id
				)));
			}
			orders.push((order, next));
		}

		let mut trip = Trip {
			id: new_id(),
			warehouse_id: warehouse.id,
			dispatcher_id: new.dispatcher_id,
			status: TripStatus::Created,
			vehicle: new.vehicle,
			departed_at: None,
			returned_at: None,
			assignments: Vec::with_capacity(orders.len()),
			created_at: ctx.now,
			updated_at: ctx.now,
			created_by: ctx.actor_id().to_string(),
			updated_by: ctx.actor_id().to_string(),
		};

		let mut batch = Batch::new();
		let mut events = Vec::with_capacity(orders.len() + 1);
		for (position, (mut order, next)) in orders.into_iter().enumerate() {
			let from = order.status;
			order.status = next;
			order.trip_id = Some(trip.id.clone());
			order.touch(ctx.actor_id(), ctx.now);
			trip.assignments.push(TripAssignment {
				order_id: order.id.clone(),
				sequence_no: position as u32 + 1,
				order_status: next,
			});
			batch.order(&order)?;
			events.push(event(ctx, status_changed(&order, from, None)));
		}
		batch.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!(trip_id = %truncate_id(&trip.id), "Trip created");
		events.insert(
			0,
			event(
				ctx,
				EventKind::TripCreated {
					trip_id: trip.id.clone(),
					dispatcher_id: trip.dispatcher_id.clone(),
					order_ids: trip.order_ids(),
				},
			),
		);
		Ok(Outcome::new(trip, events))
	}

	/// Moves a created trip to assigned, optionally replacing the dispatcher
	/// and vehicle.
	#[instrument(skip_all, fields(trip_id = %truncate_id(trip_id)))]
	pub async fn assign(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		assign: TripAssign,
	) -> Result<Outcome<Trip>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "assign trips")?;
		let mut trip = self.records.trip(trip_id).await?;
		let from = trip.status;
		let to = from.apply(TripTransition::Assign)?;

		if let Some(dispatcher_id) = assign.dispatcher_id {
			self.check_dispatcher(&dispatcher_id).await?;
			trip.dispatcher_id = dispatcher_id;
		}
		if let Some(vehicle) = assign.vehicle {
			trip.vehicle = Some(vehicle);
		}
		trip.status = to;
		trip.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!(from = %from, to = %to, "Trip assigned");
		let kind = trip_status_changed(&trip, from);
		Ok(Outcome::with_event(trip, ctx, kind))
	}

	/// Moves a trip to `target`. Starting a trip puts every still dispatched
	/// order in transit and stamps the departure; completing it stamps the
	/// return.
	#[instrument(skip_all, fields(trip_id = %truncate_id(trip_id), status = %target))]
	pub async fn update_status(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		target: TripStatus,
	) -> Result<Outcome<Trip>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "change trip status")?;
		let transition = TripStatus::transition_to(target).ok_or_else(|| {
			DepotError::validation("A trip cannot be moved back to created")
		})?;
		match transition {
			TripTransition::Cancel => return self.cancel(ctx, trip_id).await,
			TripTransition::Assign => return self.assign(ctx, trip_id, TripAssign::default()).await,
			_ => {},
		}

		let mut trip = self.records.trip(trip_id).await?;
		let from = trip.status;
		let to = from.apply(transition)?;

		let mut batch = Batch::new();
		let mut events = Vec::new();
		match to {
			TripStatus::Started => {
				trip.departed_at = Some(ctx.now);
				let moved = self
					.cascade(ctx, &mut trip, &mut batch, OrderTransition::MarkInTransit)
					.await?;
				events.extend(moved);
			},
			TripStatus::Completed => trip.returned_at = Some(ctx.now),
			_ => {},
		}
		trip.status = to;
		trip.touch(ctx.actor_id(), ctx.now);
		batch.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!(from = %from, to = %to, orders_moved = events.len(), "Trip status changed");
		events.insert(0, event(ctx, trip_status_changed(&trip, from)));
		Ok(Outcome::new(trip, events))
	}

	/// Rewrites stop order. The mapping must name every order on the trip
	/// exactly once and use each position from 1 to n once.
	#[instrument(skip_all, fields(trip_id = %truncate_id(trip_id)))]
	pub async fn reorder(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
		mapping: SequenceMapping,
	) -> Result<Outcome<Trip>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "reorder trips")?;
		let mut trip = self.records.trip(trip_id).await?;
		trip.status.apply(TripTransition::Resequence)?;

		let on_trip: HashSet<&str> = trip.assignments.iter().map(|a| a.order_id.as_str()).collect();
		let mapped: HashSet<&str> = mapping.keys().map(String::as_str).collect();
		if on_trip != mapped {
			return Err(DepotError::validation(
				"The new sequence must list exactly the orders on the trip",
			));
		}
		let mut positions: Vec<u32> = mapping.values().copied().collect();
		positions.sort_unstable();
		if positions.iter().zip(1u32..).any(|(p, expected)| *p != expected) {
			return Err(DepotError::Validation(format!(
				"Sequence numbers must run from 1 to {} without gaps",
				trip.assignments.len()
			)));
		}

		for stop in trip.assignments.iter_mut() {
			if let Some(position) = mapping.get(&stop.order_id) {
				stop.sequence_no = *position;
			}
		}
		trip.assignments.sort_by_key(|a| a.sequence_no);
		trip.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!("Trip stops reordered");
		let kind = EventKind::TripResequenced {
			trip_id: trip.id.clone(),
			dispatcher_id: trip.dispatcher_id.clone(),
			order_ids: trip.order_ids(),
		};
		Ok(Outcome::with_event(trip, ctx, kind))
	}

	/// Cancels a trip. Orders still dispatched go back to packed and leave the
	/// trip; orders already on the road are left alone.
	#[instrument(skip_all, fields(trip_id = %truncate_id(trip_id)))]
	pub async fn cancel(
		&self,
		ctx: &RequestContext,
		trip_id: &str,
	) -> Result<Outcome<Trip>, DepotError> {
		require_role(ctx, TRIP_MANAGERS, "cancel trips")?;
		let mut trip = self.records.trip(trip_id).await?;
		let from = trip.status;
		let to = from.apply(TripTransition::Cancel)?;

		let mut batch = Batch::new();
		let mut events = self
			.cascade(ctx, &mut trip, &mut batch, OrderTransition::RevertDispatch)
			.await?;
		trip.status = to;
		trip.touch(ctx.actor_id(), ctx.now);
		batch.trip(&trip)?;
		self.records.commit(batch).await?;

		tracing::info!(orders_reverted = events.len(), "Trip cancelled");
		events.insert(0, event(ctx, trip_status_changed(&trip, from)));
		Ok(Outcome::new(trip, events))
	}

	/// Suggests a stop order: by store city, then barangay, then priority
	/// orders first.
	pub async fn suggest_sequence(&self, order_ids: &[String]) -> Result<Vec<String>, DepotError> {
		let mut candidates = Vec::with_capacity(order_ids.len());
		for order_id in order_ids {
			let order = self.records.order(order_id).await?;
			let store = self.records.store(&order.store_id).await?;
			candidates.push((order, store));
		}
		Ok(suggest_order(candidates))
	}

	pub async fn get(&self, trip_id: &str) -> Result<Trip, DepotError> {
		self.records.trip(trip_id).await
	}

	/// Lists trips, newest first.
	pub async fn list(
		&self,
		status: Option<TripStatus>,
		warehouse_id: Option<&str>,
	) -> Result<Vec<Trip>, DepotError> {
		let mut trips: Vec<Trip> = self.records.all(StorageKey::Trips).await?;
		trips.retain(|t| {
			status.is_none_or(|s| t.status == s)
				&& warehouse_id.is_none_or(|w| t.warehouse_id == w)
		});
		trips.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(trips)
	}

	async fn check_dispatcher(&self, user_id: &str) -> Result<(), DepotError> {
		let user = self.records.user(user_id).await?;
		if !user.active || user.role != Role::Dispatcher {
			return Err(DepotError::Validation(format!(
				"User {} is not an active dispatcher",
				user.id
			)));
		}
		Ok(())
	}

	/// Applies `transition` to every assigned order it is valid for, queueing
	/// the orders and updating stop snapshots. Orders the transition does not
	/// apply to are skipped.
	async fn cascade(
		&self,
		ctx: &RequestContext,
		trip: &mut Trip,
		batch: &mut Batch,
		transition: OrderTransition,
	) -> Result<Vec<DepotEvent>, DepotError> {
		let mut events = Vec::new();
		for stop in trip.assignments.iter_mut() {
			let mut order: Order = self.records.order(&stop.order_id).await?;
			let Ok(next) = order.status.apply(transition) else {
				continue;
			};
			let from = order.status;
			order.status = next;
			if next == OrderStatus::Packed {
				order.trip_id = None;
			}
			order.touch(ctx.actor_id(), ctx.now);
			stop.order_status = next;
			batch.order(&order)?;

			let mut kind = status_changed(&order, from, None);
			if let EventKind::OrderStatusChanged { trip_id, .. } = &mut kind {
				*trip_id = Some(trip.id.clone());
			}
			events.push(event(ctx, kind));
		}
		Ok(events)
	}
}

fn trip_status_changed(trip: &Trip, from: TripStatus) -> EventKind {
	EventKind::TripStatusChanged {
		trip_id: trip.id.clone(),
		dispatcher_id: trip.dispatcher_id.clone(),
		from,
		to: trip.status,
	}
}

/// Stable sort by city, barangay (both case-insensitive), then priority
/// orders ahead of regular ones.
fn suggest_order(mut candidates: Vec<(Order, Store)>) -> Vec<String> {
	candidates.sort_by_cached_key(|(order, store)| {
		(
			store.city.to_lowercase(),
			store.barangay.to_lowercase(),
			!order.priority,
		)
	});
	candidates.into_iter().map(|(order, _)| order.id).collect()
}
