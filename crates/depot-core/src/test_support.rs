//! Shared fixture for engine tests: a memory-backed engine seeded with one
//! user per role, a store, a warehouse and two products.

use crate::engine::{event_bus::EventBus, DepotEngine};
use crate::handlers::admin::BOOTSTRAP_ADMIN_ID;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use depot_config::ConfigBuilder;
use depot_notify::{NotificationInterface, NotificationService, NotifyError};
use depot_storage::{implementations::memory::MemoryStorage, StorageService};
use depot_types::{
	ConfigSchema, NewOrder, NewOrderLine, NewPayment, NewProduct, NewStore, NewTrip, NewUser,
	NewWarehouse, Notification, Order, PaymentMethod, QuantityAdjustments, RequestContext, Role,
	Schema, Store, Trip, TripAssign, TripStatus, ValidationError, Warehouse,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub(crate) fn dec(s: &str) -> Decimal {
	Decimal::from_str(s).unwrap()
}

/// Channel that keeps every notification it receives, or rejects them all.
pub(crate) struct RecordingChannel {
	delivered: Arc<Mutex<Vec<Notification>>>,
	fail: bool,
}

struct NoConfig;

impl ConfigSchema for NoConfig {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl NotificationInterface for RecordingChannel {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoConfig)
	}

	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
		if self.fail {
			return Err(NotifyError::Delivery("recording channel offline".into()));
		}
		self.delivered.lock().unwrap().push(notification.clone());
		Ok(())
	}
}

pub(crate) struct Fixture {
	pub engine: DepotEngine,
	pub delivered: Arc<Mutex<Vec<Notification>>>,
	pub admin: RequestContext,
	pub agent: RequestContext,
	pub dispatcher: RequestContext,
	pub distributor: RequestContext,
	pub store: Store,
	pub warehouse: Warehouse,
	pub product_a: String,
	pub product_b: String,
}

impl Fixture {
	pub async fn new() -> Self {
		Self::build(ConfigBuilder::new(), false).await
	}

	pub async fn with_failing_channel() -> Self {
		Self::build(ConfigBuilder::new(), true).await
	}

	/// Fixture whose trips carry at most `max` orders.
	pub async fn with_trip_limit(max: usize) -> Self {
		Self::build(ConfigBuilder::new().max_orders_per_trip(max), false).await
	}

	async fn build(config: ConfigBuilder, fail: bool) -> Self {
		let config = config.tax_rate(dec("0.12")).build();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let delivered = Arc::new(Mutex::new(Vec::new()));
		let channel = RecordingChannel {
			delivered: delivered.clone(),
			fail,
		};
		let notifications = Arc::new(NotificationService::new(vec![(
			"recording".to_string(),
			Box::new(channel) as Box<dyn NotificationInterface>,
		)]));
		let engine = DepotEngine::new(config, storage, notifications, EventBus::default());
		engine.initialize().await.unwrap();

		let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
		let admin = RequestContext::new(BOOTSTRAP_ADMIN_ID, Role::Admin, now);
		let user = |name: &str, role: Role| {
			let engine = engine.clone();
			let admin = admin.clone();
			let new = NewUser {
				name: name.to_string(),
				email: format!("{}@depot.test", name.to_lowercase()),
				role,
			};
			async move { engine.create_user(&admin, new).await.unwrap() }
		};
		let agent = user("Agent", Role::Agent).await;
		let dispatcher = user("Dispatcher", Role::Dispatcher).await;
		let distributor = user("Distributor", Role::DistributorAdmin).await;

		let store = engine
			.create_store(
				&admin,
				NewStore {
					name: "Aling Nena Sari-sari".into(),
					owner_name: Some("Nena Cruz".into()),
					city: "Marikina".into(),
					barangay: "Concepcion Uno".into(),
					address_line: Some("12 Bayabas St".into()),
					contact_number: None,
				},
			)
			.await
			.unwrap();
		let warehouse = engine
			.create_warehouse(
				&admin,
				NewWarehouse {
					name: "Marikina Hub".into(),
					distributor_id: None,
					city: "Marikina".into(),
				},
			)
			.await
			.unwrap();
		let product = |sku: &str, price: &str| {
			let engine = engine.clone();
			let admin = admin.clone();
			let new = NewProduct {
				sku: sku.to_string(),
				name: format!("Product {}", sku),
				unit_price: dec(price),
			};
			async move { engine.create_product(&admin, new).await.unwrap().id }
		};
		let product_a = product("SKU-A", "10.00").await;
		let product_b = product("SKU-B", "5.00").await;

		Self {
			delivered,
			agent: RequestContext::new(agent.id, Role::Agent, now),
			dispatcher: RequestContext::new(dispatcher.id, Role::Dispatcher, now),
			distributor: RequestContext::new(distributor.id, Role::DistributorAdmin, now),
			admin,
			store,
			warehouse,
			product_a,
			product_b,
			engine,
		}
	}

	/// Creates another active user with `role`.
	pub async fn user_with_role(&self, name: &str, role: Role) -> RequestContext {
		let new = NewUser {
			name: name.to_string(),
			email: format!("{}@depot.test", name.to_lowercase()),
			role,
		};
		let user = self.engine.create_user(&self.admin, new).await.unwrap();
		RequestContext::new(user.id, role, self.admin.now)
	}

	pub fn new_order(&self, lines: &[(&String, u32)]) -> NewOrder {
		NewOrder {
			store_id: self.store.id.clone(),
			distributor_id: None,
			warehouse_id: Some(self.warehouse.id.clone()),
			priority: false,
			scheduled_for: None,
			notes: None,
			items: lines
				.iter()
				.map(|(product_id, quantity)| NewOrderLine {
					product_id: (*product_id).clone(),
					quantity: *quantity,
				})
				.collect(),
		}
	}

	pub async fn place_order(&self, lines: &[(&String, u32)]) -> Order {
		self.engine
			.create_order(&self.agent, self.new_order(lines))
			.await
			.unwrap()
	}

	pub async fn advance_to_packed(&self, order_id: &str) -> Order {
		self.engine
			.confirm_order(&self.admin, order_id, QuantityAdjustments::new())
			.await
			.unwrap();
		self.engine.mark_packed(&self.admin, order_id).await.unwrap()
	}

	/// A packed one-line order for `product_a`.
	pub async fn packed_order(&self) -> Order {
		let order = self.place_order(&[(&self.product_a, 1)]).await;
		self.advance_to_packed(&order.id).await
	}

	pub fn new_trip(&self, order_ids: &[&String]) -> NewTrip {
		NewTrip {
			warehouse_id: self.warehouse.id.clone(),
			dispatcher_id: self.dispatcher.actor_id().to_string(),
			vehicle: Some("NAB-1234".into()),
			order_ids: order_ids.iter().map(|id| (*id).clone()).collect(),
		}
	}

	pub async fn trip_with(&self, order_ids: &[&String]) -> Trip {
		self.engine
			.create_trip(&self.dispatcher, self.new_trip(order_ids))
			.await
			.unwrap()
	}

	/// Assigns a created trip and starts it.
	pub async fn start_trip(&self, trip_id: &str) -> Trip {
		self.engine
			.assign_trip(&self.dispatcher, trip_id, TripAssign::default())
			.await
			.unwrap();
		self.engine
			.update_trip_status(&self.dispatcher, trip_id, TripStatus::Started)
			.await
			.unwrap()
	}

	pub fn cash(&self, amount: &str) -> NewPayment {
		NewPayment {
			amount: dec(amount),
			method: PaymentMethod::Cash,
			reference: None,
		}
	}
}
