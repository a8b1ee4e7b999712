//! Depot engine that serialises mutations and hands their events off for
//! post-commit processing.
//!
//! Every mutating operation runs under one async write lock, so the
//! read-validate-write sequence of a handler never interleaves with another.
//! Events returned by a committed handler are published on the
//! [`event_bus::EventBus`]; the [`EventDispatcher`] consumes them from `run`.

pub mod event_bus;
pub mod lifecycle;
pub mod operations;

use crate::audit::AuditLog;
use crate::dispatch::EventDispatcher;
use crate::error::DepotError;
use crate::handlers::{AdminHandler, BillingHandler, OrderHandler, Outcome, TripHandler};
use crate::query::OrderQueryService;
use crate::state::Records;
use depot_config::Config;
use depot_notify::NotificationService;
use depot_storage::StorageService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

/// Errors that stop the engine itself, as opposed to rejecting a single
/// operation.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Main depot engine.
#[derive(Clone)]
pub struct DepotEngine {
	pub(crate) config: Config,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) event_bus: event_bus::EventBus,
	/// Held for the whole of each mutating operation.
	write_lock: Arc<Mutex<()>>,
	pub(crate) orders: Arc<OrderHandler>,
	pub(crate) trips: Arc<TripHandler>,
	pub(crate) billing: Arc<BillingHandler>,
	pub(crate) admin: Arc<AdminHandler>,
	pub(crate) queries: Arc<OrderQueryService>,
	pub(crate) audit: Arc<AuditLog>,
	pub(crate) dispatcher: Arc<EventDispatcher>,
}

impl DepotEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notifications: Arc<NotificationService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let records = Records::new(storage.clone());

		let orders = Arc::new(OrderHandler::new(
			records.clone(),
			config.billing.tax_rate,
			config.dispatch.max_orders_per_trip,
		));
		let trips = Arc::new(TripHandler::new(
			records.clone(),
			config.dispatch.max_orders_per_trip,
		));
		let billing = Arc::new(BillingHandler::new(records.clone(), config.billing.clone()));
		let admin = Arc::new(AdminHandler::new(records.clone()));
		let queries = Arc::new(OrderQueryService::new(records.clone(), config.query.clone()));
		let audit = Arc::new(AuditLog::new(records.clone()));
		let dispatcher = Arc::new(EventDispatcher::new(audit.clone(), records, notifications));

		Self {
			config,
			storage,
			event_bus,
			write_lock: Arc::new(Mutex::new(())),
			orders,
			trips,
			billing,
			admin,
			queries,
			audit,
			dispatcher,
		}
	}

	/// Runs the event dispatcher and storage housekeeping until ctrl-c.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();
		let dispatcher = self.dispatcher.clone();
		let dispatch_handle = tokio::spawn(async move {
			loop {
				match events.recv().await {
					Ok(event) => {
						dispatcher.handle(&event).await;
					},
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "Event dispatcher lagged; events were dropped");
					},
					Err(RecvError::Closed) => break,
				}
			}
		});

		let storage = self.storage.clone();
		let mut interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		let cleanup_handle = tokio::spawn(async move {
			loop {
				interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		});

		let result = tokio::signal::ctrl_c()
			.await
			.map_err(|e| EngineError::Service(format!("Failed to listen for shutdown: {}", e)));

		cleanup_handle.abort();
		dispatch_handle.abort();
		result
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Post-commit event consumer used by `run`.
	pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
		&self.dispatcher
	}

	/// Runs one mutating handler under the write lock and publishes its
	/// events once it has committed.
	async fn mutate<T, Fut>(&self, operation: &'static str, work: Fut) -> Result<T, DepotError>
	where
		Fut: Future<Output = Result<Outcome<T>, DepotError>>,
	{
		let _guard = self.write_lock.lock().await;
		match work.await {
			Ok(outcome) => {
				for event in outcome.events {
					self.event_bus.publish(event).ok();
				}
				Ok(outcome.value)
			},
			Err(e) if e.is_internal() => {
				tracing::error!(operation, error = %e, "Operation failed");
				Err(e)
			},
			Err(e) => {
				tracing::warn!(operation, error = %e, "Operation rejected");
				Err(e)
			},
		}
	}
}
