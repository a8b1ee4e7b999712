//! Post-commit event handling.
//!
//! The [`EventDispatcher`] consumes events from the bus after their mutation
//! committed. It appends an audit entry and notifies interested users. Both
//! steps are best effort: failures are logged and never reach the caller of
//! the original operation.

use crate::audit::AuditLog;
use crate::error::DepotError;
use crate::state::Records;
use depot_notify::NotificationService;
use depot_types::{
	truncate_id, DepotEvent, EventKind, Notification, NotificationKind, Role, StorageKey, User,
};
use std::sync::Arc;

pub struct EventDispatcher {
	audit: Arc<AuditLog>,
	records: Records,
	notifications: Arc<NotificationService>,
}

impl EventDispatcher {
	pub fn new(
		audit: Arc<AuditLog>,
		records: Records,
		notifications: Arc<NotificationService>,
	) -> Self {
		Self {
			audit,
			records,
			notifications,
		}
	}

	/// Audits `event` and delivers its notifications. Returns the
	/// notifications that were built, delivered or not.
	pub async fn handle(&self, event: &DepotEvent) -> Vec<Notification> {
		let (entity_type, entity_id) = event.subject();
		if let Err(e) = self.audit.record(event).await {
			tracing::warn!(
				entity = %entity_type,
				id = %truncate_id(entity_id),
				error = %e,
				"Failed to write audit entry"
			);
		}

		let notifications = match self.notifications_for(event).await {
			Ok(n) => n,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to resolve notification recipients");
				return Vec::new();
			},
		};
		for notification in &notifications {
			if let Err(e) = self.notifications.notify(notification).await {
				tracing::warn!(
					recipient = %notification.recipient_id,
					error = %e,
					"Notification not delivered"
				);
			}
		}
		notifications
	}

	async fn notifications_for(&self, event: &DepotEvent) -> Result<Vec<Notification>, DepotError> {
		let (kind, mut recipients) = match &event.kind {
			EventKind::OrderCreated { agent_id, .. } => {
				let users: Vec<User> = self.records.all(StorageKey::Users).await?;
				let mut recipients = vec![agent_id.clone()];
				recipients.extend(
					users
						.into_iter()
						.filter(|u| u.active && u.role == Role::DistributorAdmin)
						.map(|u| u.id),
				);
				(NotificationKind::NewOrder, recipients)
			},
			EventKind::OrderEdited { agent_id, .. }
			| EventKind::OrderStatusChanged { agent_id, .. } => {
				(NotificationKind::OrderUpdate, vec![agent_id.clone()])
			},
			EventKind::TripCreated { dispatcher_id, .. }
			| EventKind::TripStatusChanged { dispatcher_id, .. }
			| EventKind::TripResequenced { dispatcher_id, .. } => {
				(NotificationKind::TripUpdate, vec![dispatcher_id.clone()])
			},
			EventKind::PaymentRecorded { agent_id, .. } => {
				(NotificationKind::PaymentReceived, vec![agent_id.clone()])
			},
			EventKind::InvoiceGenerated { .. }
			| EventKind::InvoiceUpdated { .. }
			| EventKind::InventoryAdjusted { .. }
			| EventKind::RecordChanged { .. } => return Ok(Vec::new()),
		};

		recipients.sort();
		recipients.dedup();

		let (entity_type, entity_id) = event.subject();
		let message = event.describe();
		Ok(recipients
			.into_iter()
			.map(|recipient_id| Notification {
				id: uuid::Uuid::new_v4().to_string(),
				recipient_id,
				kind,
				message: message.clone(),
				entity_type,
				entity_id: entity_id.to_string(),
				created_at: event.occurred_at,
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use crate::test_support::Fixture;
	use depot_types::{EntityType, NotificationKind, TripStatus};

	#[tokio::test]
	async fn test_new_order_notifies_agent_and_distributor_admins() {
		let fx = Fixture::new().await;
		let mut events = fx.engine.event_bus().subscribe();
		let order = fx.place_order(&[(&fx.product_a, 1)]).await;

		let event = events.recv().await.unwrap();
		let sent = fx.engine.dispatcher().handle(&event).await;
		let mut recipients: Vec<&str> = sent.iter().map(|n| n.recipient_id.as_str()).collect();
		recipients.sort();
		let mut expected = vec![fx.agent.actor_id(), fx.distributor.actor_id()];
		expected.sort();
		assert_eq!(recipients, expected);
		assert!(sent.iter().all(|n| n.kind == NotificationKind::NewOrder));
		assert!(sent.iter().all(|n| n.created_at == fx.agent.now));
		assert_eq!(fx.delivered.lock().unwrap().len(), 2);

		let trail = fx.engine.audit_trail(EntityType::Order, &order.id).await.unwrap();
		assert_eq!(trail.len(), 1);
		assert_eq!(trail[0].actor_id, fx.agent.actor_id());
	}

	#[tokio::test]
	async fn test_trip_events_notify_dispatcher() {
		let fx = Fixture::new().await;
		let order = fx.packed_order().await;
		let trip = fx.trip_with(&[&order.id]).await;
		let mut events = fx.engine.event_bus().subscribe();
		fx.engine
			.update_trip_status(&fx.dispatcher, &trip.id, TripStatus::Assigned)
			.await
			.unwrap();

		let event = events.recv().await.unwrap();
		let sent = fx.engine.dispatcher().handle(&event).await;
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].recipient_id, trip.dispatcher_id);
		assert_eq!(sent[0].kind, NotificationKind::TripUpdate);
	}

	#[tokio::test]
	async fn test_catalog_changes_are_audited_only() {
		let fx = Fixture::new().await;
		let mut events = fx.engine.event_bus().subscribe();
		fx.engine
			.deactivate_store(&fx.admin, &fx.store.id)
			.await
			.unwrap();

		let event = events.recv().await.unwrap();
		let sent = fx.engine.dispatcher().handle(&event).await;
		assert!(sent.is_empty());
		let trail = fx.engine.audit_trail(EntityType::Store, &fx.store.id).await.unwrap();
		assert_eq!(trail.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_channel_does_not_fail_handling() {
		let fx = Fixture::with_failing_channel().await;
		let mut events = fx.engine.event_bus().subscribe();
		fx.place_order(&[(&fx.product_a, 1)]).await;

		let event = events.recv().await.unwrap();
		let sent = fx.engine.dispatcher().handle(&event).await;
		assert_eq!(sent.len(), 2);
		assert!(fx.delivered.lock().unwrap().is_empty());
	}
}
