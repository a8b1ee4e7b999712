//! Append-only audit trail.
//!
//! Entries are keyed `{entity_type}.{entity_id}.{micros}.{seq}` with both
//! numbers zero-padded, so a prefix scan over one entity returns its trail
//! oldest first.

use crate::error::DepotError;
use crate::state::Records;
use depot_types::{AuditEntry, DepotEvent, EntityType, StorageKey};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct AuditLog {
	records: Records,
	seq: AtomicU64,
}

impl AuditLog {
	pub fn new(records: Records) -> Self {
		Self {
			records,
			seq: AtomicU64::new(0),
		}
	}

	/// Appends the entry describing `event`.
	pub async fn record(&self, event: &DepotEvent) -> Result<AuditEntry, DepotError> {
		let (entity_type, entity_id) = event.subject();
		let seq = self.seq.fetch_add(1, Ordering::Relaxed);
		let micros = event.occurred_at.timestamp_micros().max(0);
		let key = format!("{}.{}.{:020}.{:010}", entity_type, entity_id, micros, seq);

		let entry = AuditEntry {
			id: uuid::Uuid::new_v4().to_string(),
			actor_id: event.actor_id.clone(),
			action: event.action(),
			entity_type,
			entity_id: entity_id.to_string(),
			metadata: json!({
				"description": event.describe(),
				"event": event.kind,
			}),
			recorded_at: event.occurred_at,
		};
		self.records.put(StorageKey::AuditLog, &key, &entry).await?;
		Ok(entry)
	}

	/// Entries for one entity, oldest first.
	pub async fn trail(
		&self,
		entity_type: EntityType,
		entity_id: &str,
	) -> Result<Vec<AuditEntry>, DepotError> {
		self.records
			.with_prefix(
				StorageKey::AuditLog,
				&format!("{}.{}.", entity_type, entity_id),
			)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone, Utc};
	use depot_storage::{implementations::memory::MemoryStorage, StorageService};
	use depot_types::{AuditAction, EventKind, TripStatus};
	use std::sync::Arc;

	fn log() -> AuditLog {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		AuditLog::new(Records::new(storage))
	}

	fn trip_event(trip_id: &str, minutes: i64, to: TripStatus) -> DepotEvent {
		let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
		DepotEvent::new(
			"dispatcher",
			base + Duration::minutes(minutes),
			EventKind::TripStatusChanged {
				trip_id: trip_id.into(),
				dispatcher_id: "dispatcher".into(),
				from: TripStatus::Created,
				to,
			},
		)
	}

	#[tokio::test]
	async fn test_trail_is_chronological_per_entity() {
		let log = log();
		log.record(&trip_event("t1", 5, TripStatus::Started)).await.unwrap();
		log.record(&trip_event("t1", 1, TripStatus::Assigned)).await.unwrap();
		log.record(&trip_event("t10", 0, TripStatus::Assigned)).await.unwrap();

		let trail = log.trail(EntityType::Trip, "t1").await.unwrap();
		assert_eq!(trail.len(), 2);
		assert!(trail[0].recorded_at < trail[1].recorded_at);
		assert_eq!(trail[0].action, AuditAction::TripStatusChanged);
		assert_eq!(trail[1].metadata["event"]["to"], "started");
		assert!(log.trail(EntityType::Order, "t1").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_same_instant_entries_keep_insertion_order() {
		let log = log();
		log.record(&trip_event("t1", 0, TripStatus::Assigned)).await.unwrap();
		log.record(&trip_event("t1", 0, TripStatus::Started)).await.unwrap();

		let trail = log.trail(EntityType::Trip, "t1").await.unwrap();
		assert_eq!(trail[0].metadata["event"]["to"], "assigned");
		assert_eq!(trail[1].metadata["event"]["to"], "started");
	}
}
