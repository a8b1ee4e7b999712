//! Trip entity and the trip dispatch state machine.
//!
//! A trip is a batched delivery run out of one warehouse. Its stops are
//! [`TripAssignment`]s ordered by sequence number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::OrderStatus;

/// A delivery run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
	pub id: String,
	pub warehouse_id: String,
	pub dispatcher_id: String,
	pub status: TripStatus,
	#[serde(default)]
	pub vehicle: Option<String>,
	#[serde(default)]
	pub departed_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub returned_at: Option<DateTime<Utc>>,
	/// Stops, kept sorted by sequence number.
	pub assignments: Vec<TripAssignment>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub created_by: String,
	pub updated_by: String,
}

impl Trip {
	/// Finds the stop for an order.
	pub fn assignment_mut(&mut self, order_id: &str) -> Option<&mut TripAssignment> {
		self.assignments.iter_mut().find(|a| a.order_id == order_id)
	}

	/// Sequence number a newly appended stop receives.
	pub fn next_sequence_no(&self) -> u32 {
		self.assignments
			.iter()
			.map(|a| a.sequence_no)
			.max()
			.unwrap_or(0)
			+ 1
	}

	/// Order ids in stop order.
	pub fn order_ids(&self) -> Vec<String> {
		self.assignments.iter().map(|a| a.order_id.clone()).collect()
	}

	pub fn touch(&mut self, actor_id: &str, now: DateTime<Utc>) {
		self.updated_at = now;
		self.updated_by = actor_id.to_string();
	}
}

/// One stop on a trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripAssignment {
	pub order_id: String,
	/// 1-based stop position.
	pub sequence_no: u32,
	/// Status of the order as last written alongside the trip.
	pub order_status: OrderStatus,
}

/// Status of a trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
	Created,
	Assigned,
	Started,
	InProgress,
	Completed,
	Cancelled,
}

impl TripStatus {
	pub const ALL: [TripStatus; 6] = [
		TripStatus::Created,
		TripStatus::Assigned,
		TripStatus::Started,
		TripStatus::InProgress,
		TripStatus::Completed,
		TripStatus::Cancelled,
	];

	/// Applies a trip operation, returning the resulting status.
	pub fn apply(self, transition: TripTransition) -> Result<TripStatus, TripTransitionError> {
		use TripStatus::*;
		use TripTransition as T;

		let next = match (transition, self) {
			(T::Assign, Created) => Some(Assigned),
			(T::Start, Assigned) => Some(Started),
			(T::Progress, Started) => Some(InProgress),
			(T::Complete, InProgress) => Some(Completed),
			(T::Cancel, Completed | Cancelled) => None,
			(T::Cancel, _) => Some(Cancelled),
			(T::AddStop | T::Resequence, Created | Assigned) => Some(self),
			_ => None,
		};

		next.ok_or(TripTransitionError {
			from: self,
			operation: transition,
		})
	}

	/// Maps a requested target status onto the operation that reaches it.
	pub fn transition_to(target: TripStatus) -> Option<TripTransition> {
		match target {
			TripStatus::Created => None,
			TripStatus::Assigned => Some(TripTransition::Assign),
			TripStatus::Started => Some(TripTransition::Start),
			TripStatus::InProgress => Some(TripTransition::Progress),
			TripStatus::Completed => Some(TripTransition::Complete),
			TripStatus::Cancelled => Some(TripTransition::Cancel),
		}
	}

	/// Stops may still be added or reordered.
	pub fn is_pre_departure(self) -> bool {
		matches!(self, TripStatus::Created | TripStatus::Assigned)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			TripStatus::Created => "created",
			TripStatus::Assigned => "assigned",
			TripStatus::Started => "started",
			TripStatus::InProgress => "in_progress",
			TripStatus::Completed => "completed",
			TripStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for TripStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Operations on a trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TripTransition {
	Assign,
	Start,
	Progress,
	Complete,
	Cancel,
	/// Append a stop; leaves the status unchanged.
	AddStop,
	/// Rewrite stop order; leaves the status unchanged.
	Resequence,
}

impl TripTransition {
	pub const ALL: [TripTransition; 7] = [
		TripTransition::Assign,
		TripTransition::Start,
		TripTransition::Progress,
		TripTransition::Complete,
		TripTransition::Cancel,
		TripTransition::AddStop,
		TripTransition::Resequence,
	];

	pub fn requirement(self) -> &'static str {
		match self {
			TripTransition::Assign => "Only newly created trips can be assigned",
			TripTransition::Start => "Only assigned trips can be started",
			TripTransition::Progress => "Only started trips can be marked in progress",
			TripTransition::Complete => "Only in-progress trips can be completed",
			TripTransition::Cancel => "Completed or cancelled trips cannot be cancelled",
			TripTransition::AddStop => "Orders can only be added before the trip departs",
			TripTransition::Resequence => "Stops can only be reordered before the trip departs",
		}
	}
}

/// Rejected trip operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{} (trip is {from})", .operation.requirement())]
pub struct TripTransitionError {
	pub from: TripStatus,
	pub operation: TripTransition,
}

/// Request to create a trip from packed orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
	pub warehouse_id: String,
	pub dispatcher_id: String,
	#[serde(default)]
	pub vehicle: Option<String>,
	/// Orders in intended stop order.
	pub order_ids: Vec<String>,
}

/// Request to assign a created trip.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TripAssign {
	#[serde(default)]
	pub dispatcher_id: Option<String>,
	#[serde(default)]
	pub vehicle: Option<String>,
}

/// New stop positions keyed by order id.
pub type SequenceMapping = HashMap<String, u32>;
