//! Users, roles and the per-request actor context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Admin,
	DistributorAdmin,
	Agent,
	Dispatcher,
	WarehouseStaff,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Role::Admin => "admin",
			Role::DistributorAdmin => "distributor_admin",
			Role::Agent => "agent",
			Role::Dispatcher => "dispatcher",
			Role::WarehouseStaff => "warehouse_staff",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
	pub id: String,
	pub name: String,
	pub email: String,
	pub role: Role,
	pub active: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
	pub name: String,
	pub email: String,
	pub role: Role,
}

/// The user performing an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
	pub user_id: String,
	pub role: Role,
}

/// Who is acting and when.
///
/// Every mutating engine operation receives one of these; the engine never
/// reads the wall clock itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
	pub actor: Actor,
	pub now: DateTime<Utc>,
}

impl RequestContext {
	pub fn new(user_id: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
		Self {
			actor: Actor {
				user_id: user_id.into(),
				role,
			},
			now,
		}
	}

	pub fn actor_id(&self) -> &str {
		&self.actor.user_id
	}

	/// Returns true when the actor holds one of the given roles.
	pub fn has_role(&self, roles: &[Role]) -> bool {
		roles.contains(&self.actor.role)
	}
}
