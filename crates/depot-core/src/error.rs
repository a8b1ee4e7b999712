//! Error type shared by every engine operation.

use depot_storage::StorageError;
use depot_types::{
	APIError, AmountOverflow, EntityType, OrderTransitionError, TripTransitionError,
};
use thiserror::Error;

/// Failure of an engine operation.
///
/// Everything except `Internal` is an expected business rejection and leaves
/// storage untouched.
#[derive(Debug, Error)]
pub enum DepotError {
	#[error("{entity} {id} not found")]
	NotFound { entity: EntityType, id: String },
	#[error("{0}")]
	InvalidTransition(String),
	#[error("{0}")]
	Validation(String),
	#[error("{0}")]
	Conflict(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl DepotError {
	pub fn not_found(entity: EntityType, id: impl Into<String>) -> Self {
		DepotError::NotFound {
			entity,
			id: id.into(),
		}
	}

	pub fn validation(message: impl Into<String>) -> Self {
		DepotError::Validation(message.into())
	}

	/// Returns true for failures that are not business rejections.
	pub fn is_internal(&self) -> bool {
		matches!(self, DepotError::Internal(_))
	}
}

impl From<StorageError> for DepotError {
	fn from(err: StorageError) -> Self {
		DepotError::Internal(err.to_string())
	}
}

impl From<OrderTransitionError> for DepotError {
	fn from(err: OrderTransitionError) -> Self {
		DepotError::InvalidTransition(err.to_string())
	}
}

impl From<AmountOverflow> for DepotError {
	fn from(err: AmountOverflow) -> Self {
		DepotError::Validation(err.to_string())
	}
}

impl From<TripTransitionError> for DepotError {
	fn from(err: TripTransitionError) -> Self {
		DepotError::InvalidTransition(err.to_string())
	}
}

impl From<DepotError> for APIError {
	fn from(err: DepotError) -> Self {
		match err {
			DepotError::NotFound { .. } => APIError::NotFound {
				error_type: "NOT_FOUND".to_string(),
				message: err.to_string(),
			},
			DepotError::InvalidTransition(message) => APIError::UnprocessableEntity {
				error_type: "INVALID_TRANSITION".to_string(),
				message,
				details: None,
			},
			DepotError::Validation(message) => APIError::UnprocessableEntity {
				error_type: "VALIDATION_ERROR".to_string(),
				message,
				details: None,
			},
			DepotError::Conflict(message) => APIError::Conflict {
				error_type: "CONFLICT".to_string(),
				message,
			},
			// Details of internal faults stay in the log.
			DepotError::Internal(_) => APIError::InternalServerError {
				error_type: "INTERNAL_ERROR".to_string(),
				message: "An internal error occurred".to_string(),
			},
		}
	}
}
