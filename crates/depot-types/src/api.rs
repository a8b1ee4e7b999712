//! API types for the depot HTTP API.
//!
//! Request bodies for the action endpoints and the JSON error envelope every
//! endpoint returns on failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::TripStatus;

/// Body of `POST /orders/{id}/confirm`. Omitted adjustments confirm the
/// order as placed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfirmOrderRequest {
	#[serde(default)]
	pub adjustments: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOrderRequest {
	pub trip_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CancelRequest {
	#[serde(default)]
	pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripStatusRequest {
	pub status: TripStatus,
}

/// Body of `POST /trips/{id}/reorder`: order id to new 1-based sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderTripRequest {
	pub sequence: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestSequenceRequest {
	pub order_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestSequenceResponse {
	pub order_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InvoiceMetadataRequest {
	#[serde(default)]
	pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileInvoiceRequest {
	#[serde(default)]
	pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub service_id: String,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request or missing actor (400)
	BadRequest { error_type: String, message: String },
	/// Actor header names no active user (401)
	Unauthorized { error_type: String, message: String },
	/// Unknown entity (404)
	NotFound { error_type: String, message: String },
	/// Uniqueness violation (409)
	Conflict { error_type: String, message: String },
	/// Business rule or transition guard rejected the request (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Unauthorized {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
			APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_codes_and_envelope() {
		let err = APIError::Conflict {
			error_type: "CONFLICT".into(),
			message: "invoice already exists".into(),
		};
		assert_eq!(err.status_code(), 409);
		let body = serde_json::to_value(err.to_error_response()).unwrap();
		assert_eq!(body["error"], "CONFLICT");
		assert!(body.get("details").is_none());

		assert_eq!(APIError::bad_request("MISSING_ACTOR", "x").status_code(), 400);
	}

	#[test]
	fn test_confirm_request_defaults() {
		let req: ConfirmOrderRequest = serde_json::from_str("{}").unwrap();
		assert!(req.adjustments.is_empty());
	}
}
