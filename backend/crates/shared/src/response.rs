//! Success envelope returned by every JSON endpoint.
//!
//! Errors are rendered separately (see `error::conversions`), but both
//! carry a `success` flag so clients can branch on a single field.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    /// `success: false` with a payload, for non-error bodies that report a
    /// failed state (an unhealthy dependency)
    pub fn failed(data: T) -> Self {
        Self {
            success: false,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Success without payload (`data: null`)
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(feature = "axum")]
impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let value = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], 42);
        assert!(value.get("message").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_failed_envelope_keeps_data() {
        let value = serde_json::to_value(ApiResponse::failed("unhealthy")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["data"], "unhealthy");
    }

    #[test]
    fn test_message_only_envelope() {
        let value = serde_json::to_value(ApiResponse::message_only("Logged out")).unwrap();
        assert_eq!(value["message"], "Logged out");
        assert!(value["data"].is_null());
    }
}
