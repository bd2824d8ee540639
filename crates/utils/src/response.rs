//! Standard JSON envelope for API responses.

use serde::{Deserialize, Serialize};

/// Wrapper returned by every HTTP handler: a success flag, the payload on
/// success, and a human-readable message on failure. Error responses may
/// still carry `data` (e.g. a conflict returns the current record snapshot
/// so the caller can reconcile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}
