// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response envelope for control operations.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Body returned by control operations: `{status, operation, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEnvelope {
    /// `success` or `error`.
    pub status: String,
    /// Name of the operation.
    pub operation: String,
    /// Failure message, only present on errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlEnvelope {
    /// Creates a success envelope.
    #[must_use]
    pub fn success(operation: &str) -> Self {
        Self {
            status: "success".to_string(),
            operation: operation.to_string(),
            error: None,
        }
    }

    /// Creates an error envelope.
    #[must_use]
    pub fn error(operation: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            operation: operation.to_string(),
            error: Some(message.into()),
        }
    }
}

impl IntoResponse for ControlEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A failed control operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    envelope: ControlEnvelope,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, operation: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: ControlEnvelope::error(operation, message),
        }
    }

    pub(crate) fn bad_request(operation: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, operation, message)
    }

    pub(crate) fn not_found(operation: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, operation, message)
    }

    pub(crate) fn unknown_device(operation: &str) -> Self {
        Self::not_found(operation, "UUID not found")
    }

    /// Maps a manager error to a response.
    pub(crate) fn from_error(operation: &str, error: &Error) -> Self {
        match error {
            Error::DeviceNotFound => Self::unknown_device(operation),
            Error::Value(e) => Self::bad_request(operation, e.to_string()),
            Error::Protocol(_) => {
                tracing::warn!(operation, error = %error, "Control operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, operation, error.to_string())
            }
        }
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
