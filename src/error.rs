// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `castwatch` library.
//!
//! Failures are grouped by where they originate: value validation, talking
//! to devices or webhook endpoints, and persisting the subscription state.
//! [`Error`] covers the first two; persistence failures have their own type.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to a device or a webhook endpoint.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Device was not found in the registry.
    #[error("device not found")]
    DeviceNotFound,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A value could not be parsed or is not accepted.
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Errors raised by the device control channel or outbound webhooks.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device rejected or could not execute a command.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Subscribing to or leaving a namespace failed.
    #[error("namespace {namespace} failed: {message}")]
    Namespace {
        /// The namespace URN.
        namespace: String,
        /// Description of the failure.
        message: String,
    },

    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// Errors related to the persisted subscription state.
///
/// These stay inside the store: loading falls back to an empty state and
/// background writes are logged. Only
/// [`SubscriptionStore::flush`](crate::SubscriptionStore::flush) returns them.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the state file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file is not valid TOML.
    #[error("malformed state file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The in-memory state could not be encoded.
    #[error("cannot encode state: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
