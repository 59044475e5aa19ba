// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a discovered cast device.
///
/// Cast receivers advertise a UUID-like identifier that survives restarts
/// and address changes. The value is kept verbatim (no parsing or case
/// folding) so it matches what discovery, the HTTP API and the state file
/// all see. Ordering is lexical, which is what device listings sort by.
///
/// # Examples
///
/// ```
/// use castwatch_lib::event::DeviceId;
///
/// let id = DeviceId::new("8f2a61d4-7c1e-4b8e-9a39-1f0c2d7e5b11");
/// assert_eq!(id.as_str(), "8f2a61d4-7c1e-4b8e-9a39-1f0c2d7e5b11");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier from the advertised identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show only first 8 characters for readability
        let short: String = self.0.chars().take(8).collect();
        if short.len() < self.0.len() {
            write!(f, "DeviceId({short}...)")
        } else {
            write!(f, "DeviceId({short})")
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
