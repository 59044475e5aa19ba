// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry entry wrapping a snapshot and its controller.

use std::fmt;
use std::sync::Arc;

use crate::control::CastController;
use crate::state::DeviceSnapshot;

/// A device held by the [`DeviceRegistry`](super::DeviceRegistry).
pub struct ManagedDevice {
    /// Current state.
    pub snapshot: DeviceSnapshot,
    /// Command handle for the device.
    pub controller: Arc<dyn CastController>,
    /// Registration session, assigned by the registry on insert.
    pub(crate) session: u64,
}

impl ManagedDevice {
    /// Wraps a snapshot and its controller.
    #[must_use]
    pub fn new(snapshot: DeviceSnapshot, controller: Arc<dyn CastController>) -> Self {
        Self {
            snapshot,
            controller,
            session: 0,
        }
    }

    /// Returns the registration session of this entry.
    ///
    /// Every insert gets a fresh session, so a reducer attached to an older
    /// registration can tell that the device was rediscovered.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }
}

impl fmt::Debug for ManagedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedDevice")
            .field("snapshot", &self.snapshot)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
