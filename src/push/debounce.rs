// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device trailing-edge debounce state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::event::DeviceId;

/// What a timer task should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Sleep until the given deadline and ask again.
    Wait(Instant),
    /// The quiet period elapsed; deliver now.
    Fire,
}

/// Debounce table keyed by device identity.
///
/// A device has an entry, holding its deadline, only while a timer is
/// pending for it. [`arm`](Self::arm) pushes the deadline one quiet period
/// into the future and reports whether a timer must be started. A timer
/// repeatedly calls [`tick`](Self::tick) and sleeps until the reported
/// deadline, so a burst of arms keeps extending the same timer instead of
/// starting new ones.
#[derive(Debug)]
pub(crate) struct Debouncer {
    quiet: Duration,
    deadlines: Mutex<HashMap<DeviceId, Instant>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadlines: Mutex::new(HashMap::new()),
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Extends the device's deadline.
    ///
    /// Returns `true` if no timer is pending for the device, in which case
    /// the caller must start one.
    pub fn arm(&self, device_id: &DeviceId) -> bool {
        let deadline = Instant::now() + self.quiet;
        match self.deadlines.lock().entry(device_id.clone()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = deadline;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(deadline);
                true
            }
        }
    }

    /// Decides whether the pending timer for a device should fire.
    ///
    /// Drops the device's entry when returning [`Tick::Fire`].
    pub fn tick(&self, device_id: &DeviceId) -> Tick {
        let mut deadlines = self.deadlines.lock();
        match deadlines.get(device_id) {
            Some(&deadline) if deadline > Instant::now() => Tick::Wait(deadline),
            _ => {
                deadlines.remove(device_id);
                Tick::Fire
            }
        }
    }

    pub fn is_pending(&self, device_id: &DeviceId) -> bool {
        self.deadlines.lock().contains_key(device_id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.deadlines.lock().len()
    }
}
