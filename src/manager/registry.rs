// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concurrency-safe device registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::control::CastController;
use crate::event::DeviceId;
use crate::state::DeviceSnapshot;

use super::ManagedDevice;

/// Registry of every known device, keyed by identity.
///
/// A single reader/writer lock guards the map. Snapshot reads (`get`,
/// `controller`, `list`) take the shared lock; every mutation takes the
/// exclusive lock for its whole read/modify sequence. No I/O happens while
/// the lock is held, and readers only ever see committed snapshots.
///
/// # Examples
///
/// ```
/// # use std::sync::Arc;
/// # use castwatch_lib::control::CastController;
/// use castwatch_lib::event::DeviceId;
/// use castwatch_lib::manager::{DeviceRegistry, ManagedDevice};
/// use castwatch_lib::state::DeviceSnapshot;
///
/// # async fn example(controller: Arc<dyn CastController>) {
/// let registry = DeviceRegistry::new();
/// let id = DeviceId::new("f00d-0001");
/// let snapshot = DeviceSnapshot::new("Hall", id.clone(), "10.0.0.9".parse().unwrap());
///
/// registry.upsert(ManagedDevice::new(snapshot, controller)).await;
/// assert!(registry.get(&id).await.is_some());
/// assert!(registry.remove(&id).await);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, ManagedDevice>>,
    next_session: AtomicU64,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a device's snapshot.
    pub async fn get(&self, device_id: &DeviceId) -> Option<DeviceSnapshot> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| d.snapshot.clone())
    }

    /// Returns a device's controller.
    pub async fn controller(&self, device_id: &DeviceId) -> Option<Arc<dyn CastController>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(|d| Arc::clone(&d.controller))
    }

    /// Inserts or replaces a device and returns its new session.
    pub async fn upsert(&self, mut device: ManagedDevice) -> u64 {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        device.session = session;

        let device_id = device.snapshot.uuid.clone();
        let replaced = self
            .devices
            .write()
            .await
            .insert(device_id.clone(), device)
            .is_some();

        if replaced {
            tracing::debug!(%device_id, session, "Replaced registry entry");
        }
        session
    }

    /// Removes a device.
    ///
    /// Returns `true` if the device was present.
    pub async fn remove(&self, device_id: &DeviceId) -> bool {
        self.devices.write().await.remove(device_id).is_some()
    }

    /// Removes a device only if it still belongs to `session`.
    pub(crate) async fn remove_session(&self, device_id: &DeviceId, session: u64) -> bool {
        let mut devices = self.devices.write().await;
        if devices.get(device_id).is_some_and(|d| d.session == session) {
            devices.remove(device_id);
            true
        } else {
            false
        }
    }

    /// Runs `f` against a device's snapshot under the exclusive lock.
    ///
    /// Returns `None` if the device is absent or was re-registered under a
    /// different session.
    pub(crate) async fn update<R>(
        &self,
        device_id: &DeviceId,
        session: u64,
        f: impl FnOnce(&mut DeviceSnapshot) -> R,
    ) -> Option<R> {
        let mut devices = self.devices.write().await;
        devices
            .get_mut(device_id)
            .filter(|d| d.session == session)
            .map(|d| f(&mut d.snapshot))
    }

    /// Returns every snapshot, sorted ascending by identity.
    pub async fn list(&self) -> Vec<DeviceSnapshot> {
        let mut snapshots: Vec<DeviceSnapshot> = self
            .devices
            .read()
            .await
            .values()
            .map(|d| d.snapshot.clone())
            .collect();
        snapshots.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        snapshots
    }

    /// Returns the number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns `true` if no device is registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
