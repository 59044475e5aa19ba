// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the device discovery and control protocol.
//!
//! This crate does not speak the cast control protocol itself. A discovery
//! implementation hands over one [`DiscoveredDevice`] per device it finds,
//! carrying a [`CastController`] to issue commands and a channel of
//! [`CastEvent`]s produced by the device's control connection.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use castwatch_lib::control::{CastController, DiscoveredDevice};
//! use castwatch_lib::error::ProtocolError;
//! use castwatch_lib::event::{CastEvent, DeviceId};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl CastController for Noop {
//!     async fn connect(&self) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn play(&self) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn pause(&self) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn set_volume(&self, _level: f64) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn subscribe_namespace(&self, _ns: &str, _transport: &str) -> Result<(), ProtocolError> { Ok(()) }
//!     async fn unsubscribe_namespace(&self, _ns: &str, _transport: &str) -> Result<(), ProtocolError> { Ok(()) }
//! }
//!
//! # async fn example() {
//! let (device, events) = DiscoveredDevice::channel(
//!     "Den TV",
//!     DeviceId::new("d3n-0001"),
//!     "192.168.1.61".parse().unwrap(),
//!     Arc::new(Noop),
//!     16,
//! );
//! events.send(CastEvent::Connected).await.unwrap();
//! # drop(device);
//! # }
//! ```

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ProtocolError;
use crate::event::{CastEvent, DeviceId};

/// Control handle for one cast device.
///
/// Implementations wrap the device's control connection. All methods are
/// expected to return once the message is handed to the connection; none
/// of them is called while the device registry lock is held.
#[async_trait]
pub trait CastController: Send + Sync {
    /// Opens the control connection. Events start flowing afterwards.
    async fn connect(&self) -> Result<(), ProtocolError>;

    /// Resumes playback.
    async fn play(&self) -> Result<(), ProtocolError>;

    /// Pauses playback.
    async fn pause(&self) -> Result<(), ProtocolError>;

    /// Stops playback.
    async fn stop(&self) -> Result<(), ProtocolError>;

    /// Sets the receiver volume, `level` in `0.0..=1.0`.
    async fn set_volume(&self, level: f64) -> Result<(), ProtocolError>;

    /// Subscribes to a namespace of the application at `transport_id`.
    async fn subscribe_namespace(
        &self,
        namespace: &str,
        transport_id: &str,
    ) -> Result<(), ProtocolError>;

    /// Leaves a namespace of the application at `transport_id`.
    async fn unsubscribe_namespace(
        &self,
        namespace: &str,
        transport_id: &str,
    ) -> Result<(), ProtocolError>;
}

/// A device reported by discovery.
pub struct DiscoveredDevice {
    /// Friendly name.
    pub name: String,
    /// Stable identity.
    pub id: DeviceId,
    /// Network address.
    pub address: IpAddr,
    /// Command handle.
    pub controller: Arc<dyn CastController>,
    /// Events from the device's control connection, in arrival order.
    pub events: mpsc::Receiver<CastEvent>,
}

impl DiscoveredDevice {
    /// Creates a discovered device from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        id: DeviceId,
        address: IpAddr,
        controller: Arc<dyn CastController>,
        events: mpsc::Receiver<CastEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            address,
            controller,
            events,
        }
    }

    /// Creates a discovered device together with the sender side of its
    /// event channel.
    ///
    /// `buffer` bounds the number of events queued for the reducer.
    #[must_use]
    pub fn channel(
        name: impl Into<String>,
        id: DeviceId,
        address: IpAddr,
        controller: Arc<dyn CastController>,
        buffer: usize,
    ) -> (Self, mpsc::Sender<CastEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(name, id, address, controller, rx), tx)
    }
}

impl fmt::Debug for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredDevice")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
