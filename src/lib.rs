// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `castwatch` Lib - state tracking and webhook push for cast devices.
//!
//! This library keeps an in-memory snapshot of every cast device found on
//! the local network, updates it from each device's control channel events,
//! and notifies subscribed webhooks whenever a device's visible state
//! changes.
//!
//! # Features
//!
//! - **Device registry**: one snapshot per device, listed in identity order
//! - **Event reduction**: app, media, volume and standby events folded into
//!   the snapshot by one task per device
//! - **Change detection**: a fingerprint of the visible state, so only real
//!   changes are pushed
//! - **Webhooks**: debounced per device, delivered to every subscriber in
//!   parallel, subscriptions persisted to a state file
//! - **Control API** (feature `server`): list devices, playback and volume
//!   commands, webhook (un)subscription over HTTP
//!
//! # Quick Start
//!
//! Discovery and the device control channel live outside this crate. They
//! plug in through [`control::CastController`] and a channel of
//! [`control::DiscoveredDevice`]s:
//!
//! ```no_run
//! use std::sync::Arc;
//! use castwatch_lib::{DeviceManager, HubConfig};
//! use castwatch_lib::control::DiscoveredDevice;
//!
//! # async fn run(
//! #     discovery: tokio::sync::mpsc::Receiver<DiscoveredDevice>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = HubConfig::from_env();
//! let manager = Arc::new(DeviceManager::new(config)?);
//!
//! manager.spawn_discovery(discovery);
//! manager.serve().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Webhooks
//!
//! After a device has been quiet for the debounce window (2 seconds by
//! default), every URL subscribed for it receives:
//!
//! ```json
//! {
//!   "action": "deviceUpdate",
//!   "data": {
//!     "name": "Kitchen speaker",
//!     "uuid": "8a4c2d1e-0000-4b7e-9f44-3c1a5e2b9d10",
//!     "ip": "192.168.1.30",
//!     "app": {"name": "Spotify", "id": "CC32E753"},
//!     "status": "PLAYING",
//!     "volume": 35,
//!     "muted": false,
//!     "media": {"title": "...", "subtitle": "...", "image": "...",
//!               "state": "PLAYING", "duration": 215.0, "currentTime": 12.4},
//!     "idle": false,
//!     "active": true
//!   }
//! }
//! ```

#[cfg(feature = "server")]
pub mod api;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod manager;
pub mod push;
pub mod state;
pub mod subscription;

pub use config::HubConfig;
pub use control::{CastController, DiscoveredDevice};
pub use error::{Error, PersistenceError, ProtocolError, Result, ValueError};
pub use event::{CastEvent, DeviceId};
pub use manager::{DeviceManager, DeviceRegistry};
pub use push::{PushDispatcher, WebhookPayload, WebhookTransport};
pub use state::{DeviceSnapshot, DeviceStatus};
pub use subscription::SubscriptionStore;
