// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device tracking.
//!
//! # Overview
//!
//! The [`DeviceManager`] is the central component. It provides:
//!
//! - **Registry**: one [`DeviceSnapshot`](crate::state::DeviceSnapshot) per
//!   discovered device, in a [`DeviceRegistry`]
//! - **Event reduction**: one task per device folds its control channel
//!   events into the snapshot ([`EventReducer`])
//! - **Push**: every visible change is pushed, debounced, to the device's
//!   webhooks
//! - **Commands**: play, pause, stop and volume, forwarded to the device
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use castwatch_lib::HubConfig;
//! use castwatch_lib::event::DeviceId;
//! use castwatch_lib::manager::DeviceManager;
//!
//! #[tokio::main]
//! async fn main() -> castwatch_lib::Result<()> {
//!     let manager = Arc::new(DeviceManager::new(HubConfig::new())?);
//!
//!     let id = DeviceId::new("5f3c9a1e-living-room");
//!     if manager.snapshot(&id).await.is_some() {
//!         manager.set_volume(&id, 40).await?;
//!     }
//!     Ok(())
//! }
//! ```

mod device_manager;
mod managed_device;
mod reducer;
mod registry;

pub use device_manager::DeviceManager;
pub use managed_device::ManagedDevice;
pub use reducer::{EventReducer, NamespaceAction, apply};
pub use registry::DeviceRegistry;
