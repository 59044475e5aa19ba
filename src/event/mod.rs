// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity and control channel events.
//!
//! Each discovered device produces a stream of [`CastEvent`]s. The reducer
//! in [`manager`](crate::manager) folds them into the device's snapshot.
//!
//! # Examples
//!
//! ```
//! use castwatch_lib::event::{CastEvent, DeviceId, MEDIA_NAMESPACE, Volume};
//!
//! let id = DeviceId::new("8f2a61d4-7c1e-4b8e-9a39-1f0c2d7e5b11");
//!
//! let started = CastEvent::app_started("YouTube", "233637DE", &[MEDIA_NAMESPACE], "web-7");
//! assert!(started.has_media_namespace());
//!
//! let status = CastEvent::ReceiverStatus {
//!     volume: Volume::new(0.4, false),
//!     is_stand_by: false,
//!     is_active_input: true,
//! };
//! assert_eq!(status.kind(), "receiver_status");
//! ```

mod cast_event;
mod device_id;

pub use cast_event::{
    CONNECTION_NAMESPACE, CastEvent, MEDIA_NAMESPACE, MediaPayload, Namespace, Volume,
};
pub use device_id::DeviceId;
