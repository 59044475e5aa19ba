// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device snapshot types and change detection.
//!
//! [`DeviceSnapshot`] is the canonical record of what is known about a cast
//! device. The [`fingerprint`] module hashes its visible fields so that
//! repeated protocol chatter carrying the same logical state does not
//! trigger notifications.
//!
//! # Examples
//!
//! ```
//! use castwatch_lib::event::DeviceId;
//! use castwatch_lib::state::{DeviceSnapshot, DeviceStatus};
//!
//! let mut snapshot = DeviceSnapshot::new(
//!     "Office Display",
//!     DeviceId::new("c0ffee00-0000-4000-8000-000000000001"),
//!     "192.168.1.50".parse().unwrap(),
//! );
//!
//! // Same state: nothing to report
//! assert!(!snapshot.refresh_fingerprint());
//!
//! snapshot.status = DeviceStatus::Idle;
//! assert!(snapshot.refresh_fingerprint());
//! ```

mod device_snapshot;
pub mod fingerprint;

pub use device_snapshot::{AppInfo, DeviceSnapshot, DeviceStatus, MediaInfo};
