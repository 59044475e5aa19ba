// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Webhook subscriptions.
//!
//! [`SubscriptionStore`] keeps, per device, the ordered list of webhook URLs
//! that receive a push whenever the device's state changes. The list is
//! loaded once from a state file at startup and the file is rewritten in the
//! background after every change.

mod state_file;
mod store;

pub use state_file::URL_SEPARATOR;
pub use store::SubscriptionStore;
