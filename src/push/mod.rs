// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Webhook push notifications.
//!
//! When a device's state changes, [`PushDispatcher`] waits for a quiet
//! period and then POSTs the device's full snapshot to every URL subscribed
//! for it:
//!
//! ```json
//! {"action": "deviceUpdate", "data": {"name": "Kitchen", "uuid": "...", ...}}
//! ```
//!
//! The request carries an `X-Forwarded-For` header with the device's
//! address. Requests go through a [`WebhookTransport`], which is
//! [`HttpWebhookTransport`] in production.

mod debounce;
mod dispatcher;
mod transport;

pub use dispatcher::PushDispatcher;
pub use transport::{FORWARDED_FOR_HEADER, HttpWebhookTransport, WebhookPayload, WebhookTransport};
