// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debounced webhook delivery.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::event::DeviceId;
use crate::manager::DeviceRegistry;
use crate::subscription::SubscriptionStore;

use super::debounce::{Debouncer, Tick};
use super::{WebhookPayload, WebhookTransport};

/// Pushes device snapshots to subscribed webhooks.
///
/// Notifications are debounced per device on the trailing edge: every call
/// to [`notify`](Self::notify) pushes the deadline one quiet period into the
/// future, and only when the device has been quiet for that long does a
/// single delivery cycle run. The snapshot is read from the registry when
/// the cycle fires, so subscribers always receive the latest state.
///
/// Each subscribed URL gets its own background request. Failures are logged
/// and never retried.
#[derive(Clone)]
pub struct PushDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    debouncer: Debouncer,
    registry: Arc<DeviceRegistry>,
    subscriptions: SubscriptionStore,
    transport: Arc<dyn WebhookTransport>,
}

impl PushDispatcher {
    /// Creates a dispatcher with the given quiet period.
    #[must_use]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        subscriptions: SubscriptionStore,
        transport: Arc<dyn WebhookTransport>,
        quiet: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                debouncer: Debouncer::new(quiet),
                registry,
                subscriptions,
                transport,
            }),
        }
    }

    /// Returns the debounce quiet period.
    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.inner.debouncer.quiet()
    }

    /// Records a state change for a device.
    ///
    /// Never blocks. Must be called from within a tokio runtime.
    pub fn notify(&self, device_id: &DeviceId) {
        if !self.inner.debouncer.arm(device_id) {
            tracing::trace!(%device_id, "Extended pending notification");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let device_id = device_id.clone();
        tokio::spawn(async move {
            inner.run_timer(device_id).await;
        });
    }

    /// Returns `true` if a delivery is scheduled for the device.
    #[must_use]
    pub fn is_pending(&self, device_id: &DeviceId) -> bool {
        self.inner.debouncer.is_pending(device_id)
    }
}

impl fmt::Debug for PushDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushDispatcher")
            .field("quiet", &self.quiet())
            .finish_non_exhaustive()
    }
}

impl Inner {
    async fn run_timer(&self, device_id: DeviceId) {
        while let Tick::Wait(deadline) = self.debouncer.tick(&device_id) {
            tokio::time::sleep_until(deadline).await;
        }
        self.deliver(&device_id).await;
    }

    async fn deliver(&self, device_id: &DeviceId) {
        let Some(snapshot) = self.registry.get(device_id).await else {
            tracing::debug!(%device_id, "Device gone before notification fired");
            return;
        };

        let urls = self.subscriptions.urls_for(device_id);
        if urls.is_empty() {
            return;
        }

        tracing::debug!(%device_id, subscribers = urls.len(), "Pushing device update");

        let forwarded_for = snapshot.ip;
        let payload = Arc::new(WebhookPayload::DeviceUpdate { data: snapshot });
        for url in urls {
            let transport = Arc::clone(&self.transport);
            let payload = Arc::clone(&payload);
            let device_id = device_id.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.post(&url, &payload, Some(forwarded_for)).await {
                    tracing::warn!(%device_id, url = %url, error = %e, "Webhook delivery failed");
                }
            });
        }
    }
}
