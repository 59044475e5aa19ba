// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Folds control channel events into device snapshots.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::control::CastController;
use crate::error::ProtocolError;
use crate::event::{CONNECTION_NAMESPACE, CastEvent, DeviceId, MEDIA_NAMESPACE};
use crate::push::PushDispatcher;
use crate::state::{AppInfo, DeviceSnapshot, DeviceStatus, MediaInfo};

use super::DeviceRegistry;

/// A namespace (un)subscription requested by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceAction {
    /// Start receiving messages on a namespace of a running application.
    Subscribe {
        /// Namespace URN.
        namespace: String,
        /// Transport of the application.
        transport_id: String,
    },
    /// Stop receiving messages on a namespace.
    Unsubscribe {
        /// Namespace URN.
        namespace: String,
        /// Transport of the application.
        transport_id: String,
    },
}

impl NamespaceAction {
    /// Returns the namespace URN.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Subscribe { namespace, .. } | Self::Unsubscribe { namespace, .. } => namespace,
        }
    }

    /// Sends the request to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Namespace`] if the device rejects it.
    pub async fn execute(&self, controller: &dyn CastController) -> Result<(), ProtocolError> {
        let result = match self {
            Self::Subscribe {
                namespace,
                transport_id,
            } => controller.subscribe_namespace(namespace, transport_id).await,
            Self::Unsubscribe {
                namespace,
                transport_id,
            } => controller.unsubscribe_namespace(namespace, transport_id).await,
        };

        result.map_err(|e| ProtocolError::Namespace {
            namespace: self.namespace().to_string(),
            message: e.to_string(),
        })
    }
}

/// Applies one event to a snapshot.
///
/// `Disconnected` is not handled here; removing the device is up to the
/// caller. Returns the namespace requests the event implies, in order.
pub fn apply(snapshot: &mut DeviceSnapshot, event: &CastEvent) -> Vec<NamespaceAction> {
    let mut actions = Vec::new();

    match event {
        CastEvent::Connected => snapshot.status = DeviceStatus::Idle,
        CastEvent::Disconnected => {}
        CastEvent::AppStarted {
            display_name,
            app_id,
            transport_id,
            ..
        } => {
            snapshot.app = Some(AppInfo::new(display_name, app_id));
            if event.has_media_namespace() {
                for namespace in [CONNECTION_NAMESPACE, MEDIA_NAMESPACE] {
                    actions.push(NamespaceAction::Subscribe {
                        namespace: namespace.to_string(),
                        transport_id: transport_id.clone(),
                    });
                }
            }
        }
        CastEvent::AppStopped {
            namespaces,
            transport_id,
        } => {
            snapshot.clear_app();
            snapshot.status = DeviceStatus::Idle;
            actions.extend(namespaces.iter().map(|n| NamespaceAction::Unsubscribe {
                namespace: n.name.clone(),
                transport_id: transport_id.clone(),
            }));
        }
        CastEvent::Media {
            player_state,
            volume,
            media,
            current_time,
        } => {
            snapshot.status = DeviceStatus::from_player_state(player_state);
            snapshot.volume = volume.percent();
            snapshot.muted = volume.muted;
            // Media only exists while an app is running.
            if let Some(payload) = media.as_ref().filter(|_| snapshot.app.is_some()) {
                snapshot.media = Some(MediaInfo::from_payload(
                    payload,
                    player_state,
                    *current_time,
                ));
            }
        }
        CastEvent::ReceiverStatus {
            volume,
            is_stand_by,
            is_active_input,
        } => {
            snapshot.volume = volume.percent();
            snapshot.muted = volume.muted;
            snapshot.idle = *is_stand_by;
            snapshot.active = *is_active_input;
        }
        CastEvent::Unrecognized(what) => {
            tracing::debug!(device_id = %snapshot.uuid, event = %what, "Ignoring unrecognized event");
        }
    }

    actions
}

/// Drives one device's snapshot from its event stream.
///
/// Each event is applied under the registry's exclusive lock. When the
/// visible state changed the dispatcher is notified before the lock is
/// released; namespace requests go to the controller afterwards.
#[derive(Debug, Clone)]
pub struct EventReducer {
    registry: Arc<DeviceRegistry>,
    dispatcher: PushDispatcher,
}

impl EventReducer {
    /// Creates a reducer writing into `registry`.
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>, dispatcher: PushDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Consumes events until the device disconnects, the channel closes, or
    /// the registration is superseded.
    ///
    /// A closed channel removes the device like a disconnect does.
    pub async fn run(
        self,
        device_id: DeviceId,
        session: u64,
        controller: Arc<dyn CastController>,
        mut events: mpsc::Receiver<CastEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if self
                .handle(&device_id, session, controller.as_ref(), event)
                .await
                .is_break()
            {
                return;
            }
        }

        if self.registry.remove_session(&device_id, session).await {
            tracing::info!(%device_id, "Event channel closed, device removed");
        }
    }

    pub(crate) async fn handle(
        &self,
        device_id: &DeviceId,
        session: u64,
        controller: &dyn CastController,
        event: CastEvent,
    ) -> ControlFlow<()> {
        tracing::debug!(%device_id, event = event.kind(), "Reducing event");

        if event.is_disconnect() {
            if self.registry.remove_session(device_id, session).await {
                tracing::info!(%device_id, "Device disconnected");
            }
            return ControlFlow::Break(());
        }

        let dispatcher = &self.dispatcher;
        let actions = self
            .registry
            .update(device_id, session, |snapshot| {
                let actions = apply(snapshot, &event);
                if snapshot.refresh_fingerprint() {
                    dispatcher.notify(device_id);
                }
                actions
            })
            .await;

        let Some(actions) = actions else {
            tracing::debug!(%device_id, session, "Registration superseded, stopping reducer");
            return ControlFlow::Break(());
        };

        for action in &actions {
            if let Err(e) = action.execute(controller).await {
                tracing::warn!(%device_id, error = %e, "Namespace request failed");
            }
        }
        ControlFlow::Continue(())
    }
}
