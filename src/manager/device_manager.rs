// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager tying discovery, state tracking and webhooks together.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::HubConfig;
use crate::control::{CastController, DiscoveredDevice};
use crate::error::{Error, Result, ValueError};
use crate::event::DeviceId;
use crate::push::{HttpWebhookTransport, PushDispatcher, WebhookPayload, WebhookTransport};
use crate::state::DeviceSnapshot;
use crate::subscription::{SubscriptionStore, URL_SEPARATOR};

use super::{DeviceRegistry, EventReducer, ManagedDevice};

/// Manager for the cast devices on the network.
///
/// The `DeviceManager` owns the [`DeviceRegistry`], the
/// [`SubscriptionStore`] and the [`PushDispatcher`]. Devices reported by
/// discovery are [attached](Self::attach): each gets a snapshot in the
/// registry and a task folding its control channel events into it. Every
/// visible change is pushed, debounced, to the device's webhooks.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use castwatch_lib::{DeviceManager, HubConfig};
/// use castwatch_lib::control::DiscoveredDevice;
///
/// # async fn example(
/// #     discovery: tokio::sync::mpsc::Receiver<DiscoveredDevice>,
/// # ) -> castwatch_lib::Result<()> {
/// let manager = Arc::new(DeviceManager::new(HubConfig::from_env())?);
///
/// // Attach every device discovery reports
/// manager.spawn_discovery(discovery);
///
/// for device in manager.list().await {
///     println!("{} is {}", device.name, device.status);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeviceManager {
    registry: Arc<DeviceRegistry>,
    subscriptions: SubscriptionStore,
    dispatcher: PushDispatcher,
    transport: Arc<dyn WebhookTransport>,
    config: HubConfig,
}

impl DeviceManager {
    /// Creates a manager from configuration.
    ///
    /// Loads the subscription state file and builds the HTTP webhook
    /// transport. An unreadable state file is not an error; the manager
    /// starts with no subscriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: HubConfig) -> Result<Self> {
        let subscriptions = SubscriptionStore::load(config.state_file());
        let transport = HttpWebhookTransport::new(config.webhook_timeout())?;
        Ok(Self::with_parts(config, subscriptions, Arc::new(transport)))
    }

    /// Creates a manager from an existing store and webhook transport.
    #[must_use]
    pub fn with_parts(
        config: HubConfig,
        subscriptions: SubscriptionStore,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let dispatcher = PushDispatcher::new(
            Arc::clone(&registry),
            subscriptions.clone(),
            Arc::clone(&transport),
            config.debounce(),
        );
        Self {
            registry,
            subscriptions,
            dispatcher,
            transport,
            config,
        }
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Returns the subscription store.
    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    /// Returns the push dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &PushDispatcher {
        &self.dispatcher
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Registers a discovered device and starts tracking its state.
    ///
    /// A device already registered under the same identity is replaced, and
    /// its previous event task stops at its next event. The control channel
    /// is connected in a separate task, so a slow device never holds up the
    /// caller. A failed connect is logged and leaves the device in
    /// `CONNECTING`.
    ///
    /// Returns the handle of the event task. Must be called from within a
    /// tokio runtime.
    pub async fn attach(&self, device: DiscoveredDevice) -> JoinHandle<()> {
        let DiscoveredDevice {
            name,
            id,
            address,
            controller,
            events,
        } = device;

        let snapshot = DeviceSnapshot::new(name, id.clone(), address);
        let session = self
            .registry
            .upsert(ManagedDevice::new(snapshot, Arc::clone(&controller)))
            .await;
        tracing::info!(device_id = %id, %address, session, "Device attached");

        let reducer = EventReducer::new(Arc::clone(&self.registry), self.dispatcher.clone());
        let handle = tokio::spawn(reducer.run(id.clone(), session, Arc::clone(&controller), events));

        tokio::spawn(async move {
            if let Err(e) = controller.connect().await {
                tracing::warn!(device_id = %id, error = %e, "Failed to connect to device");
            }
        });
        handle
    }

    /// Attaches every device received from `discovery` until the channel
    /// closes.
    pub async fn run_discovery(&self, mut discovery: mpsc::Receiver<DiscoveredDevice>) {
        while let Some(device) = discovery.recv().await {
            tracing::debug!(device_id = %device.id, name = %device.name, "Discovered device");
            self.attach(device).await;
        }
        tracing::debug!("Discovery channel closed");
    }

    /// Runs [`run_discovery`](Self::run_discovery) in a background task.
    pub fn spawn_discovery(
        self: &Arc<Self>,
        discovery: mpsc::Receiver<DiscoveredDevice>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_discovery(discovery).await })
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns the snapshot of one device.
    pub async fn snapshot(&self, device_id: &DeviceId) -> Option<DeviceSnapshot> {
        self.registry.get(device_id).await
    }

    /// Returns every snapshot, sorted by identity.
    pub async fn list(&self) -> Vec<DeviceSnapshot> {
        self.registry.list().await
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Resumes playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not found or rejects the command.
    pub async fn play(&self, device_id: &DeviceId) -> Result<()> {
        self.controller(device_id).await?.play().await?;
        Ok(())
    }

    /// Pauses playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not found or rejects the command.
    pub async fn pause(&self, device_id: &DeviceId) -> Result<()> {
        self.controller(device_id).await?.pause().await?;
        Ok(())
    }

    /// Stops playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not found or rejects the command.
    pub async fn stop(&self, device_id: &DeviceId) -> Result<()> {
        self.controller(device_id).await?.stop().await?;
        Ok(())
    }

    /// Sets the receiver volume as a percentage.
    ///
    /// Values outside `0..=100` are clamped.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not found or rejects the command.
    pub async fn set_volume(&self, device_id: &DeviceId, percent: i64) -> Result<()> {
        let clamped = percent.clamp(0, 100);
        if clamped != percent {
            tracing::debug!(%device_id, percent, clamped, "Clamped requested volume");
        }

        #[allow(clippy::cast_precision_loss)]
        let level = clamped as f64 / 100.0;
        self.controller(device_id).await?.set_volume(level).await?;
        Ok(())
    }

    /// Looks up a controller without holding the registry lock during I/O.
    async fn controller(&self, device_id: &DeviceId) -> Result<Arc<dyn CastController>> {
        self.registry
            .controller(device_id)
            .await
            .ok_or(Error::DeviceNotFound)
    }

    // =========================================================================
    // Webhooks
    // =========================================================================

    /// Sends a `ping` to `url` to check that it accepts webhooks.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be delivered.
    pub async fn probe(&self, url: &str) -> Result<()> {
        self.transport.post(url, &WebhookPayload::Ping, None).await?;
        Ok(())
    }

    /// Probes `url` and registers it for the device.
    ///
    /// Returns `false` if the URL was already registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown device, a value error
    /// if `url` contains [`URL_SEPARATOR`], and a protocol error if the probe
    /// fails.
    pub async fn subscribe(&self, device_id: &DeviceId, url: &str) -> Result<bool> {
        self.ensure_known(device_id).await?;
        if url.contains(URL_SEPARATOR) {
            return Err(
                ValueError::Invalid(format!("url must not contain '{URL_SEPARATOR}'")).into(),
            );
        }
        self.probe(url).await?;

        Ok(self.subscriptions.add(device_id, url))
    }

    /// Removes a webhook from the device.
    ///
    /// Returns `false` if the URL was not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown device.
    pub async fn unsubscribe(&self, device_id: &DeviceId, url: &str) -> Result<bool> {
        self.ensure_known(device_id).await?;

        Ok(self.subscriptions.remove(device_id, url))
    }

    async fn ensure_known(&self, device_id: &DeviceId) -> Result<()> {
        if self.registry.controller(device_id).await.is_some() {
            Ok(())
        } else {
            Err(Error::DeviceNotFound)
        }
    }

    // =========================================================================
    // Server
    // =========================================================================

    /// Serves the control API on the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound or the server fails.
    #[cfg(feature = "server")]
    pub async fn serve(self: Arc<Self>) -> std::io::Result<()> {
        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Control API listening");

        axum::serve(listener, crate::api::router(self)).await
    }
}

impl fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceManager")
            .field("registry", &self.registry)
            .field("subscriptions", &self.subscriptions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::control::testing::{Call, RecordingController};
    use crate::event::{CastEvent, MEDIA_NAMESPACE, MediaPayload, Volume};
    use crate::push::testing::RecordingTransport;
    use crate::state::DeviceStatus;

    fn manager(transport: RecordingTransport) -> (DeviceManager, Arc<RecordingTransport>) {
        let transport = Arc::new(transport);
        let config = HubConfig::new().with_debounce(Duration::from_millis(200));
        let manager = DeviceManager::with_parts(
            config,
            SubscriptionStore::in_memory(),
            Arc::clone(&transport) as Arc<dyn WebhookTransport>,
        );
        (manager, transport)
    }

    /// Attaches `device` and lets its connect task run.
    async fn attach(manager: &DeviceManager, device: DiscoveredDevice) -> JoinHandle<()> {
        let handle = manager.attach(device).await;
        tokio::task::yield_now().await;
        handle
    }

    fn discovered(
        id: &str,
        controller: &Arc<RecordingController>,
    ) -> (DiscoveredDevice, mpsc::Sender<CastEvent>) {
        DiscoveredDevice::channel(
            "Lounge",
            DeviceId::new(id),
            "192.168.0.40".parse().unwrap(),
            Arc::clone(controller) as Arc<dyn CastController>,
            8,
        )
    }

    #[tokio::test]
    async fn new_manager_is_empty() {
        let (manager, _) = manager(RecordingTransport::default());

        assert!(manager.list().await.is_empty());
        assert!(manager.registry().is_empty().await);
    }

    #[tokio::test]
    async fn attach_registers_and_connects() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);

        attach(&manager, device).await;

        let snapshot = manager.snapshot(&DeviceId::new("lounge")).await.unwrap();
        assert_eq!(snapshot.status, DeviceStatus::Connecting);
        assert_eq!(snapshot.fingerprint(), snapshot.compute_fingerprint());
        assert_eq!(controller.calls(), vec![Call::Connect]);
    }

    #[tokio::test(start_paused = true)]
    async fn events_flow_into_snapshot_and_webhook() {
        let (manager, transport) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let id = DeviceId::new("lounge");
        manager.subscriptions().add(&id, "http://hook.test/");
        let (device, tx) = discovered("lounge", &controller);
        attach(&manager, device).await;

        tx.send(CastEvent::app_started("Radio", "id", &[MEDIA_NAMESPACE], "t-1"))
            .await
            .unwrap();
        tx.send(CastEvent::Media {
            player_state: "PLAYING".to_string(),
            volume: Volume::new(0.5, false),
            media: Some(MediaPayload::default()),
            current_time: 0.0,
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = manager.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.status, DeviceStatus::Player("PLAYING".to_string()));
        assert_eq!(snapshot.volume, 50);
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_removes_device() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, tx) = discovered("lounge", &controller);
        let handle = attach(&manager, device).await;

        tx.send(CastEvent::Disconnected).await.unwrap();
        handle.await.unwrap();

        assert!(manager.snapshot(&DeviceId::new("lounge")).await.is_none());
    }

    #[tokio::test]
    async fn rediscovery_replaces_entry() {
        let (manager, _) = manager(RecordingTransport::default());
        let first = Arc::new(RecordingController::default());
        let second = Arc::new(RecordingController::default());
        let (device, old_tx) = discovered("lounge", &first);
        let old_handle = attach(&manager, device).await;
        let (device, _new_tx) = discovered("lounge", &second);
        attach(&manager, device).await;

        old_tx.send(CastEvent::Disconnected).await.unwrap();
        old_handle.await.unwrap();

        assert_eq!(manager.list().await.len(), 1);
        manager.play(&DeviceId::new("lounge")).await.unwrap();
        assert_eq!(second.calls(), vec![Call::Connect, Call::Play]);
    }

    #[tokio::test]
    async fn run_discovery_attaches_until_closed() {
        let (manager, _) = manager(RecordingTransport::default());
        let manager = Arc::new(manager);
        let controller = Arc::new(RecordingController::default());
        let (tx, rx) = mpsc::channel(4);
        let mut senders = Vec::new();
        for id in ["b", "a"] {
            let (device, events) = discovered(id, &controller);
            senders.push(events);
            tx.send(device).await.unwrap();
        }
        drop(tx);

        manager.spawn_discovery(rx).await.unwrap();

        let ids: Vec<String> = manager
            .list()
            .await
            .into_iter()
            .map(|s| s.uuid.to_string())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_connect_does_not_hold_up_discovery() {
        let (manager, _) = manager(RecordingTransport::default());
        let manager = Arc::new(manager);
        let stalled = Arc::new(RecordingController::stalled());
        let healthy = Arc::new(RecordingController::default());
        let (tx, rx) = mpsc::channel(4);
        let (first, _first_events) = discovered("a", &stalled);
        let (second, _second_events) = discovered("b", &healthy);
        tx.send(first).await.unwrap();
        tx.send(second).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(60), manager.spawn_discovery(rx))
            .await
            .expect("discovery waited on a connect")
            .unwrap();
        tokio::task::yield_now().await;

        assert_eq!(manager.list().await.len(), 2);
        assert_eq!(stalled.calls(), vec![Call::Connect]);
        assert_eq!(healthy.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn commands_reach_controller() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        manager.pause(&id).await.unwrap();
        manager.play(&id).await.unwrap();
        manager.stop(&id).await.unwrap();

        assert_eq!(
            controller.calls(),
            vec![Call::Connect, Call::Pause, Call::Play, Call::Stop]
        );
    }

    #[tokio::test]
    async fn set_volume_clamps_percent() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        manager.set_volume(&id, 150).await.unwrap();
        manager.set_volume(&id, -5).await.unwrap();
        manager.set_volume(&id, 25).await.unwrap();

        assert_eq!(
            controller.calls()[1..],
            [
                Call::SetVolume(1.0),
                Call::SetVolume(0.0),
                Call::SetVolume(0.25)
            ]
        );
    }

    #[tokio::test]
    async fn commands_on_unknown_device_fail() {
        let (manager, _) = manager(RecordingTransport::default());

        let err = manager.play(&DeviceId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound));
    }

    #[tokio::test]
    async fn controller_failure_is_reported() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::failing());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;

        let err = manager.stop(&DeviceId::new("lounge")).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn subscribe_probes_then_registers_once() {
        let (manager, transport) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        assert!(manager.subscribe(&id, "http://hook.test/").await.unwrap());
        assert!(!manager.subscribe(&id, "http://hook.test/").await.unwrap());

        let posts = transport.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].1, WebhookPayload::Ping);
        assert_eq!(posts[0].2, None);
        assert_eq!(manager.subscriptions().urls_for(&id), ["http://hook.test/"]);
    }

    #[tokio::test]
    async fn subscribe_with_unreachable_url_fails() {
        let (manager, _) = manager(RecordingTransport::failing_for(["http://down.test/"]));
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        let err = manager.subscribe(&id, "http://down.test/").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(manager.subscriptions().urls_for(&id).is_empty());
    }

    #[tokio::test]
    async fn subscribe_rejects_url_with_separator_before_sending_ping() {
        let (manager, transport) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        let err = manager
            .subscribe(&id, "http://hook.test/cb?a=1;b=2")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Value(ValueError::Invalid(_))));
        assert!(transport.posts().is_empty());
        assert!(manager.subscriptions().urls_for(&id).is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_reports_presence() {
        let (manager, _) = manager(RecordingTransport::default());
        let controller = Arc::new(RecordingController::default());
        let (device, _tx) = discovered("lounge", &controller);
        attach(&manager, device).await;
        let id = DeviceId::new("lounge");

        manager.subscribe(&id, "http://hook.test/").await.unwrap();
        assert!(manager.unsubscribe(&id, "http://hook.test/").await.unwrap());
        assert!(!manager.unsubscribe(&id, "http://hook.test/").await.unwrap());
        assert!(matches!(
            manager.unsubscribe(&DeviceId::new("ghost"), "http://hook.test/").await,
            Err(Error::DeviceNotFound)
        ));
    }
}
