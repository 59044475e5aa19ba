// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use castwatch_lib::control::{CastController, DiscoveredDevice};
use castwatch_lib::event::{CastEvent, DeviceId};
use castwatch_lib::{DeviceManager, HubConfig, ProtocolError};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Controller that records the commands it receives.
#[derive(Debug, Default)]
pub struct FakeController {
    commands: Mutex<Vec<String>>,
}

impl FakeController {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn record(&self, command: String) -> Result<(), ProtocolError> {
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl CastController for FakeController {
    async fn connect(&self) -> Result<(), ProtocolError> {
        self.record("connect".to_string())
    }

    async fn play(&self) -> Result<(), ProtocolError> {
        self.record("play".to_string())
    }

    async fn pause(&self) -> Result<(), ProtocolError> {
        self.record("pause".to_string())
    }

    async fn stop(&self) -> Result<(), ProtocolError> {
        self.record("stop".to_string())
    }

    async fn set_volume(&self, level: f64) -> Result<(), ProtocolError> {
        self.record(format!("volume {level}"))
    }

    async fn subscribe_namespace(
        &self,
        namespace: &str,
        transport_id: &str,
    ) -> Result<(), ProtocolError> {
        self.record(format!("subscribe {namespace} {transport_id}"))
    }

    async fn unsubscribe_namespace(
        &self,
        namespace: &str,
        transport_id: &str,
    ) -> Result<(), ProtocolError> {
        self.record(format!("unsubscribe {namespace} {transport_id}"))
    }
}

/// A manager with one attached device.
pub struct Hub {
    pub manager: Arc<DeviceManager>,
    pub controller: Arc<FakeController>,
    pub events: mpsc::Sender<CastEvent>,
}

pub const DEVICE_ID: &str = "8a4c2d1e-kitchen";
pub const DEVICE_IP: &str = "192.168.1.30";

/// Builds a manager persisting to `state_file` and attaches one device.
pub async fn hub(state_file: &Path, debounce: Duration) -> Hub {
    let config = HubConfig::new()
        .with_state_file(state_file)
        .with_debounce(debounce)
        .with_webhook_timeout(Duration::from_secs(2));
    let manager = Arc::new(DeviceManager::new(config).unwrap());
    let controller = Arc::new(FakeController::default());

    let (device, events) = DiscoveredDevice::channel(
        "Kitchen speaker",
        DeviceId::new(DEVICE_ID),
        DEVICE_IP.parse().unwrap(),
        Arc::clone(&controller) as Arc<dyn CastController>,
        16,
    );
    manager.attach(device).await;
    // Connecting runs in its own task.
    tokio::task::yield_now().await;

    Hub {
        manager,
        controller,
        events,
    }
}

/// Installs a test log writer, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
