// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the subscription state file path.
pub const STATE_FILE_ENV: &str = "STATE_FILE";

/// Environment variable overriding the HTTP listen address.
pub const LISTEN_ENV: &str = "CASTWATCH_LISTEN";

/// Configuration of a [`DeviceManager`](crate::manager::DeviceManager).
///
/// # Examples
///
/// ```
/// use castwatch_lib::HubConfig;
/// use std::time::Duration;
///
/// let config = HubConfig::new()
///     .with_state_file("/var/lib/castwatch/state.toml")
///     .with_debounce(Duration::from_millis(500));
///
/// assert_eq!(config.debounce(), Duration::from_millis(500));
/// assert_eq!(config.listen_addr().port(), 3333);
/// ```
#[derive(Debug, Clone)]
pub struct HubConfig {
    state_file: PathBuf,
    listen_addr: SocketAddr,
    debounce: Duration,
    webhook_timeout: Duration,
    event_buffer: usize,
}

impl HubConfig {
    /// Default subscription state file.
    pub const DEFAULT_STATE_FILE: &'static str = "state.toml";
    /// Default HTTP listen port.
    pub const DEFAULT_PORT: u16 = 3333;
    /// Default quiet period before a webhook fires.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);
    /// Default timeout for outbound webhook requests.
    pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default capacity of per-device event channels.
    pub const DEFAULT_EVENT_BUFFER: usize = 64;

    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state_file: PathBuf::from(Self::DEFAULT_STATE_FILE),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], Self::DEFAULT_PORT)),
            debounce: Self::DEFAULT_DEBOUNCE,
            webhook_timeout: Self::DEFAULT_WEBHOOK_TIMEOUT,
            event_buffer: Self::DEFAULT_EVENT_BUFFER,
        }
    }

    /// Creates a configuration from defaults overridden by environment
    /// variables ([`STATE_FILE_ENV`], [`LISTEN_ENV`]).
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new().apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(STATE_FILE_ENV).filter(|p| !p.is_empty()) {
            self.state_file = PathBuf::from(path);
        }

        if let Some(addr) = lookup(LISTEN_ENV).filter(|a| !a.is_empty()) {
            match addr.parse() {
                Ok(addr) => self.listen_addr = addr,
                Err(e) => tracing::warn!(value = %addr, error = %e, "Ignoring invalid {LISTEN_ENV}"),
            }
        }

        self
    }

    /// Sets the subscription state file path.
    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Sets the HTTP listen address.
    #[must_use]
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Sets the webhook quiet period.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the outbound webhook request timeout.
    #[must_use]
    pub fn with_webhook_timeout(mut self, timeout: Duration) -> Self {
        self.webhook_timeout = timeout;
        self
    }

    /// Sets the per-device event channel capacity.
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Returns the state file path.
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Returns the HTTP listen address.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Returns the webhook quiet period.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Returns the webhook request timeout.
    #[must_use]
    pub fn webhook_timeout(&self) -> Duration {
        self.webhook_timeout
    }

    /// Returns the per-device event channel capacity.
    #[must_use]
    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new()
    }
}
