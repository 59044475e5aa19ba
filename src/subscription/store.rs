// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Webhook subscription store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::PersistenceError;
use crate::event::DeviceId;

use super::state_file;

/// Persisted mapping from device identity to its webhook URLs.
///
/// URLs are kept per device in insertion order without duplicates. The
/// in-memory map is the source of truth: every successful mutation schedules
/// a background rewrite of the whole state file, and callers never wait for
/// it. Writes are serialized, and each one renders the map as it is when the
/// write starts, so the file converges on the latest state.
///
/// The store does not validate URLs beyond refusing any that contain
/// [`URL_SEPARATOR`](super::URL_SEPARATOR), which the state file cannot
/// represent.
///
/// Cloning is cheap; clones share the same map.
///
/// # Examples
///
/// ```
/// use castwatch_lib::event::DeviceId;
/// use castwatch_lib::subscription::SubscriptionStore;
///
/// let store = SubscriptionStore::in_memory();
/// let id = DeviceId::new("kitchen");
///
/// assert!(store.add(&id, "http://hooks.local/cast"));
/// assert!(!store.add(&id, "http://hooks.local/cast"));
/// assert_eq!(store.urls_for(&id), vec!["http://hooks.local/cast".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    urls: RwLock<HashMap<DeviceId, Vec<String>>>,
    path: Option<PathBuf>,
    write_lock: tokio::sync::Mutex<()>,
}

impl SubscriptionStore {
    /// Creates a store that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_urls(None, HashMap::new())
    }

    /// Loads the store from a state file.
    ///
    /// A missing file is created empty. An unreadable or malformed file is
    /// logged and the store starts empty; the file is then replaced on the
    /// first mutation.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let urls = match state_file::read(&path) {
            Ok(urls) => {
                tracing::info!(
                    path = %path.display(),
                    devices = urls.len(),
                    "Loaded subscription state"
                );
                urls
            }
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "State file not found, creating it");
                if let Err(e) = state_file::render(&HashMap::new())
                    .and_then(|empty| state_file::write_blocking(&path, &empty))
                {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot create state file");
                }
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cannot read state file, starting without subscriptions"
                );
                HashMap::new()
            }
        };

        Self::with_urls(Some(path), urls)
    }

    fn with_urls(path: Option<PathBuf>, urls: HashMap<DeviceId, Vec<String>>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                urls: RwLock::new(urls),
                path,
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the state file path, if the store is persisted.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Adds a webhook URL for a device.
    ///
    /// Returns `false` if the URL is already registered for that device or
    /// contains [`URL_SEPARATOR`](super::URL_SEPARATOR).
    pub fn add(&self, device_id: &DeviceId, url: &str) -> bool {
        if url.contains(state_file::URL_SEPARATOR) {
            tracing::warn!(%device_id, url, "Webhook URL contains the state separator, not stored");
            return false;
        }

        {
            let mut urls = self.inner.urls.write();
            let list = urls.entry(device_id.clone()).or_default();
            if list.iter().any(|u| u == url) {
                return false;
            }
            list.push(url.to_string());
        }

        tracing::info!(%device_id, url, "Webhook subscribed");
        self.schedule_persist();
        true
    }

    /// Removes a webhook URL from a device.
    ///
    /// Returns `false` if the URL was not registered for that device.
    pub fn remove(&self, device_id: &DeviceId, url: &str) -> bool {
        {
            let mut urls = self.inner.urls.write();
            let Some(list) = urls.get_mut(device_id) else {
                return false;
            };
            let Some(index) = list.iter().position(|u| u == url) else {
                return false;
            };
            list.remove(index);
        }

        tracing::info!(%device_id, url, "Webhook unsubscribed");
        self.schedule_persist();
        true
    }

    /// Returns the webhook URLs of a device, in registration order.
    #[must_use]
    pub fn urls_for(&self, device_id: &DeviceId) -> Vec<String> {
        self.inner
            .urls
            .read()
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if the URL is registered for the device.
    #[must_use]
    pub fn contains(&self, device_id: &DeviceId, url: &str) -> bool {
        self.inner
            .urls
            .read()
            .get(device_id)
            .is_some_and(|list| list.iter().any(|u| u == url))
    }

    /// Writes the current state to disk and waits for completion.
    ///
    /// Does nothing for in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encoded or written.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.inner.persist().await
    }

    fn schedule_persist(&self) {
        if self.inner.path.is_none() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = inner.persist().await {
                        tracing::warn!(error = %e, "Failed to persist subscription state");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = inner.persist_blocking() {
                    tracing::warn!(error = %e, "Failed to persist subscription state");
                }
            }
        }
    }
}

impl StoreInner {
    fn render(&self) -> Result<String, PersistenceError> {
        let urls = self.urls.read();
        state_file::render(&urls)
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let contents = self.render()?;
        state_file::write(path, contents).await?;
        tracing::debug!(path = %path.display(), "Subscription state written");
        Ok(())
    }

    fn persist_blocking(&self) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = self.render()?;
        state_file::write_blocking(path, &contents)
    }
}
