// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk format of the subscription state.
//!
//! The file is a TOML document with a single `[callbacks]` table. Each key
//! is a device identity and each value holds that device's webhook URLs
//! joined by `;`:
//!
//! ```toml
//! [callbacks]
//! "8f2a61d4-7c1e-4b8e-9a39-1f0c2d7e5b11" = "http://hooks.local/a;http://hooks.local/b"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::event::DeviceId;

/// Separator between URLs of one device.
pub const URL_SEPARATOR: char = ';';

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    callbacks: BTreeMap<String, String>,
}

/// Parses the contents of a state file.
///
/// Empty URL segments are dropped and duplicates collapse onto their first
/// occurrence.
///
/// # Errors
///
/// Returns an error if the contents are not valid TOML of the expected shape.
pub fn parse(contents: &str) -> Result<HashMap<DeviceId, Vec<String>>, PersistenceError> {
    let document: StateDocument = toml::from_str(contents)?;

    Ok(document
        .callbacks
        .into_iter()
        .map(|(id, joined)| {
            let mut urls: Vec<String> = Vec::new();
            for url in joined.split(URL_SEPARATOR).map(str::trim) {
                if !url.is_empty() && !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
            (DeviceId::new(id), urls)
        })
        .collect())
}

/// Renders the full subscription map as a state file.
///
/// Devices without URLs are left out. Keys are written in identity order so
/// the output is stable.
///
/// # Errors
///
/// Returns an error if the document cannot be encoded.
pub fn render(urls: &HashMap<DeviceId, Vec<String>>) -> Result<String, PersistenceError> {
    let callbacks = urls
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(id, list)| (id.to_string(), list.join(&URL_SEPARATOR.to_string())))
        .collect();

    Ok(toml::to_string(&StateDocument { callbacks })?)
}

/// Reads and parses a state file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read(path: &Path) -> Result<HashMap<DeviceId, Vec<String>>, PersistenceError> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

/// Writes a rendered state file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write(path: &Path, contents: String) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

/// Blocking variant of [`write`], used at startup and outside a runtime.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_blocking(path: &Path, contents: &str) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
