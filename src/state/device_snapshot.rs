// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical device snapshot.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::event::{DeviceId, MediaPayload};

use super::fingerprint;

/// High level status of a device.
///
/// Devices start out [`Connecting`](Self::Connecting), become
/// [`Idle`](Self::Idle) once the control channel is up, and otherwise carry
/// the player state string last reported by the media namespace.
/// Serialized as a bare string (`"CONNECTING"`, `"IDLE"`, `"PLAYING"`...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    /// Discovered, control channel not yet established.
    #[default]
    Connecting,
    /// Connected with nothing playing.
    Idle,
    /// Player state reported by the device.
    Player(String),
}

impl DeviceStatus {
    /// Returns the wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Idle => "IDLE",
            Self::Player(state) => state,
        }
    }

    /// Builds a status from a player state string.
    ///
    /// `IDLE` and `CONNECTING` map onto the dedicated variants so the same
    /// logical status always compares equal.
    #[must_use]
    pub fn from_player_state(state: &str) -> Self {
        match state {
            "IDLE" => Self::Idle,
            "CONNECTING" => Self::Connecting,
            other => Self::Player(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_player_state(&s))
    }
}

/// The receiver application currently running on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Display name of the application.
    pub name: String,
    /// Application identifier.
    pub id: String,
}

impl AppInfo {
    /// Creates application info.
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Media currently loaded in the running application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Title of the item.
    pub title: String,
    /// Subtitle of the item.
    pub subtitle: String,
    /// First artwork URL, empty if none.
    pub image: String,
    /// Player state at the time the metadata was received.
    pub state: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Playback position in seconds.
    pub current_time: f64,
}

impl MediaInfo {
    /// Builds media info from a media status payload.
    #[must_use]
    pub fn from_payload(payload: &MediaPayload, player_state: &str, current_time: f64) -> Self {
        Self {
            title: payload.title.clone(),
            subtitle: payload.subtitle.clone(),
            image: payload.images.first().cloned().unwrap_or_default(),
            state: player_state.to_string(),
            duration: payload.duration,
            current_time,
        }
    }
}

/// Current known state of one cast device.
///
/// Identity fields (`name`, `uuid`, `ip`) are fixed at discovery time; the
/// rest is driven by control channel events. The change fingerprint is kept
/// alongside but never serialized.
///
/// # Examples
///
/// ```
/// use castwatch_lib::event::DeviceId;
/// use castwatch_lib::state::{DeviceSnapshot, DeviceStatus};
///
/// let snapshot = DeviceSnapshot::new(
///     "Living Room TV",
///     DeviceId::new("5d1c4a0e-2f7b-4c55-8d0e-9b3a6f12c7aa"),
///     "192.168.1.40".parse().unwrap(),
/// );
/// assert_eq!(snapshot.status, DeviceStatus::Connecting);
/// assert!(snapshot.app.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Friendly name of the device.
    pub name: String,
    /// Device identity.
    pub uuid: DeviceId,
    /// Network address of the device.
    pub ip: IpAddr,
    /// Running application, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppInfo>,
    /// Current status.
    pub status: DeviceStatus,
    /// Volume as an integer percentage.
    pub volume: i32,
    /// Whether the device is muted.
    pub muted: bool,
    /// Loaded media, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    /// Whether the display is in standby.
    pub idle: bool,
    /// Whether the device is the active input.
    pub active: bool,
    #[serde(skip)]
    fingerprint: u32,
}

impl DeviceSnapshot {
    /// Creates a snapshot for a freshly discovered device.
    ///
    /// The status is `CONNECTING` and the fingerprint is computed right away
    /// so the first real event is compared against a known baseline.
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: DeviceId, ip: IpAddr) -> Self {
        let mut snapshot = Self {
            name: name.into(),
            uuid,
            ip,
            app: None,
            status: DeviceStatus::Connecting,
            volume: 0,
            muted: false,
            media: None,
            idle: false,
            active: false,
            fingerprint: 0,
        };
        snapshot.fingerprint = snapshot.compute_fingerprint();
        snapshot
    }

    /// Returns the stored fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Computes the fingerprint of the current visible fields.
    #[must_use]
    pub fn compute_fingerprint(&self) -> u32 {
        fingerprint::of(self)
    }

    /// Recomputes the fingerprint and stores it if it changed.
    ///
    /// Returns `true` when the visible state differs from the last stored
    /// fingerprint, i.e. when subscribers should be notified.
    pub fn refresh_fingerprint(&mut self) -> bool {
        let current = self.compute_fingerprint();
        if current == self.fingerprint {
            return false;
        }
        self.fingerprint = current;
        true
    }

    /// Clears the running application and its media.
    pub fn clear_app(&mut self) {
        self.app = None;
        self.media = None;
    }
}
