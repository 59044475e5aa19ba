// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol events reported by a cast device's control channel.

use serde::{Deserialize, Serialize};

/// Namespace carrying media playback status and commands.
pub const MEDIA_NAMESPACE: &str = "urn:x-cast:com.google.cast.media";

/// Namespace used to open a virtual connection to a running application.
pub const CONNECTION_NAMESPACE: &str = "urn:x-cast:com.google.cast.tp.connection";

/// A namespace advertised by a running receiver application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// The namespace URN.
    pub name: String,
}

impl Namespace {
    /// Creates a namespace from its URN.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Volume as reported by the device, with `level` in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume level as a fraction.
    pub level: f64,
    /// Whether the receiver is muted.
    pub muted: bool,
}

impl Volume {
    /// Creates a volume reading.
    #[must_use]
    pub fn new(level: f64, muted: bool) -> Self {
        Self { level, muted }
    }

    /// Returns the level as an integer percentage, rounded half away from zero.
    ///
    /// Values are not clamped: a device reporting `1.2` yields `120`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn percent(&self) -> i32 {
        (self.level * 100.0).round() as i32
    }
}

/// Media metadata carried by a media status message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Title of the current item.
    pub title: String,
    /// Subtitle (artist, channel, episode...).
    pub subtitle: String,
    /// Artwork URLs, best first.
    pub images: Vec<String>,
    /// Total duration in seconds.
    pub duration: f64,
}

/// An event emitted by the device control channel.
///
/// These mirror the messages of the cast receiver and media namespaces
/// that affect a device's observable state. Anything else the control
/// channel surfaces arrives as [`CastEvent::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CastEvent {
    /// The control channel is up.
    Connected,

    /// The control channel was lost; the device is gone until rediscovered.
    Disconnected,

    /// A receiver application started.
    AppStarted {
        /// Human readable application name.
        display_name: String,
        /// Application identifier.
        app_id: String,
        /// Namespaces the application supports.
        namespaces: Vec<Namespace>,
        /// Transport identifier used to address the application.
        transport_id: String,
    },

    /// The running receiver application stopped.
    AppStopped {
        /// Namespaces the application had advertised.
        namespaces: Vec<Namespace>,
        /// Transport identifier of the stopped application.
        transport_id: String,
    },

    /// Media status update from the media namespace.
    Media {
        /// Player state string, e.g. `PLAYING`, `PAUSED`, `BUFFERING`.
        player_state: String,
        /// Stream volume.
        volume: Volume,
        /// Metadata of the loaded item, if any.
        media: Option<MediaPayload>,
        /// Playback position in seconds.
        current_time: f64,
    },

    /// Receiver-level status update.
    ReceiverStatus {
        /// Receiver volume.
        volume: Volume,
        /// Whether the display is in standby.
        is_stand_by: bool,
        /// Whether the receiver is the active input.
        is_active_input: bool,
    },

    /// An event the reducer does not interpret.
    Unrecognized(String),
}

impl CastEvent {
    /// Returns a short name of the event kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::AppStarted { .. } => "app_started",
            Self::AppStopped { .. } => "app_stopped",
            Self::Media { .. } => "media",
            Self::ReceiverStatus { .. } => "receiver_status",
            Self::Unrecognized(_) => "unrecognized",
        }
    }

    /// Returns `true` if the event ends the device session.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Creates an app started event.
    #[must_use]
    pub fn app_started(
        display_name: impl Into<String>,
        app_id: impl Into<String>,
        namespaces: &[&str],
        transport_id: impl Into<String>,
    ) -> Self {
        Self::AppStarted {
            display_name: display_name.into(),
            app_id: app_id.into(),
            namespaces: namespaces.iter().map(|n| Namespace::new(*n)).collect(),
            transport_id: transport_id.into(),
        }
    }

    /// Creates an app stopped event.
    #[must_use]
    pub fn app_stopped(namespaces: &[&str], transport_id: impl Into<String>) -> Self {
        Self::AppStopped {
            namespaces: namespaces.iter().map(|n| Namespace::new(*n)).collect(),
            transport_id: transport_id.into(),
        }
    }

    /// Returns `true` if this is an app start advertising the media namespace.
    #[must_use]
    pub fn has_media_namespace(&self) -> bool {
        match self {
            Self::AppStarted { namespaces, .. } => {
                namespaces.iter().any(|n| n.name == MEDIA_NAMESPACE)
            }
            _ => false,
        }
    }
}
