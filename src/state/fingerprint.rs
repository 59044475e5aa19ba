// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change detection fingerprints.
//!
//! A fingerprint is the 32-bit FNV-1a hash of a snapshot's canonical JSON
//! encoding. Field order in the encoding follows the struct definition, so
//! two snapshots with the same visible fields always hash the same no matter
//! in which order the fields were filled in. The fingerprint itself is
//! skipped by the encoding.

use super::DeviceSnapshot;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes the fingerprint of a snapshot's visible fields.
#[must_use]
pub fn of(snapshot: &DeviceSnapshot) -> u32 {
    let bytes = match serde_json::to_vec(snapshot) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(device_id = %snapshot.uuid, error = %e, "Cannot encode snapshot");
            Vec::new()
        }
    };
    fnv1a_32(&bytes)
}

/// 32-bit FNV-1a.
#[must_use]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
