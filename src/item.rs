// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 dynamodb-lock-client contributors
//
// This file is part of dynamodb-lock-client.
//
// dynamodb-lock-client is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// dynamodb-lock-client is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with dynamodb-lock-client. If not, see <https://www.gnu.org/licenses/>.

//! Lock item data model and record codec.
//!
//! ## Purpose
//! A [`LockItem`] describes one lock's observed or held state. While held it
//! is owned exclusively by the client instance that created it; heartbeats
//! mutate it in place (fresh RVN, advanced renewal timestamp) behind an
//! interior mutex so the per-lock watcher task can recompute danger-zone
//! thresholds from live state.
//!
//! ## Expiry model
//! Expiry is measured against the *local monotonic* clock: a lock is expired
//! iff `last_renewed.elapsed() >= lease_duration`. Nothing in the protocol
//! compares wall clocks across processes; correctness comes from the store's
//! conditional-write atomicity.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{LockError, LockResult};
use crate::monitor::SessionMonitor;
use crate::store::{LockKey, Record};

/// Record attribute holding the owner name.
pub const ATTR_OWNER_NAME: &str = "ownerName";
/// Record attribute holding the lease duration in milliseconds.
pub const ATTR_LEASE_DURATION: &str = "leaseDuration";
/// Record attribute holding the record version number (fencing token).
pub const ATTR_RECORD_VERSION_NUMBER: &str = "recordVersionNumber";
/// Record attribute flagging a released-but-present record.
pub const ATTR_IS_RELEASED: &str = "isReleased";
/// Record attribute holding the opaque payload.
pub const ATTR_DATA: &str = "data";

/// Stored value of the released flag when set.
pub const IS_RELEASED_VALUE: &str = "1";

/// Attribute names owned by the engine; callers may not supply these as
/// additional attributes.
pub const RESERVED_ATTRIBUTES: [&str; 5] = [
    ATTR_OWNER_NAME,
    ATTR_LEASE_DURATION,
    ATTR_RECORD_VERSION_NUMBER,
    ATTR_IS_RELEASED,
    ATTR_DATA,
];

/// Mutable per-lock state, updated by acquisition and heartbeats.
struct LockState {
    /// Empty string marks an inert handle that cannot heartbeat or release
    record_version_number: String,
    lease_duration: Duration,
    last_renewed: Instant,
    data: Option<Vec<u8>>,
    is_released: bool,
}

/// How a renewal changes the stored payload.
pub(crate) enum DataAction {
    Keep,
    Replace(Vec<u8>),
    Remove,
}

/// One lock's observed or held state.
///
/// Returned by `acquire_lock` (held, heartbeatable) and by lookups/listings
/// (read-only views). Handles from a pure lookup carry an empty RVN so a
/// later heartbeat or release through them deterministically fails instead of
/// mutating a record this client does not hold.
pub struct LockItem {
    key: LockKey,
    owner_name: String,
    delete_on_release: bool,
    additional_attributes: HashMap<String, AttributeValue>,
    session_monitor: Option<SessionMonitor>,
    state: Mutex<LockState>,
}

impl LockItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: LockKey,
        owner_name: String,
        record_version_number: String,
        lease_duration: Duration,
        data: Option<Vec<u8>>,
        delete_on_release: bool,
        additional_attributes: HashMap<String, AttributeValue>,
        session_monitor: Option<SessionMonitor>,
    ) -> Self {
        Self {
            key,
            owner_name,
            delete_on_release,
            additional_attributes,
            session_monitor,
            state: Mutex::new(LockState {
                record_version_number,
                lease_duration,
                last_renewed: Instant::now(),
                data,
                is_released: false,
            }),
        }
    }

    /// Build a read-only item from a decoded store record. `keep_rvn` is
    /// false for pure lookups, which must not hand out a usable fencing token.
    pub(crate) fn from_record(key: LockKey, decoded: DecodedRecord, keep_rvn: bool) -> Self {
        let rvn = if keep_rvn {
            decoded.record_version_number
        } else {
            String::new()
        };
        Self {
            key,
            owner_name: decoded.owner_name,
            delete_on_release: false,
            additional_attributes: decoded.additional_attributes,
            session_monitor: None,
            state: Mutex::new(LockState {
                record_version_number: rvn,
                lease_duration: decoded.lease_duration,
                last_renewed: Instant::now(),
                data: decoded.data,
                is_released: decoded.is_released,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        // Recover from poisoning; the state is a plain value snapshot.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn partition_key(&self) -> &str {
        &self.key.partition_key
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.key.sort_key.as_deref()
    }

    pub(crate) fn lock_key(&self) -> &LockKey {
        &self.key
    }

    /// Registry key: `partition_key#sort_key`.
    pub fn unique_key(&self) -> String {
        self.key.unique_key()
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn delete_on_release(&self) -> bool {
        self.delete_on_release
    }

    pub fn additional_attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.additional_attributes
    }

    /// Current fencing token. Opaque; compare only for equality. Empty on
    /// inert handles from pure lookups.
    pub fn record_version_number(&self) -> String {
        self.state().record_version_number.clone()
    }

    pub fn lease_duration(&self) -> Duration {
        self.state().lease_duration
    }

    pub fn data(&self) -> Option<Vec<u8>> {
        self.state().data.clone()
    }

    pub fn is_released(&self) -> bool {
        self.state().is_released
    }

    /// Whether the lease has elapsed without renewal, per the local
    /// monotonic clock.
    pub fn is_expired(&self) -> bool {
        let state = self.state();
        state.last_renewed.elapsed() >= state.lease_duration
    }

    pub(crate) fn session_monitor(&self) -> Option<&SessionMonitor> {
        self.session_monitor.as_ref()
    }

    pub(crate) fn take_monitor_callback(&self) -> Option<Box<dyn FnOnce() + Send + Sync>> {
        self.session_monitor
            .as_ref()
            .and_then(|monitor| monitor.take_callback())
    }

    /// Milliseconds until the danger zone starts; negative once inside it.
    ///
    /// Recomputed on demand from live renewal state, so ongoing heartbeats
    /// keep pushing the threshold out. Fails with a configuration error when
    /// no session monitor is attached.
    pub fn amount_of_time_left_in_danger_zone(&self) -> LockResult<i64> {
        let monitor = self.session_monitor.as_ref().ok_or_else(|| {
            LockError::ConfigError("no session monitor attached to this lock".to_string())
        })?;
        let (last_renewed, lease) = {
            let state = self.state();
            (state.last_renewed, state.lease_duration)
        };
        let danger_at = last_renewed + lease.saturating_sub(monitor.safe_time());
        let now = Instant::now();
        let millis = if danger_at >= now {
            danger_at.duration_since(now).as_millis() as i64
        } else {
            -(now.duration_since(danger_at).as_millis() as i64)
        };
        Ok(millis)
    }

    /// Whether the lock is within `safe_time` of lease expiry.
    pub fn is_in_danger_zone(&self) -> LockResult<bool> {
        Ok(self.amount_of_time_left_in_danger_zone()? <= 0)
    }

    /// Apply a successful renewal: fresh RVN, reset lease, advanced renewal
    /// timestamp, payload per `action`.
    pub(crate) fn update_after_renewal(
        &self,
        record_version_number: String,
        lease_duration: Duration,
        action: DataAction,
    ) {
        let mut state = self.state();
        state.record_version_number = record_version_number;
        state.lease_duration = lease_duration;
        state.last_renewed = Instant::now();
        match action {
            DataAction::Keep => {}
            DataAction::Replace(data) => state.data = Some(data),
            DataAction::Remove => state.data = None,
        }
    }

    /// Advance the local renewal timestamp without a remote write. Used only
    /// by the hold-lock-on-service-unavailable policy.
    pub(crate) fn touch_renewal(&self, lease_duration: Duration) {
        let mut state = self.state();
        state.lease_duration = lease_duration;
        state.last_renewed = Instant::now();
    }

    pub(crate) fn mark_released(&self) {
        self.state().is_released = true;
    }
}

impl fmt::Debug for LockItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("LockItem")
            .field("partition_key", &self.key.partition_key)
            .field("sort_key", &self.key.sort_key)
            .field("owner_name", &self.owner_name)
            .field("record_version_number", &state.record_version_number)
            .field("lease_duration", &state.lease_duration)
            .field("is_released", &state.is_released)
            .finish()
    }
}

/// Engine-owned fields decoded from one store record.
#[derive(Debug)]
pub(crate) struct DecodedRecord {
    pub owner_name: String,
    pub lease_duration: Duration,
    pub record_version_number: String,
    pub is_released: bool,
    pub data: Option<Vec<u8>>,
    pub additional_attributes: HashMap<String, AttributeValue>,
}

/// Decode the engine-owned attributes of a record; everything else is kept
/// opaque in `additional_attributes`.
pub(crate) fn decode_record(record: &Record) -> LockResult<DecodedRecord> {
    let owner_name = record
        .get(ATTR_OWNER_NAME)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| {
            LockError::Store(crate::store::StoreError::Internal(format!(
                "lock record missing {} attribute",
                ATTR_OWNER_NAME
            )))
        })?
        .to_string();

    let lease_millis = record
        .get(ATTR_LEASE_DURATION)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            LockError::Store(crate::store::StoreError::Internal(format!(
                "lock record missing or invalid {} attribute",
                ATTR_LEASE_DURATION
            )))
        })?;

    let record_version_number = record
        .get(ATTR_RECORD_VERSION_NUMBER)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| {
            LockError::Store(crate::store::StoreError::Internal(format!(
                "lock record missing {} attribute",
                ATTR_RECORD_VERSION_NUMBER
            )))
        })?
        .to_string();

    let is_released = record
        .get(ATTR_IS_RELEASED)
        .and_then(|v| v.as_s().ok())
        .map(|s| s == IS_RELEASED_VALUE)
        .unwrap_or(false);

    let data = record
        .get(ATTR_DATA)
        .and_then(|v| v.as_b().ok())
        .map(|blob| blob.as_ref().to_vec());

    let additional_attributes = record
        .iter()
        .filter(|(name, _)| !RESERVED_ATTRIBUTES.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok(DecodedRecord {
        owner_name,
        lease_duration: Duration::from_millis(lease_millis),
        record_version_number,
        is_released,
        data,
        additional_attributes,
    })
}

/// Build the engine-owned attribute set for an acquire or renewal write.
/// The released flag is intentionally absent: writing these attributes makes
/// the record held.
pub(crate) fn lock_attributes(
    owner_name: &str,
    record_version_number: &str,
    lease_duration: Duration,
    data: Option<&[u8]>,
) -> Record {
    let mut attrs = HashMap::new();
    attrs.insert(
        ATTR_OWNER_NAME.to_string(),
        AttributeValue::S(owner_name.to_string()),
    );
    attrs.insert(
        ATTR_LEASE_DURATION.to_string(),
        AttributeValue::N(lease_duration.as_millis().to_string()),
    );
    attrs.insert(
        ATTR_RECORD_VERSION_NUMBER.to_string(),
        AttributeValue::S(record_version_number.to_string()),
    );
    if let Some(data) = data {
        attrs.insert(
            ATTR_DATA.to_string(),
            AttributeValue::B(aws_sdk_dynamodb::primitives::Blob::new(data.to_vec())),
        );
    }
    attrs
}
