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

//! Option structs for client construction and per-call configuration.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::time::Duration;

/// Client-wide configuration, validated at construction.
pub struct LockClientOptions {
    /// Opaque identity of this holding process
    pub owner_name: String,
    /// Lease duration written on acquire and reset on every heartbeat
    pub lease_duration: Duration,
    /// Period of the background heartbeat sweep
    pub heartbeat_period: Duration,
    /// Spawn the background heartbeat task at construction
    pub create_heartbeat_background_task: bool,
    /// On a store-unavailability failure during heartbeat, advance the local
    /// renewal timestamp as if the write succeeded. An explicit
    /// availability-over-exclusivity tradeoff: the lock is held through the
    /// outage at the risk of another client stealing it once the lease
    /// elapses remotely.
    pub hold_lock_on_service_unavailable: bool,
}

impl LockClientOptions {
    pub fn new(owner_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            lease_duration: Duration::from_secs(20),
            heartbeat_period: Duration::from_secs(5),
            create_heartbeat_background_task: true,
            hold_lock_on_service_unavailable: false,
        }
    }
}

/// Expiry-warning monitor to attach to an acquired lock.
///
/// `safe_time_without_heartbeat` must lie strictly between the client's
/// heartbeat period and its lease duration; this is validated when the
/// acquire call attaches the monitor.
pub struct SessionMonitorSpec {
    pub safe_time_without_heartbeat: Duration,
    pub callback: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SessionMonitorSpec {
    pub fn new(safe_time_without_heartbeat: Duration) -> Self {
        Self {
            safe_time_without_heartbeat,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Options for one acquisition attempt.
pub struct AcquireLockOptions {
    pub partition_key: String,
    pub sort_key: Option<String>,
    /// Payload to store alongside the lock
    pub data: Option<Vec<u8>>,
    /// When false, an existing record's payload is carried over instead of
    /// being replaced (falling back to `data` if the record has none)
    pub replace_data: bool,
    /// Release policy recorded on the acquired item: delete the record vs.
    /// mark it released in place
    pub delete_lock_on_release: bool,
    /// Only acquire if a record for the key already exists
    pub acquire_only_if_already_exists: bool,
    /// Fail immediately with `LockCurrentlyUnavailable` when the lock is
    /// held and unexpired, instead of waiting out its lease
    pub should_skip_blocking_wait: bool,
    /// Write acquisitions as attribute updates rather than full puts,
    /// preserving foreign attributes already present on the record
    pub update_existing_lock_record: bool,
    /// When taking over a released record, additionally require its RVN to
    /// still match the just-read value. Defaults to off as a compatibility
    /// switch; turning it on closes a race where the released record changes
    /// between the read and the takeover write.
    pub acquire_released_locks_consistently: bool,
    /// Extra wait budget on top of the 1s base buffer
    pub additional_time_to_wait: Duration,
    /// Sleep between acquisition polling iterations
    pub refresh_period: Duration,
    /// Opaque extension attributes stored with the record, never interpreted
    /// by the engine. Reserved attribute names are rejected.
    pub additional_attributes: HashMap<String, AttributeValue>,
    /// Optional expiry-warning monitor to arm on success
    pub session_monitor: Option<SessionMonitorSpec>,
}

impl AcquireLockOptions {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            data: None,
            replace_data: true,
            delete_lock_on_release: true,
            acquire_only_if_already_exists: false,
            should_skip_blocking_wait: false,
            update_existing_lock_record: false,
            acquire_released_locks_consistently: false,
            additional_time_to_wait: Duration::ZERO,
            refresh_period: Duration::from_secs(1),
            additional_attributes: HashMap::new(),
            session_monitor: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_additional_time_to_wait(mut self, wait: Duration) -> Self {
        self.additional_time_to_wait = wait;
        self
    }

    pub fn with_refresh_period(mut self, refresh_period: Duration) -> Self {
        self.refresh_period = refresh_period;
        self
    }

    pub fn with_session_monitor(mut self, monitor: SessionMonitorSpec) -> Self {
        self.session_monitor = Some(monitor);
        self
    }
}

/// Options for one heartbeat renewal.
#[derive(Default)]
pub struct SendHeartbeatOptions {
    /// Replace the stored payload; `None` leaves it untouched
    pub data: Option<Vec<u8>>,
    /// Remove the stored payload. Incompatible with `data`.
    pub delete_data: bool,
    /// Override the lease duration written by this renewal
    pub lease_duration_to_ensure: Option<Duration>,
}

/// Options for releasing a held lock.
#[derive(Default)]
pub struct ReleaseLockOptions {
    /// Delete the record vs. mark it released; `None` follows the policy
    /// recorded on the item at acquire time
    pub delete_lock: Option<bool>,
    /// Tolerate store errors once local bookkeeping is cleared
    pub best_effort: bool,
    /// Final payload written by a mark-released release
    pub data: Option<Vec<u8>>,
}

impl ReleaseLockOptions {
    pub fn best_effort() -> Self {
        Self {
            best_effort: true,
            ..Self::default()
        }
    }
}
