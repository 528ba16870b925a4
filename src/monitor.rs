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

//! Session monitor: danger-zone timing and the per-lock watcher task.
//!
//! A monitored lock enters the *danger zone* `safe_time` before its lease
//! would expire. A watcher task sleeps until that threshold, recomputing it
//! from the lock's live renewal timestamp so ongoing heartbeats postpone
//! firing indefinitely. When the threshold is reached the optional callback
//! fires exactly once, on a separate execution context so it can never block
//! heartbeating or the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::item::LockItem;

type Callback = Box<dyn FnOnce() + Send + Sync>;

/// Monitor attached to a held lock: the safe time before lease expiry at
/// which the lock is considered in danger, plus an optional one-shot
/// callback.
pub struct SessionMonitor {
    safe_time: Duration,
    callback: Mutex<Option<Callback>>,
}

impl SessionMonitor {
    pub(crate) fn new(safe_time: Duration, callback: Option<Callback>) -> Self {
        Self {
            safe_time,
            callback: Mutex::new(callback),
        }
    }

    pub(crate) fn safe_time(&self) -> Duration {
        self.safe_time
    }

    pub(crate) fn has_callback(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Take the one-shot callback; subsequent calls return `None`.
    pub(crate) fn take_callback(&self) -> Option<Callback> {
        self.callback.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Spawn the watcher task for a monitored lock.
///
/// The watcher sleeps until the danger-zone threshold, then fires the
/// callback (if any) on a blocking-task context, removes itself from the
/// watcher registry, and exits. Aborting the task cancels it; an aborted
/// watcher never fires.
pub(crate) fn spawn_watcher(
    item: Arc<LockItem>,
    watchers: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
) -> JoinHandle<()> {
    let unique_key = item.unique_key();
    tokio::spawn(async move {
        loop {
            let remaining = match item.amount_of_time_left_in_danger_zone() {
                Ok(millis) => millis,
                // No monitor attached; nothing to watch.
                Err(_) => return,
            };
            if remaining <= 0 {
                debug!(lock = %unique_key, "lock entered danger zone");
                if let Some(callback) = item.take_monitor_callback() {
                    tokio::task::spawn_blocking(move || callback());
                }
                watchers.write().await.remove(&unique_key);
                return;
            }
            tokio::time::sleep(Duration::from_millis(remaining as u64)).await;
        }
    })
}
