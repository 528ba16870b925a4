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

//! Lock client: acquisition engine, release engine, registries, shutdown.
//!
//! ## Purpose
//! `DynamoDbLockClient` is the per-process entry point. It owns the two
//! process-wide registries (active locks and session-monitor watchers),
//! drives the polling acquisition state machine, renews leases (directly or
//! through the background heartbeat loop), and releases locks with
//! conditioned writes.
//!
//! ## Concurrency
//! - Acquisition of distinct keys runs on caller tasks, unserialized.
//! - Heartbeat and release share one client-wide critical section.
//! - Registries are `RwLock<HashMap>` maps; acquisition inserts are not
//!   covered by the heartbeat/release critical section, so all paths go
//!   through the map locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use ulid::Ulid;

use crate::error::{LockError, LockResult};
use crate::heartbeat;
use crate::item::{
    decode_record, lock_attributes, DataAction, LockItem, ATTR_DATA, ATTR_IS_RELEASED,
    IS_RELEASED_VALUE, RESERVED_ATTRIBUTES,
};
use crate::monitor::{self, SessionMonitor};
use crate::options::{
    AcquireLockOptions, LockClientOptions, ReleaseLockOptions, SendHeartbeatOptions,
};
use crate::scan::LockScan;
use crate::store::{LockKey, LockStore, StoreError, UpdateExpr, WriteCondition};

/// Base wait buffer added to every acquisition's wait budget.
const DEFAULT_WAIT_BUFFER: Duration = Duration::from_secs(1);

/// The record being contested by an acquisition attempt: the held lock as
/// first observed, with its own lease measured from the first sighting.
struct Candidate {
    record_version_number: String,
    lease_duration: Duration,
    first_seen: Instant,
}

impl Candidate {
    fn is_expired(&self) -> bool {
        self.first_seen.elapsed() >= self.lease_duration
    }
}

/// Lease-based distributed lock client over a conditional-write item store.
///
/// Cheap to clone; clones share the registries and the background heartbeat
/// task. Construction with `create_heartbeat_background_task` must happen
/// inside a tokio runtime.
///
/// ## Example
/// ```rust,no_run
/// use dynamodb_lock_client::{
///     AcquireLockOptions, DynamoDbLockClient, LockClientOptions, MemoryLockStore,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryLockStore::new());
/// let client = DynamoDbLockClient::new(store, LockClientOptions::new("node-1"))?;
///
/// let lock = client
///     .acquire_lock(AcquireLockOptions::new("orders-importer"))
///     .await?;
/// // ... exclusive work ...
/// client.release_lock(&lock, Default::default()).await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DynamoDbLockClient {
    store: Arc<dyn LockStore>,
    owner_name: String,
    lease_duration: Duration,
    heartbeat_period: Duration,
    hold_lock_on_service_unavailable: bool,
    /// Active locks owned by this client instance, keyed by unique key
    locks: Arc<RwLock<HashMap<String, Arc<LockItem>>>>,
    /// Running session-monitor watcher tasks, keyed by unique key
    watchers: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
    /// Client-wide critical section serializing heartbeat and release
    sweep_lock: Arc<Mutex<()>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    heartbeat_handle: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for DynamoDbLockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbLockClient")
            .field("owner_name", &self.owner_name)
            .field("lease_duration", &self.lease_duration)
            .field("heartbeat_period", &self.heartbeat_period)
            .finish()
    }
}

impl DynamoDbLockClient {
    /// Create a client over `store`.
    ///
    /// Fails with a configuration error unless
    /// `lease_duration >= 2 * heartbeat_period`; a heartbeat period at or
    /// above half the lease cannot keep a lock alive reliably.
    pub fn new(store: Arc<dyn LockStore>, options: LockClientOptions) -> LockResult<Self> {
        if options.owner_name.is_empty() {
            return Err(LockError::ConfigError(
                "owner_name must not be empty".to_string(),
            ));
        }
        if options.lease_duration < options.heartbeat_period * 2 {
            return Err(LockError::ConfigError(format!(
                "lease_duration ({:?}) must be at least twice heartbeat_period ({:?})",
                options.lease_duration, options.heartbeat_period
            )));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let client = Self {
            store,
            owner_name: options.owner_name,
            lease_duration: options.lease_duration,
            heartbeat_period: options.heartbeat_period,
            hold_lock_on_service_unavailable: options.hold_lock_on_service_unavailable,
            locks: Arc::new(RwLock::new(HashMap::new())),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            sweep_lock: Arc::new(Mutex::new(())),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            heartbeat_handle: Arc::new(StdMutex::new(None)),
        };

        if options.create_heartbeat_background_task {
            let handle = heartbeat::spawn_heartbeat_loop(client.clone());
            *client
                .heartbeat_handle
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(handle);
        }

        Ok(client)
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    pub(crate) fn heartbeat_period(&self) -> Duration {
        self.heartbeat_period
    }

    pub(crate) fn is_stopping(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    pub(crate) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Snapshot of the locks this client currently tracks as held.
    pub async fn held_locks(&self) -> Vec<Arc<LockItem>> {
        self.locks.read().await.values().cloned().collect()
    }

    /// Fail with [`LockError::TableMissing`] if the lock table does not exist.
    pub async fn assert_lock_table_exists(&self) -> LockResult<()> {
        self.store.assert_table_exists().await.map_err(LockError::from)
    }

    /// Acquire the lock for `options.partition_key` (+ optional sort key),
    /// waiting out an existing holder's lease when necessary.
    ///
    /// Blocks (asynchronously) for at most the wait budget: a 1s base buffer
    /// plus `additional_time_to_wait`, extended once by the full lease
    /// duration of the first held record observed, so a stale lock is never
    /// stolen before one full lease period has passed.
    #[instrument(skip(self, options), fields(partition_key = %options.partition_key, owner = %self.owner_name))]
    pub async fn acquire_lock(&self, mut options: AcquireLockOptions) -> LockResult<Arc<LockItem>> {
        let started = Instant::now();

        for name in options.additional_attributes.keys() {
            if RESERVED_ATTRIBUTES.contains(&name.as_str()) {
                return Err(LockError::ConfigError(format!(
                    "additional attribute {name:?} collides with a reserved lock attribute"
                )));
            }
        }

        let mut session_monitor = match options.session_monitor.take() {
            Some(spec) => {
                let safe = spec.safe_time_without_heartbeat;
                if safe <= self.heartbeat_period || safe >= self.lease_duration {
                    return Err(LockError::ConfigError(format!(
                        "safe_time_without_heartbeat ({safe:?}) must lie strictly between \
                         heartbeat_period ({:?}) and lease_duration ({:?})",
                        self.heartbeat_period, self.lease_duration
                    )));
                }
                Some(SessionMonitor::new(safe, spec.callback))
            }
            None => None,
        };

        let key = LockKey::new(options.partition_key.clone(), options.sort_key.clone());
        let mut wait_budget = DEFAULT_WAIT_BUFFER + options.additional_time_to_wait;
        let mut candidate: Option<Candidate> = None;
        let mut lease_added = false;

        loop {
            match self.store.get(&key).await {
                Ok(None) if options.acquire_only_if_already_exists => {
                    debug!(lock = %key.unique_key(), "lock record does not exist yet; retrying");
                }
                Ok(None) => {
                    if let Some(item) = self
                        .try_write_acquire(
                            &key,
                            &options,
                            options.data.clone(),
                            WriteCondition::NotExists,
                            &mut session_monitor,
                        )
                        .await?
                    {
                        self.record_acquire(started, "success");
                        return Ok(item);
                    }
                }
                Ok(Some(record)) => {
                    let decoded = decode_record(&record)?;

                    if options.should_skip_blocking_wait && !decoded.is_released {
                        // Deliberately ignores the wait budget: the caller
                        // asked to never block on a held lock.
                        self.record_acquire(started, "unavailable");
                        return Err(LockError::LockCurrentlyUnavailable(format!(
                            "lock {} is currently held by {}",
                            key.unique_key(),
                            decoded.owner_name
                        )));
                    }

                    let new_data = if options.replace_data {
                        options.data.clone()
                    } else {
                        decoded.data.clone().or_else(|| options.data.clone())
                    };

                    if decoded.is_released {
                        let rvn = options
                            .acquire_released_locks_consistently
                            .then(|| decoded.record_version_number.clone());
                        if let Some(item) = self
                            .try_write_acquire(
                                &key,
                                &options,
                                new_data,
                                WriteCondition::ReleasedAndExists { rvn },
                                &mut session_monitor,
                            )
                            .await?
                        {
                            self.record_acquire(started, "success");
                            return Ok(item);
                        }
                    } else {
                        match &candidate {
                            None => {
                                // First sighting of a held record: extend the
                                // wait budget by its full lease, exactly once.
                                if !lease_added {
                                    wait_budget += decoded.lease_duration;
                                    lease_added = true;
                                }
                                debug!(
                                    lock = %key.unique_key(),
                                    holder = %decoded.owner_name,
                                    lease_ms = decoded.lease_duration.as_millis() as u64,
                                    "lock is held; waiting out its lease"
                                );
                                candidate = Some(Candidate {
                                    record_version_number: decoded.record_version_number,
                                    lease_duration: decoded.lease_duration,
                                    first_seen: Instant::now(),
                                });
                            }
                            Some(c) if c.record_version_number == decoded.record_version_number => {
                                if c.is_expired() {
                                    let rvn = c.record_version_number.clone();
                                    if let Some(item) = self
                                        .try_write_acquire(
                                            &key,
                                            &options,
                                            new_data,
                                            WriteCondition::RvnMatches { rvn },
                                            &mut session_monitor,
                                        )
                                        .await?
                                    {
                                        self.record_acquire(started, "takeover");
                                        return Ok(item);
                                    }
                                }
                            }
                            Some(_) => {
                                // Renewed since first observed; start the
                                // lease clock over on the fresh record.
                                candidate = Some(Candidate {
                                    record_version_number: decoded.record_version_number,
                                    lease_duration: decoded.lease_duration,
                                    first_seen: Instant::now(),
                                });
                            }
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(lock = %key.unique_key(), error = %e, "transient store error while acquiring");
                }
                Err(StoreError::TableMissing(msg)) => return Err(LockError::TableMissing(msg)),
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() > wait_budget {
                self.record_acquire(started, "not_granted");
                return Err(LockError::LockNotGranted(format!(
                    "could not acquire lock {} within {:?}",
                    key.unique_key(),
                    wait_budget
                )));
            }
            tokio::time::sleep(options.refresh_period).await;
        }
    }

    /// Non-blocking flavor of [`acquire_lock`](Self::acquire_lock): an empty
    /// result where `acquire_lock` would fail with not-granted or
    /// currently-unavailable.
    pub async fn try_acquire_lock(
        &self,
        options: AcquireLockOptions,
    ) -> LockResult<Option<Arc<LockItem>>> {
        match self.acquire_lock(options).await {
            Ok(item) => Ok(Some(item)),
            Err(LockError::LockNotGranted(_)) | Err(LockError::LockCurrentlyUnavailable(_)) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Issue the conditioned acquire write and, on success, register the new
    /// lock item. `Ok(None)` means the write lost a race or hit a transient
    /// failure and the acquisition loop should keep polling.
    async fn try_write_acquire(
        &self,
        key: &LockKey,
        options: &AcquireLockOptions,
        data: Option<Vec<u8>>,
        condition: WriteCondition,
        session_monitor: &mut Option<SessionMonitor>,
    ) -> LockResult<Option<Arc<LockItem>>> {
        let rvn = Ulid::new().to_string();
        let result = if options.update_existing_lock_record {
            let mut set = lock_attributes(&self.owner_name, &rvn, self.lease_duration, data.as_deref());
            for (name, value) in &options.additional_attributes {
                set.insert(name.clone(), value.clone());
            }
            let mut remove = vec![ATTR_IS_RELEASED.to_string()];
            if data.is_none() {
                remove.push(ATTR_DATA.to_string());
            }
            self.store.update(key, UpdateExpr { set, remove }, condition).await
        } else {
            let mut record =
                lock_attributes(&self.owner_name, &rvn, self.lease_duration, data.as_deref());
            for (name, value) in &options.additional_attributes {
                record.insert(name.clone(), value.clone());
            }
            self.store.put(key, record, condition).await
        };

        match result {
            Ok(()) => {
                let item = Arc::new(LockItem::new(
                    key.clone(),
                    self.owner_name.clone(),
                    rvn,
                    self.lease_duration,
                    data,
                    options.delete_lock_on_release,
                    options.additional_attributes.clone(),
                    session_monitor.take(),
                ));
                self.register_lock(item.clone()).await;
                debug!(
                    lock = %key.unique_key(),
                    rvn = %item.record_version_number(),
                    "lock acquired"
                );
                Ok(Some(item))
            }
            Err(StoreError::ConditionFailed) => {
                debug!(lock = %key.unique_key(), "lost acquisition race; retrying");
                Ok(None)
            }
            Err(e) if e.is_transient() => {
                warn!(lock = %key.unique_key(), error = %e, "transient store error on acquire write");
                Ok(None)
            }
            Err(StoreError::TableMissing(msg)) => Err(LockError::TableMissing(msg)),
            Err(e) => Err(e.into()),
        }
    }

    async fn register_lock(&self, item: Arc<LockItem>) {
        let unique_key = item.unique_key();
        self.locks.write().await.insert(unique_key.clone(), item.clone());
        let arm_watcher = item
            .session_monitor()
            .map(|m| m.has_callback())
            .unwrap_or(false);
        if arm_watcher {
            let handle = monitor::spawn_watcher(item, self.watchers.clone());
            if let Some(stale) = self.watchers.write().await.insert(unique_key, handle) {
                stale.abort();
            }
        }
    }

    /// Renew one held lock: conditioned update requiring unchanged owner and
    /// RVN, writing a fresh RVN and a reset lease.
    ///
    /// On a condition failure the lease had lapsed and someone took over; the
    /// lock is evicted from the registry and [`LockError::OwnershipLost`] is
    /// returned. With `hold_lock_on_service_unavailable`, an unavailability
    /// failure instead advances the local renewal timestamp optimistically.
    #[instrument(skip(self, item, options), fields(lock = %item.unique_key(), owner = %self.owner_name))]
    pub async fn send_heartbeat(
        &self,
        item: &LockItem,
        options: SendHeartbeatOptions,
    ) -> LockResult<()> {
        if options.delete_data && options.data.is_some() {
            return Err(LockError::ConfigError(
                "cannot both replace and delete lock data in one heartbeat".to_string(),
            ));
        }
        let lease = options.lease_duration_to_ensure.unwrap_or(self.lease_duration);
        let unique_key = item.unique_key();

        let _guard = self.sweep_lock.lock().await;

        if item.owner_name() != self.owner_name {
            return Err(LockError::LockNotGranted(format!(
                "lock {unique_key} is not held by this client"
            )));
        }
        // Tokenless lookup/scan handles fail here without evicting the live
        // registry entry they may shadow.
        if item.record_version_number().is_empty() {
            return Err(LockError::LockNotGranted(format!(
                "lock {unique_key} handle carries no fencing token; cannot heartbeat"
            )));
        }
        if item.is_released() || item.is_expired() {
            self.locks.write().await.remove(&unique_key);
            return Err(LockError::LockNotGranted(format!(
                "lock {unique_key} is released or expired; cannot heartbeat"
            )));
        }

        let old_rvn = item.record_version_number();
        let new_rvn = Ulid::new().to_string();
        let mut update = UpdateExpr::default();
        update.set = lock_attributes(&self.owner_name, &new_rvn, lease, options.data.as_deref());
        if options.delete_data {
            update.remove.push(ATTR_DATA.to_string());
        } else if options.data.is_none() {
            // leave data untouched
            update.set.remove(ATTR_DATA);
        }
        let condition = WriteCondition::OwnedWithRvn {
            owner: self.owner_name.clone(),
            rvn: old_rvn,
        };

        match self.store.update(item.lock_key(), update, condition).await {
            Ok(()) => {
                let action = if options.delete_data {
                    DataAction::Remove
                } else if let Some(data) = options.data {
                    DataAction::Replace(data)
                } else {
                    DataAction::Keep
                };
                item.update_after_renewal(new_rvn, lease, action);
                metrics::counter!("lock_client_heartbeat_total", "result" => "success").increment(1);
                debug!(rvn = %item.record_version_number(), "lease renewed");
                Ok(())
            }
            Err(StoreError::ConditionFailed) => {
                self.locks.write().await.remove(&unique_key);
                metrics::counter!("lock_client_heartbeat_total", "result" => "ownership_lost")
                    .increment(1);
                Err(LockError::OwnershipLost(format!(
                    "lock {unique_key} was taken over after its lease lapsed"
                )))
            }
            Err(StoreError::Unavailable(msg)) if self.hold_lock_on_service_unavailable => {
                // Availability over exclusivity: keep the lock alive locally
                // through the outage. Another client may still steal it once
                // the remote lease elapses.
                item.touch_renewal(lease);
                metrics::counter!("lock_client_heartbeat_total", "result" => "held_through_outage")
                    .increment(1);
                warn!(error = %msg, "store unavailable; holding lock on local renewal");
                Ok(())
            }
            Err(StoreError::TableMissing(msg)) => Err(LockError::TableMissing(msg)),
            Err(e) => {
                metrics::counter!("lock_client_heartbeat_total", "result" => "error").increment(1);
                Err(e.into())
            }
        }
    }

    /// Release a held lock.
    ///
    /// Returns `Ok(false)` without raising when the lock is not actually
    /// ours to release: the local handle is stale (foreign owner, cleared
    /// RVN) or someone else already took the record over. Local bookkeeping
    /// is cleared before the remote write so heartbeating stops regardless of
    /// the remote outcome.
    #[instrument(skip(self, item, options), fields(lock = %item.unique_key(), owner = %self.owner_name))]
    pub async fn release_lock(
        &self,
        item: &LockItem,
        options: ReleaseLockOptions,
    ) -> LockResult<bool> {
        if item.owner_name() != self.owner_name {
            return Ok(false);
        }
        // Tokenless handles from lookups and scans must not disturb local
        // bookkeeping for a lock this client actually holds.
        if item.record_version_number().is_empty() {
            return Ok(false);
        }
        let unique_key = item.unique_key();
        self.locks.write().await.remove(&unique_key);

        let delete = options.delete_lock.unwrap_or_else(|| item.delete_on_release());

        let result = {
            let _guard = self.sweep_lock.lock().await;
            // The RVN must be read inside the critical section: a concurrent
            // heartbeat sweep that already snapshotted this lock may renew it
            // first, rotating the token on the shared item. Reading earlier
            // would condition the release on a stale RVN and orphan the
            // record until its lease lapses.
            let condition = WriteCondition::OwnedWithRvn {
                owner: self.owner_name.clone(),
                rvn: item.record_version_number(),
            };
            if delete {
                self.store.delete(item.lock_key(), condition).await
            } else {
                let mut update = UpdateExpr::default();
                update.set.insert(
                    ATTR_IS_RELEASED.to_string(),
                    aws_sdk_dynamodb::types::AttributeValue::S(IS_RELEASED_VALUE.to_string()),
                );
                if let Some(data) = &options.data {
                    update.set.insert(
                        ATTR_DATA.to_string(),
                        aws_sdk_dynamodb::types::AttributeValue::B(
                            aws_sdk_dynamodb::primitives::Blob::new(data.clone()),
                        ),
                    );
                }
                self.store.update(item.lock_key(), update, condition).await
            }
        };

        match result {
            Ok(()) => {
                item.mark_released();
                self.cancel_watcher(&unique_key).await;
                metrics::counter!("lock_client_release_total", "result" => "released").increment(1);
                debug!(deleted = delete, "lock released");
                Ok(true)
            }
            Err(StoreError::ConditionFailed) => {
                self.cancel_watcher(&unique_key).await;
                metrics::counter!("lock_client_release_total", "result" => "already_taken")
                    .increment(1);
                Ok(false)
            }
            Err(e) if options.best_effort => {
                item.mark_released();
                self.cancel_watcher(&unique_key).await;
                metrics::counter!("lock_client_release_total", "result" => "best_effort")
                    .increment(1);
                warn!(error = %e, "best-effort release swallowed store error");
                Ok(true)
            }
            Err(StoreError::TableMissing(msg)) => Err(LockError::TableMissing(msg)),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a lock without acquiring it.
    ///
    /// Returns the live item when this client holds the lock. Otherwise a
    /// read-only handle is decoded from the store with its RVN cleared, so a
    /// heartbeat or release through it deterministically fails instead of
    /// corrupting an unheld lock.
    pub async fn get_lock(
        &self,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> LockResult<Option<Arc<LockItem>>> {
        let key = LockKey::new(partition_key, sort_key.map(str::to_string));
        if let Some(item) = self.locks.read().await.get(&key.unique_key()) {
            return Ok(Some(item.clone()));
        }
        match self.store.get(&key).await.map_err(LockError::from)? {
            Some(record) => {
                let decoded = decode_record(&record)?;
                Ok(Some(Arc::new(LockItem::from_record(key, decoded, false))))
            }
            None => Ok(None),
        }
    }

    /// Lazy paginated listing of every lock record in the store, including
    /// locks held by other clients and released records.
    pub fn scan_locks(&self, consistent: bool) -> LockScan {
        LockScan::new(self.store.clone(), consistent)
    }

    /// Shut the client down: best-effort release sweep over all tracked
    /// locks, then stop and join the heartbeat loop and any watchers.
    pub async fn close(&self) {
        let snapshot: Vec<Arc<LockItem>> = self.locks.read().await.values().cloned().collect();
        for item in snapshot {
            if let Err(e) = self.release_lock(&item, ReleaseLockOptions::best_effort()).await {
                warn!(lock = %item.unique_key(), error = %e, "release failed during shutdown sweep");
            }
        }

        let _ = self.shutdown_tx.send(true);
        let handle = self
            .heartbeat_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let watchers: Vec<JoinHandle<()>> = self
            .watchers
            .write()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in watchers {
            handle.abort();
            let _ = handle.await;
        }
        debug!(owner = %self.owner_name, "lock client closed");
    }

    async fn cancel_watcher(&self, unique_key: &str) {
        let handle = self.watchers.write().await.remove(unique_key);
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }

    fn record_acquire(&self, started: Instant, result: &'static str) {
        metrics::counter!("lock_client_acquire_total", "result" => result).increment(1);
        metrics::histogram!("lock_client_acquire_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }
}
