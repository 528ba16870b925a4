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

//! Lock client integration tests against the in-memory store.
//!
//! ## Test Coverage
//! - Acquisition (free key, released record, expired lease takeover, races)
//! - Heartbeat renewal (RVN rotation, ownership loss, outage handling)
//! - Release (delete vs mark-released, stale handles, best effort)
//! - Session monitor danger-zone callbacks
//! - Scanning with pagination, lookup, shutdown sweep
//! - Configuration validation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dynamodb_lock_client::{
    AcquireLockOptions, DynamoDbLockClient, LockClientOptions, LockError, LockKey, LockStore,
    MemoryLockStore, Record, ReleaseLockOptions, ScanCursor, ScanPage, SendHeartbeatOptions,
    SessionMonitorSpec, StoreError, StoreResult, UpdateExpr, WriteCondition,
    ATTR_RECORD_VERSION_NUMBER,
};
use tokio::time::sleep;

fn client_options(owner: &str, lease_ms: u64, heartbeat_ms: u64) -> LockClientOptions {
    let mut options = LockClientOptions::new(owner);
    options.lease_duration = Duration::from_millis(lease_ms);
    options.heartbeat_period = Duration::from_millis(heartbeat_ms);
    options.create_heartbeat_background_task = false;
    options
}

fn fast_acquire(partition_key: &str) -> AcquireLockOptions {
    AcquireLockOptions::new(partition_key).with_refresh_period(Duration::from_millis(25))
}

#[tokio::test]
async fn acquire_and_release_roundtrip() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();

    let lock = client.acquire_lock(fast_acquire("resource")).await.unwrap();
    assert_eq!(lock.owner_name(), "alice");
    assert!(!lock.record_version_number().is_empty());
    assert!(!lock.is_expired());
    assert_eq!(client.held_locks().await.len(), 1);
    assert!(store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .is_some());

    let released = client.release_lock(&lock, Default::default()).await.unwrap();
    assert!(released);
    assert!(lock.is_released());
    assert!(client.held_locks().await.is_empty());
    // default release deletes the record
    assert!(store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn released_record_is_acquirable_without_waiting() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    let mut options = fast_acquire("resource");
    options.delete_lock_on_release = false;
    let lock = alice.acquire_lock(options).await.unwrap();
    assert!(alice.release_lock(&lock, Default::default()).await.unwrap());
    // record survives as a released marker
    assert!(store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .is_some());

    let started = Instant::now();
    let taken = bob.acquire_lock(fast_acquire("resource")).await.unwrap();
    assert_eq!(taken.owner_name(), "bob");
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "released lock should be granted without waiting out a lease"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_one_holder_under_contention() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    let mut a_opts = fast_acquire("contended");
    a_opts.should_skip_blocking_wait = true;
    let mut b_opts = fast_acquire("contended");
    b_opts.should_skip_blocking_wait = true;

    let a = tokio::spawn({
        let alice = alice.clone();
        async move { alice.acquire_lock(a_opts).await }
    });
    let b = tokio::spawn({
        let bob = bob.clone();
        async move { bob.acquire_lock(b_opts).await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one contender may win");
    for result in [a, b] {
        if let Err(e) = result {
            assert!(
                matches!(e, LockError::LockCurrentlyUnavailable(_)),
                "loser must see currently-unavailable, got {e}"
            );
        }
    }
}

#[tokio::test]
async fn skip_blocking_wait_fails_immediately_on_held_lock() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    alice.acquire_lock(fast_acquire("resource")).await.unwrap();

    let mut options = fast_acquire("resource");
    options.should_skip_blocking_wait = true;
    let started = Instant::now();
    let err = bob.acquire_lock(options).await.unwrap_err();
    assert!(matches!(err, LockError::LockCurrentlyUnavailable(_)));
    assert!(started.elapsed() < Duration::from_millis(300));

    // try_acquire_lock maps the same situation to an empty result
    let mut options = fast_acquire("resource");
    options.should_skip_blocking_wait = true;
    assert!(bob.try_acquire_lock(options).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_lease_is_taken_over_after_full_lease_wait() {
    let store = Arc::new(MemoryLockStore::new());
    let alice = DynamoDbLockClient::new(store.clone(), client_options("alice", 600, 200)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 600, 200)).unwrap();

    let stale = alice.acquire_lock(fast_acquire("resource")).await.unwrap();

    let started = Instant::now();
    let taken = bob.acquire_lock(fast_acquire("resource")).await.unwrap();
    assert_eq!(taken.owner_name(), "bob");
    assert!(
        started.elapsed() >= Duration::from_millis(550),
        "takeover must wait out the full lease observed on the record"
    );

    // the overtaken holder's lease has lapsed locally too: its next
    // heartbeat is refused and the lock is evicted from its registry
    assert!(stale.is_expired());
    let err = alice
        .send_heartbeat(&stale, SendHeartbeatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::LockNotGranted(_)));
    assert!(alice.held_locks().await.is_empty());
}

#[tokio::test]
async fn heartbeat_rotates_rvn_and_resets_lease() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 1000, 300)).unwrap();

    let lock = client.acquire_lock(fast_acquire("resource")).await.unwrap();
    let first_rvn = lock.record_version_number();

    sleep(Duration::from_millis(400)).await;
    client
        .send_heartbeat(&lock, SendHeartbeatOptions::default())
        .await
        .unwrap();

    let second_rvn = lock.record_version_number();
    assert_ne!(first_rvn, second_rvn);
    assert!(!lock.is_expired());

    let record = store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        record[ATTR_RECORD_VERSION_NUMBER].as_s().unwrap(),
        &second_rvn
    );
}

#[tokio::test]
async fn external_rvn_rotation_means_ownership_lost() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let lock = client.acquire_lock(fast_acquire("resource")).await.unwrap();

    // another process rotates the RVN behind our back
    let mut expr = UpdateExpr::default();
    expr.set.insert(
        ATTR_RECORD_VERSION_NUMBER.to_string(),
        aws_sdk_dynamodb::types::AttributeValue::S("foreign-rvn".to_string()),
    );
    store
        .update(
            &LockKey::new("resource", None),
            expr,
            WriteCondition::RvnMatches {
                rvn: lock.record_version_number(),
            },
        )
        .await
        .unwrap();

    let err = client
        .send_heartbeat(&lock, SendHeartbeatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::OwnershipLost(_)));
    assert!(client.held_locks().await.is_empty());
}

#[tokio::test]
async fn background_heartbeat_keeps_lock_alive() {
    let store = Arc::new(MemoryLockStore::new());
    let mut options = client_options("alice", 400, 100);
    options.create_heartbeat_background_task = true;
    let alice = DynamoDbLockClient::new(store.clone(), options).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 400, 100)).unwrap();

    let lock = alice.acquire_lock(fast_acquire("resource")).await.unwrap();

    // bob's budget is 1s buffer + the 400ms lease; renewals keep resetting
    // his observed candidate so he must time out
    let started = Instant::now();
    let err = bob.acquire_lock(fast_acquire("resource")).await.unwrap_err();
    assert!(matches!(err, LockError::LockNotGranted(_)));
    assert!(started.elapsed() >= Duration::from_secs(1));

    assert!(!lock.is_expired());
    alice.close().await;
}

#[tokio::test]
async fn session_monitor_fires_exactly_once_when_heartbeats_stop() {
    let store = Arc::new(MemoryLockStore::new());
    let client = DynamoDbLockClient::new(store, client_options("alice", 800, 200)).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let options = fast_acquire("resource").with_session_monitor(
        SessionMonitorSpec::new(Duration::from_millis(500)).with_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let lock = client.acquire_lock(options).await.unwrap();

    // no heartbeats: the danger zone starts 300ms after acquisition
    sleep(Duration::from_millis(150)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(!lock.is_in_danger_zone().unwrap());

    sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(lock.is_in_danger_zone().unwrap());

    // well past the threshold: still exactly one invocation
    sleep(Duration::from_millis(400)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_monitor_stays_quiet_while_heartbeats_flow() {
    let store = Arc::new(MemoryLockStore::new());
    let mut client_opts = client_options("alice", 800, 150);
    client_opts.create_heartbeat_background_task = true;
    let client = DynamoDbLockClient::new(store, client_opts).unwrap();

    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();
    let options = fast_acquire("resource").with_session_monitor(
        SessionMonitorSpec::new(Duration::from_millis(400))
            .with_callback(move || flag.store(true, Ordering::SeqCst)),
    );
    client.acquire_lock(options).await.unwrap();

    sleep(Duration::from_millis(900)).await;
    assert!(
        !fired.load(Ordering::SeqCst),
        "monitor must not fire while renewals keep the lease fresh"
    );
    client.close().await;
}

#[tokio::test]
async fn get_lock_returns_inert_handle_for_foreign_locks() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    let own = alice
        .acquire_lock(fast_acquire("resource").with_data(b"payload".to_vec()))
        .await
        .unwrap();

    // looking up our own lock yields the live registered item
    let same = alice.get_lock("resource", None).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&own, &same));

    // a foreign lock comes back with its fencing token cleared
    let foreign = bob.get_lock("resource", None).await.unwrap().unwrap();
    assert_eq!(foreign.owner_name(), "alice");
    assert_eq!(foreign.data(), Some(b"payload".to_vec()));
    assert!(foreign.record_version_number().is_empty());

    assert!(!bob.release_lock(&foreign, Default::default()).await.unwrap());
    let err = bob
        .send_heartbeat(&foreign, SendHeartbeatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::LockNotGranted(_)));
    // alice still holds the lock untouched
    assert!(store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .is_some());

    assert!(bob.get_lock("missing", None).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn release_succeeds_against_concurrent_renewals() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();

    // A renewal that wins the critical section between release's registry
    // removal and its conditioned write rotates the shared item's RVN; the
    // release must condition on the rotated token and still succeed.
    for i in 0..20 {
        let name = format!("resource-{i}");
        let lock = client.acquire_lock(fast_acquire(&name)).await.unwrap();

        let renewer = tokio::spawn({
            let client = client.clone();
            let lock = lock.clone();
            async move {
                while client
                    .send_heartbeat(&lock, SendHeartbeatOptions::default())
                    .await
                    .is_ok()
                {}
            }
        });

        assert!(
            client.release_lock(&lock, Default::default()).await.unwrap(),
            "release lost to a concurrent renewal on {name}"
        );
        renewer.await.unwrap();
        assert!(store
            .get(&LockKey::new(name.as_str(), None))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn get_lock_sees_released_marker_with_cleared_token() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    let mut options = fast_acquire("resource");
    options.delete_lock_on_release = false;
    let lock = alice.acquire_lock(options).await.unwrap();
    assert!(alice.release_lock(&lock, Default::default()).await.unwrap());

    let handle = bob.get_lock("resource", None).await.unwrap().unwrap();
    assert!(handle.is_released());
    assert!(handle.record_version_number().is_empty());
    assert_eq!(handle.owner_name(), "alice");
}

#[tokio::test]
async fn scanned_handles_cannot_disturb_held_locks() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    client.acquire_lock(fast_acquire("resource")).await.unwrap();

    let mut scan = client.scan_locks(true);
    let snapshot = scan.next().await.unwrap().unwrap();
    assert_eq!(snapshot.owner_name(), "alice");
    assert!(snapshot.record_version_number().is_empty());

    // releasing or heartbeating through the snapshot is refused and leaves
    // the live registration alone, even though the owner matches
    assert!(!client.release_lock(&snapshot, Default::default()).await.unwrap());
    let err = client
        .send_heartbeat(&snapshot, SendHeartbeatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::LockNotGranted(_)));
    assert_eq!(client.held_locks().await.len(), 1);
    assert!(store
        .get(&LockKey::new("resource", None))
        .await
        .unwrap()
        .is_some());

    // the registered handle still releases normally
    let live = client.get_lock("resource", None).await.unwrap().unwrap();
    assert!(client.release_lock(&live, Default::default()).await.unwrap());
}

#[tokio::test]
async fn scan_walks_every_record_across_pages() {
    let store = Arc::new(MemoryLockStore::new().with_page_size(2));
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();

    for name in ["a", "b", "c", "d", "e"] {
        client.acquire_lock(fast_acquire(name)).await.unwrap();
    }

    let mut scan = client.scan_locks(true);
    let mut seen = Vec::new();
    while let Some(item) = scan.next().await.unwrap() {
        assert_eq!(item.owner_name(), "alice");
        assert!(item.record_version_number().is_empty());
        seen.push(item.partition_key().to_string());
    }
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);

    scan.restart();
    let mut count = 0;
    while scan.next().await.unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 5);
}

#[tokio::test]
async fn replace_data_false_preserves_previous_payload() {
    let store = Arc::new(MemoryLockStore::new());
    let alice =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let bob = DynamoDbLockClient::new(store.clone(), client_options("bob", 3000, 1000)).unwrap();

    let mut options = fast_acquire("resource").with_data(b"inherited".to_vec());
    options.delete_lock_on_release = false;
    let lock = alice.acquire_lock(options).await.unwrap();
    alice.release_lock(&lock, Default::default()).await.unwrap();

    let mut options = fast_acquire("resource");
    options.replace_data = false;
    let taken = bob.acquire_lock(options).await.unwrap();
    assert_eq!(taken.data(), Some(b"inherited".to_vec()));
}

#[tokio::test]
async fn heartbeat_can_replace_or_delete_payload() {
    let store = Arc::new(MemoryLockStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();
    let lock = client
        .acquire_lock(fast_acquire("resource").with_data(b"v1".to_vec()))
        .await
        .unwrap();

    let mut options = SendHeartbeatOptions::default();
    options.data = Some(b"v2".to_vec());
    client.send_heartbeat(&lock, options).await.unwrap();
    assert_eq!(lock.data(), Some(b"v2".to_vec()));

    let mut options = SendHeartbeatOptions::default();
    options.delete_data = true;
    client.send_heartbeat(&lock, options).await.unwrap();
    assert_eq!(lock.data(), None);

    let mut options = SendHeartbeatOptions::default();
    options.data = Some(b"v3".to_vec());
    options.delete_data = true;
    let err = client.send_heartbeat(&lock, options).await.unwrap_err();
    assert!(matches!(err, LockError::ConfigError(_)));
}

#[tokio::test]
async fn acquire_only_if_already_exists_waits_for_a_record() {
    let store = Arc::new(MemoryLockStore::new());
    let client = DynamoDbLockClient::new(store, client_options("alice", 3000, 1000)).unwrap();

    let mut options = fast_acquire("never-created");
    options.acquire_only_if_already_exists = true;
    let err = client.acquire_lock(options).await.unwrap_err();
    assert!(matches!(err, LockError::LockNotGranted(_)));
}

#[tokio::test]
async fn close_releases_all_tracked_locks() {
    let store = Arc::new(MemoryLockStore::new());
    let mut options = client_options("alice", 3000, 1000);
    options.create_heartbeat_background_task = true;
    let client = DynamoDbLockClient::new(store.clone(), options).unwrap();

    client.acquire_lock(fast_acquire("first")).await.unwrap();
    client.acquire_lock(fast_acquire("second")).await.unwrap();
    client.close().await;

    assert!(client.held_locks().await.is_empty());
    assert!(store.get(&LockKey::new("first", None)).await.unwrap().is_none());
    assert!(store.get(&LockKey::new("second", None)).await.unwrap().is_none());
}

#[tokio::test]
async fn configuration_errors_are_rejected_up_front() {
    let store = Arc::new(MemoryLockStore::new());

    // lease shorter than two heartbeat periods
    let err = DynamoDbLockClient::new(store.clone(), client_options("alice", 150, 100)).unwrap_err();
    assert!(matches!(err, LockError::ConfigError(_)));

    let err = DynamoDbLockClient::new(store.clone(), client_options("", 3000, 1000)).unwrap_err();
    assert!(matches!(err, LockError::ConfigError(_)));

    let client = DynamoDbLockClient::new(store, client_options("alice", 3000, 1000)).unwrap();

    // reserved attribute collision
    let mut options = fast_acquire("resource");
    options.additional_attributes.insert(
        "ownerName".to_string(),
        aws_sdk_dynamodb::types::AttributeValue::S("sneaky".to_string()),
    );
    let err = client.acquire_lock(options).await.unwrap_err();
    assert!(matches!(err, LockError::ConfigError(_)));

    // monitor safe time outside (heartbeat_period, lease_duration)
    let options = fast_acquire("resource")
        .with_session_monitor(SessionMonitorSpec::new(Duration::from_secs(60)));
    let err = client.acquire_lock(options).await.unwrap_err();
    assert!(matches!(err, LockError::ConfigError(_)));
}

/// Store wrapper whose updates can be switched to fail with unavailability.
struct FlakyStore {
    inner: MemoryLockStore,
    fail_updates: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryLockStore::new(),
            fail_updates: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LockStore for FlakyStore {
    async fn get(&self, key: &LockKey) -> StoreResult<Option<Record>> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &LockKey,
        record: Record,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        self.inner.put(key, record, condition).await
    }

    async fn update(
        &self,
        key: &LockKey,
        expr: UpdateExpr,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        self.inner.update(key, expr, condition).await
    }

    async fn delete(&self, key: &LockKey, condition: WriteCondition) -> StoreResult<()> {
        self.inner.delete(key, condition).await
    }

    async fn scan(&self, cursor: Option<ScanCursor>, consistent: bool) -> StoreResult<ScanPage> {
        self.inner.scan(cursor, consistent).await
    }

    async fn assert_table_exists(&self) -> StoreResult<()> {
        self.inner.assert_table_exists().await
    }
}

#[tokio::test]
async fn outage_heartbeat_holds_lock_when_configured() {
    let store = Arc::new(FlakyStore::new());
    let mut options = client_options("alice", 600, 200);
    options.hold_lock_on_service_unavailable = true;
    let client = DynamoDbLockClient::new(store.clone(), options).unwrap();

    let lock = client.acquire_lock(fast_acquire("resource")).await.unwrap();
    let rvn = lock.record_version_number();

    store.fail_updates.store(true, Ordering::SeqCst);
    sleep(Duration::from_millis(400)).await;
    client
        .send_heartbeat(&lock, SendHeartbeatOptions::default())
        .await
        .unwrap();
    // local renewal only: the fencing token did not rotate
    assert_eq!(lock.record_version_number(), rvn);
    assert!(!lock.is_expired());
}

#[tokio::test]
async fn outage_heartbeat_fails_by_default() {
    let store = Arc::new(FlakyStore::new());
    let client =
        DynamoDbLockClient::new(store.clone(), client_options("alice", 3000, 1000)).unwrap();

    let lock = client.acquire_lock(fast_acquire("resource")).await.unwrap();
    store.fail_updates.store(true, Ordering::SeqCst);
    let err = client
        .send_heartbeat(&lock, SendHeartbeatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::Store(StoreError::Unavailable(_))));
    // ownership was not proven lost, so the lock stays registered
    assert_eq!(client.held_locks().await.len(), 1);
}
