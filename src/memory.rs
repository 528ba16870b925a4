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

//! In-memory lock store with the same conditional-write semantics as the
//! DynamoDB store. Intended for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;
use tracing::debug;

use crate::item::{ATTR_IS_RELEASED, ATTR_OWNER_NAME, ATTR_RECORD_VERSION_NUMBER, IS_RELEASED_VALUE};
use crate::store::{
    LockKey, LockStore, Record, ScanCursor, ScanPage, StoreError, StoreResult, UpdateExpr,
    WriteCondition,
};

const DEFAULT_PAGE_SIZE: usize = 100;
const CURSOR_OFFSET: &str = "offset";

/// Conditional-write KV store backed by a process-local map.
///
/// Every mutation evaluates its [`WriteCondition`] and applies its change
/// under one write-lock critical section, so the check-and-set is atomic
/// exactly like a DynamoDB conditional write.
#[derive(Clone)]
pub struct MemoryLockStore {
    records: Arc<RwLock<HashMap<LockKey, Record>>>,
    page_size: usize,
}

impl Default for MemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Shrink scan pages, mainly to exercise pagination in tests.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn attr_eq(record: &Record, name: &str, expected: &str) -> bool {
        record
            .get(name)
            .and_then(|v| v.as_s().ok())
            .map(|s| s == expected)
            .unwrap_or(false)
    }

    fn is_released(record: &Record) -> bool {
        Self::attr_eq(record, ATTR_IS_RELEASED, IS_RELEASED_VALUE)
    }

    fn check(existing: Option<&Record>, condition: &WriteCondition) -> StoreResult<()> {
        let ok = match (condition, existing) {
            (WriteCondition::NotExists, None) => true,
            (WriteCondition::NotExists, Some(_)) => false,
            (WriteCondition::ReleasedAndExists { rvn }, Some(record)) => {
                Self::is_released(record)
                    && rvn
                        .as_deref()
                        .map(|r| Self::attr_eq(record, ATTR_RECORD_VERSION_NUMBER, r))
                        .unwrap_or(true)
            }
            (WriteCondition::RvnMatches { rvn }, Some(record)) => {
                Self::attr_eq(record, ATTR_RECORD_VERSION_NUMBER, rvn)
            }
            (WriteCondition::OwnedWithRvn { owner, rvn }, Some(record)) => {
                Self::attr_eq(record, ATTR_OWNER_NAME, owner)
                    && Self::attr_eq(record, ATTR_RECORD_VERSION_NUMBER, rvn)
            }
            (_, None) => false,
        };
        if ok {
            Ok(())
        } else {
            Err(StoreError::ConditionFailed)
        }
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn get(&self, key: &LockKey) -> StoreResult<Option<Record>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &LockKey,
        record: Record,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        let mut records = self.records.write().await;
        Self::check(records.get(key), &condition)?;
        records.insert(key.clone(), record);
        debug!(lock = %key.unique_key(), "memory store put");
        Ok(())
    }

    async fn update(
        &self,
        key: &LockKey,
        expr: UpdateExpr,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        let mut records = self.records.write().await;
        Self::check(records.get(key), &condition)?;
        // Conditional updates against a missing record only pass for
        // NotExists, which upserts like DynamoDB UpdateItem.
        let record = records.entry(key.clone()).or_default();
        for (name, value) in expr.set {
            record.insert(name, value);
        }
        for name in &expr.remove {
            record.remove(name);
        }
        debug!(lock = %key.unique_key(), "memory store update");
        Ok(())
    }

    async fn delete(&self, key: &LockKey, condition: WriteCondition) -> StoreResult<()> {
        let mut records = self.records.write().await;
        Self::check(records.get(key), &condition)?;
        records.remove(key);
        debug!(lock = %key.unique_key(), "memory store delete");
        Ok(())
    }

    async fn scan(&self, cursor: Option<ScanCursor>, _consistent: bool) -> StoreResult<ScanPage> {
        let offset = match cursor {
            Some(cursor) => cursor
                .get(CURSOR_OFFSET)
                .and_then(|v| v.as_n().ok())
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| StoreError::Internal("malformed scan cursor".to_string()))?,
            None => 0,
        };

        let records = self.records.read().await;
        let mut keys: Vec<&LockKey> = records.keys().collect();
        keys.sort_by_key(|k| k.unique_key());

        let entries: Vec<(LockKey, Record)> = keys
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|&k| (k.clone(), records[k].clone()))
            .collect();
        let consumed = offset + entries.len();
        let next = (consumed < keys.len()).then(|| {
            let mut cursor = ScanCursor::new();
            cursor.insert(
                CURSOR_OFFSET.to_string(),
                AttributeValue::N(consumed.to_string()),
            );
            cursor
        });
        Ok(ScanPage { entries, next })
    }

    async fn assert_table_exists(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::lock_attributes;
    use std::time::Duration;

    fn key(pk: &str) -> LockKey {
        LockKey::new(pk, None)
    }

    fn record(owner: &str, rvn: &str) -> Record {
        lock_attributes(owner, rvn, Duration::from_secs(10), None)
    }

    #[tokio::test]
    async fn put_not_exists_rejects_existing_record() {
        let store = MemoryLockStore::new();
        store
            .put(&key("a"), record("alice", "r1"), WriteCondition::NotExists)
            .await
            .unwrap();
        let err = store
            .put(&key("a"), record("bob", "r2"), WriteCondition::NotExists)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));
    }

    #[tokio::test]
    async fn rvn_match_guards_takeover() {
        let store = MemoryLockStore::new();
        store
            .put(&key("a"), record("alice", "r1"), WriteCondition::NotExists)
            .await
            .unwrap();

        let err = store
            .put(
                &key("a"),
                record("bob", "r3"),
                WriteCondition::RvnMatches { rvn: "stale".to_string() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        store
            .put(
                &key("a"),
                record("bob", "r3"),
                WriteCondition::RvnMatches { rvn: "r1".to_string() },
            )
            .await
            .unwrap();
        let stored = store.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(stored[ATTR_OWNER_NAME].as_s().unwrap(), "bob");
    }

    #[tokio::test]
    async fn released_condition_requires_released_flag() {
        let store = MemoryLockStore::new();
        store
            .put(&key("a"), record("alice", "r1"), WriteCondition::NotExists)
            .await
            .unwrap();

        let err = store
            .put(
                &key("a"),
                record("bob", "r2"),
                WriteCondition::ReleasedAndExists { rvn: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        let mut update = UpdateExpr::default();
        update.set.insert(
            ATTR_IS_RELEASED.to_string(),
            AttributeValue::S(IS_RELEASED_VALUE.to_string()),
        );
        store
            .update(
                &key("a"),
                update,
                WriteCondition::OwnedWithRvn {
                    owner: "alice".to_string(),
                    rvn: "r1".to_string(),
                },
            )
            .await
            .unwrap();

        store
            .put(
                &key("a"),
                record("bob", "r2"),
                WriteCondition::ReleasedAndExists { rvn: None },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn released_condition_with_rvn_pins_the_observed_record() {
        let store = MemoryLockStore::new();
        let mut released = record("alice", "r1");
        released.insert(
            ATTR_IS_RELEASED.to_string(),
            AttributeValue::S(IS_RELEASED_VALUE.to_string()),
        );
        store
            .put(&key("a"), released, WriteCondition::NotExists)
            .await
            .unwrap();

        let err = store
            .put(
                &key("a"),
                record("bob", "r2"),
                WriteCondition::ReleasedAndExists { rvn: Some("other".to_string()) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        store
            .put(
                &key("a"),
                record("bob", "r2"),
                WriteCondition::ReleasedAndExists { rvn: Some("r1".to_string()) },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_requires_owner_and_rvn() {
        let store = MemoryLockStore::new();
        store
            .put(&key("a"), record("alice", "r1"), WriteCondition::NotExists)
            .await
            .unwrap();

        let err = store
            .delete(
                &key("a"),
                WriteCondition::OwnedWithRvn {
                    owner: "alice".to_string(),
                    rvn: "r9".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        store
            .delete(
                &key("a"),
                WriteCondition::OwnedWithRvn {
                    owner: "alice".to_string(),
                    rvn: "r1".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(store.get(&key("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_with_not_exists_upserts() {
        let store = MemoryLockStore::new();
        let mut expr = UpdateExpr::default();
        expr.set = record("alice", "r1");
        store
            .update(&key("a"), expr, WriteCondition::NotExists)
            .await
            .unwrap();
        assert!(store.get(&key("a")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_remove_strips_attributes() {
        let store = MemoryLockStore::new();
        let mut rec = record("alice", "r1");
        rec.insert(
            ATTR_IS_RELEASED.to_string(),
            AttributeValue::S(IS_RELEASED_VALUE.to_string()),
        );
        store.put(&key("a"), rec, WriteCondition::NotExists).await.unwrap();

        let mut expr = UpdateExpr::default();
        expr.remove.push(ATTR_IS_RELEASED.to_string());
        store
            .update(
                &key("a"),
                expr,
                WriteCondition::ReleasedAndExists { rvn: None },
            )
            .await
            .unwrap();
        let stored = store.get(&key("a")).await.unwrap().unwrap();
        assert!(!stored.contains_key(ATTR_IS_RELEASED));
    }

    #[tokio::test]
    async fn scan_pages_through_sorted_keys() {
        let store = MemoryLockStore::new().with_page_size(2);
        for pk in ["c", "a", "e", "b", "d"] {
            store
                .put(&key(pk), record("alice", pk), WriteCondition::NotExists)
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = store.scan(cursor.take(), true).await.unwrap();
            for (k, _) in page.entries {
                seen.push(k.partition_key);
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }
}
