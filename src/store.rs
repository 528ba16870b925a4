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

//! Conditional store interface the lock engine depends on.
//!
//! ## Purpose
//! Narrows the networked item store down to the five operations the lock
//! lifecycle needs (conditioned get/put/update/delete plus a paginated scan),
//! so the engine can run against DynamoDB in production and an in-memory
//! fake in tests.
//!
//! ## Design
//! - Conditions are a closed enum; each backend compiles them to its native
//!   predicate (condition expressions in DynamoDB, direct checks in memory).
//! - `StoreError` separates the *condition-failed* kind (lost a race, always
//!   retryable for acquisition) from transient availability failures and
//!   terminal errors.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use thiserror::Error;

/// Attribute map for one stored lock record, excluding the key attributes.
pub type Record = HashMap<String, AttributeValue>;

/// Opaque pagination cursor for [`LockStore::scan`].
pub type ScanCursor = HashMap<String, AttributeValue>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identity of one lock record: partition key plus optional sort key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl LockKey {
    pub fn new(partition_key: impl Into<String>, sort_key: Option<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key,
        }
    }

    /// Unique registry key for this lock: `partition_key#sort_key`.
    pub fn unique_key(&self) -> String {
        format!(
            "{}#{}",
            self.partition_key,
            self.sort_key.as_deref().unwrap_or("")
        )
    }
}

/// Server-side predicate a conditional write must satisfy.
#[derive(Clone, Debug)]
pub enum WriteCondition {
    /// No record exists for the key
    NotExists,
    /// Record exists and is flagged released; optionally its RVN must still
    /// match the value observed by the caller's read
    ReleasedAndExists { rvn: Option<String> },
    /// Record exists and its RVN matches
    RvnMatches { rvn: String },
    /// Record exists, owner unchanged, and RVN matches
    OwnedWithRvn { owner: String, rvn: String },
}

/// Attribute changes for a conditioned update.
#[derive(Clone, Debug, Default)]
pub struct UpdateExpr {
    /// Attributes to set or overwrite
    pub set: Record,
    /// Attribute names to remove
    pub remove: Vec<String>,
}

/// One page of a lock table scan.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub entries: Vec<(LockKey, Record)>,
    pub next: Option<ScanCursor>,
}

/// Errors from the conditional store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The condition of a conditional write did not hold
    #[error("conditional check failed")]
    ConditionFailed,

    /// The lock table does not exist
    #[error("table missing: {0}")]
    TableMissing(String),

    /// Throughput/request limits exceeded (transient)
    #[error("throughput exceeded: {0}")]
    ThroughputExceeded(String),

    /// Connectivity or service availability failure (transient)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether the failure is worth retrying after a short delay.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ThroughputExceeded(_) | StoreError::Unavailable(_)
        )
    }
}

/// Narrow interface over the conditional-write item store.
///
/// All writes are atomic with respect to their condition: the store evaluates
/// the predicate and applies the mutation as one linearizable step per key.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Strongly consistent single-record read.
    async fn get(&self, key: &LockKey) -> StoreResult<Option<Record>>;

    /// Write a full record if `condition` holds.
    async fn put(&self, key: &LockKey, record: Record, condition: WriteCondition)
        -> StoreResult<()>;

    /// Apply set/remove attribute changes if `condition` holds. Creates the
    /// record when the condition permits absence.
    async fn update(
        &self,
        key: &LockKey,
        update: UpdateExpr,
        condition: WriteCondition,
    ) -> StoreResult<()>;

    /// Delete the record if `condition` holds.
    async fn delete(&self, key: &LockKey, condition: WriteCondition) -> StoreResult<()>;

    /// Fetch one page of lock records. `cursor` of `None` starts from the
    /// beginning; a `None` cursor in the returned page means the scan is done.
    async fn scan(&self, cursor: Option<ScanCursor>, consistent: bool) -> StoreResult<ScanPage>;

    /// Fail with [`StoreError::TableMissing`] if the lock table does not exist.
    async fn assert_table_exists(&self) -> StoreResult<()>;
}
