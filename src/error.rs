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

//! Error types for distributed lock operations.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors surfaced by the lock client.
///
/// Transient store failures are retried inside the acquisition loop and never
/// reach callers from `acquire_lock`; they can surface from single-shot
/// operations (heartbeat, release, get) as [`LockError::Store`].
#[derive(Error, Debug)]
pub enum LockError {
    /// Invalid option combination, detected synchronously and never retried
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Acquisition wait budget exhausted, or the lock is otherwise not granted
    #[error("lock not granted: {0}")]
    LockNotGranted(String),

    /// The lock is currently held and the caller asked to skip blocking waits
    #[error("lock currently unavailable: {0}")]
    LockCurrentlyUnavailable(String),

    /// A conditioned renewal lost the race; local state for the lock is evicted
    #[error("lock ownership lost: {0}")]
    OwnershipLost(String),

    /// The lock table does not exist
    #[error("lock table missing: {0}")]
    TableMissing(String),

    /// Store failure that escaped the retry loops
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LockError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TableMissing(msg) => LockError::TableMissing(msg),
            other => LockError::Store(other),
        }
    }
}
