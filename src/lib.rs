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

//! # DynamoDB Lock Client
//!
//! ## Purpose
//! Lease-based distributed mutual exclusion over any storage service that
//! supports conditional writes. DynamoDB is the primary backend; an in-memory
//! backend with identical conditional-write semantics serves tests and local
//! development.
//!
//! ## Design Decisions
//! - **Fencing by record version number**: every acquisition and renewal
//!   writes a fresh ULID; writes are conditioned on the RVN observed by the
//!   preceding read, so stale holders can never corrupt a lock
//! - **Clock independence**: lease expiry is tracked with local monotonic
//!   time measured from each client's own reads and writes; wall clocks are
//!   never compared across machines
//! - **Wait-out takeover**: a stale lock is taken over only after a full
//!   lease period has elapsed with no RVN change, observed locally
//! - **Heartbeat renewal**: a background loop renews every held lock, and an
//!   optional per-lock session monitor fires a callback when renewals fall
//!   dangerously behind
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust,no_run
//! use dynamodb_lock_client::{
//!     AcquireLockOptions, DdbLockStore, DynamoDbLockClient, LockClientOptions,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(DdbLockStore::from_env("lock-table").await);
//! let client = DynamoDbLockClient::new(store, LockClientOptions::new("node-1"))?;
//!
//! let lock = client
//!     .acquire_lock(AcquireLockOptions::new("orders-importer").with_data(b"state".to_vec()))
//!     .await?;
//! // ... exclusive work ...
//! client.release_lock(&lock, Default::default()).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ### Session Monitor
//! ```rust,no_run
//! use dynamodb_lock_client::{AcquireLockOptions, SessionMonitorSpec};
//! use std::time::Duration;
//!
//! let options = AcquireLockOptions::new("billing-job").with_session_monitor(
//!     SessionMonitorSpec::new(Duration::from_secs(15))
//!         .with_callback(|| eprintln!("lease renewals are falling behind")),
//! );
//! ```

mod client;
mod ddb;
mod error;
mod heartbeat;
mod item;
mod memory;
mod monitor;
mod options;
mod scan;
mod store;

pub use client::DynamoDbLockClient;
pub use ddb::DdbLockStore;
pub use error::{LockError, LockResult};
pub use item::{
    LockItem, ATTR_DATA, ATTR_IS_RELEASED, ATTR_LEASE_DURATION, ATTR_OWNER_NAME,
    ATTR_RECORD_VERSION_NUMBER, RESERVED_ATTRIBUTES,
};
pub use memory::MemoryLockStore;
pub use options::{
    AcquireLockOptions, LockClientOptions, ReleaseLockOptions, SendHeartbeatOptions,
    SessionMonitorSpec,
};
pub use scan::LockScan;
pub use store::{
    LockKey, LockStore, Record, ScanCursor, ScanPage, StoreError, StoreResult, UpdateExpr,
    WriteCondition,
};
