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

//! Background heartbeat loop renewing every lock the client holds.

use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::DynamoDbLockClient;
use crate::options::SendHeartbeatOptions;

/// Spawn the periodic renewal task for `client`.
///
/// Each sweep renews every tracked lock with default heartbeat options. A
/// failure on one lock is logged and never stops the sweep; locks evicted by
/// the failure simply drop out of the next snapshot. The sweep sleeps for
/// the remainder of the heartbeat period so slow sweeps do not drift the
/// schedule, and the task exits cleanly when the client shuts down.
pub(crate) fn spawn_heartbeat_loop(client: DynamoDbLockClient) -> JoinHandle<()> {
    let mut shutdown = client.shutdown_receiver();
    tokio::spawn(async move {
        debug!(owner = %client.owner_name(), "heartbeat loop started");
        loop {
            let sweep_started = Instant::now();
            for item in client.held_locks().await {
                if client.is_stopping() {
                    break;
                }
                if let Err(e) = client
                    .send_heartbeat(&item, SendHeartbeatOptions::default())
                    .await
                {
                    warn!(
                        lock = %item.unique_key(),
                        error = %e,
                        "heartbeat failed; lock may have been lost"
                    );
                }
            }
            metrics::histogram!("lock_client_heartbeat_sweep_duration_seconds")
                .record(sweep_started.elapsed().as_secs_f64());

            let sleep = client
                .heartbeat_period()
                .saturating_sub(sweep_started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.changed() => {}
            }
            if client.is_stopping() {
                debug!(owner = %client.owner_name(), "heartbeat loop stopping");
                return;
            }
        }
    })
}
