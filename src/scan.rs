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

//! Lazy paginated iteration over every lock record in the store.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::LockResult;
use crate::item::{decode_record, LockItem};
use crate::store::{LockStore, ScanCursor};

/// Pull-based cursor over the lock table.
///
/// Pages are fetched from the store only as the buffered items run out, so
/// iteration cost is proportional to how far the caller walks. Items are
/// read-only snapshots of the record at page-fetch time, returned with the
/// fencing token cleared like single-item lookups, so heartbeating or
/// releasing through them deterministically fails even for locks this same
/// client holds.
pub struct LockScan {
    store: Arc<dyn LockStore>,
    consistent: bool,
    cursor: Option<ScanCursor>,
    buffer: VecDeque<LockItem>,
    exhausted: bool,
}

impl LockScan {
    pub(crate) fn new(store: Arc<dyn LockStore>, consistent: bool) -> Self {
        Self {
            store,
            consistent,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next lock record, fetching the next page when the buffer is empty.
    /// `Ok(None)` once the table is exhausted.
    pub async fn next(&mut self) -> LockResult<Option<LockItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page = self
                .store
                .scan(self.cursor.take(), self.consistent)
                .await?;
            for (key, record) in page.entries {
                let decoded = decode_record(&record)?;
                self.buffer.push_back(LockItem::from_record(key, decoded, false));
            }
            match page.next {
                Some(cursor) => self.cursor = Some(cursor),
                None => self.exhausted = true,
            }
        }
    }

    /// Restart iteration from the beginning of the table.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }
}
