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

//! DynamoDB lock store: conditional writes compiled to condition expressions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, instrument};

use crate::item::{ATTR_IS_RELEASED, ATTR_OWNER_NAME, ATTR_RECORD_VERSION_NUMBER, IS_RELEASED_VALUE};
use crate::store::{
    LockKey, LockStore, Record, ScanCursor, ScanPage, StoreError, StoreResult, UpdateExpr,
    WriteCondition,
};

const DEFAULT_PARTITION_KEY_NAME: &str = "key";
const TABLE_ACTIVE_POLLS: u32 = 30;

/// Lock store backed by a DynamoDB table.
///
/// The table needs a string partition key (default attribute name `key`) and
/// optionally a string sort key. Lock attributes live alongside the key
/// attributes in the same item; foreign attributes written by other tooling
/// survive conditioned updates untouched.
#[derive(Clone)]
pub struct DdbLockStore {
    client: Client,
    table_name: String,
    partition_key_name: String,
    sort_key_name: Option<String>,
}

impl DdbLockStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            partition_key_name: DEFAULT_PARTITION_KEY_NAME.to_string(),
            sort_key_name: None,
        }
    }

    /// Build a store from the ambient AWS environment (region, credentials).
    pub async fn from_env(table_name: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), table_name)
    }

    /// Like [`from_env`](Self::from_env) with an endpoint override, for
    /// DynamoDB Local.
    pub async fn from_env_with_endpoint(
        table_name: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ddb_config = aws_sdk_dynamodb::config::Builder::from(&config)
            .endpoint_url(endpoint_url.into())
            .build();
        Self::new(Client::from_conf(ddb_config), table_name)
    }

    pub fn with_partition_key_name(mut self, name: impl Into<String>) -> Self {
        self.partition_key_name = name.into();
        self
    }

    pub fn with_sort_key_name(mut self, name: impl Into<String>) -> Self {
        self.sort_key_name = Some(name.into());
        self
    }

    /// Create the lock table if it does not exist and wait for it to become
    /// active. Pay-per-request billing; an existing table is left untouched.
    #[instrument(skip(self), fields(table = %self.table_name))]
    pub async fn ensure_table_exists(&self) -> StoreResult<()> {
        let mut attribute_definitions = vec![AttributeDefinition::builder()
            .attribute_name(&self.partition_key_name)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| StoreError::Internal(e.to_string()))?];
        let mut key_schema = vec![KeySchemaElement::builder()
            .attribute_name(&self.partition_key_name)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| StoreError::Internal(e.to_string()))?];
        if let Some(sort_key) = &self.sort_key_name {
            attribute_definitions.push(
                AttributeDefinition::builder()
                    .attribute_name(sort_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(|e| StoreError::Internal(e.to_string()))?,
            );
            key_schema.push(
                KeySchemaElement::builder()
                    .attribute_name(sort_key)
                    .key_type(KeyType::Range)
                    .build()
                    .map_err(|e| StoreError::Internal(e.to_string()))?,
            );
        }

        match self
            .client
            .create_table()
            .table_name(&self.table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
        {
            Ok(_) => debug!("lock table created"),
            Err(e) if e.code() == Some("ResourceInUseException") => {
                debug!("lock table already exists")
            }
            Err(e) => return Err(map_sdk_error(e)),
        }

        for _ in 0..TABLE_ACTIVE_POLLS {
            let out = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(map_sdk_error)?;
            let active = out
                .table()
                .and_then(|t| t.table_status())
                .map(|s| matches!(s, TableStatus::Active))
                .unwrap_or(false);
            if active {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        Err(StoreError::Unavailable(format!(
            "table {} did not become active",
            self.table_name
        )))
    }

    fn key_attributes(&self, key: &LockKey) -> StoreResult<Record> {
        let mut attrs = HashMap::new();
        attrs.insert(
            self.partition_key_name.clone(),
            AttributeValue::S(key.partition_key.clone()),
        );
        match (&self.sort_key_name, &key.sort_key) {
            (Some(name), Some(value)) => {
                attrs.insert(name.clone(), AttributeValue::S(value.clone()));
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(StoreError::Internal(format!(
                    "table {} requires a sort key but none was given",
                    self.table_name
                )))
            }
            (None, Some(_)) => {
                return Err(StoreError::Internal(format!(
                    "table {} has no sort key but one was given",
                    self.table_name
                )))
            }
        }
        Ok(attrs)
    }

    /// Compile a [`WriteCondition`] to a DynamoDB condition expression with
    /// its attribute name and value maps.
    fn compile_condition(
        &self,
        condition: &WriteCondition,
    ) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        names.insert("#pk".to_string(), self.partition_key_name.clone());
        let expr = match condition {
            WriteCondition::NotExists => "attribute_not_exists(#pk)".to_string(),
            WriteCondition::ReleasedAndExists { rvn } => {
                names.insert("#ir".to_string(), ATTR_IS_RELEASED.to_string());
                values.insert(
                    ":ir".to_string(),
                    AttributeValue::S(IS_RELEASED_VALUE.to_string()),
                );
                match rvn {
                    Some(rvn) => {
                        names.insert("#rvn".to_string(), ATTR_RECORD_VERSION_NUMBER.to_string());
                        values.insert(":rvn".to_string(), AttributeValue::S(rvn.clone()));
                        "attribute_exists(#pk) AND #ir = :ir AND #rvn = :rvn".to_string()
                    }
                    None => "attribute_exists(#pk) AND #ir = :ir".to_string(),
                }
            }
            WriteCondition::RvnMatches { rvn } => {
                names.insert("#rvn".to_string(), ATTR_RECORD_VERSION_NUMBER.to_string());
                values.insert(":rvn".to_string(), AttributeValue::S(rvn.clone()));
                "attribute_exists(#pk) AND #rvn = :rvn".to_string()
            }
            WriteCondition::OwnedWithRvn { owner, rvn } => {
                names.insert("#on".to_string(), ATTR_OWNER_NAME.to_string());
                names.insert("#rvn".to_string(), ATTR_RECORD_VERSION_NUMBER.to_string());
                values.insert(":on".to_string(), AttributeValue::S(owner.clone()));
                values.insert(":rvn".to_string(), AttributeValue::S(rvn.clone()));
                "attribute_exists(#pk) AND #on = :on AND #rvn = :rvn".to_string()
            }
        };
        (expr, names, values)
    }

    /// Strip the table's key attributes out of a fetched item, returning the
    /// logical key and the remaining record.
    fn split_item(&self, mut item: Record) -> StoreResult<(LockKey, Record)> {
        let partition_key = item
            .remove(&self.partition_key_name)
            .and_then(|v| v.as_s().ok().cloned())
            .ok_or_else(|| {
                StoreError::Internal(format!(
                    "item in table {} is missing its partition key",
                    self.table_name
                ))
            })?;
        let sort_key = match &self.sort_key_name {
            Some(name) => Some(item.remove(name).and_then(|v| v.as_s().ok().cloned()).ok_or_else(
                || {
                    StoreError::Internal(format!(
                        "item in table {} is missing its sort key",
                        self.table_name
                    ))
                },
            )?),
            None => None,
        };
        Ok((LockKey::new(partition_key, sort_key), item))
    }
}

#[async_trait]
impl LockStore for DdbLockStore {
    async fn get(&self, key: &LockKey) -> StoreResult<Option<Record>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(key)?))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_sdk_error)?;
        match out.item {
            Some(item) => {
                let (_, record) = self.split_item(item)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &LockKey,
        record: Record,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        let mut item = self.key_attributes(key)?;
        item.extend(record);
        let (expr, names, values) = self.compile_condition(&condition);
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(expr)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .send()
            .await
            .map_err(map_sdk_error)?;
        debug!(lock = %key.unique_key(), "conditional put succeeded");
        Ok(())
    }

    async fn update(
        &self,
        key: &LockKey,
        expr: UpdateExpr,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        let (cond_expr, mut names, mut values) = self.compile_condition(&condition);

        let mut clauses = Vec::new();
        if !expr.set.is_empty() {
            let mut assignments = Vec::new();
            for (i, (name, value)) in expr.set.into_iter().enumerate() {
                names.insert(format!("#s{i}"), name);
                values.insert(format!(":s{i}"), value);
                assignments.push(format!("#s{i} = :s{i}"));
            }
            clauses.push(format!("SET {}", assignments.join(", ")));
        }
        if !expr.remove.is_empty() {
            let mut removals = Vec::new();
            for (i, name) in expr.remove.into_iter().enumerate() {
                names.insert(format!("#r{i}"), name);
                removals.push(format!("#r{i}"));
            }
            clauses.push(format!("REMOVE {}", removals.join(", ")));
        }
        if clauses.is_empty() {
            return Err(StoreError::Internal("empty update expression".to_string()));
        }

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(key)?))
            .update_expression(clauses.join(" "))
            .condition_expression(cond_expr)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .send()
            .await
            .map_err(map_sdk_error)?;
        debug!(lock = %key.unique_key(), "conditional update succeeded");
        Ok(())
    }

    async fn delete(&self, key: &LockKey, condition: WriteCondition) -> StoreResult<()> {
        let (expr, names, values) = self.compile_condition(&condition);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key_attributes(key)?))
            .condition_expression(expr)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .send()
            .await
            .map_err(map_sdk_error)?;
        debug!(lock = %key.unique_key(), "conditional delete succeeded");
        Ok(())
    }

    async fn scan(&self, cursor: Option<ScanCursor>, consistent: bool) -> StoreResult<ScanPage> {
        let out = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(cursor)
            .consistent_read(consistent)
            .send()
            .await
            .map_err(map_sdk_error)?;
        let mut entries = Vec::new();
        for item in out.items.unwrap_or_default() {
            entries.push(self.split_item(item)?);
        }
        Ok(ScanPage {
            entries,
            next: out.last_evaluated_key,
        })
    }

    async fn assert_table_exists(&self) -> StoreResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

/// Classify an SDK failure by error code. Failures without a code (timeouts,
/// connection resets, dispatch failures) count as unavailability, which the
/// client treats as transient.
fn map_sdk_error<E>(err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    map_error_code(err.code(), err.to_string())
}

fn map_error_code(code: Option<&str>, detail: String) -> StoreError {
    match code {
        Some("ConditionalCheckFailedException") => StoreError::ConditionFailed,
        Some("ResourceNotFoundException") => StoreError::TableMissing(detail),
        Some("ProvisionedThroughputExceededException") | Some("ThrottlingException") => {
            StoreError::ThroughputExceeded(detail)
        }
        // Coded but retryable service failures
        Some("InternalServerError") | Some("ServiceUnavailable") | Some("RequestLimitExceeded") => {
            StoreError::Unavailable(detail)
        }
        Some(_) => StoreError::Internal(detail),
        None => StoreError::Unavailable(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(code: Option<&str>) -> StoreError {
        map_error_code(code, "detail".to_string())
    }

    #[test]
    fn condition_and_table_codes_map_to_their_kinds() {
        assert!(matches!(
            classify(Some("ConditionalCheckFailedException")),
            StoreError::ConditionFailed
        ));
        assert!(matches!(
            classify(Some("ResourceNotFoundException")),
            StoreError::TableMissing(_)
        ));
    }

    #[test]
    fn throttling_codes_are_transient() {
        for code in ["ProvisionedThroughputExceededException", "ThrottlingException"] {
            let err = classify(Some(code));
            assert!(matches!(err, StoreError::ThroughputExceeded(_)));
            assert!(err.is_transient());
        }
    }

    #[test]
    fn retryable_service_failures_are_unavailable() {
        for code in ["InternalServerError", "ServiceUnavailable", "RequestLimitExceeded"] {
            let err = classify(Some(code));
            assert!(matches!(err, StoreError::Unavailable(_)), "code {code}");
            assert!(err.is_transient());
        }
    }

    #[test]
    fn uncoded_failures_are_unavailable_and_unknown_codes_terminal() {
        assert!(classify(None).is_transient());
        let err = classify(Some("ValidationException"));
        assert!(matches!(err, StoreError::Internal(_)));
        assert!(!err.is_transient());
    }
}
