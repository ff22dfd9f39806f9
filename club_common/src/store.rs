//! Thin layer over the DynamoDB client: one table per entity, items keyed by a
//! single string attribute.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use aws_config::meta::region::RegionProviderChain;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::model::{AttributeValue, ReturnValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::error::ClubError;

pub const DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";

pub type Item = HashMap<String, AttributeValue>;

pub async fn sdk_config() -> aws_config::SdkConfig {
    let region_provider = RegionProviderChain::default_provider().or_else("eu-west-1");
    aws_config::from_env().region(region_provider).load().await
}

/// DynamoDB client honouring `DYNAMODB_ENDPOINT` for local DynamoDB.
pub fn dynamodb_client(config: &aws_config::SdkConfig) -> ddb::Client {
    let ddb_config = match env::var(DYNAMODB_ENDPOINT) {
        Ok(endpoint) => ddb::config::Builder::from(config).endpoint_url(endpoint).build(),
        _ => ddb::config::Builder::from(config).build(),
    };
    ddb::Client::from_conf(ddb_config)
}

pub fn env_var(name: &str) -> Result<String, ClubError> {
    env::var(name).map_err(|_| ClubError::Config(name.to_string()))
}

pub trait Record: Sized {
    /// Name of the partition key attribute.
    const KEY: &'static str;
    /// Used in "not found" messages.
    const KIND: &'static str;

    fn key(&self) -> &str;
    fn to_item(&self) -> Item;
    fn from_item(item: &Item) -> Result<Self, ClubError>;
}

#[derive(Debug, Clone)]
pub struct Table {
    client: ddb::Client,
    name: String,
}

impl Table {
    pub fn new<S: Into<String>>(client: ddb::Client, name: S) -> Table {
        Table { client, name: name.into() }
    }

    /// Table whose name is configured in the environment variable `var`.
    pub fn from_env(client: &ddb::Client, var: &str) -> Result<Table, ClubError> {
        Ok(Table::new(client.clone(), env_var(var)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get<R: Record>(&self, key: &str) -> Result<Option<R>, ClubError> {
        let output = self
            .client
            .get_item()
            .table_name(self.name.to_owned())
            .key(R::KEY, s(key))
            .send()
            .await
            .map_err(ClubError::aws)?;
        output.item().map(R::from_item).transpose()
    }

    pub async fn fetch<R: Record>(&self, key: &str) -> Result<R, ClubError> {
        self.get(key)
            .await?
            .ok_or_else(|| ClubError::not_found(format!("{} {}", R::KIND, key)))
    }

    pub async fn put<R: Record>(&self, record: &R) -> Result<(), ClubError> {
        debug!("put {} {} into {}", R::KIND, record.key(), self.name);
        self.client
            .put_item()
            .table_name(self.name.to_owned())
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(ClubError::aws)?;
        Ok(())
    }

    /// Deletes the item, returning whether it existed.
    pub async fn delete<R: Record>(&self, key: &str) -> Result<bool, ClubError> {
        let output = self
            .client
            .delete_item()
            .table_name(self.name.to_owned())
            .key(R::KEY, s(key))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(ClubError::aws)?;
        Ok(output.attributes().map_or(false, |a| !a.is_empty()))
    }

    pub async fn scan<R: Record>(&self) -> Result<Vec<R>, ClubError> {
        self.scan_where(None, HashMap::new(), HashMap::new()).await
    }

    /// Full table scan with an optional filter expression. Items that no
    /// longer decode are logged and skipped.
    pub async fn scan_where<R: Record>(
        &self,
        filter: Option<&str>,
        names: HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
    ) -> Result<Vec<R>, ClubError> {
        let mut pages = self
            .client
            .scan()
            .table_name(self.name.to_owned())
            .set_filter_expression(filter.map(str::to_string))
            .set_expression_attribute_names(if names.is_empty() { None } else { Some(names) })
            .set_expression_attribute_values(if values.is_empty() { None } else { Some(values) })
            .into_paginator()
            .send();
        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            match page.map_err(ClubError::aws)?.items() {
                Some(items) => {
                    for item in items {
                        match R::from_item(item) {
                            Ok(record) => records.push(record),
                            Err(e) => warn!("skipping {} in {}: {}", R::KIND, self.name, e),
                        }
                    }
                }
                None => break,
            }
        }
        Ok(records)
    }

    /// `SET` the given attributes on one item.
    pub async fn set_attributes<R: Record>(
        &self,
        key: &str,
        updates: Vec<(&str, AttributeValue)>,
    ) -> Result<(), ClubError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut request = self
            .client
            .update_item()
            .table_name(self.name.to_owned())
            .key(R::KEY, s(key));
        let mut assignments = Vec::with_capacity(updates.len());
        for (i, (name, value)) in updates.into_iter().enumerate() {
            assignments.push(format!("#a{i} = :v{i}"));
            request = request
                .expression_attribute_names(format!("#a{i}"), name)
                .expression_attribute_values(format!(":v{i}"), value);
        }
        request
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await
            .map_err(ClubError::aws)?;
        Ok(())
    }
}

pub fn s<S: Into<String>>(value: S) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub fn n<T: ToString>(value: T) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn string_list<S: AsRef<str>>(values: &[S]) -> AttributeValue {
    AttributeValue::L(values.iter().map(|v| s(v.as_ref())).collect())
}

pub fn date(value: NaiveDate) -> AttributeValue {
    s(value.format("%Y-%m-%d").to_string())
}

pub fn timestamp(value: DateTime<Utc>) -> AttributeValue {
    s(value.to_rfc3339())
}

/// Stores a unit enum by its serde name.
pub fn enum_value<T: Serialize>(value: &T) -> AttributeValue {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => s(name),
        _ => AttributeValue::Null(true),
    }
}

/// Inserts `value` under `name` when present.
pub fn put_opt(item: &mut Item, name: &str, value: Option<AttributeValue>) {
    if let Some(value) = value {
        item.insert(name.to_string(), value);
    }
}

pub fn get_s(item: &Item, name: &str) -> Result<String, ClubError> {
    get_s_opt(item, name).ok_or_else(|| ClubError::Malformed(format!("missing string attribute {}", name)))
}

pub fn get_s_opt(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) if !value.is_empty() => Some(value.to_string()),
        _ => None,
    }
}

pub fn get_n<T: FromStr>(item: &Item, name: &str) -> Result<T, ClubError> {
    get_n_opt(item, name).ok_or_else(|| ClubError::Malformed(format!("missing number attribute {}", name)))
}

pub fn get_n_opt<T: FromStr>(item: &Item, name: &str) -> Option<T> {
    match item.get(name) {
        Some(AttributeValue::N(value)) => T::from_str(value).ok(),
        _ => None,
    }
}

pub fn get_bool(item: &Item, name: &str) -> Option<bool> {
    match item.get(name) {
        Some(AttributeValue::Bool(value)) => Some(*value),
        _ => None,
    }
}

/// Accepts both a list of strings and a string set.
pub fn get_string_list(item: &Item, name: &str) -> Vec<String> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => values
            .iter()
            .filter_map(|v| match v {
                AttributeValue::S(s) => Some(s.to_string()),
                _ => None,
            })
            .collect(),
        Some(AttributeValue::Ss(values)) => values.to_vec(),
        _ => vec![],
    }
}

pub fn get_maps<'a>(item: &'a Item, name: &str) -> Vec<&'a Item> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => values
            .iter()
            .filter_map(|v| match v {
                AttributeValue::M(m) => Some(m),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

pub fn get_date(item: &Item, name: &str) -> Option<NaiveDate> {
    get_s_opt(item, name).and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

pub fn get_timestamp(item: &Item, name: &str) -> Option<DateTime<Utc>> {
    get_s_opt(item, name)
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|d| d.with_timezone(&Utc))
}

pub fn get_enum<T: DeserializeOwned>(item: &Item, name: &str) -> Result<T, ClubError> {
    let raw = get_s(item, name)?;
    serde_json::from_value(Value::String(raw.to_owned()))
        .map_err(|_| ClubError::Malformed(format!("unexpected value {} for {}", raw, name)))
}
