//! Typed operations on SharePoint lists
//!
//! Endpoints address lists by display title via
//! `/_api/web/lists/getbytitle('...')`. Item payloads carry the
//! `__metadata.type` member SharePoint requires for writes under the
//! verbose OData profile.

use std::sync::Arc;

use serde_json::{json, Value};
use siteqa_domain::{Page, QueryOptions, Result, SiteQaError};
use tracing::debug;

use super::client::SharePointClient;

const DEFAULT_PAGE_SIZE: u32 = 100;

/// CRUD and query operations on the lists of one site.
#[derive(Clone)]
pub struct ListService {
    client: Arc<SharePointClient>,
}

impl ListService {
    pub fn new(client: Arc<SharePointClient>) -> Self {
        Self { client }
    }

    /// Query items from a list.
    pub async fn get_items(&self, list_name: &str, options: &QueryOptions) -> Result<Vec<Value>> {
        let endpoint = format!("{}{}", items_endpoint(list_name), build_query_string(options));
        let payload = self.client.get(&endpoint, None).await?;
        Ok(extract_results(payload))
    }

    /// Fetch a single item by id. A missing item surfaces as an error.
    pub async fn get_item(&self, list_name: &str, item_id: i64) -> Result<Value> {
        self.client.get(&item_endpoint(list_name, item_id), None).await
    }

    /// Create an item and return the created payload (including the
    /// server-assigned `Id`).
    pub async fn create_item(&self, list_name: &str, fields: Value) -> Result<Value> {
        let body = with_item_metadata(list_name, fields);
        debug!(list_name, "creating list item");
        self.client.post(&items_endpoint(list_name), &body, None).await
    }

    /// Merge the given fields into an existing item.
    pub async fn update_item(&self, list_name: &str, item_id: i64, fields: Value) -> Result<()> {
        let body = with_item_metadata(list_name, fields);
        debug!(list_name, item_id, "updating list item");
        self.client.patch(&item_endpoint(list_name, item_id), &body, None).await?;
        Ok(())
    }

    /// Delete an item. A missing item surfaces as an error.
    pub async fn delete_item(&self, list_name: &str, item_id: i64) -> Result<()> {
        debug!(list_name, item_id, "deleting list item");
        self.client.delete(&item_endpoint(list_name, item_id), None).await?;
        Ok(())
    }

    /// Delete an item, treating "already gone" as success. Returns true
    /// when the item existed and was deleted.
    pub async fn delete_item_if_exists(&self, list_name: &str, item_id: i64) -> Result<bool> {
        match self.delete_item(list_name, item_id).await {
            Ok(()) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Number of items in the list, optionally restricted by an OData
    /// filter expression.
    pub async fn item_count(&self, list_name: &str, filter: Option<&str>) -> Result<u64> {
        let mut endpoint = format!("{}/$count", items_endpoint(list_name));
        if let Some(filter) = filter {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("$filter", filter);
            endpoint = format!("{endpoint}?{}", query.finish());
        }
        let payload = self.client.get(&endpoint, None).await?;
        parse_count(&payload).ok_or_else(|| {
            SiteQaError::Internal(format!("unexpected item count payload: {payload}"))
        })
    }

    /// Whether an item with the given id exists.
    pub async fn item_exists(&self, list_name: &str, item_id: i64) -> Result<bool> {
        match self.get_item(list_name, item_id).await {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetch one page of items. `options.top` is the page size
    /// (default 100) and `options.skip` the offset; one extra item is
    /// requested to learn whether more pages remain.
    pub async fn get_items_paginated(
        &self,
        list_name: &str,
        options: &QueryOptions,
    ) -> Result<Page<Value>> {
        let page_size = options.top.unwrap_or(DEFAULT_PAGE_SIZE);
        let skip = options.skip.unwrap_or(0);

        let mut probe = options.clone();
        probe.top = Some(page_size + 1);
        probe.skip = Some(skip);

        let mut items = self.get_items(list_name, &probe).await?;
        let has_more = items.len() as u32 > page_size;
        items.truncate(page_size as usize);

        Ok(Page {
            items,
            has_more,
            next_skip: has_more.then(|| skip + page_size),
        })
    }
}

fn is_not_found(err: &SiteQaError) -> bool {
    matches!(err, SiteQaError::Api(api) if api.is_not_found())
}

fn items_endpoint(list_name: &str) -> String {
    format!("/_api/web/lists/getbytitle('{}')/items", escape_list_name(list_name))
}

fn item_endpoint(list_name: &str, item_id: i64) -> String {
    format!("{}({item_id})", items_endpoint(list_name))
}

// Single quotes in OData string literals are escaped by doubling.
fn escape_list_name(list_name: &str) -> String {
    list_name.replace('\'', "''")
}

/// Ensure the payload carries the `__metadata.type` member SharePoint
/// requires for list item writes, e.g. `SP.Data.JobsListItem`.
fn with_item_metadata(list_name: &str, mut fields: Value) -> Value {
    if let Value::Object(map) = &mut fields {
        if !map.contains_key("__metadata") {
            let type_name = format!("SP.Data.{}ListItem", list_name.replace(' ', "_x0020_"));
            map.insert("__metadata".to_string(), json!({ "type": type_name }));
        }
    }
    fields
}

/// Build the `?$...` query string for a list read. Empty options yield
/// an empty string.
fn build_query_string(options: &QueryOptions) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;

    if !options.select.is_empty() {
        query.append_pair("$select", &options.select.join(","));
        any = true;
    }
    if let Some(filter) = &options.filter {
        query.append_pair("$filter", filter);
        any = true;
    }
    if !options.expand.is_empty() {
        query.append_pair("$expand", &options.expand.join(","));
        any = true;
    }
    if let Some(order_by) = &options.order_by {
        let direction = if options.descending { " desc" } else { "" };
        query.append_pair("$orderby", &format!("{order_by}{direction}"));
        any = true;
    }
    if let Some(top) = options.top {
        query.append_pair("$top", &top.to_string());
        any = true;
    }
    if let Some(skip) = options.skip {
        query.append_pair("$skip", &skip.to_string());
        any = true;
    }

    if any {
        format!("?{}", query.finish())
    } else {
        String::new()
    }
}

/// Collection reads come back as `{"results": [...]}` under the verbose
/// profile; accept a bare array as well.
fn extract_results(payload: Value) -> Vec<Value> {
    match payload {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn parse_count(payload: &Value) -> Option<u64> {
    match payload {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}
