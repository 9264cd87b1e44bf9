//! SharePoint list item and query types
//!
//! Field names use SharePoint's PascalCase column naming so items
//! serialize straight into the REST payloads.

use serde::{Deserialize, Serialize};

/// Fields present on every SharePoint list item.
///
/// Concrete list types (jobs, projects, QA packs) flatten this struct
/// and add their own columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(rename = "Id")]
    pub id: i64,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Created", default)]
    pub created: Option<String>,

    #[serde(rename = "Modified", default)]
    pub modified: Option<String>,
}

/// Metadata fields common to document library items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentItem {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "ServerRelativeUrl", default)]
    pub server_relative_url: Option<String>,

    #[serde(rename = "TimeCreated", default)]
    pub time_created: Option<String>,

    #[serde(rename = "Length", default)]
    pub length: Option<String>,
}

/// OData query options for list reads.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// OData filter expression, e.g. `Status eq 'Pending'`.
    pub filter: Option<String>,

    /// Columns to select.
    pub select: Vec<String>,

    /// Column to order by.
    pub order_by: Option<String>,

    /// Sort direction for `order_by`.
    pub descending: bool,

    /// Maximum number of items to return.
    pub top: Option<u32>,

    /// Number of items to skip (pagination).
    pub skip: Option<u32>,

    /// Related fields to expand.
    pub expand: Vec<String>,
}

/// One page of list items plus a continuation hint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_skip: Option<u32>,
}
