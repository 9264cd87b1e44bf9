//! # SiteQA Domain
//!
//! Business domain types and models for SiteQA.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures (SharePoint connection, retry policy)
//! - SharePoint item and query types
//!
//! ## Architecture
//! - No dependencies on other SiteQA crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
