//! # SiteQA Infrastructure
//!
//! Infrastructure implementations for the SiteQA integration layer.
//!
//! This crate contains:
//! - Configuration loading from the environment
//! - The SharePoint REST integration (token provider, retrying client,
//!   list and document services)
//!
//! ## Architecture
//! - Depends on `siteqa-domain` for types and errors
//! - Contains all "impure" code (network I/O, environment access)

pub mod config;
pub mod integrations;

// Re-export commonly used items
pub use integrations::*;
