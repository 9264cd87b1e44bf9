//! SharePoint REST integration
//!
//! Talks to a SharePoint Online site over its `_api` REST surface with
//! the verbose OData profile. The moving parts:
//!
//! - [`auth`]: client-credential token acquisition with caching
//! - [`classify`]: maps failed responses to structured [`ApiError`]s
//! - [`retry`]: exponential backoff around retryable failures
//! - [`client`]: the request facade (GET/POST/MERGE/DELETE, upload,
//!   download)
//! - [`lists`]: typed operations on SharePoint lists
//! - [`documents`]: document library (folder/file) operations
//!
//! [`ApiError`]: siteqa_domain::ApiError

pub mod auth;
pub mod classify;
pub mod client;
pub mod documents;
pub mod lists;
pub mod retry;

pub use auth::{AccessTokenProvider, TokenProvider};
pub use client::SharePointClient;
pub use documents::DocumentLibraryService;
pub use lists::ListService;
