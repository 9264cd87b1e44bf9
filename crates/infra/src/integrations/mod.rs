//! External service integrations

pub mod sharepoint;

pub use sharepoint::{
    AccessTokenProvider, DocumentLibraryService, ListService, SharePointClient, TokenProvider,
};
