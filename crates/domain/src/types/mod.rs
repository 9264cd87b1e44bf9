//! Domain data types

pub mod sharepoint;

pub use sharepoint::*;
