//! Shared error plumbing used across all folio crates.

pub mod error;

pub use error::{Error, FolioError, FromMessage, Result};
