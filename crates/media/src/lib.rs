//! Media normalization: MIME helpers and JPEG transcoding for downloaded images.

pub mod error;
pub mod mime;
pub mod normalize;

pub use {
    error::{Error, Result},
    normalize::{Normalized, normalize, normalize_with_quality},
};
