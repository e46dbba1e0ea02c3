//! Configuration loading, validation, and env substitution.
//!
//! Config files: `folio.toml`, `folio.yaml`, or `folio.json`
//! Searched in `./` then `~/.config/folio/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        clear_config_dir, config_dir, discover_and_load, find_config_file,
        find_or_default_config_path, load_config, save_config, set_config_dir,
    },
    schema::{DownloadConfig, FolioConfig, OutputConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
