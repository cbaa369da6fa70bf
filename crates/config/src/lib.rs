//! Configuration loading, env substitution, and validation.
//!
//! Config files: `slackntell.toml`, `slackntell.yaml`, or `slackntell.json`
//! Searched in `./` then `~/.config/slackntell/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file and `SLACKNTELL_*`
//! environment overrides for every credential.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, find_config_file, load, load_config},
    schema::{DigestConfig, SlackConfig, SlackntellConfig, SmtpConfig, SupervisorConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
