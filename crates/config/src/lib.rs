//! Configuration loading and env substitution.
//!
//! Config files: `afk.toml`, `afk.yaml` or `afk.json`.
//! Searched in `./` then `~/.config/afk/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        AfkConfig, DelayRange, EndpointConfig, PreferredModel, ResponderConfig, TimingConfig,
        UserConfig,
    },
};
