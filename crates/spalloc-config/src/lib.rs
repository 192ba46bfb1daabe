//! Configuration document loading for spalloc (spec §6's configuration
//! table), TOML-based with environment-variable overrides.
//!
//! Grounded on `knhk-config` (teacher: `seanchatmangpt-knhk`): the same
//! `env > file > defaults` hierarchy, `serde(default)` throughout.

pub mod config;
pub mod env;
pub mod schema;

pub use config::{load_config, load_from_file, validate_config, ConfigError};
pub use schema::{
    AllocatorConfig, DbConfig, KeepaliveConfig, PriorityScaleConfig, SpallocConfig,
    StateControlConfig, TransceiverConfig,
};
