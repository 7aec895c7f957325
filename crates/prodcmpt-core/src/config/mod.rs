//! Project configuration
//!
//! A project is configured by one file, found by walking up from the working directory:
//! - `.prodcmptrc.toml` - dotfile config (TOML)
//! - `prodcmpt.yaml` / `prodcmpt.yml` - YAML
//! - `prodcmpt.json` - JSON, or `prodcmpt.jsonc` with comments and trailing commas
//!
//! Every section is optional. Without a config file the defaults apply: type files match
//! `**/*.type.{yaml,yml,json}`, component files `**/*.cmpt.{yaml,yml,json}`, all validation
//! messages are reported with their built-in severity and all delta checks are on.

mod loader;
mod project_config;

pub use loader::{CONFIG_FILE_NAMES, ConfigLoader};
pub use project_config::{
    DEFAULT_CMPT_PATTERNS, DEFAULT_TYPE_PATTERNS, DeltaConfiguration, ModelConfiguration,
    ProjectConfig, ValidationConfiguration,
};
