//! Project configuration file structure
//!
//! ## Example Configuration (prodcmpt.yaml)
//!
//! ```yaml
//! model:
//!   types:
//!     - "model/**/*.type.yaml"
//!   components:
//!     - "products/**/*.cmpt.yaml"
//!
//! validation:
//!   enabled: true
//!   disabled:
//!     - PRODUCTCMPT_LINK-DuplicateRelationTarget
//!   severities:
//!     PRODUCTCMPT_TEMPLATE-InvalidTemplateValueStatus: warning
//!
//! delta:
//!   checkHiddenAttributes: true
//!   checkInheritedFallbacks: true
//! ```

use crate::diagnostics::Severity;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_TYPE_PATTERNS: [&str; 3] = ["**/*.type.yaml", "**/*.type.yml", "**/*.type.json"];
pub const DEFAULT_CMPT_PATTERNS: [&str; 3] = ["**/*.cmpt.yaml", "**/*.cmpt.yml", "**/*.cmpt.json"];

/// Root of a project configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// JSON schema reference for editor support
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Where type and component files live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfiguration>,

    /// Which validation messages are reported and how severe they are
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfiguration>,

    /// Optional delta checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaConfiguration>,
}

/// File discovery for the type model and the product components
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    #[schemars(description = "Glob patterns of product component type files")]
    pub types: Option<Vec<String>>,

    #[schemars(description = "Glob patterns of product component files")]
    pub components: Option<Vec<String>>,

    #[schemars(description = "Glob patterns of files to skip")]
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfiguration {
    #[schemars(description = "Enable or disable validation")]
    pub enabled: Option<bool>,

    #[schemars(description = "Message codes that are never reported")]
    pub disabled: Option<Vec<String>>,

    #[schemars(description = "Severity overrides keyed by message code")]
    pub severities: Option<HashMap<String, Severity>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeltaConfiguration {
    #[schemars(description = "Report hidden attributes whose value differs from the model default")]
    pub check_hidden_attributes: Option<bool>,

    #[schemars(description = "Report inherited values whose cached fallback is stale")]
    pub check_inherited_fallbacks: Option<bool>,
}

impl ProjectConfig {
    /// Load a configuration file, choosing the format by file name
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let ext = path.extension().and_then(|e| e.to_str());
        match ext {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            Some("jsonc") => Ok(json5::from_str(content)?),
            Some("toml") => Ok(toml::from_str(content)?),
            _ => Err("Unsupported file extension (expected .yaml, .yml, .json, .jsonc or .toml)".into()),
        }
    }

    pub fn type_patterns(&self) -> Vec<String> {
        self.model
            .as_ref()
            .and_then(|m| m.types.clone())
            .unwrap_or_else(|| DEFAULT_TYPE_PATTERNS.iter().map(|p| p.to_string()).collect())
    }

    pub fn cmpt_patterns(&self) -> Vec<String> {
        self.model
            .as_ref()
            .and_then(|m| m.components.clone())
            .unwrap_or_else(|| DEFAULT_CMPT_PATTERNS.iter().map(|p| p.to_string()).collect())
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        self.model
            .as_ref()
            .and_then(|m| m.exclude.clone())
            .unwrap_or_default()
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation
            .as_ref()
            .and_then(|v| v.enabled)
            .unwrap_or(true)
    }

    pub fn disabled_codes(&self) -> Vec<String> {
        self.validation
            .as_ref()
            .and_then(|v| v.disabled.clone())
            .unwrap_or_default()
    }

    pub fn severity_overrides(&self) -> HashMap<String, Severity> {
        self.validation
            .as_ref()
            .and_then(|v| v.severities.clone())
            .unwrap_or_default()
    }

    pub fn check_hidden_attributes(&self) -> bool {
        self.delta
            .as_ref()
            .and_then(|d| d.check_hidden_attributes)
            .unwrap_or(true)
    }

    pub fn check_inherited_fallbacks(&self) -> bool {
        self.delta
            .as_ref()
            .and_then(|d| d.check_inherited_fallbacks)
            .unwrap_or(true)
    }

    /// Configuration written by `prodcmpt config init`
    pub fn example() -> Self {
        Self {
            schema: None,
            model: Some(ModelConfiguration {
                types: Some(DEFAULT_TYPE_PATTERNS.iter().map(|p| p.to_string()).collect()),
                components: Some(DEFAULT_CMPT_PATTERNS.iter().map(|p| p.to_string()).collect()),
                exclude: None,
            }),
            validation: Some(ValidationConfiguration {
                enabled: Some(true),
                disabled: None,
                severities: None,
            }),
            delta: Some(DeltaConfiguration {
                check_hidden_attributes: Some(true),
                check_inherited_fallbacks: Some(true),
            }),
        }
    }

    /// JSON schema of the configuration file
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(ProjectConfig);
        serde_json::to_value(&schema).unwrap_or_default()
    }
}
