//! Assembler configuration file.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    assemble::CodeAssembler,
    validation::{GlslShaderStage, GlslValidation},
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblerConfig {
    pub separator: String,
    pub annotate: bool,
    pub trailing_newline: bool,
    pub validation: ValidationConfig,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        let assembler = CodeAssembler::default();
        Self {
            separator: assembler.separator,
            annotate: assembler.annotate,
            trailing_newline: assembler.trailing_newline,
            validation: ValidationConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub stage: GlslShaderStage,
    pub defines: BTreeMap<String, String>,
    /// Symbol environment; `None` means the Blinn-Phong prelude.
    pub prelude: Option<String>,
}

impl AssemblerConfig {
    pub fn assembler(&self) -> CodeAssembler {
        CodeAssembler {
            separator: self.separator.clone(),
            annotate: self.annotate,
            trailing_newline: self.trailing_newline,
        }
    }

    pub fn glsl_validation(&self) -> GlslValidation {
        GlslValidation {
            stage: self.validation.stage,
            prelude: self
                .validation
                .prelude
                .clone()
                .unwrap_or_else(|| crate::validation::BLINN_PHONG_PRELUDE.to_string()),
            defines: self.validation.defines.clone(),
        }
    }
}

pub fn load_config_from_path(path: impl AsRef<std::path::Path>) -> Result<AssemblerConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AssemblerConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid assembler config json in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config: AssemblerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AssemblerConfig::default());
        assert_eq!(config.assembler(), CodeAssembler::default());
    }

    #[test]
    fn test_camel_case_fields() {
        let config: AssemblerConfig = serde_json::from_str(
            r#"{
                "separator": "\n",
                "annotate": true,
                "trailingNewline": false,
                "validation": {
                    "enabled": true,
                    "stage": "vertex",
                    "defines": { "PHYSICALLY_CORRECT_LIGHTS": "1" }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.separator, "\n");
        assert!(config.annotate);
        assert!(!config.trailing_newline);
        assert!(config.validation.enabled);
        assert_eq!(config.validation.stage, GlslShaderStage::Vertex);

        let validation = config.glsl_validation();
        assert_eq!(validation.defines["PHYSICALLY_CORRECT_LIGHTS"], "1");
        assert!(validation.prelude.contains("RECIPROCAL_PI"));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let result: Result<AssemblerConfig, _> =
            serde_json::from_str(r#"{ "validation": { "stage": "geometry" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_mentions_path() {
        let err = load_config_from_path("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
