// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Configuration
//!
//! `prism.toml` declares the render pipelines and where descriptor capacity is persisted:
//!
//! ```toml
//! [descriptors]
//! capacity_file = "descriptor_capacity.txt"
//!
//! [[pipeline]]
//! name = "pbr"
//! shaders = ["pbr.vert", "pbr.frag"]
//!
//! [[pipeline]]
//! name = "ssao"
//! shaders = ["fullscreen.vert", { file = "ssao_main", stage = "fragment" }]
//! ```
//!
//! A plain shader entry names its stage with its last extension.  Use the table form when the
//! file name does not.  `PRISM_CAPACITY_FILE` overrides `capacity_file`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ash::vk;
use serde::Deserialize;
use tracing::warn;

use prism_vulkan::binding::{parse_stage, stage_from_name};

use crate::prelude::*;

pub const CONFIG_FILE: &str = "prism.toml";
pub const CAPACITY_FILE_ENV: &str = "PRISM_CAPACITY_FILE";
pub const DEFAULT_CAPACITY_FILE: &str = "descriptor_capacity.txt";

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RendererConfig {
    #[serde(default)]
    pub descriptors: DescriptorConfig,
    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineConfig>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DescriptorConfig {
    #[serde(default = "default_capacity_file")]
    pub capacity_file: PathBuf,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            capacity_file: default_capacity_file(),
        }
    }
}

fn default_capacity_file() -> PathBuf {
    PathBuf::from(DEFAULT_CAPACITY_FILE)
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub name: String,
    /// In stage order.
    pub shaders: Vec<ShaderEntry>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ShaderEntry {
    File(String),
    Staged { file: String, stage: String },
}

impl ShaderEntry {
    pub fn file(&self) -> &str {
        match self {
            ShaderEntry::File(file) => file,
            ShaderEntry::Staged { file, .. } => file,
        }
    }

    pub fn stage(&self) -> Result<vk::ShaderStageFlags, ConfigError> {
        match self {
            ShaderEntry::File(file) => stage_from_name(file),
            ShaderEntry::Staged { stage, .. } => {
                parse_stage(stage).ok_or_else(|| ConfigError::UnknownShaderStage(stage.clone()))
            }
        }
    }
}

impl RendererConfig {
    /// Parses and validates.
    pub fn parse(text: &str) -> Result<Self, PrismError> {
        let config: RendererConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PrismError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Pipeline names are unique and every shader's stage is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for pipeline in &self.pipelines {
            if !names.insert(pipeline.name.as_str()) {
                return Err(ConfigError::DuplicatePipeline(pipeline.name.clone()));
            }
            for shader in &pipeline.shaders {
                shader.stage()?;
            }
        }
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Result<&PipelineConfig, ConfigError> {
        self.pipelines
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownPipeline(name.to_owned()))
    }

    /// `PRISM_CAPACITY_FILE` when set, else the configured file.
    pub fn capacity_file(&self) -> PathBuf {
        self.capacity_file_with(std::env::var(CAPACITY_FILE_ENV).ok())
    }

    fn capacity_file_with(&self, env: Option<String>) -> PathBuf {
        match env {
            Some(raw) if !raw.trim().is_empty() => PathBuf::from(raw),
            Some(_) => {
                warn!("ignoring empty {CAPACITY_FILE_ENV}");
                self.descriptors.capacity_file.clone()
            }
            None => self.descriptors.capacity_file.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE: &str = r#"
[descriptors]
capacity_file = "cache/capacity.txt"

[[pipeline]]
name = "pbr"
shaders = ["pbr.vert", "pbr.frag"]

[[pipeline]]
name = "ssao"
shaders = ["fullscreen.vert", { file = "ssao_main", stage = "fragment" }]
"#;

    #[test]
    fn test_parse_example() {
        let config = RendererConfig::parse(EXAMPLE).unwrap();
        assert_eq!(
            config.descriptors.capacity_file,
            PathBuf::from("cache/capacity.txt")
        );
        assert_eq!(config.pipelines.len(), 2);
        let ssao = config.pipeline("ssao").unwrap();
        assert_eq!(ssao.shaders[1].file(), "ssao_main");
        assert_eq!(
            ssao.shaders[1].stage().unwrap(),
            vk::ShaderStageFlags::FRAGMENT
        );
        assert_eq!(
            config.pipeline("pbr").unwrap().shaders[0].stage().unwrap(),
            vk::ShaderStageFlags::VERTEX
        );
        assert!(matches!(
            config.pipeline("bloom"),
            Err(ConfigError::UnknownPipeline(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = RendererConfig::parse("").unwrap();
        assert!(config.pipelines.is_empty());
        assert_eq!(
            config.descriptors.capacity_file,
            PathBuf::from(DEFAULT_CAPACITY_FILE)
        );
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = r#"
[[pipeline]]
name = "sky"
shaders = ["sky.vert"]
[[pipeline]]
name = "sky"
shaders = ["sky.frag"]
"#;
        assert!(matches!(
            RendererConfig::parse(duplicate),
            Err(PrismError::Config(ConfigError::DuplicatePipeline(_)))
        ));

        let unknown_stage = r#"
[[pipeline]]
name = "sky"
shaders = ["sky.glsl"]
"#;
        assert!(matches!(
            RendererConfig::parse(unknown_stage),
            Err(PrismError::Config(ConfigError::UnknownShaderStage(_)))
        ));

        assert!(matches!(
            RendererConfig::parse("[[pipeline]]\nname = 3\n"),
            Err(PrismError::Toml(_))
        ));
    }

    #[test]
    fn test_capacity_file_override() {
        let config = RendererConfig::default();
        assert_eq!(
            config.capacity_file_with(Some("/tmp/prism.txt".to_owned())),
            PathBuf::from("/tmp/prism.txt")
        );
        assert_eq!(
            config.capacity_file_with(Some("  ".to_owned())),
            PathBuf::from(DEFAULT_CAPACITY_FILE)
        );
        assert_eq!(
            config.capacity_file_with(None),
            PathBuf::from(DEFAULT_CAPACITY_FILE)
        );
    }
}
