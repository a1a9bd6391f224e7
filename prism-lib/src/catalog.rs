// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Pipeline Catalog
//!
//! Turns the configured pipelines into a `LayoutSet`.  Shaders shared by several pipelines (a
//! fullscreen vertex shader, say) are loaded and reflected once.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use ash::vk;
use tracing::debug;

use prism_assets::{AssetDirs, AssetError};
use prism_vulkan::layout::{LayoutBuilder, LayoutSet};
use prism_vulkan::reflect::{self, ShaderReflection};

use crate::prelude::*;

#[derive(Default)]
pub struct PipelineCatalog {
    reflections: HashMap<(String, vk::ShaderStageFlags), ShaderReflection>,
}

impl PipelineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflects `entry`, loading its words through `load` unless it was reflected before.
    pub fn reflect_with<F>(
        &mut self,
        entry: &ShaderEntry,
        load: &mut F,
    ) -> Result<&ShaderReflection, PrismError>
    where
        F: FnMut(&str) -> Result<Vec<u32>, AssetError>,
    {
        let file = entry.file();
        let stage = entry.stage()?;
        match self.reflections.entry((file.to_owned(), stage)) {
            Entry::Occupied(cached) => Ok(&*cached.into_mut()),
            Entry::Vacant(slot) => {
                let words = load(file)?;
                let reflection =
                    reflect::reflect(&words, stage).map_err(|source| PrismError::Shader {
                        file: file.to_owned(),
                        source,
                    })?;
                debug!(
                    file,
                    bindings = reflection.bindings.len(),
                    push_constants = reflection.push_constants.is_some(),
                    "reflected shader"
                );
                Ok(&*slot.insert(reflection))
            }
        }
    }

    /// Reflects every configured pipeline and synthesizes the shared layouts.
    pub fn build_with<F>(
        &mut self,
        config: &RendererConfig,
        mut load: F,
    ) -> Result<LayoutSet, PrismError>
    where
        F: FnMut(&str) -> Result<Vec<u32>, AssetError>,
    {
        config.validate()?;
        let mut builder = LayoutBuilder::new();
        for pipeline in &config.pipelines {
            let mut shaders = Vec::with_capacity(pipeline.shaders.len());
            for entry in &pipeline.shaders {
                shaders.push(self.reflect_with(entry, &mut load)?.clone());
            }
            builder.add_pipeline(&pipeline.name, &shaders)?;
        }
        Ok(builder.finish())
    }

    /// `build_with` loading shaders from the asset directories.
    pub fn build(
        &mut self,
        config: &RendererConfig,
        assets: &AssetDirs,
    ) -> Result<LayoutSet, PrismError> {
        self.build_with(config, |name| assets.find_shader(name))
    }

    pub fn reflection(&self, entry: &ShaderEntry) -> Option<&ShaderReflection> {
        let stage = entry.stage().ok()?;
        self.reflections.get(&(entry.file().to_owned(), stage))
    }

    /// Number of distinct shaders reflected so far.
    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }
}
