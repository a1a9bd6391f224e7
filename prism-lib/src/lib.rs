// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup and shutdown of the Prism descriptor core.
//!
//! `prism-vulkan` knows how to reflect shaders, share layouts, size pools and track resource
//! state, but it never reads a file.  This crate does the reading and writing around it:
//!
//! - `RendererConfig` says which pipelines exist and what shaders they are made of.
//! - `PipelineCatalog` reflects each shader file once and synthesizes the shared layouts.
//! - `DescriptorCore` realizes the layouts, warm-starts the pool allocator from the capacity file
//!   and writes the file back on shutdown.

pub mod catalog;
pub mod config;
pub mod descriptors;

pub use prism_assets as assets;
pub use prism_vulkan as vulkan;

use prism_assets::AssetError;
use prism_vulkan::capacity::CapacityError;
use prism_vulkan::{ConfigError, VulkanError};

pub mod prelude {
    pub use super::PrismError;
    pub use super::catalog::PipelineCatalog;
    pub use super::config::{PipelineConfig, RendererConfig, ShaderEntry};
    pub use super::descriptors::DescriptorCore;
    pub use prism_vulkan::prelude::*;
}

#[derive(thiserror::Error, Debug)]
pub enum PrismError {
    #[error("Vulkan: {0}")]
    Vulkan(#[from] VulkanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("shader {file:?}: {source}")]
    Shader {
        file: String,
        #[source]
        source: ConfigError,
    },

    #[error("asset: {0}")]
    Asset(#[from] AssetError),

    #[error("{0}")]
    Capacity(#[from] CapacityError),

    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}
