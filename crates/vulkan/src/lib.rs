// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vulkan
//!
//! The part of the renderer that sits between shader binaries and the render loop.  Passes are
//! just fixed sequences of draws.  Wiring them together safely is the hard part, and it lives here.
//!
//! Core types:
//!
//! - **Shader inputs**
//!   * `ShaderReflection` from `reflect`
//!   * `BindingDescriptor`
//!   * `PushConstantRange`
//! - **Layouts**
//!   * `LayoutBuilder`, finished into an immutable `LayoutSet`
//!   * `DescriptorLayouts`, the realized Vulkan objects
//! - **Allocation**
//!   * `DescriptorPoolAllocator`
//!   * `PersistedCapacity`
//!   * `DescriptorSet` and `DescriptorWrites`
//! - **State**
//!   * `ImageTracker` and `BufferTracker`
//!   * `ResourceBinding`
//! - **Devices**
//!   * `DescriptorDevice` and `CommandRecorder`, implemented for `ash::Device` and
//!     `HeadlessDevice`
//!
//! Nothing here uses RAII.  Objects with Vulkan handles have a `destroy` or `shutdown` that takes
//! the device.  Validation layers will tell you when you forget.

pub mod barrier;
pub mod binding;
pub mod capacity;
pub mod context;
pub mod descriptors;
pub mod device;
pub mod headless;
pub mod layout;
pub mod reflect;
pub mod resource;
pub mod set;

use ash::vk;

use crate::binding::{DescriptorKind, MAX_DESCRIPTOR_SETS};

pub mod prelude {
    pub use super::{ConfigError, VulkanError};
    pub use crate::binding::{BindingDescriptor, DescriptorKind, PushConstantRange};
    pub use crate::device::{CommandRecorder, DescriptorDevice};
}

#[derive(thiserror::Error, Debug)]
pub enum VulkanError {
    #[error("Ash: {0}")]
    Ash(#[from] vk::Result),

    #[error("loading Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no Vulkan devices")]
    NoDevice,

    #[error("no graphics queue family")]
    NoGraphicsQueue,
}

/// Authoring and programming mistakes.  These show up during startup and resource setup, never as
/// steady-state frame conditions, so nothing retries them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("malformed shader: {0}")]
    MalformedShader(String),

    #[error("set={set} binding={binding} is past the last usable set {}", MAX_DESCRIPTOR_SETS - 1)]
    SetOutOfRange { set: u32, binding: u32 },

    #[error("shader binding set={set} binding={binding} has no name")]
    UnnamedBinding { set: u32, binding: u32 },

    #[error("unsupported descriptor at set={set} binding={binding}: {reason}")]
    UnsupportedDescriptor {
        set: u32,
        binding: u32,
        reason: &'static str,
    },

    #[error(
        "pipeline {pipeline:?} declares set={set} binding={binding} as {first} and as {second}"
    )]
    BindingMismatch {
        pipeline: String,
        set: u32,
        binding: u32,
        first: String,
        second: String,
    },

    #[error("unknown pipeline {0:?}")]
    UnknownPipeline(String),

    #[error("pipeline {0:?} declared twice")]
    DuplicatePipeline(String),

    #[error("no layout registered for signature {0}")]
    UnknownLayout(String),

    #[error("unknown shader stage {0:?}")]
    UnknownShaderStage(String),

    #[error("allocation failed from a freshly sized pool: {0}")]
    PoolExhausted(String),

    #[error("array write to binding {binding} mixes {first} and {second}")]
    MixedArrayWrite {
        binding: u32,
        first: DescriptorKind,
        second: DescriptorKind,
    },
}
