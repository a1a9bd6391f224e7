// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Bindings
//!
//! Structural descriptions of shader binding slots.  A `BindingDescriptor` is what reflection
//! produces and what layouts are made of.  Its identity for sharing purposes is the `BindingKey`,
//! which leaves out the stage mask: two pipelines that see the same slot from different stages
//! still describe the same slot.

use std::fmt;

use ash::vk;

use crate::ConfigError;

/// Set indices at or above this are rejected.  Vulkan guarantees only 4 bound sets and no driver
/// goes past 32.
pub const MAX_DESCRIPTOR_SETS: u32 = 32;

/// The descriptor types the engine binds.  Texel buffers and acceleration structures are not
/// used by any pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorKind {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformBuffer,
    StorageBuffer,
    InputAttachment,
}

impl DescriptorKind {
    pub const COUNT: usize = 7;

    pub const ALL: [DescriptorKind; Self::COUNT] = [
        DescriptorKind::Sampler,
        DescriptorKind::CombinedImageSampler,
        DescriptorKind::SampledImage,
        DescriptorKind::StorageImage,
        DescriptorKind::UniformBuffer,
        DescriptorKind::StorageBuffer,
        DescriptorKind::InputAttachment,
    ];

    /// Dense index, stable across runs.  Used for per-kind count arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn vk(self) -> vk::DescriptorType {
        match self {
            DescriptorKind::Sampler => vk::DescriptorType::SAMPLER,
            DescriptorKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            DescriptorKind::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
            DescriptorKind::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
            DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorKind::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
        }
    }

    pub fn from_vk(ty: vk::DescriptorType) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.vk() == ty)
    }

    /// Name used in the persisted capacity file.
    pub fn name(self) -> &'static str {
        match self {
            DescriptorKind::Sampler => "Sampler",
            DescriptorKind::CombinedImageSampler => "CombinedImageSampler",
            DescriptorKind::SampledImage => "SampledImage",
            DescriptorKind::StorageImage => "StorageImage",
            DescriptorKind::UniformBuffer => "UniformBuffer",
            DescriptorKind::StorageBuffer => "StorageBuffer",
            DescriptorKind::InputAttachment => "InputAttachment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Image descriptors take a `vk::DescriptorImageInfo`, the rest a `vk::DescriptorBufferInfo`.
    pub fn is_image(self) -> bool {
        !matches!(
            self,
            DescriptorKind::UniformBuffer | DescriptorKind::StorageBuffer
        )
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One shader binding slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingDescriptor {
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
    /// Array element count.  1 for non-arrays.
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

impl BindingDescriptor {
    pub fn new(
        set: u32,
        binding: u32,
        kind: DescriptorKind,
        count: u32,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        Self {
            set,
            binding,
            kind,
            count,
            stages,
        }
    }

    pub fn key(&self) -> BindingKey {
        BindingKey {
            set: self.set,
            binding: self.binding,
            kind: self.kind,
            count: self.count,
        }
    }

    pub fn vk_binding(&self) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding::default()
            .binding(self.binding)
            .descriptor_type(self.kind.vk())
            .descriptor_count(self.count)
            .stage_flags(self.stages)
    }
}

/// The part of a `BindingDescriptor` that decides whether two slots are the same slot.  Field
/// order is the canonical ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
    pub count: u32,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.set, self.binding, self.kind, self.count
        )
    }
}

/// Push-constant block of a shader or pipeline.  A zero `size` means none was declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub stages: vk::ShaderStageFlags,
}

impl PushConstantRange {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Smallest range covering both, visible to both sets of stages.
    pub fn merge(self, other: PushConstantRange) -> PushConstantRange {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let offset = self.offset.min(other.offset);
        let end = (self.offset + self.size).max(other.offset + other.size);
        PushConstantRange {
            offset,
            size: end - offset,
            stages: self.stages | other.stages,
        }
    }

    pub fn vk(&self) -> Option<vk::PushConstantRange> {
        (!self.is_empty()).then(|| vk::PushConstantRange {
            stage_flags: self.stages,
            offset: self.offset,
            size: self.size,
        })
    }
}

/// Infers a stage from a shader file name such as `pbr.frag` or `pbr.frag.spv`.
pub fn stage_from_name(name: &str) -> Result<vk::ShaderStageFlags, ConfigError> {
    let stem = name.strip_suffix(".spv").unwrap_or(name);
    let ext = stem
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .ok_or_else(|| ConfigError::UnknownShaderStage(name.to_owned()))?;
    parse_stage(ext).ok_or_else(|| ConfigError::UnknownShaderStage(name.to_owned()))
}

/// Accepts both the glslang file extensions and spelled-out stage names.
pub fn parse_stage(stage: &str) -> Option<vk::ShaderStageFlags> {
    Some(match stage {
        "vert" | "vertex" => vk::ShaderStageFlags::VERTEX,
        "frag" | "fragment" => vk::ShaderStageFlags::FRAGMENT,
        "comp" | "compute" => vk::ShaderStageFlags::COMPUTE,
        "geom" | "geometry" => vk::ShaderStageFlags::GEOMETRY,
        "tesc" | "tessellation_control" => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        "tese" | "tessellation_evaluation" => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        _ => return None,
    })
}

/// Short human-readable stage list, e.g. `vert|frag`.
pub fn stage_names(stages: vk::ShaderStageFlags) -> String {
    const NAMES: [(vk::ShaderStageFlags, &str); 6] = [
        (vk::ShaderStageFlags::VERTEX, "vert"),
        (vk::ShaderStageFlags::TESSELLATION_CONTROL, "tesc"),
        (vk::ShaderStageFlags::TESSELLATION_EVALUATION, "tese"),
        (vk::ShaderStageFlags::GEOMETRY, "geom"),
        (vk::ShaderStageFlags::FRAGMENT, "frag"),
        (vk::ShaderStageFlags::COMPUTE, "comp"),
    ];
    let names: Vec<&str> = NAMES
        .iter()
        .filter(|(flag, _)| stages.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
    if names.is_empty() {
        "none".to_owned()
    } else {
        names.join("|")
    }
}
