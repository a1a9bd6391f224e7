// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Reflection
//!
//! Reads the binding slots and push-constant block a compiled SPIR-V module declares.  Decoding is
//! done by `spirq`.  Every resource the module declares is reported, referenced or not, so a
//! layout never depends on what one entry point happens to touch.
//!
//! Two engine conventions are applied here rather than in the shaders:
//!
//! - A sampled image in a module that declares no separate sampler is reported as a combined image
//!   sampler.  Images are always written together with a sampler.
//! - Runtime-sized (bindless) arrays are reported with `BINDLESS_ARRAY_CAPACITY` elements.  They
//!   are never resized.
//!
//! Set indices must be below [`MAX_DESCRIPTOR_SETS`].  Push-constant ranges must fit in `u32`.

use ash::vk;
use spirq::ty::{DescriptorType, Type};
use spirq::var::Variable;
use tracing::trace;

use crate::ConfigError;
use crate::binding::{BindingDescriptor, DescriptorKind, MAX_DESCRIPTOR_SETS, PushConstantRange};

/// Element count reported for runtime-sized descriptor arrays.
pub const BINDLESS_ARRAY_CAPACITY: u32 = 1024;

const MAGIC: u32 = 0x0723_0203;
const HEADER_WORDS: usize = 5;

/// A binding slot together with the name the shader gave it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflectedBinding {
    pub name: String,
    pub descriptor: BindingDescriptor,
}

/// The interface of one shader stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderReflection {
    pub stage: vk::ShaderStageFlags,
    /// Ordered by `(set, binding)`.
    pub bindings: Vec<ReflectedBinding>,
    pub push_constants: Option<PushConstantRange>,
}

impl ShaderReflection {
    pub fn descriptors(&self) -> impl Iterator<Item = &BindingDescriptor> + '_ {
        self.bindings.iter().map(|b| &b.descriptor)
    }
}

/// Reflects a module given as SPIR-V words.  The module needs an entry point for `stage`.
pub fn reflect(words: &[u32], stage: vk::ShaderStageFlags) -> Result<ShaderReflection, ConfigError> {
    if words.len() < HEADER_WORDS {
        return Err(malformed("missing header"));
    }
    if words[0] != MAGIC {
        return Err(malformed(format!("bad magic {:#010x}", words[0])));
    }

    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| malformed(format!("{e:?}")))?;
    let entry_point = entry_points
        .iter()
        .find(|ep| execution_stage(ep.exec_model as u32) == Some(stage))
        .ok_or_else(|| malformed(format!("no entry point for stage {stage:?}")))?;
    trace!(entry_point = %entry_point.name, vars = entry_point.vars.len(), "reflected");

    let mut bindings: Vec<ReflectedBinding> = Vec::new();
    let mut push_constants = None;
    for var in &entry_point.vars {
        match var {
            Variable::Descriptor {
                name,
                desc_bind,
                desc_ty,
                ty,
                nbind,
                ..
            } => {
                let (set, binding) = (desc_bind.set(), desc_bind.bind());
                if set >= MAX_DESCRIPTOR_SETS {
                    return Err(ConfigError::SetOutOfRange { set, binding });
                }
                let kind = descriptor_kind(desc_ty, set, binding)?;
                let count = match u32::try_from(*nbind) {
                    Ok(0) => BINDLESS_ARRAY_CAPACITY,
                    Ok(n) => n,
                    Err(_) => {
                        return Err(malformed(format!(
                            "array at set={set} binding={binding} too long"
                        )));
                    }
                };
                let name = name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .or_else(|| block_name(ty))
                    .ok_or(ConfigError::UnnamedBinding { set, binding })?;
                insert_binding(
                    &mut bindings,
                    ReflectedBinding {
                        name: name.to_owned(),
                        descriptor: BindingDescriptor::new(set, binding, kind, count, stage),
                    },
                )?;
            }
            Variable::PushConstant { ty, .. } if push_constants.is_none() => {
                push_constants = Some(push_constant_range(ty, stage)?);
            }
            _ => {}
        }
    }

    let separate_samplers = bindings
        .iter()
        .any(|b| b.descriptor.kind == DescriptorKind::Sampler);
    if !separate_samplers {
        for b in bindings.iter_mut() {
            if b.descriptor.kind == DescriptorKind::SampledImage {
                b.descriptor.kind = DescriptorKind::CombinedImageSampler;
            }
        }
    }

    bindings.sort_by_key(|b| (b.descriptor.set, b.descriptor.binding));

    Ok(ShaderReflection {
        stage,
        bindings,
        push_constants,
    })
}

/// Reflects a module straight from file bytes.
pub fn reflect_bytes(
    bytes: &[u8],
    stage: vk::ShaderStageFlags,
) -> Result<ShaderReflection, ConfigError> {
    if bytes.len() % 4 != 0 {
        return Err(malformed(format!(
            "length not a multiple of 4: {} bytes",
            bytes.len()
        )));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<u32>)
        .collect();
    reflect(&words, stage)
}

fn malformed(reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedShader(reason.into())
}

/// Two variables may share a slot only when they describe it identically.
fn insert_binding(
    bindings: &mut Vec<ReflectedBinding>,
    reflected: ReflectedBinding,
) -> Result<(), ConfigError> {
    let (set, binding) = (reflected.descriptor.set, reflected.descriptor.binding);
    match bindings
        .iter()
        .find(|b| b.descriptor.set == set && b.descriptor.binding == binding)
    {
        Some(existing) if existing.descriptor.key() == reflected.descriptor.key() => Ok(()),
        Some(existing) => Err(malformed(format!(
            "set={set} binding={binding} aliased as {} and {}",
            existing.descriptor.kind, reflected.descriptor.kind
        ))),
        None => {
            bindings.push(reflected);
            Ok(())
        }
    }
}

fn descriptor_kind(
    desc_ty: &DescriptorType,
    set: u32,
    binding: u32,
) -> Result<DescriptorKind, ConfigError> {
    let unsupported = |reason| ConfigError::UnsupportedDescriptor {
        set,
        binding,
        reason,
    };
    Ok(match desc_ty {
        DescriptorType::Sampler(..) => DescriptorKind::Sampler,
        DescriptorType::CombinedImageSampler(..) => DescriptorKind::CombinedImageSampler,
        DescriptorType::SampledImage(..) => DescriptorKind::SampledImage,
        DescriptorType::StorageImage(..) => DescriptorKind::StorageImage,
        DescriptorType::UniformBuffer(..) => DescriptorKind::UniformBuffer,
        DescriptorType::StorageBuffer(..) => DescriptorKind::StorageBuffer,
        DescriptorType::InputAttachment(..) => DescriptorKind::InputAttachment,
        DescriptorType::UniformTexelBuffer(..) | DescriptorType::StorageTexelBuffer(..) => {
            return Err(unsupported("texel buffer"));
        }
        DescriptorType::AccelStruct(..) => return Err(unsupported("acceleration structure")),
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported("descriptor type not bound by any pass")),
    })
}

/// Name of the block type behind a binding, looking through arrays.
fn block_name(ty: &Type) -> Option<&str> {
    match ty {
        Type::Struct(st) => st.name.as_deref().filter(|n| !n.is_empty()),
        Type::Array(arr) => block_name(&arr.element_ty),
        _ => None,
    }
}

/// The range runs from the lowest member offset to the furthest member end.
fn push_constant_range(
    ty: &Type,
    stage: vk::ShaderStageFlags,
) -> Result<PushConstantRange, ConfigError> {
    let (offset, end) = match ty {
        Type::Struct(st) if !st.members.is_empty() => {
            let mut offset = usize::MAX;
            let mut end = 0usize;
            for (index, member) in st.members.iter().enumerate() {
                let start = member
                    .offset
                    .ok_or_else(|| malformed(format!("push constant member {index} has no Offset")))?;
                let size = member.ty.nbyte().ok_or_else(|| {
                    malformed(format!("push constant member {index} has no fixed size"))
                })?;
                let member_end = start.checked_add(size).ok_or_else(|| {
                    malformed(format!("push constant member {index} overflows"))
                })?;
                offset = offset.min(start);
                end = end.max(member_end);
            }
            (offset, end)
        }
        ty => (
            0,
            ty.nbyte()
                .ok_or_else(|| malformed("push constant block has no fixed size"))?,
        ),
    };

    match (u32::try_from(offset), u32::try_from(end)) {
        (Ok(offset), Ok(end)) => Ok(PushConstantRange {
            offset,
            size: end - offset,
            stages: stage,
        }),
        _ => Err(malformed(format!(
            "push constant range {offset}..{end} does not fit in u32"
        ))),
    }
}

fn execution_stage(model: u32) -> Option<vk::ShaderStageFlags> {
    Some(match model {
        0 => vk::ShaderStageFlags::VERTEX,
        1 => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        2 => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        3 => vk::ShaderStageFlags::GEOMETRY,
        4 => vk::ShaderStageFlags::FRAGMENT,
        5 => vk::ShaderStageFlags::COMPUTE,
        _ => return None,
    })
}
