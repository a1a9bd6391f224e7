// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Layouts
//!
//! Pipelines never create descriptor set layouts themselves.  Every pipeline's shaders are
//! reflected and handed to a [`LayoutBuilder`].  The builder merges the stages of each pipeline,
//! cuts the result into one binding list per set index and interns each list by its
//! [`LayoutSignature`].  Two pipelines whose set lists match structurally share one layout.  The
//! shared layout is visible to the union of the stages that use it.
//!
//! `finish` freezes the builder into a [`LayoutSet`].  `realize` then creates exactly one Vulkan
//! layout per shared layout, and `destroy` releases each of them once.
//!
//! Binding lists are compared in binding-index order and nothing else is canonicalized.  The set
//! index is part of every binding's key, so the same bindings at set 0 and at set 1 are two
//! layouts.  The empty list is the exception.  It has no bindings to carry a set index and fills
//! every gap in every pipeline's set numbering.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ash::vk;
use smallvec::SmallVec;
use tracing::debug;

use crate::binding::{
    BindingDescriptor, BindingKey, MAX_DESCRIPTOR_SETS, PushConstantRange, stage_names,
};
use crate::descriptors::DescriptorCounts;
use crate::prelude::*;
use crate::reflect::ShaderReflection;

/// Index of a shared layout in its `LayoutSet`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub usize);

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layout#{}", self.0)
    }
}

/// Structural identity of a binding list.  Stage masks are left out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutSignature(SmallVec<[BindingKey; 8]>);

impl LayoutSignature {
    pub fn of(bindings: &[BindingDescriptor]) -> Self {
        Self(bindings.iter().map(BindingDescriptor::key).collect())
    }

    pub fn keys(&self) -> &[BindingKey] {
        &self.0
    }
}

impl fmt::Display for LayoutSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("]")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutUser {
    pub pipeline: String,
    pub set: u32,
}

/// One shared layout.
#[derive(Clone, Debug)]
pub struct LayoutInfo {
    bindings: Vec<BindingDescriptor>,
    users: Vec<LayoutUser>,
}

impl LayoutInfo {
    /// Binding-index order.  Stage masks are the union over all users.
    pub fn bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }

    /// In registration order.
    pub fn users(&self) -> &[LayoutUser] {
        &self.users
    }

    pub fn signature(&self) -> LayoutSignature {
        LayoutSignature::of(&self.bindings)
    }

    /// What allocating one set of this layout takes from a pool.
    pub fn need(&self) -> DescriptorCounts {
        DescriptorCounts::for_bindings(&self.bindings)
    }

    pub fn stages(&self) -> vk::ShaderStageFlags {
        self.bindings
            .iter()
            .fold(vk::ShaderStageFlags::empty(), |acc, b| acc | b.stages)
    }
}

#[derive(Clone, Debug)]
struct PipelineLayouts {
    sets: Vec<LayoutId>,
    push_constants: PushConstantRange,
}

#[derive(Default)]
pub struct LayoutBuilder {
    layouts: Vec<LayoutInfo>,
    index: HashMap<LayoutSignature, LayoutId>,
    pipelines: BTreeMap<String, PipelineLayouts>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline made of `shaders`.  On error the builder is left as it was.
    pub fn add_pipeline(
        &mut self,
        name: &str,
        shaders: &[ShaderReflection],
    ) -> Result<(), ConfigError> {
        if self.pipelines.contains_key(name) {
            return Err(ConfigError::DuplicatePipeline(name.to_owned()));
        }

        let mut merged: BTreeMap<(u32, u32), BindingDescriptor> = BTreeMap::new();
        for shader in shaders {
            for b in shader.descriptors() {
                if b.set >= MAX_DESCRIPTOR_SETS {
                    return Err(ConfigError::SetOutOfRange {
                        set: b.set,
                        binding: b.binding,
                    });
                }
                match merged.get_mut(&(b.set, b.binding)) {
                    Some(existing) if existing.key() == b.key() => {
                        existing.stages |= b.stages;
                    }
                    Some(existing) => {
                        return Err(ConfigError::BindingMismatch {
                            pipeline: name.to_owned(),
                            set: b.set,
                            binding: b.binding,
                            first: describe(existing),
                            second: describe(b),
                        });
                    }
                    None => {
                        merged.insert((b.set, b.binding), *b);
                    }
                }
            }
        }

        let push_constants = shaders
            .iter()
            .filter_map(|s| s.push_constants)
            .fold(PushConstantRange::default(), PushConstantRange::merge);

        let set_count = merged.last_key_value().map_or(0, |((set, _), _)| set + 1);
        let mut by_set: Vec<Vec<BindingDescriptor>> = vec![Vec::new(); set_count as usize];
        for ((set, _), b) in merged {
            by_set[set as usize].push(b);
        }

        let sets = by_set
            .into_iter()
            .enumerate()
            .map(|(set, bindings)| self.intern(name, set as u32, bindings))
            .collect();

        self.pipelines.insert(
            name.to_owned(),
            PipelineLayouts {
                sets,
                push_constants,
            },
        );
        Ok(())
    }

    fn intern(&mut self, pipeline: &str, set: u32, bindings: Vec<BindingDescriptor>) -> LayoutId {
        let user = LayoutUser {
            pipeline: pipeline.to_owned(),
            set,
        };
        let signature = LayoutSignature::of(&bindings);
        if let Some(&id) = self.index.get(&signature) {
            let info = &mut self.layouts[id.0];
            for (shared, b) in info.bindings.iter_mut().zip(&bindings) {
                shared.stages |= b.stages;
            }
            info.users.push(user);
            return id;
        }
        let id = LayoutId(self.layouts.len());
        self.layouts.push(LayoutInfo {
            bindings,
            users: vec![user],
        });
        self.index.insert(signature, id);
        id
    }

    pub fn finish(self) -> LayoutSet {
        LayoutSet {
            layouts: self.layouts,
            index: self.index,
            pipelines: self.pipelines,
        }
    }
}

fn describe(b: &BindingDescriptor) -> String {
    format!("{}[{}] ({})", b.kind, b.count, stage_names(b.stages))
}

/// Every shared layout of every registered pipeline.  Immutable.
pub struct LayoutSet {
    layouts: Vec<LayoutInfo>,
    index: HashMap<LayoutSignature, LayoutId>,
    pipelines: BTreeMap<String, PipelineLayouts>,
}

impl LayoutSet {
    pub fn layouts(&self) -> &[LayoutInfo] {
        &self.layouts
    }

    pub fn layout(&self, id: LayoutId) -> Option<&LayoutInfo> {
        self.layouts.get(id.0)
    }

    /// Sorted by name.
    pub fn pipelines(&self) -> impl Iterator<Item = &str> + '_ {
        self.pipelines.keys().map(String::as_str)
    }

    /// Layouts indexed by set number.
    pub fn pipeline_layouts(&self, pipeline: &str) -> Result<&[LayoutId], ConfigError> {
        self.pipelines
            .get(pipeline)
            .map(|p| p.sets.as_slice())
            .ok_or_else(|| ConfigError::UnknownPipeline(pipeline.to_owned()))
    }

    /// Zero-sized when no stage declares push constants.
    pub fn push_constant_range(&self, pipeline: &str) -> Result<PushConstantRange, ConfigError> {
        self.pipelines
            .get(pipeline)
            .map(|p| p.push_constants)
            .ok_or_else(|| ConfigError::UnknownPipeline(pipeline.to_owned()))
    }

    /// The shared layout structurally equal to `bindings`.
    pub fn find(&self, bindings: &[BindingDescriptor]) -> Result<LayoutId, ConfigError> {
        let signature = LayoutSignature::of(bindings);
        self.index
            .get(&signature)
            .copied()
            .ok_or_else(|| ConfigError::UnknownLayout(signature.to_string()))
    }

    /// Creates one Vulkan layout per shared layout.  On failure the ones already created are
    /// destroyed.
    pub fn realize<D: DescriptorDevice>(self, device: &D) -> Result<DescriptorLayouts, VulkanError> {
        let mut realized = Vec::with_capacity(self.layouts.len());
        for (i, info) in self.layouts.iter().enumerate() {
            match device.create_set_layout(&info.bindings) {
                Ok(handle) => {
                    debug!(
                        id = i,
                        signature = %info.signature(),
                        stages = %stage_names(info.stages()),
                        users = info.users.len(),
                        "realized descriptor set layout"
                    );
                    realized.push(RealizedLayout {
                        id: LayoutId(i),
                        handle,
                        need: info.need(),
                    });
                }
                Err(e) => {
                    for r in &realized {
                        device.destroy_set_layout(r.handle);
                    }
                    return Err(e);
                }
            }
        }
        Ok(DescriptorLayouts {
            set: self,
            realized,
        })
    }
}

/// A shared layout's Vulkan handle and what one set of it needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RealizedLayout {
    pub id: LayoutId,
    pub handle: vk::DescriptorSetLayout,
    pub need: DescriptorCounts,
}

/// A `LayoutSet` whose layouts exist on the device.
pub struct DescriptorLayouts {
    set: LayoutSet,
    realized: Vec<RealizedLayout>,
}

impl DescriptorLayouts {
    pub fn layout_set(&self) -> &LayoutSet {
        &self.set
    }

    pub fn realized(&self, id: LayoutId) -> Option<&RealizedLayout> {
        self.realized.get(id.0)
    }

    /// The layout `pipeline` binds at `set`.
    pub fn pipeline_set(&self, pipeline: &str, set: u32) -> Result<&RealizedLayout, ConfigError> {
        let ids = self.set.pipeline_layouts(pipeline)?;
        ids.get(set as usize)
            .and_then(|id| self.realized.get(id.0))
            .ok_or_else(|| ConfigError::UnknownLayout(format!("{pipeline:?} set {set}")))
    }

    /// Handles indexed by set number, ready for a `vk::PipelineLayoutCreateInfo`.
    pub fn set_layouts(&self, pipeline: &str) -> Result<Vec<vk::DescriptorSetLayout>, ConfigError> {
        self.set
            .pipeline_layouts(pipeline)?
            .iter()
            .map(|id| {
                self.realized
                    .get(id.0)
                    .map(|r| r.handle)
                    .ok_or_else(|| ConfigError::UnknownLayout(id.to_string()))
            })
            .collect()
    }

    /// The caller owns the returned layout.
    pub fn create_pipeline_layout<D: DescriptorDevice>(
        &self,
        device: &D,
        pipeline: &str,
    ) -> Result<vk::PipelineLayout, VulkanError> {
        let set_layouts = self.set_layouts(pipeline)?;
        let push_constants = self.set.push_constant_range(pipeline)?;
        device.create_pipeline_layout(&set_layouts, push_constants.vk())
    }

    pub fn destroy<D: DescriptorDevice>(self, device: &D) {
        for r in &self.realized {
            device.destroy_set_layout(r.handle);
        }
    }
}
