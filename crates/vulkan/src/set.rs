// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Descriptor Sets
//!
//! Sets are plain handles.  They are freed with the pool they came from, never one by one.
//!
//! Writes copy the binding's kind and layout at the time `DescriptorWrites` is built.  Transition
//! the resource first, then write.

use ash::vk;

use crate::binding::DescriptorKind;
use crate::layout::LayoutId;
use crate::prelude::*;
use crate::resource::ResourceBinding;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorSet {
    handle: vk::DescriptorSet,
    layout: LayoutId,
}

impl DescriptorSet {
    pub(crate) fn new(handle: vk::DescriptorSet, layout: LayoutId) -> Self {
        Self { handle, layout }
    }

    /// What goes into `cmd_bind_descriptor_sets`.
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }
}

#[derive(Clone, Debug)]
pub enum DescriptorPayload {
    Images(Vec<vk::DescriptorImageInfo>),
    Buffers(Vec<vk::DescriptorBufferInfo>),
}

impl DescriptorPayload {
    pub fn len(&self) -> usize {
        match self {
            DescriptorPayload::Images(infos) => infos.len(),
            DescriptorPayload::Buffers(infos) => infos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One `vk::WriteDescriptorSet` with owned payload.
#[derive(Clone, Debug)]
pub struct DescriptorWrite {
    pub set: vk::DescriptorSet,
    pub binding: u32,
    pub array_element: u32,
    pub kind: DescriptorKind,
    pub payload: DescriptorPayload,
}

/// Batches writes into a single `update_sets` call.
#[derive(Default)]
pub struct DescriptorWrites {
    writes: Vec<DescriptorWrite>,
}

impl DescriptorWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, set: &DescriptorSet, binding: u32, resource: &ResourceBinding) -> Self {
        self.writes.push(DescriptorWrite {
            set: set.handle,
            binding,
            array_element: 0,
            kind: resource.kind(),
            payload: payload(std::slice::from_ref(resource)),
        });
        self
    }

    /// Consecutive array elements starting at `first_element`.  All resources must currently read
    /// as the same descriptor kind.
    pub fn write_array(
        mut self,
        set: &DescriptorSet,
        binding: u32,
        first_element: u32,
        resources: &[ResourceBinding],
    ) -> Result<Self, ConfigError> {
        let Some(first) = resources.first() else {
            return Ok(self);
        };
        if let Some(other) = resources.iter().find(|r| r.kind() != first.kind()) {
            return Err(ConfigError::MixedArrayWrite {
                binding,
                first: first.kind(),
                second: other.kind(),
            });
        }
        self.writes.push(DescriptorWrite {
            set: set.handle,
            binding,
            array_element: first_element,
            kind: first.kind(),
            payload: payload(resources),
        });
        Ok(self)
    }

    pub fn writes(&self) -> &[DescriptorWrite] {
        &self.writes
    }

    pub fn submit<D: DescriptorDevice>(self, device: &D) {
        if !self.writes.is_empty() {
            device.update_sets(&self.writes);
        }
    }
}

fn payload(resources: &[ResourceBinding]) -> DescriptorPayload {
    if resources.first().is_some_and(|r| r.kind().is_image()) {
        DescriptorPayload::Images(resources.iter().filter_map(|r| r.image_info()).collect())
    } else {
        DescriptorPayload::Buffers(resources.iter().filter_map(|r| r.buffer_info()).collect())
    }
}
