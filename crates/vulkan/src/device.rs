// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Device
//!
//! The few device entry points the descriptor core calls, as traits.  `ash::Device` implements
//! them for real work.  [`HeadlessDevice`](crate::headless::HeadlessDevice) implements them for
//! tests and dry runs.

use ash::vk;

use crate::barrier::Barrier;
use crate::binding::BindingDescriptor;
use crate::descriptors::DescriptorCounts;
use crate::prelude::*;
use crate::set::{DescriptorPayload, DescriptorWrite};

pub trait DescriptorDevice {
    fn create_set_layout(
        &self,
        bindings: &[BindingDescriptor],
    ) -> Result<vk::DescriptorSetLayout, VulkanError>;

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constants: Option<vk::PushConstantRange>,
    ) -> Result<vk::PipelineLayout, VulkanError>;

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    /// A pool holding exactly `capacity`.
    fn create_pool(&self, capacity: &DescriptorCounts) -> Result<vk::DescriptorPool, VulkanError>;

    fn destroy_pool(&self, pool: vk::DescriptorPool);

    /// One set per layout.  Errors are the raw driver result so callers can tell an exhausted pool
    /// from a lost device.
    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>, vk::Result>;

    fn update_sets(&self, writes: &[DescriptorWrite]);
}

pub trait CommandRecorder {
    fn pipeline_barrier(&self, cmd: vk::CommandBuffer, barrier: &Barrier);
}

impl DescriptorDevice for ash::Device {
    fn create_set_layout(
        &self,
        bindings: &[BindingDescriptor],
    ) -> Result<vk::DescriptorSetLayout, VulkanError> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> =
            bindings.iter().map(BindingDescriptor::vk_binding).collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        Ok(unsafe { self.create_descriptor_set_layout(&info, None)? })
    }

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constants: Option<vk::PushConstantRange>,
    ) -> Result<vk::PipelineLayout, VulkanError> {
        let ranges: Vec<vk::PushConstantRange> = push_constants.into_iter().collect();
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(&ranges);
        Ok(unsafe { ash::Device::create_pipeline_layout(self, &info, None)? })
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { ash::Device::destroy_pipeline_layout(self, layout, None) };
    }

    fn create_pool(&self, capacity: &DescriptorCounts) -> Result<vk::DescriptorPool, VulkanError> {
        let sizes = capacity.pool_sizes();
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(capacity.sets)
            .pool_sizes(&sizes);
        Ok(unsafe { self.create_descriptor_pool(&info, None)? })
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>, vk::Result> {
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(layouts);
        unsafe { self.allocate_descriptor_sets(&info) }
    }

    fn update_sets(&self, writes: &[DescriptorWrite]) {
        let writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|w| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(w.set)
                    .dst_binding(w.binding)
                    .dst_array_element(w.array_element)
                    .descriptor_type(w.kind.vk());
                match &w.payload {
                    DescriptorPayload::Images(infos) => write.image_info(infos),
                    DescriptorPayload::Buffers(infos) => write.buffer_info(infos),
                }
            })
            .collect();
        unsafe { self.update_descriptor_sets(&writes, &[]) };
    }
}

impl CommandRecorder for ash::Device {
    fn pipeline_barrier(&self, cmd: vk::CommandBuffer, barrier: &Barrier) {
        let (src, dst) = barrier.stages();
        match barrier {
            Barrier::Image(b) => unsafe {
                self.cmd_pipeline_barrier(
                    cmd,
                    src,
                    dst,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[b.vk()],
                );
            },
            Barrier::Buffer(b) => unsafe {
                self.cmd_pipeline_barrier(
                    cmd,
                    src,
                    dst,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[b.vk()],
                    &[],
                );
            },
        }
    }
}
