// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Headless Device
//!
//! A software stand-in for the descriptor half of a Vulkan device.  Handles are counters.  Pools
//! enforce their capacity the way a driver does and answer `ERROR_OUT_OF_POOL_MEMORY` when full.
//! Every write and barrier is recorded so tests and the workbench can look at what would have
//! reached the GPU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use ash::vk;
use ash::vk::Handle;

use crate::barrier::Barrier;
use crate::binding::BindingDescriptor;
use crate::descriptors::DescriptorCounts;
use crate::prelude::*;
use crate::set::DescriptorWrite;

#[derive(Default)]
struct Inner {
    next_handle: u64,
    set_layouts: HashMap<u64, DescriptorCounts>,
    pipeline_layouts: HashSet<u64>,
    pools: HashMap<u64, DescriptorCounts>,
    created_pools: Vec<DescriptorCounts>,
    refusals: u32,
    writes: Vec<DescriptorWrite>,
    barriers: Vec<Barrier>,
}

impl Inner {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

#[derive(Default)]
pub struct HeadlessDevice {
    inner: RefCell<Inner>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` set allocations fail with `ERROR_OUT_OF_POOL_MEMORY` regardless of capacity.
    pub fn refuse_next_allocations(&self, n: u32) {
        self.inner.borrow_mut().refusals = n;
    }

    /// Capacity of every pool ever created, in creation order.
    pub fn created_pools(&self) -> Vec<DescriptorCounts> {
        self.inner.borrow().created_pools.clone()
    }

    pub fn live_pools(&self) -> usize {
        self.inner.borrow().pools.len()
    }

    pub fn live_set_layouts(&self) -> usize {
        self.inner.borrow().set_layouts.len()
    }

    pub fn live_pipeline_layouts(&self) -> usize {
        self.inner.borrow().pipeline_layouts.len()
    }

    pub fn writes(&self) -> Vec<DescriptorWrite> {
        self.inner.borrow().writes.clone()
    }

    pub fn barriers(&self) -> Vec<Barrier> {
        self.inner.borrow().barriers.clone()
    }
}

impl DescriptorDevice for HeadlessDevice {
    fn create_set_layout(
        &self,
        bindings: &[BindingDescriptor],
    ) -> Result<vk::DescriptorSetLayout, VulkanError> {
        let mut inner = self.inner.borrow_mut();
        let handle = inner.handle();
        inner
            .set_layouts
            .insert(handle, DescriptorCounts::for_bindings(bindings));
        Ok(vk::DescriptorSetLayout::from_raw(handle))
    }

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.inner.borrow_mut().set_layouts.remove(&layout.as_raw());
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
        _push_constants: Option<vk::PushConstantRange>,
    ) -> Result<vk::PipelineLayout, VulkanError> {
        let mut inner = self.inner.borrow_mut();
        if set_layouts
            .iter()
            .any(|l| !inner.set_layouts.contains_key(&l.as_raw()))
        {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED.into());
        }
        let handle = inner.handle();
        inner.pipeline_layouts.insert(handle);
        Ok(vk::PipelineLayout::from_raw(handle))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.inner
            .borrow_mut()
            .pipeline_layouts
            .remove(&layout.as_raw());
    }

    fn create_pool(&self, capacity: &DescriptorCounts) -> Result<vk::DescriptorPool, VulkanError> {
        let mut inner = self.inner.borrow_mut();
        let handle = inner.handle();
        inner.pools.insert(handle, *capacity);
        inner.created_pools.push(*capacity);
        Ok(vk::DescriptorPool::from_raw(handle))
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        self.inner.borrow_mut().pools.remove(&pool.as_raw());
    }

    fn allocate_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>, vk::Result> {
        let mut inner = self.inner.borrow_mut();
        if inner.refusals > 0 {
            inner.refusals -= 1;
            return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
        }

        let mut need = DescriptorCounts::default();
        for layout in layouts {
            let layout_need = inner
                .set_layouts
                .get(&layout.as_raw())
                .ok_or(vk::Result::ERROR_UNKNOWN)?;
            need += layout_need;
        }

        let remaining = inner
            .pools
            .get_mut(&pool.as_raw())
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        if !remaining.covers(&need) {
            return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
        }
        remaining.consume(&need);

        Ok(layouts
            .iter()
            .map(|_| vk::DescriptorSet::from_raw(inner.handle()))
            .collect())
    }

    fn update_sets(&self, writes: &[DescriptorWrite]) {
        self.inner
            .borrow_mut()
            .writes
            .extend(writes.iter().cloned());
    }
}

impl CommandRecorder for HeadlessDevice {
    fn pipeline_barrier(&self, _cmd: vk::CommandBuffer, barrier: &Barrier) {
        self.inner.borrow_mut().barriers.push(*barrier);
    }
}
