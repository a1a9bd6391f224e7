// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Descriptor Core
//!
//! Owns the realized layouts and the pool allocator for the life of the renderer.  `startup` reads
//! the capacity file and `shutdown` writes it.  Nothing in between touches the disk.

use std::path::{Path, PathBuf};

use tracing::info;

use prism_vulkan::capacity::PersistedCapacity;
use prism_vulkan::descriptors::DescriptorPoolAllocator;
use prism_vulkan::layout::{DescriptorLayouts, LayoutSet, RealizedLayout};
use prism_vulkan::set::DescriptorSet;

use crate::prelude::*;

pub struct DescriptorCore {
    layouts: DescriptorLayouts,
    allocator: DescriptorPoolAllocator,
    capacity_file: PathBuf,
}

impl DescriptorCore {
    /// Realizes `layouts` and warm-starts the allocator from `capacity_file` if it holds a usable
    /// capacity.
    pub fn startup<D: DescriptorDevice>(
        device: &D,
        layouts: LayoutSet,
        capacity_file: impl Into<PathBuf>,
    ) -> Result<Self, PrismError> {
        let capacity_file = capacity_file.into();
        let layouts = layouts.realize(device)?;
        let persisted = PersistedCapacity::load(&capacity_file);
        let allocator = match DescriptorPoolAllocator::new(device, persisted.as_ref()) {
            Ok(allocator) => allocator,
            Err(e) => {
                layouts.destroy(device);
                return Err(e.into());
            }
        };
        info!(
            layouts = layouts.layout_set().layouts().len(),
            warm = persisted.is_some(),
            "descriptor core started"
        );
        Ok(Self {
            layouts,
            allocator,
            capacity_file,
        })
    }

    pub fn layouts(&self) -> &DescriptorLayouts {
        &self.layouts
    }

    pub fn allocator(&self) -> &DescriptorPoolAllocator {
        &self.allocator
    }

    pub fn capacity_file(&self) -> &Path {
        &self.capacity_file
    }

    /// One set of the layout `pipeline` binds at `set`.
    pub fn allocate<D: DescriptorDevice>(
        &mut self,
        device: &D,
        pipeline: &str,
        set: u32,
    ) -> Result<DescriptorSet, PrismError> {
        let layout = self.layouts.pipeline_set(pipeline, set)?;
        Ok(self.allocator.allocate(device, layout)?)
    }

    /// One set per `(pipeline, set)` request, sized as one batch.
    pub fn allocate_batch<D: DescriptorDevice>(
        &mut self,
        device: &D,
        requests: &[(&str, u32)],
    ) -> Result<Vec<DescriptorSet>, PrismError> {
        let layouts = requests
            .iter()
            .map(|&(pipeline, set)| self.layouts.pipeline_set(pipeline, set))
            .collect::<Result<Vec<&RealizedLayout>, ConfigError>>()?;
        Ok(self.allocator.allocate_batch(device, &layouts)?)
    }

    /// Every set of `pipeline`, indexed by set number.
    pub fn allocate_pipeline<D: DescriptorDevice>(
        &mut self,
        device: &D,
        pipeline: &str,
    ) -> Result<Vec<DescriptorSet>, PrismError> {
        let count = self.layouts.layout_set().pipeline_layouts(pipeline)?.len() as u32;
        let requests: Vec<(&str, u32)> = (0..count).map(|set| (pipeline, set)).collect();
        self.allocate_batch(device, &requests)
    }

    /// Destroys pools and layouts, then persists the capacity if anything was allocated.  The
    /// pipeline layouts made with `create_pipeline_layout` must be gone already.
    pub fn shutdown<D: DescriptorDevice>(
        self,
        device: &D,
    ) -> Result<Option<PersistedCapacity>, PrismError> {
        let persisted = self.allocator.shutdown(device);
        self.layouts.destroy(device);
        if let Some(capacity) = &persisted {
            capacity.store(&self.capacity_file)?;
        }
        Ok(persisted)
    }
}
