// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Descriptors
//!
//! Pools are sized to exactly what was asked for.  There is no guessing at "256 of everything"
//! and hoping.  The allocator keeps an append-only list of pools.  A request is served from the
//! most recent pool that can still hold it.  If none can, a new pool is created with exactly the
//! outstanding need and nothing more.
//!
//! Exact growth means the first run of a new scene creates a lot of tiny pools.  To avoid paying
//! that every run, the cumulative totals are handed back at `shutdown` as a
//! [`PersistedCapacity`](crate::capacity::PersistedCapacity).  Passing that into the next run's
//! `new` creates one pool holding everything the previous run needed.  The allocator itself never
//! touches the file system.
//!
//! Accounting invariant, for every descriptor kind:
//!
//!   `allocated[kind] + sum(pool.remaining[kind]) == sum(pool.capacity[kind])`

use std::fmt;
use std::ops::{AddAssign, Index, IndexMut};

use ash::vk;
use tracing::{debug, info};

use crate::binding::{BindingDescriptor, DescriptorKind};
use crate::capacity::PersistedCapacity;
use crate::layout::RealizedLayout;
use crate::prelude::*;
use crate::set::DescriptorSet;

/// Set count plus per-kind descriptor counts.  Used for needs, pool capacity, remaining capacity
/// and running totals alike.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DescriptorCounts {
    pub sets: u32,
    counts: [u32; DescriptorKind::COUNT],
}

impl DescriptorCounts {
    /// `sets` set slots and no descriptors.
    pub fn with_sets(sets: u32) -> Self {
        DescriptorCounts {
            sets,
            ..Default::default()
        }
    }

    /// The need of one set allocated with these bindings.
    pub fn for_bindings(bindings: &[BindingDescriptor]) -> Self {
        let mut need = DescriptorCounts::with_sets(1);
        for b in bindings {
            need[b.kind] += b.count;
        }
        need
    }

    /// True when every count, sets included, is at least the one in `need`.
    pub fn covers(&self, need: &DescriptorCounts) -> bool {
        self.sets >= need.sets
            && self
                .counts
                .iter()
                .zip(need.counts.iter())
                .all(|(have, want)| have >= want)
    }

    pub fn is_empty(&self) -> bool {
        self.sets == 0 && self.counts.iter().all(|&c| c == 0)
    }

    /// Subtracts `used`.  Callers check `covers` first.
    pub fn consume(&mut self, used: &DescriptorCounts) {
        self.sets = self.sets.saturating_sub(used.sets);
        for (have, used) in self.counts.iter_mut().zip(used.counts.iter()) {
            *have = have.saturating_sub(*used);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DescriptorKind, u32)> + '_ {
        DescriptorKind::ALL
            .into_iter()
            .map(move |kind| (kind, self[kind]))
    }

    /// Descriptor count over all kinds.
    pub fn descriptors(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Non-zero kinds only.
    pub fn pool_sizes(&self) -> Vec<vk::DescriptorPoolSize> {
        self.iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| vk::DescriptorPoolSize {
                ty: kind.vk(),
                descriptor_count: count,
            })
            .collect()
    }
}

impl Index<DescriptorKind> for DescriptorCounts {
    type Output = u32;

    fn index(&self, kind: DescriptorKind) -> &u32 {
        &self.counts[kind.index()]
    }
}

impl IndexMut<DescriptorKind> for DescriptorCounts {
    fn index_mut(&mut self, kind: DescriptorKind) -> &mut u32 {
        &mut self.counts[kind.index()]
    }
}

impl AddAssign<&DescriptorCounts> for DescriptorCounts {
    fn add_assign(&mut self, other: &DescriptorCounts) {
        self.sets += other.sets;
        for (have, more) in self.counts.iter_mut().zip(other.counts.iter()) {
            *have += *more;
        }
    }
}

impl fmt::Display for DescriptorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sets={}", self.sets)?;
        for (kind, count) in self.iter().filter(|(_, c)| *c > 0) {
            write!(f, " {kind}={count}")?;
        }
        Ok(())
    }
}

/// One device pool and what is left in it.
#[derive(Clone, Debug)]
pub struct Pool {
    pub handle: vk::DescriptorPool,
    pub capacity: DescriptorCounts,
    pub remaining: DescriptorCounts,
}

pub struct DescriptorPoolAllocator {
    pools: Vec<Pool>,
    allocated: DescriptorCounts,
}

impl DescriptorPoolAllocator {
    /// With a persisted capacity, starts with one pool sized exactly to it.
    pub fn new<D: DescriptorDevice>(
        device: &D,
        persisted: Option<&PersistedCapacity>,
    ) -> Result<Self, VulkanError> {
        let mut allocator = Self {
            pools: Vec::new(),
            allocated: DescriptorCounts::default(),
        };
        if let Some(persisted) = persisted.filter(|p| p.counts.sets > 0) {
            info!(capacity = %persisted.counts, "warm starting descriptor pool");
            allocator.grow(device, &persisted.counts)?;
        }
        Ok(allocator)
    }

    /// Allocates one set for `layout`.
    pub fn allocate<D: DescriptorDevice>(
        &mut self,
        device: &D,
        layout: &RealizedLayout,
    ) -> Result<DescriptorSet, VulkanError> {
        let sets = self.allocate_raw(device, &[layout.handle], &layout.need)?;
        let handle = sets
            .first()
            .copied()
            .ok_or_else(|| ConfigError::PoolExhausted("device returned no set".to_owned()))?;
        Ok(DescriptorSet::new(handle, layout.id))
    }

    /// Allocates one set per layout, sized as one aggregate request.  When no pool can hold the
    /// whole batch, a single pool is created for it.
    pub fn allocate_batch<D: DescriptorDevice>(
        &mut self,
        device: &D,
        layouts: &[&RealizedLayout],
    ) -> Result<Vec<DescriptorSet>, VulkanError> {
        if layouts.is_empty() {
            return Ok(Vec::new());
        }
        let mut need = DescriptorCounts::default();
        for layout in layouts {
            need += &layout.need;
        }
        let handles: Vec<vk::DescriptorSetLayout> = layouts.iter().map(|l| l.handle).collect();

        let sets = self.allocate_raw(device, &handles, &need)?;
        if sets.len() != layouts.len() {
            return Err(ConfigError::PoolExhausted(format!(
                "device returned {} sets for a batch of {}",
                sets.len(),
                layouts.len()
            ))
            .into());
        }
        Ok(sets
            .into_iter()
            .zip(layouts)
            .map(|(handle, layout)| DescriptorSet::new(handle, layout.id))
            .collect())
    }

    fn allocate_raw<D: DescriptorDevice>(
        &mut self,
        device: &D,
        handles: &[vk::DescriptorSetLayout],
        need: &DescriptorCounts,
    ) -> Result<Vec<vk::DescriptorSet>, VulkanError> {
        for index in (0..self.pools.len()).rev() {
            if !self.pools[index].remaining.covers(need) {
                continue;
            }
            match device.allocate_sets(self.pools[index].handle, handles) {
                Ok(sets) => {
                    self.commit(index, need);
                    return Ok(sets);
                }
                // The accounting says it fits but the driver disagrees.  Leave the pool alone.
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                    debug!(pool = index, %need, "pool refused allocation, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let index = self.grow(device, need)?;
        match device.allocate_sets(self.pools[index].handle, handles) {
            Ok(sets) => {
                self.commit(index, need);
                Ok(sets)
            }
            Err(e) => Err(ConfigError::PoolExhausted(format!("{need}: {e}")).into()),
        }
    }

    fn grow<D: DescriptorDevice>(
        &mut self,
        device: &D,
        capacity: &DescriptorCounts,
    ) -> Result<usize, VulkanError> {
        let handle = device.create_pool(capacity)?;
        self.pools.push(Pool {
            handle,
            capacity: *capacity,
            remaining: *capacity,
        });
        debug!(pools = self.pools.len(), %capacity, "created descriptor pool");
        Ok(self.pools.len() - 1)
    }

    fn commit(&mut self, index: usize, need: &DescriptorCounts) {
        self.pools[index].remaining.consume(need);
        self.allocated += need;
    }

    /// Totals allocated since construction.
    pub fn allocated(&self) -> &DescriptorCounts {
        &self.allocated
    }

    /// Remaining capacity summed over all pools.
    pub fn remaining(&self) -> DescriptorCounts {
        let mut total = DescriptorCounts::default();
        for pool in &self.pools {
            total += &pool.remaining;
        }
        total
    }

    /// Capacity summed over all pools.
    pub fn capacity(&self) -> DescriptorCounts {
        let mut total = DescriptorCounts::default();
        for pool in &self.pools {
            total += &pool.capacity;
        }
        total
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Destroys every pool, freeing every set allocated from them.  Returns the totals to persist
    /// if anything was allocated.
    pub fn shutdown<D: DescriptorDevice>(self, device: &D) -> Option<PersistedCapacity> {
        for pool in &self.pools {
            device.destroy_pool(pool.handle);
        }
        (self.allocated.sets > 0).then(|| PersistedCapacity {
            counts: self.allocated,
        })
    }
}
