// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Barriers
//!
//! One tracker per resource, one current state per tracker.  Nothing here knows about frames in
//! flight or reorders anything.  Barriers are recorded in call order, so call `transition_to`
//! right before the resource is used in a new way.
//!
//! An image tracker owns the [`ResourceBinding`] for its image.  Every transition refreshes the
//! binding's layout and descriptor kind, so a descriptor write built afterwards always matches the
//! layout the image will be in when the commands execute.

use ash::vk;
use tracing::trace;

use crate::prelude::*;
use crate::resource::ResourceBinding;

/// Where an image is and how it was last touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageState {
    pub access: vk::AccessFlags,
    pub layout: vk::ImageLayout,
    pub stage: vk::PipelineStageFlags,
}

impl ImageState {
    pub const UNDEFINED: Self = Self {
        access: vk::AccessFlags::empty(),
        layout: vk::ImageLayout::UNDEFINED,
        stage: vk::PipelineStageFlags::TOP_OF_PIPE,
    };

    pub const TRANSFER_DST: Self = Self {
        access: vk::AccessFlags::TRANSFER_WRITE,
        layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        stage: vk::PipelineStageFlags::TRANSFER,
    };

    pub const TRANSFER_SRC: Self = Self {
        access: vk::AccessFlags::TRANSFER_READ,
        layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        stage: vk::PipelineStageFlags::TRANSFER,
    };

    /// Sampled from fragment shaders.
    pub const SHADER_READ: Self = Self {
        access: vk::AccessFlags::SHADER_READ,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
    };

    /// Read and written as a storage image by compute.
    pub const COMPUTE_STORAGE: Self = Self {
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::SHADER_READ.as_raw() | vk::AccessFlags::SHADER_WRITE.as_raw(),
        ),
        layout: vk::ImageLayout::GENERAL,
        stage: vk::PipelineStageFlags::COMPUTE_SHADER,
    };

    pub const COLOR_ATTACHMENT: Self = Self {
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::COLOR_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags::COLOR_ATTACHMENT_WRITE.as_raw(),
        ),
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    };

    pub const DEPTH_ATTACHMENT: Self = Self {
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        stage: vk::PipelineStageFlags::from_raw(
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS.as_raw()
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS.as_raw(),
        ),
    };

    /// Depth-only attachment with separate depth and stencil layouts.
    pub const DEPTH_ONLY_ATTACHMENT: Self = Self {
        layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        ..Self::DEPTH_ATTACHMENT
    };

    pub const STENCIL_ONLY_ATTACHMENT: Self = Self {
        layout: vk::ImageLayout::STENCIL_ATTACHMENT_OPTIMAL,
        ..Self::DEPTH_ATTACHMENT
    };

    /// `ATTACHMENT_OPTIMAL` leaves color or depth to the format, so both are covered.
    pub const ANY_ATTACHMENT: Self = Self {
        access: vk::AccessFlags::from_raw(
            Self::COLOR_ATTACHMENT.access.as_raw() | Self::DEPTH_ATTACHMENT.access.as_raw(),
        ),
        layout: vk::ImageLayout::ATTACHMENT_OPTIMAL,
        stage: vk::PipelineStageFlags::from_raw(
            Self::COLOR_ATTACHMENT.stage.as_raw() | Self::DEPTH_ATTACHMENT.stage.as_raw(),
        ),
    };

    pub const PRESENT: Self = Self {
        access: vk::AccessFlags::empty(),
        layout: vk::ImageLayout::PRESENT_SRC_KHR,
        stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    };

    /// Infers access and stage for callers that only know the layout they want.  Unknown layouts
    /// get the conservative all-commands state.
    pub fn for_layout(layout: vk::ImageLayout) -> Self {
        match layout {
            vk::ImageLayout::UNDEFINED => Self::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => Self::TRANSFER_DST,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL => Self::TRANSFER_SRC,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => Self::SHADER_READ,
            vk::ImageLayout::GENERAL => Self::COMPUTE_STORAGE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => Self::COLOR_ATTACHMENT,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => Self::DEPTH_ATTACHMENT,
            vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL => Self::DEPTH_ONLY_ATTACHMENT,
            vk::ImageLayout::STENCIL_ATTACHMENT_OPTIMAL => Self::STENCIL_ONLY_ATTACHMENT,
            vk::ImageLayout::ATTACHMENT_OPTIMAL => Self::ANY_ATTACHMENT,
            vk::ImageLayout::PRESENT_SRC_KHR => Self::PRESENT,
            layout => Self {
                access: vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
                layout,
                stage: vk::PipelineStageFlags::ALL_COMMANDS,
            },
        }
    }
}

/// Buffers have no layout, only the last access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferState {
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
}

impl BufferState {
    pub const UNUSED: Self = Self {
        access: vk::AccessFlags::empty(),
        stage: vk::PipelineStageFlags::TOP_OF_PIPE,
    };

    pub const TRANSFER_DST: Self = Self {
        access: vk::AccessFlags::TRANSFER_WRITE,
        stage: vk::PipelineStageFlags::TRANSFER,
    };

    pub const HOST_WRITE: Self = Self {
        access: vk::AccessFlags::HOST_WRITE,
        stage: vk::PipelineStageFlags::HOST,
    };

    pub const UNIFORM_READ: Self = Self {
        access: vk::AccessFlags::UNIFORM_READ,
        stage: vk::PipelineStageFlags::from_raw(
            vk::PipelineStageFlags::VERTEX_SHADER.as_raw()
                | vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw(),
        ),
    };

    pub const VERTEX_INPUT: Self = Self {
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::VERTEX_ATTRIBUTE_READ.as_raw() | vk::AccessFlags::INDEX_READ.as_raw(),
        ),
        stage: vk::PipelineStageFlags::VERTEX_INPUT,
    };

    pub const COMPUTE_READ: Self = Self {
        access: vk::AccessFlags::SHADER_READ,
        stage: vk::PipelineStageFlags::COMPUTE_SHADER,
    };

    pub const COMPUTE_WRITE: Self = Self {
        access: vk::AccessFlags::from_raw(
            vk::AccessFlags::SHADER_READ.as_raw() | vk::AccessFlags::SHADER_WRITE.as_raw(),
        ),
        stage: vk::PipelineStageFlags::COMPUTE_SHADER,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: vk::Image,
    pub aspect: vk::ImageAspectFlags,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub from: ImageState,
    pub to: ImageState,
}

impl ImageBarrier {
    /// Every mip level and array layer.
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.array_layers,
        }
    }

    pub fn vk(&self) -> vk::ImageMemoryBarrier<'static> {
        vk::ImageMemoryBarrier::default()
            .src_access_mask(self.from.access)
            .dst_access_mask(self.to.access)
            .old_layout(self.from.layout)
            .new_layout(self.to.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(self.subresource_range())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBarrier {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub from: BufferState,
    pub to: BufferState,
}

impl BufferBarrier {
    pub fn vk(&self) -> vk::BufferMemoryBarrier<'static> {
        vk::BufferMemoryBarrier::default()
            .src_access_mask(self.from.access)
            .dst_access_mask(self.to.access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(self.buffer)
            .offset(self.offset)
            .size(self.size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Barrier {
    Image(ImageBarrier),
    Buffer(BufferBarrier),
}

impl Barrier {
    /// `(src, dst)` stages for `cmd_pipeline_barrier`.
    pub fn stages(&self) -> (vk::PipelineStageFlags, vk::PipelineStageFlags) {
        match self {
            Barrier::Image(b) => (b.from.stage, b.to.stage),
            Barrier::Buffer(b) => (b.from.stage, b.to.stage),
        }
    }
}

/// Aspect implied by a format.
pub fn aspect_for_format(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D32_SFLOAT => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

pub struct ImageTracker {
    image: vk::Image,
    format: vk::Format,
    mip_levels: u32,
    array_layers: u32,
    state: ImageState,
    binding: ResourceBinding,
}

impl ImageTracker {
    /// A freshly created image.  Its contents are undefined until the first transition.
    pub fn new(
        image: vk::Image,
        view: vk::ImageView,
        format: vk::Format,
        mip_levels: u32,
        array_layers: u32,
    ) -> Self {
        Self {
            image,
            format,
            mip_levels: mip_levels.max(1),
            array_layers: array_layers.max(1),
            state: ImageState::UNDEFINED,
            binding: ResourceBinding::image(view),
        }
    }

    /// Records a barrier into `next` and refreshes the binding.  Returns `false` when nothing was
    /// recorded because the image is already in exactly `next`.  Write-after-write ordering between
    /// two uses of the same state is the caller's barrier to record.
    pub fn transition_to<R: CommandRecorder>(
        &mut self,
        recorder: &R,
        cmd: vk::CommandBuffer,
        next: ImageState,
    ) -> bool {
        if self.state == next {
            return false;
        }
        let barrier = ImageBarrier {
            image: self.image,
            aspect: aspect_for_format(self.format),
            mip_levels: self.mip_levels,
            array_layers: self.array_layers,
            from: self.state,
            to: next,
        };
        trace!(
            image = ?self.image,
            from = ?self.state.layout,
            to = ?next.layout,
            "image barrier"
        );
        recorder.pipeline_barrier(cmd, &Barrier::Image(barrier));
        self.state = next;
        self.binding.refresh(next.layout);
        true
    }

    /// `transition_to` with access and stage inferred from the layout.
    pub fn transition_layout<R: CommandRecorder>(
        &mut self,
        recorder: &R,
        cmd: vk::CommandBuffer,
        layout: vk::ImageLayout,
    ) -> bool {
        self.transition_to(recorder, cmd, ImageState::for_layout(layout))
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn layout(&self) -> vk::ImageLayout {
        self.state.layout
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn binding(&self) -> &ResourceBinding {
        &self.binding
    }

    /// The sampler used when the image is written as a combined image sampler.
    pub fn set_sampler(&mut self, sampler: Option<vk::Sampler>) {
        self.binding.set_sampler(sampler);
    }
}

pub struct BufferTracker {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    state: BufferState,
}

impl BufferTracker {
    pub fn new(buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        Self {
            buffer,
            offset,
            size,
            state: BufferState::UNUSED,
        }
    }

    /// Same rule as images: a transition into the current state records nothing.
    pub fn transition_to<R: CommandRecorder>(
        &mut self,
        recorder: &R,
        cmd: vk::CommandBuffer,
        next: BufferState,
    ) -> bool {
        if self.state == next {
            return false;
        }
        let barrier = BufferBarrier {
            buffer: self.buffer,
            offset: self.offset,
            size: self.size,
            from: self.state,
            to: next,
        };
        trace!(buffer = ?self.buffer, from = ?self.state.access, to = ?next.access, "buffer barrier");
        recorder.pipeline_barrier(cmd, &Barrier::Buffer(barrier));
        self.state = next;
        true
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }
}
