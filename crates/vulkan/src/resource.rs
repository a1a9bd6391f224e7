// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Resource Bindings
//!
//! What a descriptor write needs to know about one live resource.  A binding never owns GPU
//! memory.  For images the descriptor kind and layout are not chosen by the caller.  They follow
//! the layout the image is actually in, which only the owning
//! [`ImageTracker`](crate::barrier::ImageTracker) may change.

use ash::vk;

use crate::binding::DescriptorKind;

/// Descriptor kind an image in `layout` is read through.
///
/// | layout                                 | kind                                       |
/// |----------------------------------------|--------------------------------------------|
/// | `SHADER_READ_ONLY_OPTIMAL`             | `CombinedImageSampler` with a sampler attached, else `SampledImage` |
/// | `GENERAL`                              | `StorageImage`                             |
/// | any color, depth or stencil attachment | `InputAttachment`                          |
/// | anything else                          | `StorageImage`                             |
pub fn descriptor_kind_for_layout(layout: vk::ImageLayout, has_sampler: bool) -> DescriptorKind {
    match layout {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL if has_sampler => {
            DescriptorKind::CombinedImageSampler
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => DescriptorKind::SampledImage,
        vk::ImageLayout::GENERAL => DescriptorKind::StorageImage,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        | vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        | vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
        | vk::ImageLayout::STENCIL_ATTACHMENT_OPTIMAL
        | vk::ImageLayout::ATTACHMENT_OPTIMAL => DescriptorKind::InputAttachment,
        _ => DescriptorKind::StorageImage,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundResource {
    Image {
        view: vk::ImageView,
        sampler: Option<vk::Sampler>,
        layout: vk::ImageLayout,
    },
    Buffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceBinding {
    kind: DescriptorKind,
    resource: BoundResource,
}

impl ResourceBinding {
    /// A view of an image that has not been transitioned yet.
    pub fn image(view: vk::ImageView) -> Self {
        let layout = vk::ImageLayout::UNDEFINED;
        Self {
            kind: descriptor_kind_for_layout(layout, false),
            resource: BoundResource::Image {
                view,
                sampler: None,
                layout,
            },
        }
    }

    pub fn uniform_buffer(buffer: vk::Buffer, offset: vk::DeviceSize, range: vk::DeviceSize) -> Self {
        Self {
            kind: DescriptorKind::UniformBuffer,
            resource: BoundResource::Buffer {
                buffer,
                offset,
                range,
            },
        }
    }

    pub fn storage_buffer(buffer: vk::Buffer, offset: vk::DeviceSize, range: vk::DeviceSize) -> Self {
        Self {
            kind: DescriptorKind::StorageBuffer,
            resource: BoundResource::Buffer {
                buffer,
                offset,
                range,
            },
        }
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn resource(&self) -> &BoundResource {
        &self.resource
    }

    /// `None` for buffers.
    pub fn layout(&self) -> Option<vk::ImageLayout> {
        match self.resource {
            BoundResource::Image { layout, .. } => Some(layout),
            BoundResource::Buffer { .. } => None,
        }
    }

    pub fn sampler(&self) -> Option<vk::Sampler> {
        match self.resource {
            BoundResource::Image { sampler, .. } => sampler,
            BoundResource::Buffer { .. } => None,
        }
    }

    /// Attaches or removes a sampler.  The kind is re-derived from the current layout.  No-op on
    /// buffers.
    pub fn set_sampler(&mut self, sampler: Option<vk::Sampler>) {
        if let BoundResource::Image {
            sampler: ref mut current,
            layout,
            ..
        } = self.resource
        {
            *current = sampler;
            self.kind = descriptor_kind_for_layout(layout, sampler.is_some());
        }
    }

    /// Follows the image into `layout`.  Only trackers call this.
    pub(crate) fn refresh(&mut self, layout: vk::ImageLayout) {
        if let BoundResource::Image {
            layout: ref mut current,
            sampler,
            ..
        } = self.resource
        {
            *current = layout;
            self.kind = descriptor_kind_for_layout(layout, sampler.is_some());
        }
    }

    pub fn image_info(&self) -> Option<vk::DescriptorImageInfo> {
        match self.resource {
            BoundResource::Image {
                view,
                sampler,
                layout,
            } => Some(vk::DescriptorImageInfo {
                sampler: sampler.unwrap_or_default(),
                image_view: view,
                image_layout: layout,
            }),
            BoundResource::Buffer { .. } => None,
        }
    }

    pub fn buffer_info(&self) -> Option<vk::DescriptorBufferInfo> {
        match self.resource {
            BoundResource::Buffer {
                buffer,
                offset,
                range,
            } => Some(vk::DescriptorBufferInfo {
                buffer,
                offset,
                range,
            }),
            BoundResource::Image { .. } => None,
        }
    }
}
