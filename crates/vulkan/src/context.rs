// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Context
//!
//! Entry, instance and a logical device with one graphics queue, encapsulated by `VkContext`.
//! There is no surface.  The descriptor core only needs a device to create layouts and pools on,
//! plus a command pool for recording barriers.
//!
//! Set `PRISM_VALIDATION` to any non-empty value to enable the Khronos validation layer.

use std::ffi::CStr;

use ash::vk;
use tracing::{info, warn};

use crate::prelude::*;

static VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub const VALIDATION_ENV: &str = "PRISM_VALIDATION";

pub struct VkContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    /// Vulkan logical device
    pub device: ash::Device,
    pub graphics_family: u32,
    pub graphics_queue: vk::Queue,
    pub command_pool: vk::CommandPool,
}

impl VkContext {
    /// Obtain an entry, instance, and initialized device.
    ///
    /// NEXT device choice via config and heuristics (discrete vs on-CPU).  The first device with a
    /// graphics queue wins.
    pub fn new() -> Result<Self, VulkanError> {
        let entry = unsafe { ash::Entry::load()? };

        let validation = std::env::var(VALIDATION_ENV).is_ok_and(|v| !v.is_empty());
        let mut layers = Vec::new();
        if validation {
            let available = unsafe { entry.enumerate_instance_layer_properties()? };
            let present = available.iter().any(|layer| {
                layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER)
            });
            if present {
                layers.push(VALIDATION_LAYER.as_ptr());
            } else {
                warn!("{VALIDATION_ENV} set but the validation layer is not installed");
            }
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"prism")
            .api_version(vk::make_api_version(0, 1, 2, 0));
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers);
        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let physical_devices = match unsafe { instance.enumerate_physical_devices() } {
            Ok(devices) => devices,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e.into());
            }
        };
        let Some((physical_device, graphics_family)) =
            physical_devices.iter().find_map(|&pd| {
                let families =
                    unsafe { instance.get_physical_device_queue_family_properties(pd) };
                min_caps_family(&families, vk::QueueFlags::GRAPHICS).map(|i| (pd, i))
            })
        else {
            unsafe { instance.destroy_instance(None) };
            return Err(if physical_devices.is_empty() {
                VulkanError::NoDevice
            } else {
                VulkanError::NoGraphicsQueue
            });
        };

        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(graphics_family)
            .queue_priorities(&priorities)];
        let device_info = vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos);
        let device = match unsafe { instance.create_device(physical_device, &device_info, None) } {
            Ok(device) => device,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e.into());
            }
        };

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(graphics_family);
        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                unsafe {
                    device.destroy_device(None);
                    instance.destroy_instance(None);
                }
                return Err(e.into());
            }
        };

        let props = unsafe { instance.get_physical_device_properties(physical_device) };
        info!(
            device = ?props.device_name_as_c_str().unwrap_or(c"unknown"),
            validation = !layers.is_empty(),
            "Vulkan context ready"
        );

        Ok(Self {
            entry,
            instance,
            physical_device,
            device,
            graphics_family,
            graphics_queue,
            command_pool,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// A primary command buffer from the graphics pool, freed with the pool.
    pub fn command_buffer(&self) -> Result<vk::CommandBuffer, VulkanError> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&info)? };
        buffers
            .first()
            .copied()
            .ok_or(VulkanError::Ash(vk::Result::ERROR_UNKNOWN))
    }

    // XXX in reality, this consumes the context, but ownership friction needs worked out.
    pub fn destroy(&self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Index of the family with the fewest capabilities beyond `flags`.  Dedicated families first.
fn min_caps_family(families: &[vk::QueueFamilyProperties], flags: vk::QueueFlags) -> Option<u32> {
    families
        .iter()
        .enumerate()
        .filter(|(_, qf)| qf.queue_flags.contains(flags) && qf.queue_count > 0)
        .min_by_key(|(_, qf)| qf.queue_flags.as_raw().count_ones())
        .map(|(i, _)| i as u32)
}
