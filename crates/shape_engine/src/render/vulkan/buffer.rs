//! Buffer management for vertex, index, and uniform data
//!
//! RAII ownership of buffer + backing memory, host-visible writes through a
//! temporary mapping, and staged uploads into device-local memory via a
//! one-shot copy submission.

use ash::{vk, Device};
use bytemuck::Pod;

use crate::geometry::Shape;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::memory::find_memory_type;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Buffer wrapper owning its backing device memory
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Allocate a buffer plus backing memory of the requested usage and
    /// visibility class.
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type_index = match find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            properties,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(VulkanError::Api(e));
            }
        };

        unsafe {
            if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
                return Err(VulkanError::Api(e));
            }
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Copy host data into the buffer through a temporary mapping.
    ///
    /// Valid only for host-visible buffers.
    pub fn write_data<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);

        unsafe {
            let mapped = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;

            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());

            self.device.unmap_memory(self.memory);
        }

        Ok(())
    }

    /// Upload host data into a device-local buffer through a staging buffer.
    ///
    /// Synchronous: the copy is recorded and submitted as a one-shot command
    /// and the destination is fully populated before this returns. The
    /// staging buffer is released on every path when the scope ends.
    pub fn device_local_with_data<T: Pod>(
        context: &VulkanContext,
        pool: &CommandPool,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let size = std::mem::size_of_val(data) as vk::DeviceSize;

        let staging = Buffer::new(
            context.device.clone(),
            &context.physical.memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(data)?;

        let destination = Buffer::new(
            context.device.clone(),
            &context.physical.memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_DST | usage,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let one_shot = pool.begin_one_shot()?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            context.device.cmd_copy_buffer(
                one_shot.command_buffer(),
                staging.handle(),
                destination.handle(),
                &[region],
            );
        }
        one_shot.submit(context.graphics_queue)?;

        Ok(destination)
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get the allocation size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Device-side vertex/index buffer pair owned one-to-one per shape.
///
/// Created once during initialization from the shape's host data and never
/// resized; a changed shape requires full recreation.
pub struct GeometryBuffers {
    /// Vertex buffer in device-local memory
    pub vertex: Buffer,
    /// Full vertex count
    pub vertex_count: u32,
    /// Index buffer in device-local memory, for indexed shapes
    pub index: Option<Buffer>,
    /// Full index count (0 when not indexed)
    pub index_count: u32,
}

impl GeometryBuffers {
    /// Upload one shape's geometry
    pub fn upload(
        context: &VulkanContext,
        pool: &CommandPool,
        shape: &Shape,
    ) -> VulkanResult<Self> {
        if shape.vertices.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("shape {} has no vertices", shape.index),
            });
        }

        let vertex = Buffer::device_local_with_data(
            context,
            pool,
            &shape.vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let index = if shape.indexed && !shape.indices.is_empty() {
            Some(Buffer::device_local_with_data(
                context,
                pool,
                &shape.indices,
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?)
        } else {
            None
        };

        log::debug!(
            "Uploaded shape {}: {} vertices, {} indices",
            shape.index,
            shape.vertex_count(),
            shape.index_count()
        );

        Ok(Self {
            vertex,
            vertex_count: shape.vertex_count(),
            index,
            index_count: shape.index_count(),
        })
    }
}
