//! Descriptor sets and per-shape uniform buffers
//!
//! Every shape owns one uniform buffer and one descriptor set per swapchain
//! image; the frame loop writes the acquired image's buffer for every shape
//! before submitting. These live independently of the swapchain-derived
//! resources and are rebuilt only when the image count actually changes.

use ash::{vk, Device};

use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::uniforms::UniformBufferObject;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Descriptor set layout: one uniform buffer at binding 0, vertex stage.
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Create the shared shape layout
    pub fn new(device: Device) -> VulkanResult<Self> {
        let bindings = [vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .build()];

        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

        let layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, layout })
    }

    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    fn new(device: Device, set_count: u32) -> VulkanResult<Self> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: set_count,
        }];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(set_count);

        let pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, pool })
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            // Frees every set allocated from the pool as well.
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

struct PerShapeUniforms {
    buffers: Vec<Buffer>,
    sets: Vec<vk::DescriptorSet>,
}

/// Uniform buffers and descriptor sets for every shape, per swapchain image
pub struct ShapeUniforms {
    pool: DescriptorPool,
    per_shape: Vec<PerShapeUniforms>,
    image_count: usize,
}

impl ShapeUniforms {
    /// Allocate buffers and descriptor sets for `shape_count` shapes across
    /// `image_count` swapchain images.
    pub fn new(
        context: &VulkanContext,
        layout: &DescriptorSetLayout,
        shape_count: usize,
        image_count: usize,
    ) -> VulkanResult<Self> {
        let total_sets = (shape_count * image_count) as u32;
        let pool = DescriptorPool::new(context.device.clone(), total_sets.max(1))?;

        let ubo_size = std::mem::size_of::<UniformBufferObject>() as vk::DeviceSize;
        let mut per_shape = Vec::with_capacity(shape_count);

        for _ in 0..shape_count {
            let mut buffers = Vec::with_capacity(image_count);
            for _ in 0..image_count {
                buffers.push(Buffer::new(
                    context.device.clone(),
                    &context.physical.memory_properties,
                    ubo_size,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    vk::MemoryPropertyFlags::HOST_VISIBLE
                        | vk::MemoryPropertyFlags::HOST_COHERENT,
                )?);
            }

            let layouts = vec![layout.handle(); image_count];
            let alloc_info = vk::DescriptorSetAllocateInfo::builder()
                .descriptor_pool(pool.pool)
                .set_layouts(&layouts);

            let sets = unsafe {
                context
                    .device
                    .allocate_descriptor_sets(&alloc_info)
                    .map_err(VulkanError::Api)?
            };

            for (set, buffer) in sets.iter().zip(buffers.iter()) {
                let buffer_info = [vk::DescriptorBufferInfo {
                    buffer: buffer.handle(),
                    offset: 0,
                    range: ubo_size,
                }];

                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info)
                    .build();

                unsafe {
                    context.device.update_descriptor_sets(&[write], &[]);
                }
            }

            per_shape.push(PerShapeUniforms { buffers, sets });
        }

        Ok(Self {
            pool,
            per_shape,
            image_count,
        })
    }

    /// Image count these uniforms were sized for
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// Write the frame's uniform data into every shape's buffer for the
    /// acquired image.
    pub fn write_all(&self, image_index: usize, ubo: &UniformBufferObject) -> VulkanResult<()> {
        for shape in &self.per_shape {
            shape.buffers[image_index].write_data(std::slice::from_ref(ubo))?;
        }
        Ok(())
    }

    /// Descriptor set for one shape at one image index
    pub fn descriptor_set(&self, shape: usize, image_index: usize) -> vk::DescriptorSet {
        self.per_shape[shape].sets[image_index]
    }
}
