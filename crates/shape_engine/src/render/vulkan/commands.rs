//! Command buffer management
//!
//! Command pool ownership, scoped one-shot submissions for uploads, and the
//! per-image draw recording. Recording is split into a pure plan
//! (`plan_draws`) and an executor so the bind/draw ordering is testable
//! without a device.

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a command pool on the given queue family
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            command_pool,
        })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Return command buffers to the pool
    pub fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, buffers);
        }
    }

    /// Begin a scoped single-time submission.
    ///
    /// The returned scope frees its command buffer on every path: `submit`
    /// waits for completion and frees, and an abandoned scope frees on drop.
    pub fn begin_one_shot(&self) -> VulkanResult<OneShot<'_>> {
        let command_buffer = self.allocate_command_buffers(1)?[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        Ok(OneShot {
            pool: self,
            command_buffer,
        })
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All command buffers must be finished before the pool goes away.
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Scoped single-time command submission
pub struct OneShot<'a> {
    pool: &'a CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl OneShot<'_> {
    /// The command buffer being recorded
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// End recording, submit, and block until the queue drains.
    pub fn submit(self, queue: vk::Queue) -> VulkanResult<()> {
        let device = &self.pool.device;

        unsafe {
            device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;

            let command_buffers = [self.command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

            device
                .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            device.queue_wait_idle(queue).map_err(VulkanError::Api)?;
        }

        Ok(())
        // Drop frees the command buffer.
    }
}

impl Drop for OneShot<'_> {
    fn drop(&mut self) {
        self.pool.free_command_buffers(&[self.command_buffer]);
    }
}

/// Everything the recorder needs to draw one shape for one swapchain image
#[derive(Debug, Clone)]
pub struct ShapeBinding {
    /// Graphics pipeline the shape draws with
    pub pipeline: vk::Pipeline,
    /// Layout matching the descriptor set below
    pub pipeline_layout: vk::PipelineLayout,
    /// Descriptor set for the image being recorded
    pub descriptor_set: vk::DescriptorSet,
    /// Vertex buffer handle
    pub vertex_buffer: vk::Buffer,
    /// Full vertex count
    pub vertex_count: u32,
    /// Index buffer handle, present only for indexed shapes
    pub index_buffer: Option<vk::Buffer>,
    /// Full index count (0 when not indexed)
    pub index_count: u32,
}

/// One step of a recorded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawStep {
    /// Bind a graphics pipeline
    BindPipeline(vk::Pipeline),
    /// Bind a descriptor set at set 0
    BindDescriptorSet(vk::PipelineLayout, vk::DescriptorSet),
    /// Bind a vertex buffer at binding 0
    BindVertexBuffer(vk::Buffer),
    /// Non-indexed draw over the full vertex range
    Draw(u32),
    /// Bind a 16-bit index buffer
    BindIndexBuffer(vk::Buffer),
    /// Indexed draw over the full index range
    DrawIndexed(u32),
}

/// Build the bind/draw step list for one image, shapes in registration
/// order.
///
/// An indexed shape issues its plain vertex draw first and the indexed draw
/// second; both draws cover the same geometry. That double submission is
/// the system's long-standing observable behavior and is kept as-is.
pub fn plan_draws(shapes: &[ShapeBinding]) -> Vec<DrawStep> {
    let mut steps = Vec::new();

    for shape in shapes {
        steps.push(DrawStep::BindPipeline(shape.pipeline));
        steps.push(DrawStep::BindDescriptorSet(
            shape.pipeline_layout,
            shape.descriptor_set,
        ));
        steps.push(DrawStep::BindVertexBuffer(shape.vertex_buffer));
        steps.push(DrawStep::Draw(shape.vertex_count));

        if let Some(index_buffer) = shape.index_buffer {
            steps.push(DrawStep::BindIndexBuffer(index_buffer));
            steps.push(DrawStep::DrawIndexed(shape.index_count));
        }
    }

    steps
}

/// Record one swapchain image's command buffer: render pass on the image's
/// framebuffer, viewport/scissor at the current extent, then the step list.
pub fn record_image_commands(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    clear_values: &[vk::ClearValue],
    steps: &[DrawStep],
) -> VulkanResult<()> {
    let begin_info = vk::CommandBufferBeginInfo::builder();

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    let render_pass_begin = vk::RenderPassBeginInfo::builder()
        .render_pass(render_pass)
        .framebuffer(framebuffer)
        .render_area(render_area)
        .clear_values(clear_values);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    unsafe {
        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(VulkanError::Api)?;

        device.cmd_begin_render_pass(
            command_buffer,
            &render_pass_begin,
            vk::SubpassContents::INLINE,
        );
        device.cmd_set_viewport(command_buffer, 0, &[viewport]);
        device.cmd_set_scissor(command_buffer, 0, &[render_area]);

        for step in steps {
            match *step {
                DrawStep::BindPipeline(pipeline) => {
                    device.cmd_bind_pipeline(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline,
                    );
                }
                DrawStep::BindDescriptorSet(layout, set) => {
                    device.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        layout,
                        0,
                        &[set],
                        &[],
                    );
                }
                DrawStep::BindVertexBuffer(buffer) => {
                    device.cmd_bind_vertex_buffers(command_buffer, 0, &[buffer], &[0]);
                }
                DrawStep::Draw(vertex_count) => {
                    device.cmd_draw(command_buffer, vertex_count, 1, 0, 0);
                }
                DrawStep::BindIndexBuffer(buffer) => {
                    device.cmd_bind_index_buffer(command_buffer, buffer, 0, vk::IndexType::UINT16);
                }
                DrawStep::DrawIndexed(index_count) => {
                    device.cmd_draw_indexed(command_buffer, index_count, 1, 0, 0, 0);
                }
            }
        }

        device.cmd_end_render_pass(command_buffer);
        device
            .end_command_buffer(command_buffer)
            .map_err(VulkanError::Api)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn binding(id: u64, vertex_count: u32, indices: Option<u32>) -> ShapeBinding {
        ShapeBinding {
            pipeline: vk::Pipeline::from_raw(id),
            pipeline_layout: vk::PipelineLayout::from_raw(id),
            descriptor_set: vk::DescriptorSet::from_raw(id),
            vertex_buffer: vk::Buffer::from_raw(id),
            vertex_count,
            index_buffer: indices.map(|_| vk::Buffer::from_raw(id + 100)),
            index_count: indices.unwrap_or(0),
        }
    }

    #[test]
    fn indexed_shape_issues_plain_draw_before_indexed_draw() {
        // Deliberate behavior: the indexed draw supplements the plain draw,
        // it does not replace it.
        let steps = plan_draws(&[binding(1, 4, Some(6))]);

        assert_eq!(
            steps,
            vec![
                DrawStep::BindPipeline(vk::Pipeline::from_raw(1)),
                DrawStep::BindDescriptorSet(
                    vk::PipelineLayout::from_raw(1),
                    vk::DescriptorSet::from_raw(1)
                ),
                DrawStep::BindVertexBuffer(vk::Buffer::from_raw(1)),
                DrawStep::Draw(4),
                DrawStep::BindIndexBuffer(vk::Buffer::from_raw(101)),
                DrawStep::DrawIndexed(6),
            ]
        );
    }

    #[test]
    fn non_indexed_shape_skips_index_steps() {
        let steps = plan_draws(&[binding(2, 9, None)]);

        assert_eq!(steps.len(), 4);
        assert!(!steps
            .iter()
            .any(|step| matches!(step, DrawStep::BindIndexBuffer(_) | DrawStep::DrawIndexed(_))));
    }

    #[test]
    fn shapes_draw_in_registration_order() {
        let steps = plan_draws(&[binding(1, 3, None), binding(2, 5, Some(9))]);

        let pipelines: Vec<u64> = steps
            .iter()
            .filter_map(|step| match step {
                DrawStep::BindPipeline(p) => Some(p.as_raw()),
                _ => None,
            })
            .collect();
        assert_eq!(pipelines, vec![1, 2]);

        let draws: Vec<&DrawStep> = steps
            .iter()
            .filter(|step| matches!(step, DrawStep::Draw(_) | DrawStep::DrawIndexed(_)))
            .collect();
        assert_eq!(
            draws,
            vec![
                &DrawStep::Draw(3),
                &DrawStep::Draw(5),
                &DrawStep::DrawIndexed(9)
            ]
        );
    }

    #[test]
    fn empty_shape_list_records_nothing() {
        assert!(plan_draws(&[]).is_empty());
    }
}
