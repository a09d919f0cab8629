//! Top-level renderer lifecycle
//!
//! `ShapeRenderer` wires the subsystems together: it builds everything once
//! at construction, drives the per-frame state machine, and rebuilds the
//! swapchain-derived resources wholesale when the surface goes stale.
//! Ownership is scoped: the renderer owns swapchain-derived resources and
//! per-frame primitives; shape geometry and uniforms live for the
//! renderer's whole lifetime.

use ash::vk;
use std::time::Instant;

use crate::config::AppConfig;
use crate::geometry::Shape;
use crate::render::vulkan::buffer::GeometryBuffers;
use crate::render::vulkan::commands::{self, CommandPool, ShapeBinding};
use crate::render::vulkan::descriptor::{DescriptorSetLayout, ShapeUniforms};
use crate::render::vulkan::frame::{AcquireOutcome, FrameFlight, FrameOutcome, PresentOutcome};
use crate::render::vulkan::framebuffer::{ColorBuffer, DepthBuffer, Framebuffer};
use crate::render::vulkan::pipeline::{GraphicsPipeline, ShaderModule};
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::uniforms::UniformBufferObject;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};
use crate::render::window::Window;

/// Map the configured MSAA count onto Vulkan sample flags.
///
/// Unsupported counts fall back to single-sampling rather than failing:
/// sample count is a quality knob, not a correctness requirement.
fn sample_count_from(samples: u32) -> vk::SampleCountFlags {
    match samples {
        1 => vk::SampleCountFlags::TYPE_1,
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        other => {
            log::warn!("Unsupported MSAA count {other}, falling back to 1");
            vk::SampleCountFlags::TYPE_1
        }
    }
}

/// The rendering harness: device setup, geometry upload, per-frame loop.
///
/// Field order is teardown order (reverse of construction); the context
/// drops last.
pub struct ShapeRenderer {
    // Swapchain-derived state, rebuilt wholesale on invalidation.
    command_buffers: Vec<vk::CommandBuffer>,
    framebuffers: Vec<Framebuffer>,
    color: Option<ColorBuffer>,
    depth: DepthBuffer,
    swapchain: Swapchain,

    // Frame synchronization primitives.
    frames: FrameFlight,

    // Long-lived resources.
    uniforms: ShapeUniforms,
    descriptor_layout: DescriptorSetLayout,
    pipeline: GraphicsPipeline,
    geometry: Vec<GeometryBuffers>,
    shapes: Vec<Shape>,
    command_pool: CommandPool,
    render_pass: RenderPass,

    start_time: Instant,
    vsync: bool,
    samples: vk::SampleCountFlags,

    context: VulkanContext,
}

impl ShapeRenderer {
    /// Build the full rendering stack for the given shapes.
    ///
    /// Shapes must be populated before this is called; their geometry is
    /// uploaded here and never mutated afterwards.
    pub fn new(
        window: &mut Window,
        config: &AppConfig,
        shapes: Vec<Shape>,
    ) -> VulkanResult<Self> {
        if shapes.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "at least one shape must be registered".to_string(),
            });
        }

        log::debug!("Initializing renderer with {} shapes", shapes.len());

        let context = VulkanContext::new(window, &config.window.title)?;
        let samples = sample_count_from(config.msaa_samples);
        let vsync = config.vsync;

        let swapchain = Swapchain::new(
            &context,
            window.framebuffer_extent(),
            vsync,
            vk::SwapchainKHR::null(),
        )?;

        let render_pass = RenderPass::new_forward_pass(
            context.device.clone(),
            swapchain.format().format,
            samples,
        )?;

        let descriptor_layout = DescriptorSetLayout::new(context.device.clone())?;

        let vertex_shader = ShaderModule::from_file(
            context.device.clone(),
            &config.shaders.vertex_shader_path,
        )?;
        let fragment_shader = ShaderModule::from_file(
            context.device.clone(),
            &config.shaders.fragment_shader_path,
        )?;
        let pipeline = GraphicsPipeline::new(
            context.device.clone(),
            render_pass.handle(),
            descriptor_layout.handle(),
            &vertex_shader,
            &fragment_shader,
            samples,
        )?;

        let depth = DepthBuffer::new(
            context.device.clone(),
            &context.physical.memory_properties,
            swapchain.extent(),
            samples,
        )?;
        let color = if samples == vk::SampleCountFlags::TYPE_1 {
            None
        } else {
            Some(ColorBuffer::new(
                context.device.clone(),
                &context.physical.memory_properties,
                swapchain.extent(),
                swapchain.format().format,
                samples,
            )?)
        };
        let framebuffers =
            Self::create_framebuffers(&context, &render_pass, &swapchain, &depth, &color)?;

        let command_pool =
            CommandPool::new(context.device.clone(), context.physical.graphics_family)?;

        let geometry = shapes
            .iter()
            .map(|shape| GeometryBuffers::upload(&context, &command_pool, shape))
            .collect::<VulkanResult<Vec<_>>>()?;

        let uniforms = ShapeUniforms::new(
            &context,
            &descriptor_layout,
            shapes.len(),
            swapchain.image_count(),
        )?;

        let command_buffers =
            command_pool.allocate_command_buffers(swapchain.image_count() as u32)?;
        Self::record_command_buffers(
            &context,
            &render_pass,
            &swapchain,
            &framebuffers,
            &command_buffers,
            &pipeline,
            &uniforms,
            &geometry,
        )?;

        let frames = FrameFlight::new(&context.device, swapchain.image_count())?;

        log::debug!("Renderer initialized");

        Ok(Self {
            command_buffers,
            framebuffers,
            color,
            depth,
            swapchain,
            frames,
            uniforms,
            descriptor_layout,
            pipeline,
            geometry,
            shapes,
            command_pool,
            render_pass,
            start_time: Instant::now(),
            vsync,
            samples,
            context,
        })
    }

    /// Render one frame.
    ///
    /// Returns `SkippedRebuilt` when the swapchain went stale before
    /// submission: the frame is dropped, the swapchain rebuilt, and the
    /// frame slot left unchanged. Staleness discovered at present time
    /// still counts as `Rendered` — the rebuild happens before the next
    /// frame begins.
    pub fn draw_frame(&mut self, window: &mut Window) -> VulkanResult<FrameOutcome> {
        self.frames.wait_current()?;

        let (image_index, acquired_suboptimal) = match self.frames.acquire(&self.swapchain)? {
            AcquireOutcome::OutOfDate => {
                self.recreate_swapchain(window)?;
                return Ok(FrameOutcome::SkippedRebuilt);
            }
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
        };

        let extent = self.swapchain.extent();
        let aspect = extent.width as f32 / extent.height as f32;
        let ubo = UniformBufferObject::animated(self.start_time.elapsed().as_secs_f32(), aspect);
        self.uniforms.write_all(image_index as usize, &ubo)?;

        self.frames
            .wait_image_and_alias(&self.context.device, image_index)?;

        self.frames.submit(
            &self.context.device,
            self.context.graphics_queue,
            self.command_buffers[image_index as usize],
        )?;

        let presented =
            self.frames
                .present(self.context.present_queue, &self.swapchain, image_index)?;

        let resized = window.take_resize_flag();
        if presented == PresentOutcome::Stale || acquired_suboptimal || resized {
            self.recreate_swapchain(window)?;
        }

        self.frames.advance();
        Ok(FrameOutcome::Rendered)
    }

    /// Block until the device finishes all in-flight work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    /// Tear down and rebuild every swapchain-derived resource.
    ///
    /// Waits for the device to go idle first so no in-flight GPU work can
    /// reference the resources being destroyed. The old swapchain handle is
    /// passed to the replacement's create info and then destroyed exactly
    /// once when the old wrapper drops.
    fn recreate_swapchain(&mut self, window: &Window) -> VulkanResult<()> {
        let extent = window.framebuffer_extent();
        if extent.width == 0 || extent.height == 0 {
            // Minimized; rebuild on the next nonzero-size frame.
            log::debug!("Deferring swapchain rebuild while drawable is zero-sized");
            return Ok(());
        }

        log::debug!(
            "Recreating swapchain at {}x{}",
            extent.width,
            extent.height
        );

        self.context.wait_idle()?;

        // Old framebuffers, color/depth attachments, and command buffers go
        // first; they reference the swapchain being replaced.
        self.framebuffers.clear();
        self.color = None;
        self.command_pool.free_command_buffers(&self.command_buffers);
        self.command_buffers.clear();

        let replacement =
            Swapchain::new(&self.context, extent, self.vsync, self.swapchain.handle())?;
        let old = std::mem::replace(&mut self.swapchain, replacement);
        drop(old);

        self.depth = DepthBuffer::new(
            self.context.device.clone(),
            &self.context.physical.memory_properties,
            self.swapchain.extent(),
            self.samples,
        )?;
        if self.samples != vk::SampleCountFlags::TYPE_1 {
            self.color = Some(ColorBuffer::new(
                self.context.device.clone(),
                &self.context.physical.memory_properties,
                self.swapchain.extent(),
                self.swapchain.format().format,
                self.samples,
            )?);
        }
        self.framebuffers = Self::create_framebuffers(
            &self.context,
            &self.render_pass,
            &self.swapchain,
            &self.depth,
            &self.color,
        )?;

        // Uniform buffers and descriptor sets are indexed by image; they
        // survive rebuilds unless the image count itself changed.
        if self.uniforms.image_count() != self.swapchain.image_count() {
            log::debug!(
                "Swapchain image count changed to {}, reallocating uniforms",
                self.swapchain.image_count()
            );
            self.uniforms = ShapeUniforms::new(
                &self.context,
                &self.descriptor_layout,
                self.shapes.len(),
                self.swapchain.image_count(),
            )?;
        }

        self.command_buffers = self
            .command_pool
            .allocate_command_buffers(self.swapchain.image_count() as u32)?;
        Self::record_command_buffers(
            &self.context,
            &self.render_pass,
            &self.swapchain,
            &self.framebuffers,
            &self.command_buffers,
            &self.pipeline,
            &self.uniforms,
            &self.geometry,
        )?;

        self.frames.rebind_images(self.swapchain.image_count());

        Ok(())
    }

    /// One framebuffer per swapchain image, over the attachments the render
    /// pass expects: [view, depth] single-sampled, [color, depth, view]
    /// multisampled.
    fn create_framebuffers(
        context: &VulkanContext,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
        depth: &DepthBuffer,
        color: &Option<ColorBuffer>,
    ) -> VulkanResult<Vec<Framebuffer>> {
        swapchain
            .image_views()
            .iter()
            .map(|&view| {
                let attachments: Vec<vk::ImageView> = match color {
                    Some(color) => vec![color.view(), depth.view(), view],
                    None => vec![view, depth.view()],
                };
                Framebuffer::new(
                    context.device.clone(),
                    render_pass.handle(),
                    &attachments,
                    swapchain.extent(),
                )
            })
            .collect()
    }

    /// Record every swapchain image's command buffer: all shapes in
    /// registration order, each binding its pipeline, descriptor set, and
    /// buffers.
    fn record_command_buffers(
        context: &VulkanContext,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
        framebuffers: &[Framebuffer],
        command_buffers: &[vk::CommandBuffer],
        pipeline: &GraphicsPipeline,
        uniforms: &ShapeUniforms,
        geometry: &[GeometryBuffers],
    ) -> VulkanResult<()> {
        let clear_values = render_pass.clear_values();

        for (image_index, (&command_buffer, framebuffer)) in
            command_buffers.iter().zip(framebuffers).enumerate()
        {
            let bindings: Vec<ShapeBinding> = geometry
                .iter()
                .enumerate()
                .map(|(shape_index, buffers)| ShapeBinding {
                    pipeline: pipeline.handle(),
                    pipeline_layout: pipeline.layout(),
                    descriptor_set: uniforms.descriptor_set(shape_index, image_index),
                    vertex_buffer: buffers.vertex.handle(),
                    vertex_count: buffers.vertex_count,
                    index_buffer: buffers.index.as_ref().map(|b| b.handle()),
                    index_count: buffers.index_count,
                })
                .collect();

            let steps = commands::plan_draws(&bindings);
            commands::record_image_commands(
                &context.device,
                command_buffer,
                render_pass.handle(),
                framebuffer.handle(),
                swapchain.extent(),
                &clear_values,
                &steps,
            )?;
        }

        Ok(())
    }
}

impl Drop for ShapeRenderer {
    fn drop(&mut self) {
        // No field may be destroyed while the GPU still references it.
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during renderer teardown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msaa_counts_map_to_sample_flags() {
        assert_eq!(sample_count_from(1), vk::SampleCountFlags::TYPE_1);
        assert_eq!(sample_count_from(4), vk::SampleCountFlags::TYPE_4);
        assert_eq!(sample_count_from(8), vk::SampleCountFlags::TYPE_8);
    }

    #[test]
    fn unsupported_msaa_count_falls_back_to_single_sampling() {
        assert_eq!(sample_count_from(0), vk::SampleCountFlags::TYPE_1);
        assert_eq!(sample_count_from(3), vk::SampleCountFlags::TYPE_1);
        assert_eq!(sample_count_from(16), vk::SampleCountFlags::TYPE_1);
    }
}
