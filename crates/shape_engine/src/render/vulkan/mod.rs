//! Vulkan rendering backend
//!
//! Low-level wrappers follow RAII ownership: every resource category is an
//! owning type whose `Drop` releases the device objects, so teardown is the
//! reverse of construction with no explicit free lists.

/// Buffer creation and staged uploads
pub mod buffer;
/// Command pool, one-shot submissions, and per-image draw recording
pub mod commands;
/// Instance/surface/device bootstrap and the error taxonomy
pub mod context;
/// Per-shape uniform buffers and descriptor sets
pub mod descriptor;
/// Framebuffers and depth/color attachments
pub mod framebuffer;
/// Frame slots, image fence aliasing, and the per-frame state machine
pub mod frame;
/// Device memory type selection
pub mod memory;
/// Shader modules and the graphics pipeline
pub mod pipeline;
/// Forward render pass
pub mod render_pass;
/// Top-level renderer lifecycle
pub mod renderer;
/// Swapchain and surface-parameter selection
pub mod swapchain;
/// Semaphore/fence wrappers
pub mod sync;
/// Uniform buffer object layout and animation
pub mod uniforms;

pub use buffer::{Buffer, GeometryBuffers};
pub use commands::CommandPool;
pub use context::{PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use descriptor::ShapeUniforms;
pub use frame::{FrameFlight, FrameOutcome, MAX_FRAMES_IN_FLIGHT};
pub use framebuffer::{ColorBuffer, DepthBuffer, Framebuffer};
pub use pipeline::{GraphicsPipeline, ShaderModule};
pub use render_pass::RenderPass;
pub use renderer::ShapeRenderer;
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use uniforms::UniformBufferObject;
