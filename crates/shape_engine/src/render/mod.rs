//! Rendering: window shim and the Vulkan backend

/// Vulkan rendering backend
pub mod vulkan;
/// GLFW window wrapper
pub mod window;

pub use vulkan::{FrameOutcome, ShapeRenderer, VulkanError, VulkanResult};
pub use window::{Window, WindowError};
