//! A thin Vulkan rendering harness for tessellated shapes.
//!
//! The crate initializes a GPU device, uploads per-shape vertex/index
//! geometry into device-local buffers, and drives a per-frame render loop
//! with a bounded number of frames in flight. Swapchain staleness (resize,
//! out-of-date, suboptimal) is handled by a wholesale rebuild of every
//! swapchain-derived resource; every other device failure is fatal and
//! surfaced to the caller as an error.

/// Configuration loading (TOML/RON) and application settings
pub mod config;
/// Math aliases and logging bootstrap
pub mod foundation;
/// Vertex/shape records and tessellators
pub mod geometry;
/// Window shim and the Vulkan rendering backend
pub mod render;

pub use config::{AppConfig, Config, ConfigError};
pub use geometry::{Shape, ShapeKind, Vertex};
pub use render::{
    vulkan::{FrameOutcome, ShapeRenderer, VulkanError, VulkanResult},
    window::{Window, WindowError},
};
