//! Vulkan swapchain management
//!
//! Swapchain, images, and image views with RAII cleanup. Surface-parameter
//! selection lives in free functions so the policies are testable.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Prefer SRGB B8G8R8A8; fall back to the first reported format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

/// Prefer MAILBOX unless vsync is requested; FIFO is always available.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }

    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Surface-fixed extent when reported, otherwise the drawable size clamped
/// to the surface's min/max bounds.
pub fn choose_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    drawable_extent: vk::Extent2D,
) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: drawable_extent.width.clamp(
            caps.min_image_extent.width,
            caps.max_image_extent.width,
        ),
        height: drawable_extent.height.clamp(
            caps.min_image_extent.height,
            caps.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, clamped when the surface bounds the count.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        preferred.min(caps.max_image_count)
    } else {
        preferred
    }
}

/// Swapchain wrapper owning images and views
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Build a swapchain from current surface capabilities.
    ///
    /// `old_swapchain` is handed to the create info during recreation so the
    /// driver can recycle the presentable images; the caller drops the old
    /// wrapper (destroying the old handle exactly once) after this returns.
    pub fn new(
        context: &VulkanContext,
        drawable_extent: vk::Extent2D,
        vsync: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let loader = SwapchainLoader::new(context.instance(), &context.device);
        let (caps, formats, present_modes) =
            query_surface_support(&context.surface_loader, context.physical.device, context.surface)?;

        if formats.is_empty() || present_modes.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "surface reports no formats or present modes".to_string(),
            ));
        }

        let format = choose_surface_format(&formats);
        let present_mode = choose_present_mode(&present_modes, vsync);
        let extent = choose_extent(&caps, drawable_extent);
        let image_count = choose_image_count(&caps);

        let queue_families = [
            context.physical.graphics_family,
            context.physical.present_family,
        ];
        let concurrent = queue_families[0] != queue_families[1];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        create_info = if concurrent {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let device = context.device.clone();
        let image_views = match create_image_views(&device, &images, format.format) {
            Ok(views) => views,
            Err(e) => {
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(e);
            }
        };

        log::debug!(
            "Swapchain created: {} images, {}x{}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            present_mode
        );

        Ok(Self {
            device,
            loader,
            swapchain,
            image_views,
            format,
            extent,
        })
    }

    /// Get the swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get the surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get the per-image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of presentable images
    pub fn image_count(&self) -> usize {
        self.image_views.len()
    }

    /// Get the swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the swapchain extension loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

fn query_surface_support(
    surface_loader: &Surface,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> VulkanResult<(
    vk::SurfaceCapabilitiesKHR,
    Vec<vk::SurfaceFormatKHR>,
    Vec<vk::PresentModeKHR>,
)> {
    unsafe {
        let caps = surface_loader
            .get_physical_device_surface_capabilities(device, surface)
            .map_err(VulkanError::Api)?;
        let formats = surface_loader
            .get_physical_device_surface_formats(device, surface)
            .map_err(VulkanError::Api)?;
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(device, surface)
            .map_err(VulkanError::Api)?;
        Ok((caps, formats, present_modes))
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> VulkanResult<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());

    for &image in images {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = match unsafe { device.create_image_view(&create_info, None) } {
            Ok(view) => view,
            Err(e) => {
                for view in views {
                    unsafe { device.destroy_image_view(view, None) };
                }
                return Err(VulkanError::Api(e));
            }
        };
        views.push(view);
    }

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(
        current: (u32, u32),
        min: (u32, u32),
        max: (u32, u32),
        min_images: u32,
        max_images: u32,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            min_image_count: min_images,
            max_image_count: max_images,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_srgb_bgra_format() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];

        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn vsync_forces_fifo_even_when_mailbox_exists() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];

        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
        assert_eq!(
            choose_present_mode(&modes, false),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn fixed_surface_extent_wins() {
        let caps = caps((800, 600), (1, 1), (4096, 4096), 2, 0);
        let extent = choose_extent(&caps, vk::Extent2D { width: 100, height: 100 });

        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn free_extent_clamps_to_surface_bounds() {
        let caps = caps((u32::MAX, u32::MAX), (200, 200), (1000, 1000), 2, 0);

        let small = choose_extent(&caps, vk::Extent2D { width: 50, height: 50 });
        assert_eq!((small.width, small.height), (200, 200));

        let large = choose_extent(&caps, vk::Extent2D { width: 5000, height: 5000 });
        assert_eq!((large.width, large.height), (1000, 1000));

        let inside = choose_extent(&caps, vk::Extent2D { width: 640, height: 480 });
        assert_eq!((inside.width, inside.height), (640, 480));
    }

    #[test]
    fn image_count_is_min_plus_one_bounded_by_max() {
        let unbounded = caps((1, 1), (1, 1), (1, 1), 2, 0);
        assert_eq!(choose_image_count(&unbounded), 3);

        let bounded = caps((1, 1), (1, 1), (1, 1), 2, 2);
        assert_eq!(choose_image_count(&bounded), 2);
    }
}
