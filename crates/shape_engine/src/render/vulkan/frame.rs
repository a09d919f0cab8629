//! Frame synchronization
//!
//! A bounded set of frame slots cycles round-robin; each slot's fence must
//! be observed signaled before the CPU reuses the slot, and each swapchain
//! image tracks the fence of whichever slot last used it so the image's
//! command buffer is never reused while the GPU still references it.
//!
//! Swapchain staleness reported by acquire/present is the only recoverable
//! error class; it is surfaced as a typed outcome for the renderer to turn
//! into a rebuild. Every other device result is fatal.

use ash::{vk, Device};

use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::{VulkanError, VulkanResult};

/// Upper bound on concurrently in-flight frames
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// What a completed `draw_frame` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and presented
    Rendered,
    /// The frame was dropped and the swapchain rebuilt instead
    SkippedRebuilt,
}

/// Result of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready; `suboptimal` requests a rebuild after presenting
    Ready {
        /// Index of the acquired presentable image
        image_index: u32,
        /// Surface no longer matches exactly but the image is usable
        suboptimal: bool,
    },
    /// The swapchain is out of date; rebuild and drop this frame
    OutOfDate,
}

/// Result of a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented and the swapchain still matches the surface
    Presented,
    /// Presented (or failed to) with a stale/suboptimal swapchain; rebuild
    Stale,
}

/// Round-robin frame slot table
pub struct FrameSlots {
    slots: Vec<FrameSync>,
    current: usize,
}

impl FrameSlots {
    /// Create `count` slots with signaled fences
    pub fn new(device: &Device, count: usize) -> VulkanResult<Self> {
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            slots.push(FrameSync::new(device.clone())?);
        }

        Ok(Self { slots, current: 0 })
    }

    /// The slot owning the frame being prepared
    pub fn current(&self) -> &FrameSync {
        &self.slots[self.current]
    }

    /// Index of the current slot
    pub fn index(&self) -> usize {
        self.current
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table is empty (never true in practice)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Move to the next slot, wrapping at the slot count
    pub fn advance(&mut self) {
        self.current = next_slot(self.current, self.slots.len());
    }
}

fn next_slot(current: usize, count: usize) -> usize {
    (current + 1) % count
}

/// Per-image fence alias table.
///
/// Entry `i` holds the fence of the frame slot whose work last targeted
/// image `i`, or null when the image has never been used since the table
/// was (re)built. At most one fence is aliased per image at a time.
pub struct ImageFences {
    fences: Vec<vk::Fence>,
}

impl ImageFences {
    /// Create a vacant table for `image_count` images
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![vk::Fence::null(); image_count],
        }
    }

    /// Fence guarding the image's previous use, if any
    pub fn pending(&self, image_index: usize) -> Option<vk::Fence> {
        let fence = self.fences[image_index];
        (fence != vk::Fence::null()).then_some(fence)
    }

    /// Record that the image's next use is guarded by `fence`
    pub fn alias(&mut self, image_index: usize, fence: vk::Fence) {
        self.fences[image_index] = fence;
    }

    /// Reset the table for a rebuilt swapchain
    pub fn rebind(&mut self, image_count: usize) {
        self.fences.clear();
        self.fences.resize(image_count, vk::Fence::null());
    }
}

/// The per-frame acquire/submit/present orchestrator
pub struct FrameFlight {
    slots: FrameSlots,
    images: ImageFences,
}

impl FrameFlight {
    /// Create slots and the image alias table
    pub fn new(device: &Device, image_count: usize) -> VulkanResult<Self> {
        Ok(Self {
            slots: FrameSlots::new(device, MAX_FRAMES_IN_FLIGHT)?,
            images: ImageFences::new(image_count),
        })
    }

    /// Index of the current frame slot
    pub fn current_slot(&self) -> usize {
        self.slots.index()
    }

    /// Wait (unbounded) for the current slot's previous work to finish
    pub fn wait_current(&self) -> VulkanResult<()> {
        self.slots.current().in_flight.wait(u64::MAX)
    }

    /// Acquire the next presentable image, signaling the current slot's
    /// image-available semaphore.
    pub fn acquire(&self, swapchain: &Swapchain) -> VulkanResult<AcquireOutcome> {
        let result = unsafe {
            swapchain.loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                self.slots.current().image_available.handle(),
                vk::Fence::null(),
            )
        };

        classify_acquire(result)
    }

    /// If the acquired image is still guarded by an earlier slot's fence,
    /// wait for it, then alias the image to the current slot's fence.
    pub fn wait_image_and_alias(&mut self, device: &Device, image_index: u32) -> VulkanResult<()> {
        if let Some(fence) = self.images.pending(image_index as usize) {
            unsafe {
                device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }

        self.images
            .alias(image_index as usize, self.slots.current().in_flight.handle());
        Ok(())
    }

    /// Reset the current slot's fence and submit the image's command
    /// buffer, waiting on image-available at color-attachment output and
    /// signaling render-finished.
    pub fn submit(
        &self,
        device: &Device,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
    ) -> VulkanResult<()> {
        let slot = self.slots.current();
        slot.in_flight.reset()?;

        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [slot.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(queue, &[submit_info.build()], slot.in_flight.handle())
                .map_err(VulkanError::Api)
        }
    }

    /// Present the image, waiting on render-finished.
    pub fn present(
        &self,
        queue: vk::Queue,
        swapchain: &Swapchain,
        image_index: u32,
    ) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [self.slots.current().render_finished.handle()];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { swapchain.loader().queue_present(queue, &present_info) };

        classify_present(result)
    }

    /// Advance to the next frame slot
    pub fn advance(&mut self) {
        self.slots.advance();
    }

    /// Reset the image alias table after a swapchain rebuild
    pub fn rebind_images(&mut self, image_count: usize) {
        self.images.rebind(image_count);
    }
}

/// Sort an acquire result into the two-class taxonomy: out-of-date is
/// recoverable, suboptimal is a deferred rebuild, anything else is fatal.
fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> VulkanResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
            image_index,
            suboptimal,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            log::warn!("Swapchain out of date during acquire");
            Ok(AcquireOutcome::OutOfDate)
        }
        Err(e) => Err(VulkanError::Api(e)),
    }
}

/// Sort a present result into the two-class taxonomy. ash reports
/// `SUBOPTIMAL_KHR` as `Ok(true)`.
fn classify_present(result: Result<bool, vk::Result>) -> VulkanResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) => Ok(PresentOutcome::Stale),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            log::warn!("Swapchain out of date during present");
            Ok(PresentOutcome::Stale)
        }
        Err(e) => Err(VulkanError::Api(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn image_fence_table_starts_vacant() {
        let images = ImageFences::new(3);
        for i in 0..3 {
            assert_eq!(images.pending(i), None);
        }
    }

    #[test]
    fn alias_is_observable_until_replaced() {
        let mut images = ImageFences::new(3);
        let fence_a = vk::Fence::from_raw(0xA);
        let fence_b = vk::Fence::from_raw(0xB);

        images.alias(1, fence_a);
        assert_eq!(images.pending(1), Some(fence_a));
        assert_eq!(images.pending(0), None);

        // A later frame slot takes over the image; only one fence is
        // aliased per image at a time.
        images.alias(1, fence_b);
        assert_eq!(images.pending(1), Some(fence_b));
    }

    #[test]
    fn rebind_clears_every_alias() {
        let mut images = ImageFences::new(2);
        images.alias(0, vk::Fence::from_raw(0xA));
        images.alias(1, vk::Fence::from_raw(0xB));

        images.rebind(4);
        for i in 0..4 {
            assert_eq!(images.pending(i), None);
        }
    }

    #[test]
    fn slot_indices_cycle_with_fixed_period() {
        let mut current = 0_usize;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(current);
            current = next_slot(current, MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn acquire_out_of_date_is_recoverable() {
        let outcome = classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(outcome, AcquireOutcome::OutOfDate);
    }

    #[test]
    fn acquire_suboptimal_still_delivers_the_image() {
        let outcome = classify_acquire(Ok((2, true))).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Ready {
                image_index: 2,
                suboptimal: true
            }
        );
    }

    #[test]
    fn acquire_device_loss_is_fatal() {
        let result = classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST));
        assert!(matches!(
            result,
            Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        ));
    }

    #[test]
    fn present_staleness_requests_a_rebuild() {
        assert_eq!(classify_present(Ok(true)).unwrap(), PresentOutcome::Stale);
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::Stale
        );
        assert_eq!(
            classify_present(Ok(false)).unwrap(),
            PresentOutcome::Presented
        );
        assert!(classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }
}
