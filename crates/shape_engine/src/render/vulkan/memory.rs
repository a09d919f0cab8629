//! Device memory type selection
//!
//! Kept free of device calls: the scan runs over a cached
//! `vk::PhysicalDeviceMemoryProperties` snapshot so the selection rule is
//! unit-testable.

use ash::vk;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Find the first memory type whose bit is set in `type_mask` and whose
/// property flags are a superset of `required`.
///
/// Exhausting the search is a configuration/capability error, not a
/// transient one: the caller gets `NoSuitableMemoryType`, never a silent
/// index 0.
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_mask: u32,
    required: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    for i in 0..properties.memory_type_count {
        let type_matches = type_mask & (1 << i) != 0;
        let property_matches = properties.memory_types[i as usize]
            .property_flags
            .contains(required);

        if type_matches && property_matches {
            return Ok(i);
        }
    }

    Err(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties_with(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (i, &flags) in types.iter().enumerate() {
            properties.memory_types[i].property_flags = flags;
        }
        properties
    }

    #[test]
    fn returns_first_matching_type() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let index = find_memory_type(
            &properties,
            0b11,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        )
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn returned_flags_are_a_superset_of_the_request() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let requested =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let index = find_memory_type(&properties, 0b11, requested).unwrap();

        assert!(properties.memory_types[index as usize]
            .property_flags
            .contains(requested));
    }

    #[test]
    fn type_mask_excludes_otherwise_valid_types() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);

        // Only bit 1 is allowed, so index 0 must be skipped.
        let index =
            find_memory_type(&properties, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn exhausted_search_is_an_error_not_index_zero() {
        let properties = properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

        let result = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(matches!(result, Err(VulkanError::NoSuitableMemoryType)));
    }
}
