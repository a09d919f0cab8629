//! Per-frame uniform data
//!
//! The uniform block shared by every shape: model/view/projection matrices,
//! animated by elapsed time and written into each shape's uniform buffer
//! for the acquired image every frame.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{look_at, perspective, rotation_z, Point3, Vec3};

/// Uniform block layout; must match the vertex shader's binding 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    /// Model transform
    pub model: [[f32; 4]; 4],
    /// View transform
    pub view: [[f32; 4]; 4],
    /// Projection transform (Vulkan clip space)
    pub proj: [[f32; 4]; 4],
}

impl UniformBufferObject {
    /// Build the frame's uniform data: the model spins around Z over time,
    /// the camera looks at the origin from a fixed offset.
    pub fn animated(elapsed_seconds: f32, aspect: f32) -> Self {
        let model = rotation_z(elapsed_seconds * std::f32::consts::FRAC_PI_2);
        let view = look_at(
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let proj = perspective(aspect, 45.0_f32.to_radians(), 0.1, 10.0);

        Self {
            model: model.into(),
            view: view.into(),
            proj: proj.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ubo_layout_is_three_packed_matrices() {
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 3 * 64);
    }

    #[test]
    fn ubo_bytes_round_trip() {
        let ubo = UniformBufferObject::animated(1.25, 16.0 / 9.0);
        let bytes = bytemuck::bytes_of(&ubo);
        let back: &UniformBufferObject = bytemuck::from_bytes(bytes);
        assert_eq!(*back, ubo);
    }

    #[test]
    fn zero_elapsed_time_yields_identity_model() {
        let ubo = UniformBufferObject::animated(0.0, 1.0);
        for (row, row_values) in ubo.model.iter().enumerate() {
            for (col, &value) in row_values.iter().enumerate() {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert_relative_eq!(value, expected, epsilon = 1e-6);
            }
        }
    }
}
