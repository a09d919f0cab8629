//! Math type aliases and camera helpers built on nalgebra

/// 2D vector
pub type Vec2 = nalgebra::Vector2<f32>;
/// 3D vector
pub type Vec3 = nalgebra::Vector3<f32>;
/// 4x4 matrix
pub type Mat4 = nalgebra::Matrix4<f32>;
/// 3D point
pub type Point3 = nalgebra::Point3<f32>;

/// Right-handed look-at view matrix
pub fn look_at(eye: Point3, target: Point3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&eye, &target, &up)
}

/// Perspective projection for Vulkan clip space.
///
/// Vulkan's clip space has an inverted Y relative to OpenGL's, so the Y
/// scale is negated after building the standard right-handed projection.
pub fn perspective(aspect: f32, fovy: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::new_perspective(aspect, fovy, near, far);
    proj[(1, 1)] *= -1.0;
    proj
}

/// Rotation around the Z axis, in radians
pub fn rotation_z(angle: f32) -> Mat4 {
    Mat4::from_axis_angle(&nalgebra::Vector3::z_axis(), angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perspective_flips_clip_space_y() {
        let plain = Mat4::new_perspective(16.0 / 9.0, 0.8, 0.1, 10.0);
        let flipped = perspective(16.0 / 9.0, 0.8, 0.1, 10.0);

        assert_relative_eq!(flipped[(1, 1)], -plain[(1, 1)], epsilon = 1e-6);
        assert_relative_eq!(flipped[(0, 0)], plain[(0, 0)], epsilon = 1e-6);
    }

    #[test]
    fn rotation_z_preserves_z_axis() {
        let rot = rotation_z(std::f32::consts::FRAC_PI_2);
        let v = rot.transform_vector(&Vec3::new(0.0, 0.0, 1.0));

        assert_relative_eq!(v.z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
    }
}
