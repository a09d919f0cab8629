//! Shape geometry: vertex format, shape records, and tessellators

mod circle;
mod cube;
mod ring;

pub use circle::make_circle;
pub use cube::make_cube;
pub use ring::make_ring;

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// White vertex color used by the tessellators
pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Vertex format shared by every shape
///
/// Layout must match the vertex shader inputs; the attribute descriptions
/// below are the single source of truth for locations and offsets.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Vertex color
    pub color: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(
        position: [f32; 3],
        color: [f32; 3],
        normal: [f32; 3],
        tex_coord: [f32; 2],
    ) -> Self {
        Self {
            position,
            color,
            normal,
            tex_coord,
        }
    }

    /// Vertex input binding description for the graphics pipeline
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Vertex attribute descriptions for the graphics pipeline
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        [
            // Position (location = 0)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            // Color (location = 1)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            // Normal (location = 2)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 24,
            },
            // Texture coordinate (location = 3)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 3,
                format: vk::Format::R32G32_SFLOAT,
                offset: 36,
            },
        ]
    }
}

/// Kinds of shapes the tessellators can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Filled disc
    Circle,
    /// Annulus
    Ring,
    /// Unit cube
    Cube,
}

/// An immutable-after-construction geometric record.
///
/// `index` correlates the shape with its device-side buffers and per-image
/// descriptor sets; it is assigned at generation time and never changes.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Ordered vertex sequence
    pub vertices: Vec<Vertex>,
    /// Ordered 16-bit index sequence; empty when the shape is not indexed
    pub indices: Vec<u16>,
    /// Whether the shape draws through its index buffer as well
    pub indexed: bool,
    /// Stable identity correlating device buffers and descriptor sets
    pub index: u32,
}

impl Shape {
    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Tessellate a shape of the given kind with the given stable identity
pub fn generate_shape(kind: ShapeKind, index: u32) -> Shape {
    match kind {
        ShapeKind::Circle => make_circle(index, 36, 1.0),
        ShapeKind::Ring => make_ring(index, 36, 2.0, 1.0),
        ShapeKind::Cube => make_cube(index, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_matches_attribute_offsets() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);

        let binding = Vertex::binding_description();
        assert_eq!(binding.stride, 44);

        let attributes = Vertex::attribute_descriptions();
        assert_eq!(attributes.len(), 4);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[2].offset, 24);
        assert_eq!(attributes[3].offset, 36);
    }

    #[test]
    fn vertex_bytes_round_trip() {
        let vertex = Vertex::new(
            [1.0, 2.0, 3.0],
            WHITE,
            [0.0, 0.0, 1.0],
            [0.5, 0.25],
        );
        let bytes = bytemuck::bytes_of(&vertex);
        let back: &Vertex = bytemuck::from_bytes(bytes);
        assert_eq!(*back, vertex);
    }

    #[test]
    fn generated_shapes_carry_their_identity() {
        for (i, kind) in [ShapeKind::Circle, ShapeKind::Ring, ShapeKind::Cube]
            .into_iter()
            .enumerate()
        {
            let shape = generate_shape(kind, i as u32);
            assert_eq!(shape.index, i as u32);
            assert!(shape.indexed);
            assert!(!shape.vertices.is_empty());
        }
    }

    #[test]
    fn all_indices_reference_valid_vertices() {
        for kind in [ShapeKind::Circle, ShapeKind::Ring, ShapeKind::Cube] {
            let shape = generate_shape(kind, 0);
            let count = shape.vertices.len();
            assert!(
                shape.indices.iter().all(|&i| (i as usize) < count),
                "{kind:?} has out-of-range indices"
            );
        }
    }
}
