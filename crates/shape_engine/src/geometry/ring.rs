//! Annulus tessellation

use super::{Shape, Vertex, WHITE};

/// Tessellate a flat ring (annulus) in the XY plane, facing +Z.
///
/// Two rim vertices (outer, inner) per sector boundary, quads stitched
/// between consecutive boundaries. Texture coordinates run around the ring
/// in `u` and across it in `v`.
pub fn make_ring(index: u32, sector_count: u32, outer_radius: f32, inner_radius: f32) -> Shape {
    let mut vertices = Vec::with_capacity((sector_count as usize + 1) * 2);
    let mut indices = Vec::with_capacity(sector_count as usize * 6);

    let step = std::f32::consts::TAU / sector_count as f32;
    for i in 0..=sector_count {
        let angle = step * i as f32;
        let (sin, cos) = angle.sin_cos();
        let u = i as f32 / sector_count as f32;

        vertices.push(Vertex::new(
            [cos * outer_radius, sin * outer_radius, 0.0],
            WHITE,
            [0.0, 0.0, 1.0],
            [u, 0.0],
        ));
        vertices.push(Vertex::new(
            [cos * inner_radius, sin * inner_radius, 0.0],
            WHITE,
            [0.0, 0.0, 1.0],
            [u, 1.0],
        ));
    }

    for i in 0..sector_count as u16 {
        let outer = i * 2;
        let inner = outer + 1;
        let next_outer = outer + 2;
        let next_inner = outer + 3;

        indices.extend_from_slice(&[outer, inner, next_outer]);
        indices.extend_from_slice(&[next_outer, inner, next_inner]);
    }

    Shape {
        vertices,
        indices,
        indexed: true,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ring_vertex_and_index_counts() {
        let ring = make_ring(0, 10, 2.0, 1.0);
        assert_eq!(ring.vertices.len(), 22);
        assert_eq!(ring.indices.len(), 60);
    }

    #[test]
    fn rim_pairs_alternate_outer_inner() {
        let ring = make_ring(0, 6, 3.0, 1.5);
        for pair in ring.vertices.chunks(2) {
            let outer = &pair[0].position;
            let inner = &pair[1].position;
            assert_relative_eq!(
                (outer[0] * outer[0] + outer[1] * outer[1]).sqrt(),
                3.0,
                epsilon = 1e-5
            );
            assert_relative_eq!(
                (inner[0] * inner[0] + inner[1] * inner[1]).sqrt(),
                1.5,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn seam_vertices_share_positions() {
        let ring = make_ring(0, 8, 2.0, 1.0);
        let first_outer = ring.vertices[0].position;
        let last_outer = ring.vertices[ring.vertices.len() - 2].position;
        assert_relative_eq!(first_outer[0], last_outer[0], epsilon = 1e-5);
        assert_relative_eq!(first_outer[1], last_outer[1], epsilon = 1e-5);
    }
}
