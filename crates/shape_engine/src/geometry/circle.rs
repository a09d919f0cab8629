//! Disc tessellation

use super::{Shape, Vertex, WHITE};

/// Tessellate a filled disc in the XY plane, facing +Z.
///
/// One center vertex plus `sector_count` rim vertices; triangles fan out
/// from the center.
pub fn make_circle(index: u32, sector_count: u32, radius: f32) -> Shape {
    let mut vertices = Vec::with_capacity(sector_count as usize + 1);
    let mut indices = Vec::with_capacity(sector_count as usize * 3);

    vertices.push(Vertex::new([0.0, 0.0, 0.0], WHITE, [0.0, 0.0, 1.0], [0.5, 0.5]));

    let step = std::f32::consts::TAU / sector_count as f32;
    for i in 0..sector_count {
        let angle = step * i as f32;
        let (sin, cos) = angle.sin_cos();
        vertices.push(Vertex::new(
            [cos * radius, sin * radius, 0.0],
            WHITE,
            [0.0, 0.0, 1.0],
            [0.5 + cos * 0.5, 0.5 + sin * 0.5],
        ));
    }

    for i in 0..sector_count as u16 {
        let next = 1 + (i + 1) % sector_count as u16;
        indices.extend_from_slice(&[0, 1 + i, next]);
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
    fn circle_has_center_plus_rim() {
        let circle = make_circle(0, 12, 1.0);
        assert_eq!(circle.vertices.len(), 13);
        assert_eq!(circle.indices.len(), 36);
    }

    #[test]
    fn rim_vertices_sit_on_the_radius() {
        let circle = make_circle(0, 8, 2.0);
        for vertex in &circle.vertices[1..] {
            let [x, y, _] = vertex.position;
            assert_relative_eq!((x * x + y * y).sqrt(), 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn fan_closes_back_to_first_rim_vertex() {
        let circle = make_circle(0, 8, 1.0);
        let last_triangle = &circle.indices[circle.indices.len() - 3..];
        assert_eq!(last_triangle, &[0, 8, 1]);
    }
}
