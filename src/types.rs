//! Vertex format and demo geometry.

use bytemuck::{Pod, Zeroable};

use crate::buffers::VertexAttribute;

/// An interleaved vertex: position, color, texture coordinates.
///
/// 32 bytes, laid out as eight consecutive `f32`s so a `&[Vertex]` can be
/// uploaded as-is with [`bytemuck::cast_slice`].
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Texture coordinates. Values outside `[0, 1]` tile.
    pub uv: [f32; 2],
}

impl Vertex {
    /// Byte stride between consecutive vertices.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Attribute layout matching [`DEFAULT_VERTEX_SRC`](crate::shaders::DEFAULT_VERTEX_SRC).
    pub const LAYOUT: [VertexAttribute; 3] = [
        VertexAttribute::new(0, 3, Self::STRIDE, 0),
        VertexAttribute::new(1, 3, Self::STRIDE, 12),
        VertexAttribute::new(2, 2, Self::STRIDE, 24),
    ];

    /// Shorthand constructor.
    #[must_use]
    pub const fn new(position: [f32; 3], color: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// A square-based pyramid standing on the XZ plane, apex at +Y.
///
/// UVs run past 1.0 so a repeating texture tiles across each face.
pub const PYRAMID_VERTICES: [Vertex; 5] = [
    Vertex::new([-0.5, 0.0, 0.5], WHITE, [0.0, 0.0]),
    Vertex::new([-0.5, 0.0, -0.5], WHITE, [5.0, 0.0]),
    Vertex::new([0.5, 0.0, -0.5], WHITE, [0.0, 0.0]),
    Vertex::new([0.5, 0.0, 0.5], WHITE, [5.0, 0.0]),
    Vertex::new([0.0, 0.8, 0.0], WHITE, [2.5, 5.0]),
];

/// Triangle indices into [`PYRAMID_VERTICES`]: two for the base, one per side.
pub const PYRAMID_INDICES: [u32; 18] = [
    0, 1, 2, //
    0, 2, 3, //
    0, 1, 4, //
    1, 2, 4, //
    2, 3, 4, //
    3, 0, 4, //
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_eight_packed_floats() {
        assert_eq!(Vertex::STRIDE, 8 * std::mem::size_of::<f32>());
        let floats: &[f32] = bytemuck::cast_slice(&PYRAMID_VERTICES[4..]);
        assert_eq!(floats, &[0.0, 0.8, 0.0, 1.0, 1.0, 1.0, 2.5, 5.0]);
    }

    #[test]
    fn layout_covers_the_whole_vertex() {
        let covered: usize = Vertex::LAYOUT
            .iter()
            .map(|attribute| attribute.components * 4)
            .sum();
        assert_eq!(covered, Vertex::STRIDE);
        assert_eq!(Vertex::LAYOUT[2].offset, 24);
    }

    #[test]
    fn pyramid_indices_stay_in_range() {
        assert!(PYRAMID_INDICES
            .iter()
            .all(|&index| (index as usize) < PYRAMID_VERTICES.len()));
    }
}
