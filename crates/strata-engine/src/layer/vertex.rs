use crate::atlas::TextureHandle;
use crate::coords::{Color, Vec2};

use super::scratch::ScratchBuffer;

/// One vertex as produced by layers.
///
/// `uv` is relative to the entry's rectangle (`0..1` on both axes, origin
/// bottom-left); the shading stage maps it into the canvas through the
/// dimensions table at `texture`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    pub uv: Vec2,
    pub texture: TextureHandle,
    pub color: Color,
}

/// Byte layout of a serialized [`Vertex`].
///
/// | offset | field      | V1 | V2 |
/// |-------:|------------|----|----|
/// | 0      | position   | x  | x  |
/// | 8      | uv         | x  | x  |
/// | 16     | texture    | x  | x  |
/// | 20     | color      |    | x  |
///
/// All fields are native-endian `f32`/`u32`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    /// Position, uv, registry index.
    V1,
    /// V1 plus a packed modulate color.
    #[default]
    V2,
}

impl VertexFormat {
    const ATTRS_V1: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Uint32,
    ];
    const ATTRS_V2: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Uint32,
        3 => Uint32,
    ];

    /// Serialized size of one vertex, in bytes.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            VertexFormat::V1 => 20,
            VertexFormat::V2 => 24,
        }
    }

    pub fn write(self, vertex: &Vertex, out: &mut ScratchBuffer) {
        out.push_f32(vertex.position.x);
        out.push_f32(vertex.position.y);
        out.push_f32(vertex.uv.x);
        out.push_f32(vertex.uv.y);
        out.push_u32(vertex.texture.index());
        if self == VertexFormat::V2 {
            out.push_u32(vertex.color.pack());
        }
    }

    /// Vertex buffer layout matching [`write`](Self::write).
    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: match self {
                VertexFormat::V1 => &Self::ATTRS_V1,
                VertexFormat::V2 => &Self::ATTRS_V2,
            },
        }
    }
}
