//! # Vertex Streams
//!
//! Each vertex attribute lives in its own tightly packed buffer bound to a
//! fixed slot. Every shader program must declare its inputs at these slots:
//!
//! | slot | name              | format        |
//! |------|-------------------|---------------|
//! | 0    | `vertex_position` | `Float32x3`   |
//! | 1    | `vertex_normal`   | `Float32x3`   |
//! | 2    | `vertex_texcoord` | `Float32x2`   |

use std::mem::size_of;

/// A vertex attribute stored as its own buffer.
pub trait VertexStream: bytemuck::Pod {
    /// Shader location and buffer slot of this attribute
    const SLOT: u32;
    /// Name the shader must give the input at [`Self::SLOT`]
    const NAME: &'static str;
    const FORMAT: wgpu::VertexFormat;

    /// Describes this stream as a single-attribute vertex buffer.
    fn layout() -> wgpu::VertexBufferLayout<'static>;
}

/// Object-space position, slot 0
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Position(pub [f32; 3]);

/// Unit surface normal, slot 1
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Normal(pub [f32; 3]);

/// Texture coordinate, slot 2
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexCoord(pub [f32; 2]);

/// Three 16-bit indices forming one counter-clockwise triangle
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Triangle(pub [u16; 3]);

const _: () = assert!(size_of::<Position>() == 12);
const _: () = assert!(size_of::<Normal>() == 12);
const _: () = assert!(size_of::<TexCoord>() == 8);
const _: () = assert!(size_of::<Triangle>() == 6);

macro_rules! vertex_stream {
    ($ty:ty, $slot:expr, $name:expr, $format:ident) => {
        impl VertexStream for $ty {
            const SLOT: u32 = $slot;
            const NAME: &'static str = $name;
            const FORMAT: wgpu::VertexFormat = wgpu::VertexFormat::$format;

            fn layout() -> wgpu::VertexBufferLayout<'static> {
                const ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::$format,
                    offset: 0,
                    shader_location: $slot,
                }];
                wgpu::VertexBufferLayout {
                    array_stride: size_of::<$ty>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &ATTRIBUTES,
                }
            }
        }
    };
}

vertex_stream!(Position, 0, "vertex_position", Float32x3);
vertex_stream!(Normal, 1, "vertex_normal", Float32x3);
vertex_stream!(TexCoord, 2, "vertex_texcoord", Float32x2);

/// The fixed attribute binding contract, in slot order.
pub const VERTEX_ATTRIBUTES: [(u32, &str); 3] = [
    (Position::SLOT, Position::NAME),
    (Normal::SLOT, Normal::NAME),
    (TexCoord::SLOT, TexCoord::NAME),
];

/// Buffer layouts for the three streams, in slot order.
pub fn vertex_buffer_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    [Position::layout(), Normal::layout(), TexCoord::layout()]
}
