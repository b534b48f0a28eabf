//! # Graphics Devices
//!
//! [`GraphicsDevice`] is the seam between the renderer and a GPU API. It is
//! shaped like a classic immediate-mode API: programs own their uniform
//! values, uniforms are addressed by location, and a draw uses whatever
//! program, vertex array and texture are currently bound.
//!
//! - [`WgpuDevice`] renders to a window surface through `wgpu`
//! - [`HeadlessDevice`] records every command; used by tests and GPU-less runs

pub mod headless;
mod pipeline;
pub mod wgpu_device;

use image::RgbaImage;

use crate::error::{DeviceError, ShaderBuildError};
use crate::gfx::geometry::MeshData;
use crate::gfx::shader::{LinkedProgram, UniformLocation, UniformType};

pub use headless::{DeviceCommand, HeadlessDevice, HeadlessTexture};
pub use wgpu_device::WgpuDevice;

/// Handle of a linked program on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle of an uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Handle of a 2D RGBA texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Value written to a uniform location
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    /// Integers; also the texture unit of a sampled texture
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// Whether the value can be written to a uniform of type `ty`
    pub fn matches(&self, ty: UniformType) -> bool {
        matches!(
            (self, ty),
            (UniformValue::Float(_), UniformType::Float)
                | (UniformValue::Int(_), UniformType::Int)
                | (UniformValue::Int(_), UniformType::Texture2d)
                | (UniformValue::Vec2(_), UniformType::Vec2)
                | (UniformValue::Vec3(_), UniformType::Vec3)
                | (UniformValue::Vec4(_), UniformType::Vec4)
                | (UniformValue::Mat4(_), UniformType::Mat4)
        )
    }

    /// Writes the value's bytes at the start of `dst`.
    pub fn write_to(&self, dst: &mut [u8]) {
        let bytes: &[u8] = match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        };
        dst[..bytes.len()].copy_from_slice(bytes);
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(matrix: cgmath::Matrix4<f32>) -> Self {
        UniformValue::Mat4(matrix.into())
    }
}

impl From<cgmath::Vector3<f32>> for UniformValue {
    fn from(vector: cgmath::Vector3<f32>) -> Self {
        UniformValue::Vec3(vector.into())
    }
}

impl From<cgmath::Point3<f32>> for UniformValue {
    fn from(point: cgmath::Point3<f32>) -> Self {
        UniformValue::Vec3(point.into())
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Texel filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling state stored with a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub wrap: WrapMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    /// Filter between mip levels; `None` samples only the base level
    pub mipmap_filter: Option<FilterMode>,
}

impl SamplerConfig {
    /// Stand-in textures: clamped, linear, nearest mip
    pub fn placeholder() -> Self {
        Self {
            wrap: WrapMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: Some(FilterMode::Nearest),
        }
    }

    /// Loaded images: repeating, trilinear with a full mip chain
    pub fn trilinear_repeat() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: Some(FilterMode::Linear),
        }
    }

    pub fn generates_mipmaps(&self) -> bool {
        self.mipmap_filter.is_some()
    }
}

/// Clip-space depth convention of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthRange {
    /// OpenGL style, z in [-1, 1]
    NegativeOneToOne,
    /// wgpu, Vulkan, Metal and D3D style, z in [0, 1]
    ZeroToOne,
}

/// Immediate-mode drawing interface the renderer is written against
pub trait GraphicsDevice {
    /// Depth convention projection matrices must target
    fn depth_range(&self) -> DepthRange;

    /// Largest width or height a texture may have
    fn max_texture_dimension(&self) -> u32;

    /// Creates a program from linked stages. Uniform locations are the
    /// indices of `program.uniforms`.
    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramId, ShaderBuildError>;

    /// Uploads the mesh streams and indices as static buffers.
    fn create_vertex_array(&mut self, mesh: &MeshData) -> VertexArrayId;

    fn create_texture(&mut self, image: &RgbaImage, sampler: SamplerConfig) -> TextureId;

    /// Replaces a texture's contents and sampling in place; the handle
    /// stays valid.
    fn update_texture(&mut self, texture: TextureId, image: &RgbaImage, sampler: SamplerConfig);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Starts a frame cleared to `color` with depth reset.
    fn clear(&mut self, color: [f32; 3]);

    fn use_program(&mut self, program: Option<ProgramId>);

    /// Sets a uniform of the program in use; the value persists with the
    /// program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);

    /// Draws `index_count` indices of the bound vertex array as triangles.
    fn draw_indexed(&mut self, index_count: u32);

    /// Finishes the frame and shows it.
    fn present(&mut self) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_values_check_their_type() {
        assert!(UniformValue::Int(0).matches(UniformType::Texture2d));
        assert!(UniformValue::Vec3([0.0; 3]).matches(UniformType::Vec3));
        assert!(!UniformValue::Vec3([0.0; 3]).matches(UniformType::Vec4));
        assert!(!UniformValue::Float(1.0).matches(UniformType::Int));
    }

    #[test]
    fn matrices_are_written_column_major() {
        let matrix = cgmath::Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let mut floats = [0f32; 16];
        UniformValue::from(matrix).write_to(bytemuck::cast_slice_mut(&mut floats));
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
    }
}
