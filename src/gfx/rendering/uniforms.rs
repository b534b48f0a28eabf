//! Uniform names shared by the renderer and the shipped shaders, plus the
//! projection setup.

use cgmath::{perspective, Deg, Matrix4};

use crate::gfx::device::DepthRange;

pub const PROJECTION_MATRIX: &str = "projection_matrix";
pub const VIEW_MATRIX: &str = "view_matrix";
pub const MODEL_MATRIX: &str = "model_matrix";

pub const MATERIAL_COLOR: &str = "material_color";
pub const MATERIAL_SPECULAR: &str = "material_specular";
pub const MATERIAL_SHININESS: &str = "material_shininess";

pub const IMAGE: &str = "image";
pub const TEXTURE_SCALE: &str = "texture_scale";

pub const NUM_LIGHTS: &str = "num_lights";
pub const LIGHT_AMBIENT: &str = "light_ambient";
pub const CAMERA_POSITION: &str = "camera_position";

/// Texture unit sampled textures are bound to
pub const TEXTURE_UNIT: u32 = 0;

/// Maps OpenGL clip depth [-1, 1] onto [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection for a viewport, targeting the device's depth range
pub fn projection_matrix(
    fov_y_degrees: f32,
    width: u32,
    height: u32,
    z_near: f32,
    z_far: f32,
    depth_range: DepthRange,
) -> Matrix4<f32> {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    let projection = perspective(Deg(fov_y_degrees), aspect, z_near, z_far);
    match depth_range {
        DepthRange::NegativeOneToOne => projection,
        DepthRange::ZeroToOne => OPENGL_TO_WGPU_MATRIX * projection,
    }
}
