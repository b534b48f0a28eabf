//! Renderer configuration
//!
//! Everything the original renderer hardwired (field of view, clip planes,
//! tessellation density, marker size, placeholder color) lives here with the
//! same defaults, adjustable through builder-style setters.

use crate::gfx::{geometry::MAX_SPHERE_DIVISIONS, scene::Shape, shader::ShadingAlgorithm};

/// Configuration for a [`Renderer`](crate::gfx::rendering::Renderer)
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Longitude divisions of the sphere primitive
    pub sphere_slices: u16,
    /// Latitude divisions of the sphere primitive
    pub sphere_stacks: u16,
    pub hexagon_radius: f32,
    pub hexagon_flip_normal: bool,
    /// Uniform scale applied to the sphere drawn at each point light
    pub light_marker_scale: f32,
    /// RGBA fill of the stand-in texture shown while an image downloads
    pub placeholder_color: [u8; 4],
    pub shading: ShadingAlgorithm,
    /// Directory (relative to the asset source root) holding the WGSL files
    pub shader_dir: String,
    /// Primitives to build at startup; models using any other shape are skipped
    pub shapes: Vec<Shape>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 30.0,
            z_near: 0.1,
            z_far: 100.0,
            sphere_slices: 36,
            sphere_stacks: 18,
            hexagon_radius: 0.5,
            hexagon_flip_normal: false,
            light_marker_scale: 0.1,
            placeholder_color: [255, 0, 255, 255],
            shading: ShadingAlgorithm::Gouraud,
            shader_dir: "shaders".to_string(),
            shapes: Shape::ALL.to_vec(),
        }
    }
}

impl RendererConfig {
    pub fn with_fov(mut self, degrees: f32) -> Self {
        self.fov_y_degrees = degrees;
        self
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.z_near = near;
        self.z_far = far;
        self
    }

    /// Sets the sphere tessellation. Values are clamped so the sphere stays
    /// closed (3 slices, 2 stacks minimum) and fits 16-bit indices.
    pub fn with_sphere_resolution(mut self, slices: u16, stacks: u16) -> Self {
        self.sphere_slices = slices.clamp(3, MAX_SPHERE_DIVISIONS);
        self.sphere_stacks = stacks.clamp(2, MAX_SPHERE_DIVISIONS);
        self
    }

    pub fn with_hexagon(mut self, radius: f32, flip_normal: bool) -> Self {
        self.hexagon_radius = radius;
        self.hexagon_flip_normal = flip_normal;
        self
    }

    pub fn with_light_marker_scale(mut self, scale: f32) -> Self {
        self.light_marker_scale = scale;
        self
    }

    pub fn with_placeholder_color(mut self, rgba: [u8; 4]) -> Self {
        self.placeholder_color = rgba;
        self
    }

    pub fn with_shading(mut self, shading: ShadingAlgorithm) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_shader_dir(mut self, dir: &str) -> Self {
        self.shader_dir = dir.to_owned();
        self
    }

    pub fn with_shapes(mut self, shapes: &[Shape]) -> Self {
        self.shapes = shapes.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_renderer() {
        let config = RendererConfig::default();
        assert_eq!(config.fov_y_degrees, 30.0);
        assert_eq!((config.z_near, config.z_far), (0.1, 100.0));
        assert_eq!((config.sphere_slices, config.sphere_stacks), (36, 18));
        assert_eq!(config.light_marker_scale, 0.1);
        assert_eq!(config.shading, ShadingAlgorithm::Gouraud);
        assert_eq!(config.shapes.len(), 4);
    }

    #[test]
    fn sphere_resolution_is_clamped() {
        let config = RendererConfig::default().with_sphere_resolution(1, 1000);
        assert_eq!(config.sphere_slices, 3);
        assert_eq!(config.sphere_stacks, 254);
    }
}
