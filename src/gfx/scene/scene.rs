use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::error::RenderError;

use super::{model::Model, Color};

/// Viewer placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Self {
        Self {
            position,
            target,
            up,
        }
    }

    /// Right-handed look-at view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// A camera looking at its own position has no view direction.
    pub fn is_degenerate(&self) -> bool {
        (self.target - self.position).magnitude2() <= f32::EPSILON
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 3.0, 8.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }
}

/// Point light; also drawn as a small self-colored sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: Color,
}

impl PointLight {
    pub fn new(position: Vector3<f32>, color: Color) -> Self {
        Self { position, color }
    }
}

/// Ambient term plus the ordered point lights
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: Color,
    pub point_lights: Vec<PointLight>,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: [0.1, 0.1, 0.1],
            point_lights: Vec::new(),
        }
    }
}

/// Everything drawn in a frame
///
/// Scenes are replaced wholesale through
/// [`Renderer::set_scene`](crate::gfx::rendering::Renderer::set_scene); the
/// renderer only reads them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub background: Color,
    pub camera: Camera,
    pub light: Lighting,
    pub models: Vec<Model>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_ambient(mut self, color: Color) -> Self {
        self.light.ambient = color;
        self
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.light.point_lights.push(light);
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    /// Checks the invariants the renderer relies on.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.camera.is_degenerate() {
            return Err(RenderError::DegenerateCamera);
        }
        Ok(())
    }

    /// Gets statistics about the scene
    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            model_count: self.models.len(),
            textured_models: self
                .models
                .iter()
                .filter(|m| m.appearance.texture().is_some())
                .count(),
            point_lights: self.light.point_lights.len(),
        }
    }
}

/// Scene statistics for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub model_count: usize,
    pub textured_models: usize,
    pub point_lights: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::{Model, ModelTexture, Shape};

    #[test]
    fn camera_on_its_target_is_rejected() {
        let point = Point3::new(1.0, 1.0, 1.0);
        let scene = Scene::new(Camera::new(point, point, Vector3::unit_y()));
        assert!(matches!(scene.validate(), Err(RenderError::DegenerateCamera)));
        assert!(Scene::default().validate().is_ok());
    }

    #[test]
    fn statistics_count_models_and_lights() {
        let mut scene = Scene::default();
        scene.add_model(Model::new(Shape::Cube));
        scene.add_model(Model::new(Shape::Plane).with_texture(ModelTexture::from_url("grass.jpg")));
        scene.add_point_light(PointLight::new(Vector3::new(0.0, 2.0, 0.0), [1.0, 1.0, 1.0]));

        let stats = scene.get_statistics();
        assert_eq!(stats.model_count, 2);
        assert_eq!(stats.textured_models, 1);
        assert_eq!(stats.point_lights, 1);
    }
}
