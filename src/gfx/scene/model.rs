use std::str::FromStr;

use cgmath::{Matrix4, Rad, Vector3};

use crate::error::UnsupportedShapeOrMode;
use crate::gfx::device::TextureId;

use super::Color;

/// Built-in primitive a model is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Plane,
    Cube,
    Sphere,
    /// The hexagon fan
    Custom,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Plane, Shape::Cube, Shape::Sphere, Shape::Custom];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Plane => "plane",
            Shape::Cube => "cube",
            Shape::Sphere => "sphere",
            Shape::Custom => "custom",
        }
    }
}

impl FromStr for Shape {
    type Err = UnsupportedShapeOrMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plane" => Ok(Shape::Plane),
            "cube" => Ok(Shape::Cube),
            "sphere" => Ok(Shape::Sphere),
            "custom" | "hexagon" => Ok(Shape::Custom),
            other => Err(UnsupportedShapeOrMode::Shape(other.to_owned())),
        }
    }
}

/// Phong material terms shared by both appearance modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [0.8, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
            shininess: 16.0,
        }
    }
}

impl Material {
    pub fn new(color: Color, specular: Color, shininess: f32) -> Self {
        Self {
            color,
            specular,
            shininess,
        }
    }
}

/// Where a model's texture image comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// Image fetched from the asset source; created on first use
    Url(String),
    /// A texture the host already created, e.g. a placeholder
    Handle(TextureId),
}

/// Texture reference of a textured model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTexture {
    pub source: TextureSource,
    /// Multiplier applied to the mesh texture coordinates
    pub scale: [f32; 2],
}

impl ModelTexture {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: TextureSource::Url(url.into()),
            scale: [1.0, 1.0],
        }
    }

    pub fn from_handle(texture: TextureId) -> Self {
        Self {
            source: TextureSource::Handle(texture),
            scale: [1.0, 1.0],
        }
    }

    pub fn with_scale(mut self, u: f32, v: f32) -> Self {
        self.scale = [u, v];
        self
    }
}

/// Whether surface color comes from the material or a sampled image
#[derive(Debug, Clone, PartialEq)]
pub enum Appearance {
    Material,
    Textured(ModelTexture),
}

impl Appearance {
    pub fn mode(&self) -> AppearanceMode {
        match self {
            Appearance::Material => AppearanceMode::Material,
            Appearance::Textured(_) => AppearanceMode::Textured,
        }
    }

    pub fn texture(&self) -> Option<&ModelTexture> {
        match self {
            Appearance::Material => None,
            Appearance::Textured(texture) => Some(texture),
        }
    }
}

/// Appearance without its payload; one axis of the program table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppearanceMode {
    Material,
    Textured,
}

impl AppearanceMode {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for AppearanceMode {
    type Err = UnsupportedShapeOrMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "material" | "color" => Ok(AppearanceMode::Material),
            "textured" | "texture" => Ok(AppearanceMode::Textured),
            other => Err(UnsupportedShapeOrMode::Appearance(other.to_owned())),
        }
    }
}

/// A drawable instance of a primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub shape: Shape,
    pub appearance: Appearance,
    pub center: Vector3<f32>,
    /// Rotation angles in radians about X, Y and Z
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub material: Material,
}

impl Model {
    /// Create a material-colored model at the origin with identity transform
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            appearance: Appearance::Material,
            center: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            material: Material::default(),
        }
    }

    pub fn with_center(mut self, x: f32, y: f32, z: f32) -> Self {
        self.center = Vector3::new(x, y, z);
        self
    }

    /// Set rotation angles (radians) about X, Y and Z
    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_texture(mut self, texture: ModelTexture) -> Self {
        self.appearance = Appearance::Textured(texture);
        self
    }

    /// Object-to-world transform
    ///
    /// `T(center) * Rz * Ry * Rx * S(scale)`: the mesh is scaled, then
    /// rotated about X, then Y, then Z, then translated.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.center);
        let rz = Matrix4::from_angle_z(Rad(self.rotation.z));
        let ry = Matrix4::from_angle_y(Rad(self.rotation.y));
        let rx = Matrix4::from_angle_x(Rad(self.rotation.x));
        let s = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        t * rz * ry * rx * s // Order matters
    }
}

/// Transform placing a light marker sphere at `position`
pub fn marker_matrix(position: Vector3<f32>, scale: f32) -> Matrix4<f32> {
    Matrix4::from_translation(position) * Matrix4::from_scale(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::{Vector4, Zero};
    use std::f32::consts::FRAC_PI_2;

    fn transform(m: Matrix4<f32>, p: [f32; 3]) -> [f32; 3] {
        let v = m * Vector4::new(p[0], p[1], p[2], 1.0);
        [v.x, v.y, v.z]
    }

    fn assert_point(actual: [f32; 3], expected: [f32; 3]) {
        for axis in 0..3 {
            assert_abs_diff_eq!(actual[axis], expected[axis], epsilon = 1e-5);
        }
    }

    #[test]
    fn rotation_applies_x_then_y_then_z() {
        let model = Model::new(Shape::Cube).with_rotation(0.0, FRAC_PI_2, FRAC_PI_2);
        let expected = Matrix4::from_translation(Vector3::zero())
            * Matrix4::from_angle_z(Rad(FRAC_PI_2))
            * Matrix4::from_angle_y(Rad(FRAC_PI_2))
            * Matrix4::from_angle_x(Rad(0.0))
            * Matrix4::from_scale(1.0);

        let world = transform(model.model_matrix(), [1.0, 0.0, 0.0]);
        assert_point(world, transform(expected, [1.0, 0.0, 0.0]));
        // Y first sends +X to -Z, which Z leaves alone
        assert_point(world, [0.0, 0.0, -1.0]);

        let reversed = Matrix4::from_angle_x(Rad(0.0))
            * Matrix4::from_angle_y(Rad(FRAC_PI_2))
            * Matrix4::from_angle_z(Rad(FRAC_PI_2));
        let other = transform(reversed, [1.0, 0.0, 0.0]);
        assert!((other[1] - world[1]).abs() > 0.5, "rotation order must matter");
    }

    #[test]
    fn scale_applies_before_translation() {
        let model = Model::new(Shape::Plane)
            .with_center(1.0, 2.0, 3.0)
            .with_scale(2.0, 3.0, 4.0);
        assert_point(
            transform(model.model_matrix(), [0.5, 0.5, 0.5]),
            [2.0, 3.5, 5.0],
        );
    }

    #[test]
    fn marker_matrix_scales_about_the_light() {
        let m = marker_matrix(Vector3::new(1.0, 1.0, 1.0), 0.1);
        assert_point(transform(m, [0.5, 0.0, 0.0]), [1.05, 1.0, 1.0]);
    }

    #[test]
    fn names_parse_from_the_host_vocabulary() {
        assert_eq!("custom".parse::<Shape>(), Ok(Shape::Custom));
        assert_eq!("sphere".parse::<Shape>(), Ok(Shape::Sphere));
        assert_eq!(
            "torus".parse::<Shape>(),
            Err(UnsupportedShapeOrMode::Shape("torus".to_string()))
        );
        assert_eq!("texture".parse::<AppearanceMode>(), Ok(AppearanceMode::Textured));
        assert_eq!("color".parse::<AppearanceMode>(), Ok(AppearanceMode::Material));
        assert!("chrome".parse::<AppearanceMode>().is_err());
    }

    #[test]
    fn textured_appearance_always_carries_a_texture() {
        let model = Model::new(Shape::Cube).with_texture(ModelTexture::from_url("a.png").with_scale(2.0, 1.0));
        assert_eq!(model.appearance.mode(), AppearanceMode::Textured);
        assert_eq!(model.appearance.texture().unwrap().scale, [2.0, 1.0]);
        assert!(Appearance::Material.texture().is_none());
    }
}
