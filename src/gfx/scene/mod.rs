//! # Scene Model
//!
//! The in-memory description of what to draw: a camera, a background color,
//! ambient plus point lighting, and an ordered list of models.
//!
//! ## Key Components
//!
//! - [`Scene`] - the value handed to the renderer, replaced wholesale on update
//! - [`Model`] - a primitive [`Shape`] with transform, [`Material`] and [`Appearance`]
//! - [`PointLight`] - a colored light, also drawn as a marker sphere
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::{Point3, Vector3};
//! use illuminate::gfx::scene::{Camera, Model, PointLight, Scene, Shape};
//!
//! let mut scene = Scene::new(Camera::new(
//!     Point3::new(0.0, 4.0, 10.0),
//!     Point3::new(0.0, 0.0, 0.0),
//!     Vector3::unit_y(),
//! ));
//! scene.add_model(Model::new(Shape::Sphere).with_center(0.0, 0.5, 0.0));
//! scene.add_point_light(PointLight::new(Vector3::new(2.0, 3.0, 2.0), [1.0, 1.0, 1.0]));
//! ```

pub mod model;
pub mod scene;

/// Linear RGB with components in [0, 1]
pub type Color = [f32; 3];

// Re-export main types
pub use model::{
    marker_matrix, Appearance, AppearanceMode, Material, Model, ModelTexture, Shape, TextureSource,
};
pub use scene::{Camera, Lighting, PointLight, Scene, SceneStatistics};
