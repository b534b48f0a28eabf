//! # Lit Scene
//!
//! A grass floor, a crate, a glossy sphere and a hexagon under three
//! colored point lights, seen through the default 30 degree field of view.
//! Press `G` for Gouraud shading, `P` for Phong, `Escape` to quit.
//!
//! Run from the crate root so `shaders/` resolves:
//!
//! ```text
//! cargo run --example lit_scene
//! ```

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use cgmath::{Point3, Vector3};
use illuminate::{
    gfx::scene::{Camera, Material, Model, ModelTexture, PointLight, Scene, Shape},
    logging::{init_logging, LoggingConfig},
    IlluminateApp, RendererConfig,
};

fn build_scene() -> Scene {
    let mut scene = Scene::new(Camera::new(
        Point3::new(0.0, 5.0, 5.0),
        Point3::new(0.0, 1.9, 0.0),
        Vector3::unit_y(),
    ))
    .with_background([0.1, 0.1, 0.1])
    .with_ambient([0.2, 0.2, 0.2]);

    scene.add_point_light(PointLight::new(Vector3::new(-2.0, 3.0, 1.0), [1.0, 1.0, 1.0]));
    scene.add_point_light(PointLight::new(Vector3::new(2.0, 3.5, -1.0), [0.9, 0.4, 0.2]));
    scene.add_point_light(PointLight::new(Vector3::new(0.0, 1.0, 3.0), [0.2, 0.4, 0.9]));

    scene.add_model(
        Model::new(Shape::Plane)
            .with_scale(8.0, 1.0, 8.0)
            .with_texture(ModelTexture::from_url("assets/grass.jpg").with_scale(4.0, 4.0)),
    );
    scene.add_model(
        Model::new(Shape::Cube)
            .with_center(-1.0, 0.5, 0.0)
            .with_rotation(0.0, FRAC_PI_4, 0.0)
            .with_texture(ModelTexture::from_url("assets/crate.png")),
    );
    scene.add_model(
        Model::new(Shape::Sphere)
            .with_center(1.2, 0.6, 0.4)
            .with_scale(0.6, 0.6, 0.6)
            .with_material(Material::new([0.2, 0.6, 0.8], [1.0, 1.0, 1.0], 64.0)),
    );
    scene.add_model(
        Model::new(Shape::Custom)
            .with_center(0.0, 2.2, -1.0)
            .with_rotation(FRAC_PI_2, 0.0, 0.0)
            .with_material(Material::new([0.8, 0.7, 0.2], [0.5, 0.5, 0.5], 8.0)),
    );
    scene
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    IlluminateApp::new(build_scene(), RendererConfig::default(), ".")?
        .with_title("Illuminate: lit scene")
        .run()
}
