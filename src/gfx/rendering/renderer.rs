//! Frame orchestration
//!
//! The [`Renderer`] owns the device, the program table, the uploaded
//! primitives, the texture manager and the current scene. Each frame it
//! draws every model with the program selected by the renderer-wide
//! [`ShadingAlgorithm`] and the model's appearance, then draws a small
//! emissive sphere at each point light.

use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix};

use super::uniforms::{self, projection_matrix, TEXTURE_UNIT};
use crate::assets::AssetSource;
use crate::config::RendererConfig;
use crate::error::{RenderError, UnsupportedShapeOrMode};
use crate::gfx::device::{GraphicsDevice, TextureId, UniformValue};
use crate::gfx::resources::{MeshBuffer, MeshLibrary, TextureManager, TextureStats};
use crate::gfx::scene::{
    marker_matrix, Appearance, Color, Material, Scene, Shape, TextureSource,
};
use crate::gfx::shader::{ProgramRegistry, ShaderProgram, ShaderSources, ShadingAlgorithm};

/// What one call to [`Renderer::render_frame`] drew
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub models_drawn: usize,
    /// Models whose shape has no uploaded primitive
    pub models_skipped: usize,
    pub markers_drawn: usize,
    /// Point lights uploaded to the shaded programs
    pub lights_active: usize,
}

pub struct Renderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    programs: ProgramRegistry,
    meshes: MeshLibrary,
    textures: TextureManager,

    scene: Scene,
    /// Resolved texture of each model, parallel to `scene.models`
    model_textures: Vec<Option<TextureId>>,
    shading: ShadingAlgorithm,

    viewport: (u32, u32),
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    model_matrix: Matrix4<f32>,

    redraw_requested: bool,
    light_clamp_warned: bool,
    frames_rendered: u64,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Fetches the shader sources from `source` and builds the renderer.
    ///
    /// All ten sources are requested concurrently; any missing source fails
    /// startup.
    pub async fn load(
        device: D,
        source: Arc<dyn AssetSource>,
        width: u32,
        height: u32,
        scene: Scene,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let sources = ShaderSources::fetch(source.as_ref(), &config.shader_dir)
            .await
            .inspect_err(|e| log::error!("Shader fetch failed: {}", e))?;
        Self::new(device, &sources, source, width, height, scene, config)
    }

    /// Builds programs and primitives on `device` and installs `scene`.
    pub fn new(
        mut device: D,
        sources: &ShaderSources,
        source: Arc<dyn AssetSource>,
        width: u32,
        height: u32,
        scene: Scene,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        scene.validate()?;

        device.set_viewport(width, height);
        let programs = ProgramRegistry::build(&mut device, sources)
            .inspect_err(|e| log::error!("{}", e))?;
        let meshes = MeshLibrary::build(&mut device, &config);
        let textures = TextureManager::new(source, config.placeholder_color);

        let projection = projection_matrix(
            config.fov_y_degrees,
            width,
            height,
            config.z_near,
            config.z_far,
            device.depth_range(),
        );

        let mut renderer = Self {
            device,
            shading: config.shading,
            config,
            programs,
            meshes,
            textures,
            scene: Scene::default(),
            model_textures: Vec::new(),
            viewport: (width, height),
            projection,
            view: Matrix4::identity(),
            model_matrix: Matrix4::identity(),
            redraw_requested: true,
            light_clamp_warned: false,
            frames_rendered: 0,
        };
        renderer.install_scene(scene);

        log::info!(
            "Renderer ready: {} primitives, {} shading, {}x{}",
            renderer.meshes.len(),
            renderer.shading.name(),
            width,
            height
        );
        Ok(renderer)
    }

    /// Replaces the scene.
    ///
    /// A scene whose camera looks at its own position is rejected and the
    /// current scene stays active.
    pub fn set_scene(&mut self, scene: Scene) -> Result<(), RenderError> {
        if let Err(e) = scene.validate() {
            log::warn!("Rejected scene: {}", e);
            return Err(e);
        }
        self.install_scene(scene);
        Ok(())
    }

    fn install_scene(&mut self, scene: Scene) {
        self.view = scene.camera.view_matrix();
        self.model_textures = scene
            .models
            .iter()
            .map(|model| match &model.appearance {
                Appearance::Material => None,
                Appearance::Textured(texture) => Some(match &texture.source {
                    TextureSource::Url(url) => self.textures.create_from_url(&mut self.device, url),
                    TextureSource::Handle(id) => *id,
                }),
            })
            .collect();

        let stats = scene.get_statistics();
        log::debug!(
            "Scene set: {} models ({} textured), {} point lights",
            stats.model_count,
            stats.textured_models,
            stats.point_lights
        );

        self.scene = scene;
        self.light_clamp_warned = false;
        self.redraw_requested = true;
    }

    /// Selects the shading algorithm by name (`gouraud` or `phong`).
    ///
    /// Unknown names are rejected and the current algorithm is kept.
    pub fn set_shading_algorithm(&mut self, name: &str) -> Result<(), UnsupportedShapeOrMode> {
        match name.parse() {
            Ok(algorithm) => {
                self.set_shading(algorithm);
                Ok(())
            }
            Err(e) => {
                log::warn!("{}; keeping {}", e, self.shading.name());
                Err(e)
            }
        }
    }

    pub fn set_shading(&mut self, algorithm: ShadingAlgorithm) {
        if self.shading != algorithm {
            log::info!("Shading algorithm: {}", algorithm.name());
            self.shading = algorithm;
            self.redraw_requested = true;
        }
    }

    /// Resizes the viewport and recomputes the projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.viewport {
            return;
        }
        self.viewport = (width, height);
        self.device.set_viewport(width, height);
        self.projection = projection_matrix(
            self.config.fov_y_degrees,
            width,
            height,
            self.config.z_near,
            self.config.z_far,
            self.device.depth_range(),
        );
        self.redraw_requested = true;
    }

    /// Applies finished texture loads without blocking.
    pub fn poll(&mut self) -> usize {
        self.textures.poll(&mut self.device)
    }

    /// One event-loop iteration: applies texture loads, then renders if
    /// anything asked for a redraw since the last rendered frame.
    ///
    /// Any number of redraw requests between two ticks produce one frame.
    pub fn tick(&mut self) -> Result<Option<FrameStats>, RenderError> {
        if !self.poll_redraw() {
            return Ok(None);
        }
        self.render_frame().map(Some)
    }

    /// Applies finished texture loads and reports whether a frame is due.
    ///
    /// For hosts that schedule their own redraws and call
    /// [`render_frame`](Self::render_frame) when the window asks for one.
    pub fn poll_redraw(&mut self) -> bool {
        self.poll();
        if self.textures.take_redraw_request() {
            self.redraw_requested = true;
        }
        self.redraw_requested
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw_requested
    }

    /// Draws the current scene and presents it.
    pub fn render_frame(&mut self) -> Result<FrameStats, RenderError> {
        self.redraw_requested = false;
        let mut stats = FrameStats::default();
        let device = &mut self.device;
        let scene = &self.scene;
        let lights = &scene.light.point_lights;

        device.clear(scene.background);

        for (index, model) in scene.models.iter().enumerate() {
            let Some(mesh) = self.meshes.get(model.shape) else {
                log::debug!("Skipping model {}: no {} primitive", index, model.shape.name());
                stats.models_skipped += 1;
                continue;
            };

            let program = self.programs.get(self.shading, model.appearance.mode());
            self.model_matrix = model.model_matrix();

            let capacity = program.light_capacity();
            if lights.len() > capacity && !self.light_clamp_warned {
                log::warn!(
                    "Scene has {} point lights; '{}' illuminates with the first {}",
                    lights.len(),
                    program.label(),
                    capacity
                );
                self.light_clamp_warned = true;
            }

            device.use_program(Some(program.id()));

            let texture = match &model.appearance {
                Appearance::Textured(texture) => {
                    let id = self.model_textures.get(index).copied().flatten();
                    upload_texture(device, program, id, texture.scale);
                    true
                }
                Appearance::Material => false,
            };
            stats.lights_active = upload_lights_and_camera(device, program, scene);
            upload_material(device, program, &model.material);
            upload_matrices(device, program, &self.projection, &self.view, &self.model_matrix);

            draw(device, mesh);
            if texture {
                device.bind_texture(TEXTURE_UNIT, None);
            }
            device.use_program(None);
            stats.models_drawn += 1;
        }

        if !lights.is_empty() {
            match self.meshes.get(Shape::Sphere) {
                Some(sphere) => {
                    let program = self.programs.emissive();
                    for light in lights {
                        self.model_matrix =
                            marker_matrix(light.position, self.config.light_marker_scale);

                        device.use_program(Some(program.id()));
                        upload_matrices(device, program, &self.projection, &self.view, &self.model_matrix);
                        set(device, program, uniforms::MATERIAL_COLOR, UniformValue::Vec3(light.color));
                        draw(device, sphere);
                        device.use_program(None);
                        stats.markers_drawn += 1;
                    }
                }
                None => log::debug!("No sphere primitive; light markers skipped"),
            }
        }

        self.device.present()?;
        self.frames_rendered += 1;
        Ok(stats)
    }

    /// Creates a single-color 1x1 texture usable as a model texture handle.
    pub fn create_placeholder_texture(&mut self, rgba: [u8; 4]) -> TextureId {
        self.textures.create_placeholder(&mut self.device, rgba)
    }

    /// Returns the texture for `url`, starting its load if needed.
    pub fn create_texture_from_url(&mut self, url: &str) -> TextureId {
        self.textures.create_from_url(&mut self.device, url)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn shading(&self) -> ShadingAlgorithm {
        self.shading
    }

    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    pub fn meshes(&self) -> &MeshLibrary {
        &self.meshes
    }

    pub fn texture_stats(&self) -> TextureStats {
        self.textures.stats()
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

/// Writes a uniform if the program declares it
fn set<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &ShaderProgram,
    name: &str,
    value: UniformValue,
) {
    if let Some(location) = program.location(name) {
        device.set_uniform(location, value);
    }
}

fn upload_texture<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &ShaderProgram,
    texture: Option<TextureId>,
    scale: [f32; 2],
) {
    device.bind_texture(TEXTURE_UNIT, texture);
    set(device, program, uniforms::IMAGE, UniformValue::Int(TEXTURE_UNIT as i32));
    set(device, program, uniforms::TEXTURE_SCALE, UniformValue::Vec2(scale));
}

/// Uploads point lights up to the program's capacity, then the ambient term
/// and the camera position. Returns the number of lights uploaded.
fn upload_lights_and_camera<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &ShaderProgram,
    scene: &Scene,
) -> usize {
    let lights = &scene.light.point_lights;
    let active = lights.len().min(program.light_capacity());

    for (index, light) in lights.iter().take(active).enumerate() {
        if let Some((position, color)) = program.light_locations(index) {
            device.set_uniform(position, light.position.into());
            device.set_uniform(color, UniformValue::Vec3(light.color));
        }
    }

    set(device, program, uniforms::NUM_LIGHTS, UniformValue::Int(active as i32));
    set(device, program, uniforms::LIGHT_AMBIENT, color(scene.light.ambient));
    set(device, program, uniforms::CAMERA_POSITION, scene.camera.position.into());
    active
}

fn upload_material<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &ShaderProgram,
    material: &Material,
) {
    set(device, program, uniforms::MATERIAL_COLOR, color(material.color));
    set(device, program, uniforms::MATERIAL_SPECULAR, color(material.specular));
    set(device, program, uniforms::MATERIAL_SHININESS, UniformValue::Float(material.shininess));
}

fn upload_matrices<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    program: &ShaderProgram,
    projection: &Matrix4<f32>,
    view: &Matrix4<f32>,
    model: &Matrix4<f32>,
) {
    set(device, program, uniforms::PROJECTION_MATRIX, (*projection).into());
    set(device, program, uniforms::VIEW_MATRIX, (*view).into());
    set(device, program, uniforms::MODEL_MATRIX, (*model).into());
}

fn draw<D: GraphicsDevice + ?Sized>(device: &mut D, mesh: &MeshBuffer) {
    device.bind_vertex_array(Some(mesh.vertex_array));
    device.draw_indexed(mesh.index_count);
    device.bind_vertex_array(None);
}

fn color(rgb: Color) -> UniformValue {
    UniformValue::Vec3(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::error::AssetFetchError;
    use crate::gfx::device::{DeviceCommand, HeadlessDevice, ProgramId, VertexArrayId};
    use crate::gfx::scene::{Camera, Model, ModelTexture, PointLight};
    use crate::gfx::shader::ProgramKind;
    use cgmath::{Point3, Vector3};
    use futures::channel::oneshot;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    type Reply = Result<Vec<u8>, AssetFetchError>;

    /// Source whose fetches complete only when the test releases them
    #[derive(Clone, Default)]
    struct GatedSource {
        gates: Arc<Mutex<HashMap<String, oneshot::Sender<Reply>>>>,
    }

    impl GatedSource {
        fn release(&self, url: &str, reply: Reply) {
            let sender = self.gates.lock().unwrap().remove(url).unwrap();
            sender.send(reply).unwrap();
        }
    }

    impl AssetSource for GatedSource {
        fn fetch(&self, url: &str) -> BoxFuture<'static, Reply> {
            let (sender, receiver) = oneshot::channel();
            self.gates.lock().unwrap().insert(url.to_owned(), sender);
            let url = url.to_owned();
            receiver
                .map(move |r| r.unwrap_or_else(|_| Err(AssetFetchError::new(url, 500))))
                .boxed()
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([20, 120, 20, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn test_scene(models: Vec<Model>, lights: Vec<PointLight>) -> Scene {
        let mut scene = Scene::new(Camera::new(
            Point3::new(0.0, 3.0, 8.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        ))
        .with_background([0.1, 0.2, 0.3])
        .with_ambient([0.2, 0.2, 0.2]);
        for model in models {
            scene.add_model(model);
        }
        for light in lights {
            scene.add_point_light(light);
        }
        scene
    }

    fn light(x: f32, color: Color) -> PointLight {
        PointLight::new(Vector3::new(x, 2.0, 0.0), color)
    }

    fn build(
        scene: Scene,
        config: RendererConfig,
        source: Arc<dyn AssetSource>,
    ) -> Renderer<HeadlessDevice> {
        Renderer::new(
            HeadlessDevice::new(),
            &ShaderSources::embedded(),
            source,
            800,
            600,
            scene,
            config,
        )
        .unwrap()
    }

    fn build_default(scene: Scene) -> Renderer<HeadlessDevice> {
        build(scene, RendererConfig::default(), Arc::new(MemorySource::new()))
    }

    fn draws(commands: &[DeviceCommand]) -> Vec<(ProgramId, VertexArrayId, Option<TextureId>, u32)> {
        commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::DrawIndexed {
                    program,
                    vertex_array,
                    texture,
                    index_count,
                } => Some((*program, *vertex_array, *texture, *index_count)),
                _ => None,
            })
            .collect()
    }

    /// Uniform names written before each draw
    fn uniforms_per_draw(commands: &[DeviceCommand]) -> Vec<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for command in commands {
            match command {
                DeviceCommand::SetUniform { name, .. } => current.push(name.clone()),
                DeviceCommand::DrawIndexed { .. } => segments.push(std::mem::take(&mut current)),
                _ => {}
            }
        }
        segments
    }

    fn label(renderer: &Renderer<HeadlessDevice>, program: ProgramId) -> String {
        renderer.device().program_label(program).unwrap().to_owned()
    }

    #[test]
    fn single_cube_draws_once_with_gouraud_color() {
        let mut renderer = build_default(test_scene(vec![Model::new(Shape::Cube)], vec![]));
        renderer.device_mut().take_commands();

        let stats = renderer.render_frame().unwrap();
        assert_eq!(stats.models_drawn, 1);
        assert_eq!(stats.markers_drawn, 0);

        let commands = renderer.device_mut().take_commands();
        assert_eq!(commands.first(), Some(&DeviceCommand::Clear([0.1, 0.2, 0.3])));
        assert_eq!(commands.last(), Some(&DeviceCommand::Present));

        let draws = draws(&commands);
        assert_eq!(draws.len(), 1);
        let (program, vertex_array, texture, index_count) = draws[0];
        assert_eq!(label(&renderer, program), "gouraud_color");
        assert_eq!(Some(vertex_array), renderer.meshes().get(Shape::Cube).map(|m| m.vertex_array));
        assert_eq!(texture, None);
        assert_eq!(index_count, 36);
        assert!(renderer.device().errors().is_empty());
    }

    #[test]
    fn uniforms_upload_texture_then_lights_then_material_then_matrices() {
        let handle_scene = |texture| {
            test_scene(
                vec![Model::new(Shape::Plane).with_texture(ModelTexture::from_handle(texture).with_scale(4.0, 2.0))],
                vec![light(-1.0, [1.0, 0.0, 0.0]), light(1.0, [0.0, 0.0, 1.0])],
            )
        };
        let mut renderer = build_default(test_scene(vec![], vec![]));
        let texture = renderer.create_placeholder_texture([200, 200, 200, 255]);
        renderer.set_scene(handle_scene(texture)).unwrap();
        renderer.device_mut().take_commands();

        renderer.render_frame().unwrap();
        let commands = renderer.device_mut().take_commands();

        let expected = [
            "image",
            "texture_scale",
            "light_positions[0]",
            "light_colors[0]",
            "light_positions[1]",
            "light_colors[1]",
            "num_lights",
            "light_ambient",
            "camera_position",
            "material_color",
            "material_specular",
            "material_shininess",
            "projection_matrix",
            "view_matrix",
            "model_matrix",
        ];
        assert_eq!(uniforms_per_draw(&commands)[0], expected);

        let bind = commands
            .iter()
            .position(|c| *c == DeviceCommand::BindTexture { unit: 0, texture: Some(texture) })
            .unwrap();
        let first_uniform = commands
            .iter()
            .position(|c| matches!(c, DeviceCommand::SetUniform { .. }))
            .unwrap();
        assert!(bind < first_uniform);

        let (program, _, bound, _) = draws(&commands)[0];
        assert_eq!(label(&renderer, program), "gouraud_texture");
        assert_eq!(bound, Some(texture));
        assert_eq!(
            renderer.device().uniform_value(program, "texture_scale"),
            Some(UniformValue::Vec2([4.0, 2.0]))
        );
        assert_eq!(
            renderer.device().uniform_value(program, "image"),
            Some(UniformValue::Int(0))
        );
        assert!(commands.contains(&DeviceCommand::BindTexture { unit: 0, texture: None }));
        assert_eq!(commands[commands.len() - 2], DeviceCommand::UseProgram(None));
    }

    #[test]
    fn lights_are_drawn_as_emissive_markers() {
        let red = light(-1.0, [1.0, 0.0, 0.0]);
        let blue = light(1.0, [0.0, 0.0, 1.0]);
        let mut renderer = build_default(test_scene(vec![Model::new(Shape::Cube)], vec![red, blue]));
        renderer.device_mut().take_commands();

        let stats = renderer.render_frame().unwrap();
        assert_eq!(stats.markers_drawn, 2);
        assert_eq!(stats.lights_active, 2);

        let commands = renderer.device_mut().take_commands();
        let draws = draws(&commands);
        let segments = uniforms_per_draw(&commands);
        assert_eq!(draws.len(), 3);

        let sphere = renderer.meshes().get(Shape::Sphere).unwrap();
        for draw in &draws[1..] {
            assert_eq!(label(&renderer, draw.0), "emissive");
            assert_eq!(draw.1, sphere.vertex_array);
            assert_eq!(draw.3, sphere.index_count);
        }
        assert_eq!(
            segments[1],
            ["projection_matrix", "view_matrix", "model_matrix", "material_color"]
        );

        let emissive = renderer.programs().emissive().id();
        assert_eq!(
            renderer.device().uniform_value(emissive, "material_color"),
            Some(UniformValue::Vec3([0.0, 0.0, 1.0]))
        );
        assert_eq!(
            renderer.device().uniform_value(emissive, "model_matrix"),
            Some(marker_matrix(blue.position, 0.1).into())
        );
    }

    #[test]
    fn surplus_lights_are_clamped_but_all_get_markers() {
        let lights: Vec<PointLight> = (0..10).map(|i| light(i as f32, [1.0, 1.0, 1.0])).collect();
        let mut renderer = build_default(test_scene(vec![Model::new(Shape::Sphere)], lights));

        let stats = renderer.render_frame().unwrap();
        assert_eq!(stats.lights_active, 8);
        assert_eq!(stats.markers_drawn, 10);

        let program = renderer
            .programs()
            .get(ShadingAlgorithm::Gouraud, crate::gfx::scene::AppearanceMode::Material)
            .id();
        assert_eq!(
            renderer.device().uniform_value(program, "num_lights"),
            Some(UniformValue::Int(8))
        );
    }

    #[test]
    fn models_without_a_built_primitive_are_skipped() {
        let config = RendererConfig::default().with_shapes(&[Shape::Cube, Shape::Sphere]);
        let scene = test_scene(vec![Model::new(Shape::Custom), Model::new(Shape::Cube)], vec![]);
        let mut renderer = build(scene, config, Arc::new(MemorySource::new()));

        let stats = renderer.render_frame().unwrap();
        assert_eq!(stats.models_skipped, 1);
        assert_eq!(stats.models_drawn, 1);
        assert_eq!(draws(renderer.device().commands()).len(), 1);
    }

    #[test]
    fn unknown_algorithm_keeps_current_state() {
        let mut renderer = build_default(test_scene(vec![Model::new(Shape::Cube)], vec![]));
        assert!(renderer.tick().unwrap().is_some());

        let err = renderer.set_shading_algorithm("toon").unwrap_err();
        assert_eq!(err, UnsupportedShapeOrMode::ShadingAlgorithm("toon".to_string()));
        assert_eq!(renderer.shading(), ShadingAlgorithm::Gouraud);
        assert!(renderer.tick().unwrap().is_none());
    }

    #[test]
    fn switching_to_phong_redraws_with_phong_programs() {
        let scene = test_scene(
            vec![
                Model::new(Shape::Cube),
                Model::new(Shape::Plane).with_texture(ModelTexture::from_url("floor.png")),
            ],
            vec![],
        );
        let mut renderer = build(scene, RendererConfig::default(), Arc::new(GatedSource::default()));
        renderer.tick().unwrap();
        renderer.device_mut().take_commands();

        renderer.set_shading_algorithm("phong").unwrap();
        assert!(renderer.tick().unwrap().is_some());

        let commands = renderer.device_mut().take_commands();
        let labels: Vec<String> = draws(&commands).iter().map(|d| label(&renderer, d.0)).collect();
        assert_eq!(labels, ["phong_color", "phong_texture"]);
    }

    #[test]
    fn degenerate_camera_is_rejected_and_previous_scene_kept() {
        let mut renderer = build_default(test_scene(vec![Model::new(Shape::Cube)], vec![]));
        let point = Point3::new(1.0, 1.0, 1.0);
        let bad = Scene::new(Camera::new(point, point, Vector3::unit_y()));

        assert!(matches!(renderer.set_scene(bad.clone()), Err(RenderError::DegenerateCamera)));
        assert_eq!(renderer.scene().models.len(), 1);

        let result = Renderer::new(
            HeadlessDevice::new(),
            &ShaderSources::embedded(),
            Arc::new(MemorySource::new()),
            800,
            600,
            bad,
            RendererConfig::default(),
        );
        assert!(matches!(result, Err(RenderError::DegenerateCamera)));
    }

    #[test]
    fn texture_load_triggers_exactly_one_redraw() {
        let source = GatedSource::default();
        let scene = test_scene(
            vec![
                Model::new(Shape::Cube).with_texture(ModelTexture::from_url("crate.png")),
                Model::new(Shape::Plane).with_texture(ModelTexture::from_url("grass.png")),
                Model::new(Shape::Sphere).with_texture(ModelTexture::from_url("crate.png")),
            ],
            vec![],
        );
        let mut renderer = build(scene, RendererConfig::default(), Arc::new(source.clone()));
        assert_eq!(renderer.texture_stats().created, 2);

        // First frame shows the placeholders
        assert!(renderer.tick().unwrap().is_some());
        let first = draws(renderer.device().commands());
        let crate_texture = first[0].2.unwrap();
        assert_eq!(first[2].2, Some(crate_texture));
        let placeholder = renderer.device().texture(crate_texture).unwrap();
        assert_eq!(placeholder.image.get_pixel(0, 0).0, [255, 0, 255, 255]);
        assert!(renderer.tick().unwrap().is_none());

        // Two loads finishing in the same tick coalesce into one frame
        source.release("crate.png", Ok(png(8, 8)));
        source.release("grass.png", Ok(png(4, 4)));
        assert!(renderer.tick().unwrap().is_some());
        assert!(renderer.tick().unwrap().is_none());
        assert_eq!(renderer.frames_rendered(), 2);

        let loaded = renderer.device().texture(crate_texture).unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.image.dimensions(), (8, 8));
        assert_eq!(renderer.texture_stats().loaded, 2);
    }

    #[test]
    fn host_scheduled_redraws_follow_texture_loads() {
        let source = GatedSource::default();
        let scene = test_scene(
            vec![Model::new(Shape::Cube).with_texture(ModelTexture::from_url("crate.png"))],
            vec![],
        );
        let mut renderer = build(scene, RendererConfig::default(), Arc::new(source.clone()));
        assert!(renderer.poll_redraw());
        renderer.render_frame().unwrap();
        assert!(!renderer.poll_redraw());

        source.release("crate.png", Ok(png(2, 2)));
        assert!(renderer.poll_redraw());
        assert!(renderer.poll_redraw());
        renderer.render_frame().unwrap();
        assert!(!renderer.poll_redraw());
        assert_eq!(renderer.frames_rendered(), 2);
        assert_eq!(renderer.texture_stats().loaded, 1);
    }

    #[test]
    fn failed_texture_load_never_redraws() {
        let source = GatedSource::default();
        let scene = test_scene(
            vec![Model::new(Shape::Cube).with_texture(ModelTexture::from_url("gone.png"))],
            vec![],
        );
        let mut renderer = build(scene, RendererConfig::default(), Arc::new(source.clone()));
        renderer.tick().unwrap();

        source.release("gone.png", Err(AssetFetchError::new("gone.png", 404)));
        assert!(renderer.tick().unwrap().is_none());
        assert_eq!(renderer.texture_stats().failed, 1);
    }

    #[test]
    fn resize_recomputes_projection_only_for_real_changes() {
        let mut renderer = build_default(test_scene(vec![], vec![]));
        renderer.tick().unwrap();
        let before = renderer.projection();

        renderer.resize(0, 600);
        assert_eq!(renderer.projection(), before);
        assert!(!renderer.needs_redraw());

        renderer.resize(1200, 600);
        assert_ne!(renderer.projection(), before);
        assert_eq!(renderer.viewport(), (1200, 600));
        assert!(renderer.needs_redraw());
        assert!(renderer
            .device()
            .commands()
            .contains(&DeviceCommand::Viewport { width: 1200, height: 600 }));
    }

    #[test]
    fn projection_targets_the_device_depth_range() {
        use crate::gfx::device::DepthRange;

        let gl = Renderer::new(
            HeadlessDevice::new().with_depth_range(DepthRange::NegativeOneToOne),
            &ShaderSources::embedded(),
            Arc::new(MemorySource::new()),
            800,
            600,
            test_scene(vec![], vec![]),
            RendererConfig::default(),
        )
        .unwrap();
        let wgpu = build_default(test_scene(vec![], vec![]));

        assert_eq!(
            gl.projection(),
            projection_matrix(30.0, 800, 600, 0.1, 100.0, DepthRange::NegativeOneToOne)
        );
        assert_eq!(
            wgpu.projection(),
            projection_matrix(30.0, 800, 600, 0.1, 100.0, DepthRange::ZeroToOne)
        );
        assert_ne!(gl.projection(), wgpu.projection());
    }

    #[test]
    fn load_fails_fast_when_a_shader_is_missing() {
        let embedded = ShaderSources::embedded();
        let mut source = MemorySource::new();
        for kind in ProgramKind::ALL {
            let (vertex, fragment) = embedded.get(kind).unwrap();
            source.insert(format!("shaders/{}.vert.wgsl", kind.name()), vertex.as_bytes().to_vec());
            if kind != ProgramKind::Emissive {
                source.insert(format!("shaders/{}.frag.wgsl", kind.name()), fragment.as_bytes().to_vec());
            }
        }

        let result = futures::executor::block_on(Renderer::load(
            HeadlessDevice::new(),
            Arc::new(source.clone()),
            800,
            600,
            test_scene(vec![], vec![]),
            RendererConfig::default(),
        ));
        match result {
            Err(RenderError::AssetFetch(e)) => assert_eq!(e.url, "shaders/emissive.frag.wgsl"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("renderer built without all shaders"),
        }

        source.insert(
            "shaders/emissive.frag.wgsl",
            embedded.get(ProgramKind::Emissive).unwrap().1.as_bytes().to_vec(),
        );
        let renderer = futures::executor::block_on(Renderer::load(
            HeadlessDevice::new(),
            Arc::new(source),
            800,
            600,
            test_scene(vec![], vec![]),
            RendererConfig::default(),
        ));
        assert!(renderer.is_ok());
    }
}
