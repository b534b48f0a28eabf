use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::assets::{AssetSource, FileSource};
use crate::config::RendererConfig;
use crate::gfx::{
    device::WgpuDevice,
    rendering::Renderer,
    scene::Scene,
    shader::ShadingAlgorithm,
};

/// How often pending texture loads are polled while the loop is idle
const TEXTURE_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Windowed host for a [`Renderer`].
///
/// `G` and `P` switch between Gouraud and Phong shading, `Escape` quits.
pub struct IlluminateApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    title: String,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer<WgpuDevice>>,
    scene: Option<Scene>,
    config: RendererConfig,
    source: Arc<dyn AssetSource>,
    error: Option<anyhow::Error>,
}

impl IlluminateApp {
    /// Creates an app that loads shaders and textures relative to `asset_root`.
    pub fn new(scene: Scene, config: RendererConfig, asset_root: &str) -> anyhow::Result<Self> {
        Self::with_source(scene, config, Arc::new(FileSource::new(asset_root)))
    }

    pub fn with_source(
        scene: Scene,
        config: RendererConfig,
        source: Arc<dyn AssetSource>,
    ) -> anyhow::Result<Self> {
        scene.validate()?;
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                title: "Illuminate".to_string(),
                window: None,
                renderer: None,
                scene: Some(scene),
                config,
                source,
                error: None,
            },
        })
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.app_state.title = title.to_owned();
        self
    }

    /// Runs the event loop until the window closes or startup fails.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| anyhow!("event loop already consumed"))?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut self.app_state)
            .context("event loop terminated abnormally")?;

        match self.app_state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.title.clone())
                    .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);
        let (width, height) = window.inner_size().into();

        let scene = self.scene.take().unwrap_or_default();
        let device = pollster::block_on(WgpuDevice::new(window.clone(), width, height))
            .context("failed to create graphics device")?;
        let renderer = pollster::block_on(Renderer::load(
            device,
            self.source.clone(),
            width,
            height,
            scene,
            self.config.clone(),
        ))
        .context("failed to start renderer")?;

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match key {
            KeyCode::KeyG => renderer.set_shading(ShadingAlgorithm::Gouraud),
            KeyCode::KeyP => renderer.set_shading(ShadingAlgorithm::Phong),
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("{:#}", e);
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(key_code, event_loop),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };
                if let Err(e) = renderer.render_frame() {
                    log::error!("Frame failed: {}", e);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return;
        };

        if renderer.poll_redraw() {
            window.request_redraw();
        }

        // Loads complete off-thread without waking the loop
        if renderer.texture_stats().pending > 0 {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + TEXTURE_POLL_INTERVAL));
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}
