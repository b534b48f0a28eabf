//! # Graphics Module
//!
//! All rendering functionality of the illuminate renderer: the device
//! abstraction, procedural geometry, shader programs, GPU resources, the
//! scene model and the frame renderer.
//!
//! ## Architecture Overview
//!
//! - **Device** ([`device`]) - GL-style [`GraphicsDevice`] trait with a wgpu and a headless backend
//! - **Geometry** ([`geometry`]) - plane, cube, sphere and hexagon generators
//! - **Shaders** ([`shader`]) - WGSL reflection, linking and the five-program registry
//! - **Resources** ([`resources`]) - uploaded primitives and deferred-load textures
//! - **Scene** ([`scene`]) - camera, lights and models
//! - **Rendering** ([`rendering`]) - the [`Renderer`] that draws a scene each frame
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use illuminate::assets::FileSource;
//! use illuminate::config::RendererConfig;
//! use illuminate::gfx::{device::HeadlessDevice, scene::Scene, Renderer};
//!
//! let renderer = pollster::block_on(Renderer::load(
//!     HeadlessDevice::new(),
//!     Arc::new(FileSource::new(".")),
//!     800,
//!     600,
//!     Scene::default(),
//!     RendererConfig::default(),
//! ));
//! ```

pub mod device;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod shader;

// Re-export commonly used types
pub use device::GraphicsDevice;
pub use rendering::{FrameStats, Renderer};
