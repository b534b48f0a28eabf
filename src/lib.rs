// src/lib.rs
//! Illuminate
//!
//! A real-time point-light renderer built on wgpu and winit. Models made of
//! procedural primitives are shaded per vertex (Gouraud) or per fragment
//! (Phong), with either a flat material color or a texture.

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::IlluminateApp;
pub use config::RendererConfig;
pub use error::RenderError;
pub use gfx::rendering::{FrameStats, Renderer};
pub use gfx::shader::ShadingAlgorithm;
