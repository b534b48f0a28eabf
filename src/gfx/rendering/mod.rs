// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles program selection, uniform upload and frame submission.

pub mod renderer;
pub mod uniforms;

// Re-export main types
pub use renderer::{FrameStats, Renderer};
pub use uniforms::projection_matrix;
