// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles uploaded meshes, textures with deferred image loading, and the
//! wgpu texture/sampler bundles behind them.

pub mod mesh_buffer;
pub mod texture_manager;
pub mod texture_resource;

// Re-export main types
pub use mesh_buffer::{build_primitive, primitive_data, MeshBuffer, MeshLibrary};
pub use texture_manager::{TextureManager, TextureStats};
pub use texture_resource::TextureResource;
