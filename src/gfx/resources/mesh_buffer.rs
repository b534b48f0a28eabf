//! Uploaded primitives
//!
//! Each built-in shape is generated and uploaded once at startup. The
//! resulting [`MeshBuffer`]s are shared read-only by every model and light
//! marker using that shape.

use crate::config::RendererConfig;
use crate::gfx::device::{GraphicsDevice, VertexArrayId};
use crate::gfx::geometry::{
    generate_cube, generate_hexagon, generate_plane, generate_sphere, MeshData,
};
use crate::gfx::scene::Shape;

/// A mesh resident on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffer {
    pub vertex_array: VertexArrayId,
    pub index_count: u32,
    pub vertex_count: usize,
}

impl MeshBuffer {
    /// Packs the mesh streams into a vertex array on `device`.
    pub fn upload<D: GraphicsDevice + ?Sized>(device: &mut D, mesh: &MeshData) -> Self {
        debug_assert!(mesh.is_consistent(), "mesh indices exceed its vertex data");
        Self {
            vertex_array: device.create_vertex_array(mesh),
            index_count: mesh.index_count(),
            vertex_count: mesh.vertex_count(),
        }
    }
}

/// Generates the geometry of a built-in shape.
pub fn primitive_data(shape: Shape, config: &RendererConfig) -> MeshData {
    match shape {
        Shape::Plane => generate_plane(),
        Shape::Cube => generate_cube(),
        Shape::Sphere => generate_sphere(config.sphere_slices, config.sphere_stacks),
        Shape::Custom => generate_hexagon(
            config.hexagon_radius,
            [0.0, 0.0, 0.0],
            config.hexagon_flip_normal,
        ),
    }
}

/// Generates and uploads one built-in shape.
pub fn build_primitive<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    shape: Shape,
    config: &RendererConfig,
) -> MeshBuffer {
    MeshBuffer::upload(device, &primitive_data(shape, config))
}

/// The uploaded primitives, indexed by shape
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    meshes: [Option<MeshBuffer>; Shape::ALL.len()],
}

impl MeshLibrary {
    /// Builds every shape listed in `config.shapes`.
    pub fn build<D: GraphicsDevice + ?Sized>(device: &mut D, config: &RendererConfig) -> Self {
        let mut library = Self::default();
        for &shape in &config.shapes {
            if library.meshes[shape.index()].is_some() {
                continue;
            }
            let mesh = build_primitive(device, shape, config);
            log::debug!(
                "Uploaded {} mesh: {} vertices, {} indices",
                shape.name(),
                mesh.vertex_count,
                mesh.index_count
            );
            library.meshes[shape.index()] = Some(mesh);
        }
        library
    }

    pub fn get(&self, shape: Shape) -> Option<&MeshBuffer> {
        self.meshes[shape.index()].as_ref()
    }

    pub fn len(&self) -> usize {
        self.meshes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
