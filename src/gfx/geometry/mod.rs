//! # Procedural Geometry Generation
//!
//! Generators for the built-in primitives. Nothing here touches the GPU; the
//! output is uploaded by [`MeshBuffer::upload`](crate::gfx::resources::MeshBuffer::upload).
//!
//! ## Supported Primitives
//!
//! - **Plane**: unit quad on the XZ plane facing +Y
//! - **Cube**: unit cube with independent per-face normals and texcoords
//! - **Sphere**: UV sphere of diameter 1 with configurable resolution
//! - **Hexagon**: flat six-triangle fan, the "custom" model shape
//!
//! ## Usage
//!
//! ```rust
//! use illuminate::gfx::geometry::{generate_cube, generate_sphere};
//!
//! let cube = generate_cube();
//! assert_eq!(cube.vertex_count(), 24);
//!
//! let sphere = generate_sphere(36, 18);
//! assert_eq!(sphere.triangle_count(), 36 * 18 * 2);
//! ```

pub mod primitives;
pub mod vertex;

pub use primitives::*;
pub use vertex::{Normal, Position, TexCoord, Triangle, VertexStream, VERTEX_ATTRIBUTES};

/// Generated geometry ready for GPU upload
///
/// The three vertex streams are parallel: entry `i` of each describes
/// vertex `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Position>,
    pub normals: Vec<Normal>,
    pub tex_coords: Vec<TexCoord>,
    pub triangles: Vec<Triangle>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one vertex to all three streams and returns its index.
    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> u16 {
        let index = self.positions.len() as u16;
        self.positions.push(Position(position));
        self.normals.push(Normal(normal));
        self.tex_coords.push(TexCoord(tex_coord));
        index
    }

    pub fn push_triangle(&mut self, a: u16, b: u16, c: u16) {
        self.triangles.push(Triangle([a, b, c]));
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of indices a draw call over the whole mesh consumes
    pub fn index_count(&self) -> u32 {
        (self.triangles.len() * 3) as u32
    }

    /// Largest vertex index referenced by any triangle
    pub fn max_index(&self) -> Option<u16> {
        self.triangles.iter().flat_map(|t| t.0).max()
    }

    /// Checks that the streams line up and no triangle points past the
    /// vertex data.
    pub fn is_consistent(&self) -> bool {
        let count = self.positions.len();
        self.normals.len() == count
            && self.tex_coords.len() == count
            && self.max_index().map_or(true, |max| (max as usize) < count)
    }
}
