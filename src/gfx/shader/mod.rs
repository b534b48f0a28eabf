//! # Shader Programs
//!
//! WGSL sources are parsed and validated with `naga`, their interfaces are
//! reflected and the two stages are linked into a [`LinkedProgram`]: a flat
//! table of named uniforms with byte offsets into the program's uniform
//! block. The table is what makes the location-style API of
//! [`GraphicsDevice`](crate::gfx::device::GraphicsDevice) possible.
//!
//! ## Binding convention
//!
//! - `@group(0) @binding(0)`: one `var<uniform>` struct holding every scalar,
//!   vector and matrix uniform
//! - `@group(1) @binding(0)`: the sampled 2D texture, exposed as the uniform
//!   named after the variable (`image`)
//! - `@group(1) @binding(1)`: its sampler
//!
//! Array members are exposed element-wise as `name[i]`.

mod reflect;
pub mod registry;

use std::fmt;

use crate::error::ShaderBuildError;
use crate::gfx::geometry::VERTEX_ATTRIBUTES;

pub use registry::{ProgramKind, ProgramRegistry, ShaderProgram, ShaderSources, ShadingAlgorithm};

/// Pipeline stage a shader source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert.wgsl",
            ShaderStage::Fragment => "frag.wgsl",
        }
    }

    fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Index of a uniform within its program's uniform table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

impl UniformLocation {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shader-side type of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Sampled 2D texture; its value is the texture unit
    Texture2d,
}

impl UniformType {
    /// Bytes the value occupies in the uniform block
    pub fn size(self) -> u32 {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
            UniformType::Texture2d => 0,
        }
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{ScalarKind, TypeInner, VectorSize};

        let is_f32 = |scalar: naga::Scalar| scalar.kind == ScalarKind::Float && scalar.width == 4;
        match *inner {
            TypeInner::Scalar(scalar) if is_f32(scalar) => Some(UniformType::Float),
            TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Sint && scalar.width == 4 => {
                Some(UniformType::Int)
            }
            TypeInner::Vector { size, scalar } if is_f32(scalar) => Some(match size {
                VectorSize::Bi => UniformType::Vec2,
                VectorSize::Tri => UniformType::Vec3,
                VectorSize::Quad => UniformType::Vec4,
            }),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if is_f32(scalar) => Some(UniformType::Mat4),
            _ => None,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformType::Float => "f32",
            UniformType::Int => "i32",
            UniformType::Vec2 => "vec2<f32>",
            UniformType::Vec3 => "vec3<f32>",
            UniformType::Vec4 => "vec4<f32>",
            UniformType::Mat4 => "mat4x4<f32>",
            UniformType::Texture2d => "texture_2d<f32>",
        };
        f.write_str(name)
    }
}

/// One active uniform of a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub ty: UniformType,
    /// Byte offset inside the uniform block; zero for textures
    pub offset: u32,
}

/// Source and entry point of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    pub source: String,
    pub entry_point: String,
}

/// Both stages of a program after validation and interface linking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    pub label: String,
    pub vertex: StageSource,
    pub fragment: StageSource,
    /// Every uniform of both stages; a uniform's location is its index here
    pub uniforms: Vec<UniformInfo>,
    /// Size in bytes of the `@group(0)` uniform struct
    pub uniform_block_size: u32,
}

impl LinkedProgram {
    /// Compiles both stages and links their interfaces.
    ///
    /// Vertex inputs named after the vertex streams must sit at the stream
    /// slots. Every fragment input must be written by the vertex stage, and a
    /// uniform declared in both stages must agree on type and offset.
    pub fn link(
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderBuildError> {
        let vertex = reflect::reflect_stage(label, ShaderStage::Vertex, vertex_source)?;
        let fragment = reflect::reflect_stage(label, ShaderStage::Fragment, fragment_source)?;
        let link_error = |diagnostic: String| ShaderBuildError::Link {
            program: label.to_owned(),
            diagnostic,
        };

        for input in &vertex.inputs {
            match VERTEX_ATTRIBUTES.iter().find(|(_, name)| input.name.as_deref() == Some(*name)) {
                Some((slot, name)) if *slot != input.location => {
                    return Err(link_error(format!(
                        "vertex input '{}' is bound to location {} but the '{}' stream uses slot {}",
                        name, input.location, name, slot
                    )));
                }
                Some(_) => {}
                None if (input.location as usize) < VERTEX_ATTRIBUTES.len() => {}
                None => {
                    return Err(link_error(format!(
                        "vertex input at location {} has no vertex stream",
                        input.location
                    )));
                }
            }
        }

        for input in &fragment.inputs {
            if !vertex.outputs.contains(&input.location) {
                return Err(link_error(format!(
                    "fragment input at location {} is not written by the vertex stage",
                    input.location
                )));
            }
        }

        let mut uniforms = vertex.uniforms;
        for uniform in fragment.uniforms {
            match uniforms.iter().find(|u| u.name == uniform.name) {
                Some(existing) if existing.ty != uniform.ty || existing.offset != uniform.offset => {
                    return Err(link_error(format!(
                        "uniform '{}' is declared as {} at offset {} in the vertex stage but as {} at offset {} in the fragment stage",
                        uniform.name, existing.ty, existing.offset, uniform.ty, uniform.offset
                    )));
                }
                Some(_) => {}
                None => uniforms.push(uniform),
            }
        }

        let uniform_block_size = vertex.block_size.max(fragment.block_size);
        if let Some(overflow) = uniforms
            .iter()
            .find(|u| u.ty != UniformType::Texture2d && u.offset + u.ty.size() > uniform_block_size)
        {
            return Err(link_error(format!(
                "uniform '{}' lies outside the uniform block",
                overflow.name
            )));
        }

        Ok(Self {
            label: label.to_owned(),
            vertex: StageSource {
                source: vertex_source.to_owned(),
                entry_point: vertex.entry_point,
            },
            fragment: StageSource {
                source: fragment_source.to_owned(),
                entry_point: fragment.entry_point,
            },
            uniforms,
            uniform_block_size,
        })
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|index| UniformLocation(index as u32))
    }

    pub fn uniform(&self, location: UniformLocation) -> Option<&UniformInfo> {
        self.uniforms.get(location.index())
    }

    /// Whether the fragment or vertex stage samples a texture
    pub fn samples_texture(&self) -> bool {
        self.uniforms.iter().any(|u| u.ty == UniformType::Texture2d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct Uniforms {
    model_matrix: mat4x4<f32>,
    light_positions: array<vec3<f32>, 2>,
    num_lights: i32,
};
@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
};

@vertex
fn main(
    @location(0) vertex_position: vec3<f32>,
    @location(2) vertex_texcoord: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.model_matrix * vec4<f32>(vertex_position, 1.0);
    out.texcoord = vertex_texcoord;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
struct Uniforms {
    model_matrix: mat4x4<f32>,
    light_positions: array<vec3<f32>, 2>,
    num_lights: i32,
};
@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var image: texture_2d<f32>;
@group(1) @binding(1) var image_sampler: sampler;

@fragment
fn main(@location(0) texcoord: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, texcoord);
}
"#;

    #[test]
    fn link_flattens_uniforms_and_array_elements() {
        let program = LinkedProgram::link("test", VERTEX, FRAGMENT).unwrap();

        let names: Vec<&str> = program.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "model_matrix",
                "light_positions[0]",
                "light_positions[1]",
                "num_lights",
                "image"
            ]
        );

        let second = program.location("light_positions[1]").unwrap();
        let info = program.uniform(second).unwrap();
        assert_eq!(info.ty, UniformType::Vec3);
        assert_eq!(info.offset, 64 + 16);
        assert_eq!(program.uniform(program.location("num_lights").unwrap()).unwrap().offset, 96);
        assert!(program.samples_texture());
        assert_eq!(program.vertex.entry_point, "main");
        assert!(program.uniform_block_size >= 100);
    }

    #[test]
    fn misplaced_vertex_attribute_fails_to_link() {
        let swapped = VERTEX.replace("@location(2) vertex_texcoord", "@location(1) vertex_texcoord");
        let err = LinkedProgram::link("swapped", &swapped, FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderBuildError::Link { .. }));
        assert!(err.diagnostic().contains("vertex_texcoord"));
    }

    #[test]
    fn conflicting_uniform_declarations_fail_to_link() {
        let fragment = FRAGMENT.replacen("num_lights: i32", "num_lights: f32", 1);
        let err = LinkedProgram::link("conflict", VERTEX, &fragment).unwrap_err();
        assert!(matches!(err, ShaderBuildError::Link { .. }));
        assert!(err.diagnostic().contains("num_lights"));
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        let fragment = FRAGMENT.replace("@location(0) texcoord", "@location(3) texcoord");
        let err = LinkedProgram::link("varyings", VERTEX, &fragment).unwrap_err();
        assert!(err.diagnostic().contains("location 3"));
    }

    #[test]
    fn syntax_errors_report_the_stage() {
        let broken = FRAGMENT.replace("return textureSample", "return textureSample(");
        let err = LinkedProgram::link("broken", VERTEX, &broken).unwrap_err();
        match err {
            ShaderBuildError::Compile { stage, diagnostic, .. } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected a compile error, got {other:?}"),
        }
    }

    #[test]
    fn missing_entry_point_is_a_compile_error() {
        let err = LinkedProgram::link("no-entry", FRAGMENT, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            ShaderBuildError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }
}
