//! Command-recording device without a GPU

use image::RgbaImage;

use super::{
    DepthRange, GraphicsDevice, ProgramId, SamplerConfig, TextureId, UniformValue, VertexArrayId,
};
use crate::error::{DeviceError, ShaderBuildError};
use crate::gfx::geometry::MeshData;
use crate::gfx::shader::{LinkedProgram, UniformInfo, UniformLocation};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Viewport { width: u32, height: u32 },
    Clear([f32; 3]),
    UseProgram(Option<ProgramId>),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    BindTexture { unit: u32, texture: Option<TextureId> },
    BindVertexArray(Option<VertexArrayId>),
    DrawIndexed {
        program: ProgramId,
        vertex_array: VertexArrayId,
        texture: Option<TextureId>,
        index_count: u32,
    },
    Present,
}

#[derive(Debug, Clone)]
struct HeadlessProgram {
    label: String,
    uniforms: Vec<UniformInfo>,
    values: Vec<Option<UniformValue>>,
}

#[derive(Debug, Clone, Copy)]
struct HeadlessMesh {
    vertex_count: usize,
    index_count: u32,
}

/// Stored texture contents
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessTexture {
    pub image: RgbaImage,
    pub sampler: SamplerConfig,
    /// Mip levels a GPU backend would allocate
    pub mip_level_count: u32,
    /// Number of in-place updates since creation
    pub revision: u32,
}

/// A [`GraphicsDevice`] that records commands instead of drawing.
///
/// Uniform writes are type-checked against the program's uniform table and
/// draws are validated against the bound state; invalid calls are logged and
/// counted in [`HeadlessDevice::errors`].
#[derive(Debug)]
pub struct HeadlessDevice {
    depth_range: DepthRange,
    max_texture_dimension: u32,
    programs: Vec<HeadlessProgram>,
    meshes: Vec<HeadlessMesh>,
    textures: Vec<HeadlessTexture>,
    commands: Vec<DeviceCommand>,
    current_program: Option<ProgramId>,
    current_vertex_array: Option<VertexArrayId>,
    texture_units: [Option<TextureId>; 4],
    frames_presented: u64,
    errors: Vec<String>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            depth_range: DepthRange::ZeroToOne,
            max_texture_dimension: 8192,
            programs: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            commands: Vec::new(),
            current_program: None,
            current_vertex_array: None,
            texture_units: [None; 4],
            frames_presented: 0,
            errors: Vec::new(),
        }
    }

    pub fn with_depth_range(mut self, depth_range: DepthRange) -> Self {
        self.depth_range = depth_range;
        self
    }

    /// Limits texture sizes; larger uploads are rejected as errors.
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drains the recorded commands
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs
            .get(program.0 as usize)
            .map(|p| p.label.as_str())
    }

    /// Current value of a program uniform, by name
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let program = self.programs.get(program.0 as usize)?;
        let index = program.uniforms.iter().position(|u| u.name == name)?;
        program.values[index]
    }

    pub fn texture(&self, texture: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(texture.0 as usize)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn vertex_array_index_count(&self, vertex_array: VertexArrayId) -> Option<u32> {
        self.meshes
            .get(vertex_array.0 as usize)
            .map(|m| m.index_count)
    }

    pub fn vertex_array_vertex_count(&self, vertex_array: VertexArrayId) -> Option<usize> {
        self.meshes
            .get(vertex_array.0 as usize)
            .map(|m| m.vertex_count)
    }

    /// Invalid calls seen so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn check_texture_size(&mut self, image: &RgbaImage) {
        let (width, height) = image.dimensions();
        if width.max(height) > self.max_texture_dimension {
            self.error(format!(
                "texture {}x{} exceeds the {} texel limit",
                width, height, self.max_texture_dimension
            ));
        }
    }

    fn error(&mut self, message: String) {
        log::warn!("headless device: {}", message);
        self.errors.push(message);
    }
}

/// Levels in a full mip chain down to 1x1
pub(super) fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl GraphicsDevice for HeadlessDevice {
    fn depth_range(&self) -> DepthRange {
        self.depth_range
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramId, ShaderBuildError> {
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(HeadlessProgram {
            label: program.label.clone(),
            uniforms: program.uniforms.clone(),
            values: vec![None; program.uniforms.len()],
        });
        Ok(id)
    }

    fn create_vertex_array(&mut self, mesh: &MeshData) -> VertexArrayId {
        let id = VertexArrayId(self.meshes.len() as u32);
        self.meshes.push(HeadlessMesh {
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
        });
        id
    }

    fn create_texture(&mut self, image: &RgbaImage, sampler: SamplerConfig) -> TextureId {
        self.check_texture_size(image);
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(HeadlessTexture {
            image: image.clone(),
            sampler,
            mip_level_count: mip_levels_for(image, sampler),
            revision: 0,
        });
        id
    }

    fn update_texture(&mut self, texture: TextureId, image: &RgbaImage, sampler: SamplerConfig) {
        self.check_texture_size(image);
        match self.textures.get_mut(texture.0 as usize) {
            Some(stored) => {
                stored.image = image.clone();
                stored.sampler = sampler;
                stored.mip_level_count = mip_levels_for(image, sampler);
                stored.revision += 1;
            }
            None => self.error(format!("update of unknown texture {:?}", texture)),
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(DeviceCommand::Viewport { width, height });
    }

    fn clear(&mut self, color: [f32; 3]) {
        self.commands.push(DeviceCommand::Clear(color));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program {
            if id.0 as usize >= self.programs.len() {
                self.error(format!("use of unknown program {:?}", id));
            }
        }
        self.current_program = program;
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program_id) = self.current_program else {
            self.error(format!("uniform {:?} set with no program in use", location));
            return;
        };
        let Some(program) = self.programs.get_mut(program_id.0 as usize) else {
            return;
        };
        let Some(info) = program.uniforms.get(location.index()) else {
            let message = format!("location {:?} out of range for '{}'", location, program.label);
            self.error(message);
            return;
        };
        if !value.matches(info.ty) {
            let message = format!("{:?} written to '{}' of type {}", value, info.name, info.ty);
            self.error(message);
            return;
        }

        let name = info.name.clone();
        program.values[location.index()] = Some(value);
        self.commands.push(DeviceCommand::SetUniform {
            program: program_id,
            name,
            value,
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        match self.texture_units.get_mut(unit as usize) {
            Some(slot) => *slot = texture,
            None => {
                self.error(format!("texture unit {} out of range", unit));
                return;
            }
        }
        self.commands
            .push(DeviceCommand::BindTexture { unit, texture });
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.current_vertex_array = vertex_array;
        self.commands
            .push(DeviceCommand::BindVertexArray(vertex_array));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        let (Some(program), Some(vertex_array)) = (self.current_program, self.current_vertex_array)
        else {
            self.error("draw without a program and vertex array bound".to_owned());
            return;
        };
        match self.meshes.get(vertex_array.0 as usize) {
            Some(mesh) if index_count <= mesh.index_count => {}
            _ => {
                self.error(format!(
                    "draw of {} indices exceeds vertex array {:?}",
                    index_count, vertex_array
                ));
                return;
            }
        }
        self.commands.push(DeviceCommand::DrawIndexed {
            program,
            vertex_array,
            texture: self.texture_units[0],
            index_count,
        });
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.frames_presented += 1;
        self.commands.push(DeviceCommand::Present);
        Ok(())
    }
}

fn mip_levels_for(image: &RgbaImage, sampler: SamplerConfig) -> u32 {
    if sampler.generates_mipmaps() {
        mip_level_count(image.width(), image.height())
    } else {
        1
    }
}
