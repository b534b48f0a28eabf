//! WGPU-backed graphics device
//!
//! Commands between [`clear`](GraphicsDevice::clear) and
//! [`present`](GraphicsDevice::present) are recorded: each draw captures the
//! bound pipeline, buffers and texture plus a snapshot of the program's
//! uniform block. `present` uploads all snapshots at once and replays the
//! draws in a single render pass.

use image::RgbaImage;
use wgpu::util::DeviceExt;

use super::pipeline::{create_pipeline, PipelineLayouts};
use super::{
    DepthRange, GraphicsDevice, ProgramId, SamplerConfig, TextureId, UniformValue, VertexArrayId,
};
use crate::error::{DeviceError, ShaderBuildError};
use crate::gfx::geometry::MeshData;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::shader::{LinkedProgram, UniformInfo, UniformLocation, UniformType};
use crate::wgpu_utils::{DynamicUniformBuffer, UniformArena};

struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniforms: Vec<UniformInfo>,
    /// Current uniform values laid out as the shader's uniform struct
    block: Vec<u8>,
}

struct GpuMesh {
    positions: wgpu::Buffer,
    normals: wgpu::Buffer,
    tex_coords: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    /// Owns the texture the bind group samples
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy)]
struct RecordedDraw {
    program: ProgramId,
    vertex_array: VertexArrayId,
    texture: Option<TextureId>,
    uniform_offset: u32,
    index_count: u32,
}

struct Frame {
    clear_color: [f32; 3],
    draws: Vec<RecordedDraw>,
}

/// [`GraphicsDevice`] rendering to a window surface
pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    layouts: PipelineLayouts,

    programs: Vec<GpuProgram>,
    meshes: Vec<GpuMesh>,
    textures: Vec<GpuTexture>,
    /// Bound when a draw samples no texture; the layout always has one
    fallback_texture: GpuTexture,

    uniform_arena: UniformArena,
    uniform_buffer: DynamicUniformBuffer,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_block_size: u32,
    offset_alignment: u32,

    current_program: Option<ProgramId>,
    current_vertex_array: Option<VertexArrayId>,
    current_texture: Option<TextureId>,
    frame: Option<Frame>,
}

impl WgpuDevice {
    /// Creates a device presenting to `window`
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| DeviceError::CreateSurface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| DeviceError::Adapter(e.to_string()))?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Illuminate Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| DeviceError::RequestDevice(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = TextureResource::surface_format(&surface_capabilities.formats)
            .ok_or_else(|| DeviceError::Surface("surface reports no formats".to_owned()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let layouts = PipelineLayouts::new(&device);
        let fallback_texture = create_gpu_texture(
            &device,
            &queue,
            &layouts,
            &RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
            SamplerConfig::placeholder(),
            "fallback texture",
        );

        let offset_alignment = device.limits().min_uniform_buffer_offset_alignment;
        let uniform_buffer = DynamicUniformBuffer::new(&device, 64 * 1024);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            layouts,
            programs: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            fallback_texture,
            uniform_arena: UniformArena::new(0, offset_alignment),
            uniform_buffer,
            uniform_bind_group: None,
            uniform_block_size: 0,
            offset_alignment,
            current_program: None,
            current_vertex_array: None,
            current_texture: None,
            frame: None,
        })
    }

    fn uniform_bind_group(&mut self) -> &wgpu::BindGroup {
        let size = (self.uniform_block_size.max(16) as u64).next_multiple_of(16);
        self.uniform_bind_group.get_or_insert_with(|| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Uniform Block Bind Group"),
                layout: &self.layouts.uniforms,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.binding_resource(size),
                }],
            })
        })
    }

    fn encode_frame(&mut self, frame: &Frame, target: &wgpu::TextureView) -> wgpu::CommandBuffer {
        if self.uniform_buffer.upload(&self.device, &self.queue, &self.uniform_arena) {
            self.uniform_bind_group = None;
        }
        let uniform_bind_group = self.uniform_bind_group().clone();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = frame.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &frame.draws {
                let (Some(program), Some(mesh)) = (
                    self.programs.get(draw.program.0 as usize),
                    self.meshes.get(draw.vertex_array.0 as usize),
                ) else {
                    continue;
                };
                let texture = draw
                    .texture
                    .and_then(|t| self.textures.get(t.0 as usize))
                    .unwrap_or(&self.fallback_texture);

                render_pass.set_pipeline(&program.pipeline);
                render_pass.set_bind_group(0, &uniform_bind_group, &[draw.uniform_offset]);
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.positions.slice(..));
                render_pass.set_vertex_buffer(1, mesh.normals.slice(..));
                render_pass.set_vertex_buffer(2, mesh.tex_coords.slice(..));
                render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.index_count.min(mesh.index_count), 0, 0..1);
            }
        }

        encoder.finish()
    }
}

fn create_gpu_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &PipelineLayouts,
    image: &RgbaImage,
    sampler: SamplerConfig,
    label: &str,
) -> GpuTexture {
    let resource = TextureResource::create_from_image(device, queue, image, sampler, label);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &layouts.texture,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&resource.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&resource.sampler),
            },
        ],
    });
    GpuTexture {
        _resource: resource,
        bind_group,
    }
}

impl GraphicsDevice for WgpuDevice {
    fn depth_range(&self) -> DepthRange {
        DepthRange::ZeroToOne
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_program(&mut self, program: &LinkedProgram) -> Result<ProgramId, ShaderBuildError> {
        let pipeline = create_pipeline(&self.device, &self.layouts, program, self.config.format)?;

        if program.uniform_block_size > self.uniform_block_size {
            self.uniform_block_size = program.uniform_block_size;
            self.uniform_arena
                .reset(self.uniform_block_size, self.offset_alignment);
            self.uniform_bind_group = None;
        }

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(GpuProgram {
            label: program.label.clone(),
            pipeline,
            uniforms: program.uniforms.clone(),
            block: vec![0; program.uniform_block_size as usize],
        });
        log::debug!("Created pipeline for '{}'", program.label);
        Ok(id)
    }

    fn create_vertex_array(&mut self, mesh: &MeshData) -> VertexArrayId {
        let buffer = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
        };

        // Index buffers must be a multiple of 4 bytes
        let mut indices: Vec<u16> = bytemuck::cast_slice(&mesh.triangles).to_vec();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }

        let gpu_mesh = GpuMesh {
            positions: buffer(
                "positions",
                bytemuck::cast_slice(&mesh.positions),
                wgpu::BufferUsages::VERTEX,
            ),
            normals: buffer(
                "normals",
                bytemuck::cast_slice(&mesh.normals),
                wgpu::BufferUsages::VERTEX,
            ),
            tex_coords: buffer(
                "tex_coords",
                bytemuck::cast_slice(&mesh.tex_coords),
                wgpu::BufferUsages::VERTEX,
            ),
            indices: buffer(
                "indices",
                bytemuck::cast_slice(&indices),
                wgpu::BufferUsages::INDEX,
            ),
            index_count: mesh.index_count(),
        };

        let id = VertexArrayId(self.meshes.len() as u32);
        self.meshes.push(gpu_mesh);
        id
    }

    fn create_texture(&mut self, image: &RgbaImage, sampler: SamplerConfig) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        let texture = create_gpu_texture(
            &self.device,
            &self.queue,
            &self.layouts,
            image,
            sampler,
            &format!("texture {}", id.0),
        );
        self.textures.push(texture);
        id
    }

    fn update_texture(&mut self, texture: TextureId, image: &RgbaImage, sampler: SamplerConfig) {
        let label = format!("texture {}", texture.0);
        let replacement = create_gpu_texture(
            &self.device,
            &self.queue,
            &self.layouts,
            image,
            sampler,
            &label,
        );
        match self.textures.get_mut(texture.0 as usize) {
            Some(slot) => *slot = replacement,
            None => log::warn!("Ignoring update of unknown texture {:?}", texture),
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    fn clear(&mut self, color: [f32; 3]) {
        self.uniform_arena.clear();
        self.frame = Some(Frame {
            clear_color: color,
            draws: Vec::new(),
        });
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self
            .current_program
            .and_then(|id| self.programs.get_mut(id.0 as usize))
        else {
            log::warn!("Uniform {:?} set with no program in use", location);
            return;
        };
        let Some(info) = program.uniforms.get(location.index()) else {
            log::warn!("Location {:?} out of range for '{}'", location, program.label);
            return;
        };
        if !value.matches(info.ty) {
            log::warn!("{:?} does not fit uniform '{}' ({})", value, info.name, info.ty);
            return;
        }
        // Sampled textures come from the unit bound at draw time
        if info.ty == UniformType::Texture2d {
            return;
        }

        let start = info.offset as usize;
        let end = start + info.ty.size() as usize;
        if let Some(dst) = program.block.get_mut(start..end) {
            value.write_to(dst);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        if unit == 0 {
            self.current_texture = texture;
        } else {
            log::warn!("Texture unit {} is not supported", unit);
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.current_vertex_array = vertex_array;
    }

    fn draw_indexed(&mut self, index_count: u32) {
        let (Some(program), Some(vertex_array)) = (self.current_program, self.current_vertex_array)
        else {
            log::warn!("Draw without a program and vertex array bound");
            return;
        };
        let Some(block) = self.programs.get(program.0 as usize).map(|p| &p.block) else {
            return;
        };

        let uniform_offset = self.uniform_arena.push(block);
        let draw = RecordedDraw {
            program,
            vertex_array,
            texture: self.current_texture,
            uniform_offset,
            index_count,
        };
        self.frame
            .get_or_insert_with(|| Frame {
                clear_color: [0.0; 3],
                draws: Vec::new(),
            })
            .draws
            .push(draw);
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost; reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out; skipping frame");
                return Ok(());
            }
            Err(e) => return Err(DeviceError::Surface(e.to_string())),
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encode_frame(&frame, &view);

        self.queue.submit(std::iter::once(commands));
        surface_texture.present();
        Ok(())
    }
}
