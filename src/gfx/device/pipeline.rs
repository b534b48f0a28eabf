//! Render pipeline creation for linked programs
//!
//! Every program shares one pipeline layout: the dynamic uniform block at
//! group 0 and the texture/sampler pair at group 1. Pipelines differ only in
//! their shader modules.

use std::borrow::Cow;

use wgpu::*;

use crate::error::ShaderBuildError;
use crate::gfx::geometry::vertex::vertex_buffer_layouts;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::shader::LinkedProgram;
use crate::wgpu_utils::{self, entry};

/// Bind group layouts and the pipeline layout shared by all programs
pub(super) struct PipelineLayouts {
    pub uniforms: BindGroupLayout,
    pub texture: BindGroupLayout,
    pub pipeline: PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &Device) -> Self {
        let uniforms = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Uniform Block Layout"),
            entries: &[entry(
                0,
                ShaderStages::VERTEX_FRAGMENT,
                wgpu_utils::uniform_dynamic(),
            )],
        });

        let texture = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Texture Layout"),
            entries: &[
                entry(0, ShaderStages::FRAGMENT, wgpu_utils::texture_2d()),
                entry(
                    1,
                    ShaderStages::FRAGMENT,
                    wgpu_utils::sampler(SamplerBindingType::Filtering),
                ),
            ],
        });

        let pipeline = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &[&uniforms, &texture],
            push_constant_ranges: &[],
        });

        Self {
            uniforms,
            texture,
            pipeline,
        }
    }
}

/// Creates the render pipeline of a linked program.
///
/// wgpu validation errors raised while creating the modules or the pipeline
/// are captured and returned as a link error.
pub(super) fn create_pipeline(
    device: &Device,
    layouts: &PipelineLayouts,
    program: &LinkedProgram,
    color_format: TextureFormat,
) -> Result<RenderPipeline, ShaderBuildError> {
    device.push_error_scope(ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(&format!("{} vertex", program.label)),
        source: ShaderSource::Wgsl(Cow::Borrowed(&program.vertex.source)),
    });
    let fragment_module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(&format!("{} fragment", program.label)),
        source: ShaderSource::Wgsl(Cow::Borrowed(&program.fragment.source)),
    });

    let vertex_buffers = vertex_buffer_layouts();
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(&program.label),
        layout: Some(&layouts.pipeline),
        vertex: VertexState {
            module: &vertex_module,
            entry_point: Some(&program.vertex.entry_point),
            buffers: &vertex_buffers,
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &fragment_module,
            entry_point: Some(&program.fragment.entry_point),
            targets: &[Some(ColorTargetState {
                format: color_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // Planes and the hexagon are seen from both sides
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: TextureResource::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(ShaderBuildError::Link {
            program: program.label.clone(),
            diagnostic: error.to_string(),
        }),
        None => Ok(pipeline),
    }
}
