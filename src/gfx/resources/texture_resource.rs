//! Texture resource management for wgpu
//!
//! Provides utilities for creating GPU textures, views, and samplers for the
//! depth buffer and for sampled RGBA images with generated mip chains.

use image::{imageops, RgbaImage};

use crate::gfx::device::{FilterMode, SamplerConfig, WrapMode};

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the renderer
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Texels are stored and shaded as-is, without sRGB decoding, and are
    /// written to a surface that does not re-encode either.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Picks the surface format matching [`Self::COLOR_FORMAT`]'s color
    /// space, falling back to the first supported format.
    pub fn surface_format(supported: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
        let srgb = Self::COLOR_FORMAT.is_srgb();
        supported
            .iter()
            .copied()
            .find(|f| f.is_srgb() == srgb)
            .or_else(|| supported.first().copied())
    }

    /// Creates a depth texture matching the surface dimensions
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates a sampled texture from an RGBA image
    ///
    /// When the sampler filters between mip levels, the full chain down to
    /// 1x1 is generated on the CPU and uploaded level by level.
    pub fn create_from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        sampler: SamplerConfig,
        label: &str,
    ) -> Self {
        let levels = if sampler.generates_mipmaps() {
            mip_chain(image)
        } else {
            vec![image.clone()]
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(image),
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, data) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * data.width()),
                    rows_per_image: Some(data.height()),
                },
                extent(data),
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor(sampler, label));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

fn extent(image: &RgbaImage) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: image.width().max(1),
        height: image.height().max(1),
        depth_or_array_layers: 1,
    }
}

fn sampler_descriptor(config: SamplerConfig, label: &str) -> wgpu::SamplerDescriptor<'_> {
    let address_mode = match config.wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    };
    let filter = |mode: FilterMode| match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };

    wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter(config.mag_filter),
        min_filter: filter(config.min_filter),
        mipmap_filter: config
            .mipmap_filter
            .map_or(wgpu::FilterMode::Nearest, filter),
        lod_min_clamp: 0.0,
        lod_max_clamp: 32.0,
        ..Default::default()
    }
}

/// Builds the full mip chain of `image`, base level first.
///
/// Each level halves both dimensions (rounding down, never below 1) until
/// the 1x1 level.
pub fn mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![image.clone()];
    let (mut width, mut height) = image.dimensions();

    while width > 1 || height > 1 {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        let previous = levels.last().unwrap_or(image);
        let next = imageops::resize(previous, width, height, imageops::FilterType::Triangle);
        levels.push(next);
    }

    levels
}
