//! Textures that are usable before their image arrives
//!
//! [`TextureManager::create_from_url`] returns a handle immediately, backed
//! by a 1x1 placeholder. The image is fetched and decoded in the
//! background; [`TextureManager::poll`] applies finished loads in place and
//! raises a redraw request. Failed loads keep the placeholder. Images
//! larger than the device allows are downscaled first.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::assets::AssetSource;
use crate::error::TextureError;
use crate::gfx::device::{GraphicsDevice, SamplerConfig, TextureId};

/// A finished background load
struct TextureLoad {
    texture: TextureId,
    url: String,
    result: Result<RgbaImage, TextureError>,
}

/// Counters for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureStats {
    pub created: usize,
    pub loaded: usize,
    pub failed: usize,
    pub pending: usize,
}

pub struct TextureManager {
    source: Arc<dyn AssetSource>,
    placeholder_color: [u8; 4],
    by_url: HashMap<String, TextureId>,
    pending: FuturesUnordered<BoxFuture<'static, TextureLoad>>,
    redraw_requested: bool,
    created: usize,
    loaded: usize,
    failed: usize,
}

impl TextureManager {
    /// `placeholder_color` fills URL textures until their image loads.
    pub fn new(source: Arc<dyn AssetSource>, placeholder_color: [u8; 4]) -> Self {
        Self {
            source,
            placeholder_color,
            by_url: HashMap::new(),
            pending: FuturesUnordered::new(),
            redraw_requested: false,
            created: 0,
            loaded: 0,
            failed: 0,
        }
    }

    /// Creates a 1x1 texture of a single color.
    pub fn create_placeholder<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        rgba: [u8; 4],
    ) -> TextureId {
        self.created += 1;
        let image = RgbaImage::from_pixel(1, 1, Rgba(rgba));
        device.create_texture(&image, SamplerConfig::placeholder())
    }

    /// Returns the texture for `url`, starting its load on first request.
    pub fn create_from_url<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        url: &str,
    ) -> TextureId {
        if let Some(&texture) = self.by_url.get(url) {
            return texture;
        }

        let texture = self.create_placeholder(device, self.placeholder_color);
        self.by_url.insert(url.to_owned(), texture);

        let owned_url = url.to_owned();
        let load = self
            .source
            .fetch(url)
            .map(move |fetched| {
                let result = fetched.map_err(TextureError::from).and_then(|bytes| {
                    image::load_from_memory(&bytes)
                        .map(|decoded| decoded.to_rgba8())
                        .map_err(|source| TextureError::Decode {
                            url: owned_url.clone(),
                            source,
                        })
                });
                TextureLoad {
                    texture,
                    url: owned_url,
                    result,
                }
            })
            .boxed();
        self.pending.push(load);

        log::debug!("Loading texture '{}' into {:?}", url, texture);
        texture
    }

    /// Applies every load that has finished since the last poll.
    ///
    /// Never blocks. Returns the number of textures updated.
    pub fn poll<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> usize {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut updated = 0;

        while let Poll::Ready(Some(load)) = self.pending.poll_next_unpin(&mut cx) {
            match load.result {
                Ok(image) => {
                    log::info!(
                        "Loaded texture '{}' ({}x{})",
                        load.url,
                        image.width(),
                        image.height()
                    );
                    let image = fit_to_limit(image, device.max_texture_dimension(), &load.url);
                    device.update_texture(load.texture, &image, SamplerConfig::trilinear_repeat());
                    self.loaded += 1;
                    updated += 1;
                    self.redraw_requested = true;
                }
                Err(e) => {
                    log::warn!("Keeping placeholder for '{}': {}", load.url, e);
                    self.failed += 1;
                }
            }
        }

        updated
    }

    /// Returns and clears the redraw request raised by finished loads.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> TextureStats {
        TextureStats {
            created: self.created,
            loaded: self.loaded,
            failed: self.failed,
            pending: self.pending.len(),
        }
    }
}

/// Shrinks `image` so neither side exceeds `max`, keeping its aspect ratio.
fn fit_to_limit(image: RgbaImage, max: u32, url: &str) -> RgbaImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max || max == 0 {
        return image;
    }

    let scale = max as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max);
    log::warn!(
        "Texture '{}' is {}x{}, above the device limit of {}; downscaling to {}x{}",
        url,
        width,
        height,
        max,
        new_width,
        new_height
    );
    image::imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::gfx::device::{HeadlessDevice, WrapMode};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn placeholder_is_replaced_in_place() {
        let source = MemorySource::new().with_asset("grass.png", png_bytes(4, 4, [0, 200, 0, 255]));
        let mut manager = TextureManager::new(Arc::new(source), [255, 0, 255, 255]);
        let mut device = HeadlessDevice::new();

        let texture = manager.create_from_url(&mut device, "grass.png");
        let stored = device.texture(texture).unwrap();
        assert_eq!(stored.image.dimensions(), (1, 1));
        assert_eq!(stored.image.get_pixel(0, 0).0, [255, 0, 255, 255]);
        assert_eq!(stored.sampler.wrap, WrapMode::ClampToEdge);
        assert!(!manager.take_redraw_request());

        assert_eq!(manager.poll(&mut device), 1);
        let stored = device.texture(texture).unwrap();
        assert_eq!(stored.image.dimensions(), (4, 4));
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.sampler, SamplerConfig::trilinear_repeat());
        assert_eq!(stored.mip_level_count, 3);
        assert!(manager.take_redraw_request());
        assert!(!manager.take_redraw_request());
    }

    #[test]
    fn oversized_images_are_downscaled_to_the_device_limit() {
        let source = MemorySource::new().with_asset("wide.png", png_bytes(40, 20, [0, 0, 200, 255]));
        let mut manager = TextureManager::new(Arc::new(source), [255, 0, 255, 255]);
        let mut device = HeadlessDevice::new().with_max_texture_dimension(16);

        let texture = manager.create_from_url(&mut device, "wide.png");
        assert_eq!(manager.poll(&mut device), 1);

        let stored = device.texture(texture).unwrap();
        assert_eq!(stored.image.dimensions(), (16, 8));
        let [r, _, b, _] = stored.image.get_pixel(7, 3).0;
        assert!(r <= 1 && b.abs_diff(200) <= 1);
        assert_eq!(stored.mip_level_count, 5);
        assert!(device.errors().is_empty());
    }

    #[test]
    fn images_within_the_limit_are_untouched() {
        let image = RgbaImage::from_pixel(16, 3, Rgba([1, 2, 3, 4]));
        assert_eq!(fit_to_limit(image, 16, "edge.png").dimensions(), (16, 3));

        let tall = RgbaImage::from_pixel(1, 100, Rgba([1, 2, 3, 4]));
        assert_eq!(fit_to_limit(tall, 10, "tall.png").dimensions(), (1, 10));
    }

    #[test]
    fn repeated_urls_share_one_texture() {
        let source = MemorySource::new().with_asset("a.png", png_bytes(2, 2, [1, 2, 3, 255]));
        let mut manager = TextureManager::new(Arc::new(source), [255, 0, 255, 255]);
        let mut device = HeadlessDevice::new();

        let first = manager.create_from_url(&mut device, "a.png");
        let second = manager.create_from_url(&mut device, "a.png");
        assert_eq!(first, second);
        assert_eq!(device.texture_count(), 1);
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn failed_loads_keep_the_placeholder() {
        let source = MemorySource::new().with_asset("broken.png", b"not an image".to_vec());
        let mut manager = TextureManager::new(Arc::new(source), [9, 9, 9, 255]);
        let mut device = HeadlessDevice::new();

        let missing = manager.create_from_url(&mut device, "missing.png");
        let broken = manager.create_from_url(&mut device, "broken.png");
        assert_eq!(manager.poll(&mut device), 0);

        for texture in [missing, broken] {
            let stored = device.texture(texture).unwrap();
            assert_eq!(stored.revision, 0);
            assert_eq!(stored.image.get_pixel(0, 0).0, [9, 9, 9, 255]);
        }
        assert!(!manager.take_redraw_request());
        assert_eq!(manager.stats().failed, 2);
        assert_eq!(manager.stats().pending, 0);
    }

    #[test]
    fn explicit_placeholders_use_the_given_color() {
        let mut manager = TextureManager::new(Arc::new(MemorySource::new()), [255, 0, 255, 255]);
        let mut device = HeadlessDevice::new();
        let texture = manager.create_placeholder(&mut device, [10, 20, 30, 255]);
        assert_eq!(device.texture(texture).unwrap().image.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(manager.stats().created, 1);
    }
}
