// src/wgpu_utils/uniform_buffer.rs - Dynamic-offset uniform storage
//! Per-draw uniform snapshots packed into one buffer.
//!
//! Every draw of a frame gets its own slot; the render pass selects a slot
//! through the dynamic offset of the uniform bind group.

/// CPU side of a dynamic uniform buffer: fixed-stride slots in one byte vec
#[derive(Debug, Clone, Default)]
pub struct UniformArena {
    stride: u64,
    bytes: Vec<u8>,
}

impl UniformArena {
    /// Creates an arena whose slots hold `block_size` bytes and start at
    /// multiples of `alignment`.
    pub fn new(block_size: u32, alignment: u32) -> Self {
        Self {
            stride: aligned_stride(block_size, alignment),
            bytes: Vec::new(),
        }
    }

    /// Changes the slot size; existing slots are dropped.
    pub fn reset(&mut self, block_size: u32, alignment: u32) {
        self.stride = aligned_stride(block_size, alignment);
        self.bytes.clear();
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Copies `block` into a new slot and returns its dynamic offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.bytes.len();
        let copied = block.len().min(self.stride as usize);
        self.bytes.resize(offset + self.stride as usize, 0);
        self.bytes[offset..offset + copied].copy_from_slice(&block[..copied]);
        offset as u32
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.bytes.len() / self.stride as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Rounds a block size up to a valid dynamic offset stride
pub fn aligned_stride(block_size: u32, alignment: u32) -> u64 {
    let alignment = alignment.max(1) as u64;
    let size = (block_size as u64).max(16);
    size.div_ceil(alignment) * alignment
}

/// GPU buffer backing a [`UniformArena`]
pub struct DynamicUniformBuffer {
    buffer: wgpu::Buffer,
    previous_content: Vec<u8>,
}

impl DynamicUniformBuffer {
    pub fn new(device: &wgpu::Device, size: u64) -> Self {
        Self {
            buffer: Self::create_buffer(device, size),
            previous_content: Vec::new(),
        }
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DynamicUniformBuffer"),
            size: size.max(256),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Uploads the arena, growing the buffer when it no longer fits.
    ///
    /// Returns `true` when the buffer was reallocated, in which case bind
    /// groups referencing it must be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, arena: &UniformArena) -> bool {
        let content = arena.as_bytes();
        let mut reallocated = false;

        if content.len() as u64 > self.buffer.size() {
            let size = (content.len() as u64).next_power_of_two();
            log::debug!("Growing dynamic uniform buffer to {} bytes", size);
            self.buffer = Self::create_buffer(device, size);
            self.previous_content.clear();
            reallocated = true;
        }

        if content.is_empty() || self.previous_content == content {
            return reallocated;
        }
        queue.write_buffer(&self.buffer, 0, content);
        self.previous_content = content.to_vec();
        reallocated
    }

    /// Binding of one slot-sized window, moved by the dynamic offset
    pub fn binding_resource(&self, size: u64) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(size),
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}
