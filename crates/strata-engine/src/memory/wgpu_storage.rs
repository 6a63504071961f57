use std::ops::Range;

use crate::device::GpuContext;

use super::storage::RegionStorage;

/// Region storage living in a GPU buffer.
///
/// wgpu rejects copies whose source and destination are the same buffer, so
/// compaction bounces the tail through a second buffer of equal capacity.
#[derive(Debug)]
pub struct WgpuStorage {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffer: wgpu::Buffer,
    copy_buffer: wgpu::Buffer,
    capacity: u64,
}

impl WgpuStorage {
    /// Allocates `capacity` bytes (rounded up to the copy alignment).
    ///
    /// `usage` is added to the flags the region itself needs, typically
    /// `VERTEX` for a vertex region.
    pub fn new(gpu: &GpuContext, capacity: u64, usage: wgpu::BufferUsages) -> Self {
        let capacity = capacity.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata region"),
            size: capacity,
            usage: usage | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Only used for moving data inside `buffer`, never bound for drawing.
        let copy_buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata region copy"),
            size: capacity,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device: gpu.device().clone(),
            queue: gpu.queue().clone(),
            buffer,
            copy_buffer,
            capacity,
        }
    }

    /// Buffer to bind as the vertex source of draw calls.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl RegionStorage for WgpuStorage {
    #[inline]
    fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    fn alignment(&self) -> u64 {
        wgpu::COPY_BUFFER_ALIGNMENT
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) {
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if bytes.len() % align == 0 {
            self.queue.write_buffer(&self.buffer, offset, bytes);
        } else {
            // Block sizes are aligned, so padding stays inside the block.
            let mut padded = bytes.to_vec();
            padded.resize(bytes.len().next_multiple_of(align), 0);
            self.queue.write_buffer(&self.buffer, offset, &padded);
        }
    }

    fn copy_within(&mut self, src: Range<u64>, dst: u64) {
        let len = (src.end - src.start).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("strata region compaction"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, src.start, &self.copy_buffer, 0, len);
        encoder.copy_buffer_to_buffer(&self.copy_buffer, 0, &self.buffer, dst, len);

        // Pending `write_buffer` calls run at the start of this submission,
        // so bytes written earlier in the frame move along with the tail.
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
