use crate::atlas::{Canvas, TextureDimensions, TextureHandle, CHANNELS};
use crate::coords::Viewport;
use crate::device::GpuContext;

use super::backend::{Backend, DrawCall};

struct AtlasTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Backend keeping the atlas and its dimensions table on the GPU.
///
/// The atlas texture is `Rgba8Unorm` and recreated whenever the canvas grows.
/// Canvas row 0 is the bottom row, so texture row 0 holds the bottom of the
/// atlas as well; the shading stage samples with that in mind.
///
/// Draws are collected, not executed: the host drains them with
/// [`take_draws`](Self::take_draws) and records them into its own render
/// pass together with [`atlas_view`](Self::atlas_view) and
/// [`dimensions_buffer`](Self::dimensions_buffer).
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    atlas: Option<AtlasTexture>,
    dimensions: wgpu::Buffer,
    dimensions_capacity: u32,
    draws: Vec<DrawCall>,
    viewport: Viewport,
}

impl WgpuBackend {
    /// `max_entries` must match the atlas manager's limit; the table holds one
    /// extra record for the reserved index 0.
    pub fn new(gpu: &GpuContext, max_entries: usize) -> Self {
        let dimensions_capacity = max_entries as u32 + 1;
        let record = std::mem::size_of::<TextureDimensions>() as u64;

        let dimensions = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata atlas dimensions"),
            size: u64::from(dimensions_capacity) * record,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device: gpu.device().clone(),
            queue: gpu.queue().clone(),
            atlas: None,
            dimensions,
            dimensions_capacity,
            draws: Vec::new(),
            viewport: Viewport::default(),
        }
    }

    /// View of the atlas texture, `None` until the first canvas upload.
    pub fn atlas_view(&self) -> Option<&wgpu::TextureView> {
        self.atlas.as_ref().map(|a| &a.view)
    }

    /// Storage buffer of [`TextureDimensions`] indexed by registry index.
    #[inline]
    pub fn dimensions_buffer(&self) -> &wgpu::Buffer {
        &self.dimensions
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Draws collected since the last call, in issue order.
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    fn ensure_atlas(&mut self, width: u32, height: u32) -> Option<&wgpu::Texture> {
        let fits = self
            .atlas
            .as_ref()
            .is_some_and(|a| a.width == width && a.height == height);
        if !fits {
            let max = self.device.limits().max_texture_dimension_2d;
            if width > max || height > max {
                log::error!("atlas canvas {width}x{height} exceeds the device limit of {max}");
                return None;
            }

            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("strata atlas"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            log::debug!("atlas texture recreated at {width}x{height}");
            self.atlas = Some(AtlasTexture {
                texture,
                view,
                width,
                height,
            });
        }
        self.atlas.as_ref().map(|a| &a.texture)
    }
}

impl Backend for WgpuBackend {
    fn upload_canvas(&mut self, canvas: &Canvas) {
        if canvas.is_empty() {
            return;
        }
        let (width, height) = (canvas.width(), canvas.height());
        let queue = self.queue.clone();
        let Some(texture) = self.ensure_atlas(width, height) else {
            return;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            canvas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * CHANNELS as u32),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn upload_dimensions(&mut self, handle: TextureHandle, dimensions: TextureDimensions) {
        if handle.index() >= self.dimensions_capacity {
            log::error!(
                "dimensions record {} is past the table capacity of {}",
                handle.index(),
                self.dimensions_capacity
            );
            return;
        }
        let offset = u64::from(handle.index()) * std::mem::size_of::<TextureDimensions>() as u64;
        self.queue
            .write_buffer(&self.dimensions, offset, bytemuck::bytes_of(&dimensions));
    }

    fn draw(&mut self, call: DrawCall) {
        self.draws.push(call);
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}
