use std::ops::Range;

use crate::atlas::{Canvas, TextureDimensions, TextureHandle};
use crate::coords::Viewport;
use crate::layer::LayerId;

/// One draw of one layer's block.
///
/// Vertex data for the draw is `size` bytes starting at `offset` in the
/// region; bind the region buffer sliced at `offset` and draw
/// `vertex_count` vertices from 0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCall {
    pub layer: LayerId,
    pub offset: u64,
    pub size: u64,
    pub vertex_count: u32,
    /// Layer depth in `[0, 1]`.
    pub depth: f32,
    pub world_space: bool,
}

impl DrawCall {
    #[inline]
    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

/// Upload and draw surface the renderer drives every tick.
pub trait Backend {
    /// The whole canvas changed (new pixels or a new size).
    fn upload_canvas(&mut self, canvas: &Canvas);

    /// Record `handle` of the dimensions table changed.
    fn upload_dimensions(&mut self, handle: TextureHandle, dimensions: TextureDimensions);

    fn draw(&mut self, call: DrawCall);

    /// Host window size changed.
    fn resize(&mut self, viewport: Viewport) {
        let _ = viewport;
    }
}

/// Backend that only remembers what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub canvas_uploads: usize,
    /// Size of the last uploaded canvas.
    pub canvas_size: (u32, u32),
    pub dimension_uploads: Vec<(TextureHandle, TextureDimensions)>,
    pub draws: Vec<DrawCall>,
    pub viewports: Vec<Viewport>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws recorded for `layer`, oldest first.
    pub fn draws_of(&self, layer: LayerId) -> impl Iterator<Item = &DrawCall> + '_ {
        self.draws.iter().filter(move |d| d.layer == layer)
    }
}

impl Backend for RecordingBackend {
    fn upload_canvas(&mut self, canvas: &Canvas) {
        self.canvas_uploads += 1;
        self.canvas_size = (canvas.width(), canvas.height());
    }

    fn upload_dimensions(&mut self, handle: TextureHandle, dimensions: TextureDimensions) {
        self.dimension_uploads.push((handle, dimensions));
    }

    fn draw(&mut self, call: DrawCall) {
        self.draws.push(call);
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewports.push(viewport);
    }
}
