use anyhow::Context as _;

use crate::atlas::AtlasManager;
use crate::coords::Viewport;
use crate::device::GpuContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerCommand, LayerCtx, LayerId, LayerOptions, LayerRegistry, VertexFormat};
use crate::memory::{HostStorage, Region, RegionStorage, WgpuStorage};
use crate::render::{Backend, DrawCall};

use super::clock::{FrameClock, FrameTime};

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Bytes of vertex memory shared by all layers.
    pub region_capacity: u64,
    /// Most atlas entries the dimensions table can hold.
    pub max_atlas_entries: usize,
    /// Initial scratch buffer size of a new layer, in bytes.
    pub initial_scratch_capacity: usize,
    /// Block size reserved for a new layer, in bytes.
    pub initial_block_size: u64,
    pub vertex_format: VertexFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let vertex_format = VertexFormat::default();
        Self {
            // One million triangles.
            region_capacity: vertex_format.stride() as u64 * 3 * 1_000_000,
            max_atlas_entries: 65_536,
            initial_scratch_capacity: 256,
            initial_block_size: 0,
            vertex_format,
        }
    }
}

/// Owns the vertex region, the atlas and the layers, and drives frames.
///
/// Each [`tick`](Self::tick) runs every layer in registration order:
/// 1. the scratch buffer is reset and the layer generates into it
/// 2. if it produced bytes (or a redraw is pending) the block is grown when
///    too small and the bytes are uploaded
/// 3. pending atlas changes are flushed
/// 4. one draw covering the block is issued
/// 5. commands queued by the layer are applied
///
/// An error from any step aborts the rest of the tick.
pub struct Renderer<S: RegionStorage = HostStorage> {
    config: RendererConfig,
    region: Region<S>,
    atlas: AtlasManager,
    layers: LayerRegistry,
    clock: FrameClock,
    viewport: Viewport,
    viewport_dirty: bool,
    stopped: bool,
}

impl Renderer<HostStorage> {
    /// Renderer whose vertex memory is a CPU buffer.
    pub fn headless(config: RendererConfig) -> Self {
        let storage = HostStorage::new(config.region_capacity);
        Self::new(config, storage)
    }
}

impl Renderer<WgpuStorage> {
    /// Renderer whose vertex memory is a GPU vertex buffer.
    pub fn gpu(gpu: &GpuContext, config: RendererConfig) -> anyhow::Result<Self> {
        let limit = gpu.device().limits().max_buffer_size;
        if config.region_capacity > limit {
            return Err(Error::OutOfMemory {
                required: config.region_capacity,
                capacity: limit,
            })
            .context("vertex region does not fit in one device buffer");
        }

        let storage = WgpuStorage::new(gpu, config.region_capacity, wgpu::BufferUsages::VERTEX);
        Ok(Self::new(config, storage))
    }
}

impl<S: RegionStorage> Renderer<S> {
    pub fn new(config: RendererConfig, storage: S) -> Self {
        log::info!(
            "renderer: {} byte vertex region, {} atlas entries, format {:?}",
            storage.capacity(),
            config.max_atlas_entries,
            config.vertex_format
        );
        Self {
            atlas: AtlasManager::new(config.max_atlas_entries),
            region: Region::new(storage),
            layers: LayerRegistry::new(),
            clock: FrameClock::new(),
            viewport: Viewport::default(),
            viewport_dirty: false,
            stopped: false,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn region(&self) -> &Region<S> {
        &self.region
    }

    #[inline]
    pub fn atlas(&self) -> &AtlasManager {
        &self.atlas
    }

    #[inline]
    pub fn atlas_mut(&mut self) -> &mut AtlasManager {
        &mut self.atlas
    }

    #[inline]
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Registers a layer at the end of the generation order.
    pub fn add_layer(&mut self, layer: impl Layer + 'static, options: LayerOptions) -> Result<LayerId> {
        let id = self.layers.next_id();
        self.insert_layer(id, Box::new(layer), options)?;
        Ok(id)
    }

    /// Deregisters a layer and compacts the region. Returns `false` if the
    /// id is unknown.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<bool> {
        self.layers.remove(&mut self.region, id)
    }

    /// Deregisters every layer.
    pub fn clear_layers(&mut self) -> Result<()> {
        // Last first so no bytes move.
        while let Some(id) = self.layers.slots.last().map(|s| s.id) {
            self.layers.remove(&mut self.region, id)?;
        }
        Ok(())
    }

    /// Forces an upload for `id` on the next tick.
    pub fn request_redraw(&mut self, id: LayerId) -> bool {
        self.layers.request_redraw(id)
    }

    /// Makes [`run_until_stopped`](Self::run_until_stopped) return after the
    /// current tick.
    pub fn request_stop(&mut self) {
        self.stopped = true;
    }

    /// Window size notification; forwarded to the backend on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        let viewport = Viewport::new(width, height);
        if viewport != self.viewport {
            log::debug!("renderer: viewport {width}x{height}");
            self.viewport = viewport;
            self.viewport_dirty = true;
        }
    }

    /// Runs one frame over every layer.
    pub fn tick<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<FrameTime> {
        let time = self.clock.tick();

        if std::mem::take(&mut self.viewport_dirty) {
            backend.resize(self.viewport);
        }

        let mut commands = Vec::new();
        let mut i = 0;
        while i < self.layers.slots.len() {
            let id = self.step(i, time, &mut commands)?;
            self.atlas.upload(backend);
            backend.draw(self.draw_call(i));

            self.apply(&mut commands)?;
            // Slots are sorted by id; resume after the layer that just ran.
            i = self.layers.slots.partition_point(|s| s.id <= id);
        }

        // Registrations made outside of any layer still need to go up.
        self.atlas.upload(backend);
        Ok(time)
    }

    /// Ticks until a layer or the host requests a stop. Returns the number of
    /// completed ticks.
    pub fn run_until_stopped<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<u64> {
        let mut ticks = 0;
        while !self.stopped {
            self.tick(backend)?;
            ticks += 1;
        }
        log::info!("renderer: stopped after {ticks} ticks");
        Ok(ticks)
    }

    /// Generates slot `i` and reconciles its block.
    fn step(&mut self, i: usize, time: FrameTime, commands: &mut Vec<LayerCommand>) -> Result<LayerId> {
        let slot = &mut self.layers.slots[i];
        slot.scratch.reset();

        let mut ctx = LayerCtx {
            id: slot.id,
            scratch: &mut slot.scratch,
            atlas: &mut self.atlas,
            ids: &mut self.layers.ids,
            commands,
            redraw: false,
            format: self.config.vertex_format,
            time,
            viewport: self.viewport,
        };
        slot.layer.generate(&mut ctx)?;
        let redraw = ctx.redraw;
        slot.redraw |= redraw;

        let produced = slot.scratch.used() as u64;
        if produced == 0 && !slot.redraw {
            return Ok(slot.id);
        }

        let size = self.region.block(slot.block).map_or(0, |b| b.size);
        if produced > size {
            let grown = size.saturating_mul(2).saturating_add(produced);
            log::debug!("layer {}: block {} -> {grown} bytes", slot.id.get(), slot.block);
            self.region.resize_block(slot.block, grown)?;
        }

        self.region.upload(slot.block, slot.scratch.as_bytes())?;
        slot.redraw = false;
        Ok(slot.id)
    }

    fn draw_call(&self, i: usize) -> DrawCall {
        let slot = &self.layers.slots[i];
        let (offset, used) = self
            .region
            .block(slot.block)
            .map_or((0, 0), |b| (b.offset, b.used));
        DrawCall {
            layer: slot.id,
            offset,
            size: used,
            vertex_count: (used / self.config.vertex_format.stride() as u64) as u32,
            depth: slot.options.depth.normalized(),
            world_space: slot.options.world_space,
        }
    }

    fn apply(&mut self, commands: &mut Vec<LayerCommand>) -> Result<()> {
        for command in commands.drain(..) {
            match command {
                LayerCommand::Add { id, layer, options } => self.insert_layer(id, layer, options)?,
                LayerCommand::Remove(id) => {
                    self.layers.remove(&mut self.region, id)?;
                }
                LayerCommand::Stop => self.stopped = true,
            }
        }
        Ok(())
    }

    fn insert_layer(&mut self, id: LayerId, layer: Box<dyn Layer>, options: LayerOptions) -> Result<()> {
        self.layers.insert(
            &mut self.region,
            id,
            layer,
            options,
            self.config.initial_block_size,
            self.config.initial_scratch_capacity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{MemoryImage, Pixels, TextureHandle};
    use crate::coords::Vec2;
    use crate::layer::{from_fn, Depth, RectFlags};
    use crate::render::RecordingBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    fn config(capacity: u64) -> RendererConfig {
        RendererConfig {
            region_capacity: capacity,
            initial_scratch_capacity: 16,
            ..RendererConfig::default()
        }
    }

    /// Layer writing `bytes` (shared with the test) every tick.
    fn bytes_layer(bytes: Rc<Cell<usize>>) -> impl Layer {
        from_fn(move |ctx: &mut LayerCtx<'_>| {
            ctx.scratch().push_bytes(&vec![0xAB; bytes.get()]);
            Ok(())
        })
    }

    // ── reconciliation ────────────────────────────────────────────────────

    #[test]
    fn overflow_resizes_once_then_never() {
        let mut renderer = Renderer::headless(config(4096));
        let bytes = Rc::new(Cell::new(100));
        let id = renderer
            .add_layer(bytes_layer(bytes.clone()), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();

        renderer.tick(&mut backend).unwrap();
        let block = *renderer.region().block(0).unwrap();
        assert!(block.size >= 100);
        assert_eq!(block.size, 100);
        assert_eq!(block.used, 100);

        bytes.set(60);
        renderer.tick(&mut backend).unwrap();
        let block = *renderer.region().block(0).unwrap();
        assert_eq!(block.size, 100);
        assert_eq!(block.used, 60);

        bytes.set(150);
        renderer.tick(&mut backend).unwrap();
        assert_eq!(renderer.region().block(0).unwrap().size, 2 * 100 + 150);

        let sizes: Vec<_> = backend.draws_of(id).map(|d| d.size).collect();
        assert_eq!(sizes, [100, 60, 150]);
    }

    #[test]
    fn unchanged_layer_keeps_previous_bytes() {
        let mut renderer = Renderer::headless(config(1024));
        let bytes = Rc::new(Cell::new(24));
        renderer
            .add_layer(bytes_layer(bytes.clone()), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();
        renderer.tick(&mut backend).unwrap();

        bytes.set(0);
        renderer.tick(&mut backend).unwrap();

        let block = *renderer.region().block(0).unwrap();
        assert_eq!(block.used, 24);
        assert_eq!(renderer.region().storage().read(block.offset, 24), &[0xAB; 24]);
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(backend.draws[1].vertex_count, 1);
    }

    #[test]
    fn redraw_with_no_bytes_clears_the_layer() {
        let mut renderer = Renderer::headless(config(1024));
        let bytes = Rc::new(Cell::new(48));
        let id = renderer
            .add_layer(bytes_layer(bytes.clone()), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();
        renderer.tick(&mut backend).unwrap();

        bytes.set(0);
        assert!(renderer.request_redraw(id));
        renderer.tick(&mut backend).unwrap();

        assert_eq!(renderer.region().block(0).unwrap().used, 0);
        assert!(backend.draws[1].is_empty());
    }

    #[test]
    fn draw_carries_depth_and_space() {
        let mut renderer = Renderer::headless(config(1024));
        let options = LayerOptions {
            depth: Depth::MAX,
            world_space: true,
        };
        renderer.add_layer(bytes_layer(Rc::new(Cell::new(0))), options).unwrap();
        let mut backend = RecordingBackend::new();
        renderer.tick(&mut backend).unwrap();

        let draw = backend.draws[0];
        assert_eq!(draw.depth, 1.0);
        assert!(draw.world_space);
    }

    #[test]
    fn out_of_memory_aborts_the_frame() {
        let mut renderer = Renderer::headless(config(64));
        renderer
            .add_layer(bytes_layer(Rc::new(Cell::new(100))), LayerOptions::default())
            .unwrap();
        let after = renderer
            .add_layer(bytes_layer(Rc::new(Cell::new(8))), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();

        let err = renderer.tick(&mut backend).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { .. }));
        assert_eq!(backend.draws_of(after).count(), 0);
        assert!(renderer.region().blocks().iter().all(|b| b.size == 0));
    }

    #[test]
    fn growth_that_does_not_fit_fails_even_if_the_exact_size_would() {
        let mut renderer = Renderer::headless(config(100));
        let bytes = Rc::new(Cell::new(40));
        renderer
            .add_layer(bytes_layer(bytes.clone()), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();
        renderer.tick(&mut backend).unwrap();
        assert_eq!(renderer.region().block(0).unwrap().size, 40);

        // 2 * 40 + 60 = 140 > 100, although 60 alone would fit.
        bytes.set(60);
        let err = renderer.tick(&mut backend).unwrap_err();
        assert_eq!(
            err,
            Error::OutOfMemory {
                required: 140,
                capacity: 100
            }
        );
        let block = *renderer.region().block(0).unwrap();
        assert_eq!((block.size, block.used), (40, 40));
    }

    // ── commands ──────────────────────────────────────────────────────────

    #[test]
    fn layer_added_mid_frame_runs_in_the_same_tick() {
        let mut renderer = Renderer::headless(config(1024));
        let spawned = Rc::new(Cell::new(false));
        let flag = spawned.clone();
        renderer
            .add_layer(
                from_fn(move |ctx: &mut LayerCtx<'_>| {
                    if !flag.replace(true) {
                        ctx.add_layer(bytes_layer(Rc::new(Cell::new(24))), LayerOptions::default());
                    }
                    Ok(())
                }),
                LayerOptions::default(),
            )
            .unwrap();
        let mut backend = RecordingBackend::new();

        renderer.tick(&mut backend).unwrap();
        assert_eq!(renderer.layers().len(), 2);
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(backend.draws[1].size, 24);
    }

    #[test]
    fn layer_can_remove_itself_and_later_layers_still_run() {
        let mut renderer = Renderer::headless(config(1024));
        let first = renderer
            .add_layer(
                from_fn(|ctx: &mut LayerCtx<'_>| {
                    ctx.scratch().push_bytes(&[1; 24]);
                    let id = ctx.id();
                    ctx.remove_layer(id);
                    Ok(())
                }),
                LayerOptions::default(),
            )
            .unwrap();
        let second = renderer
            .add_layer(bytes_layer(Rc::new(Cell::new(24))), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();

        renderer.tick(&mut backend).unwrap();
        assert!(!renderer.layers().contains(first));
        assert_eq!(renderer.layers().block_index(second), Some(0));
        assert_eq!(backend.draws_of(second).count(), 1);

        let block = renderer.region().block(0).unwrap();
        assert_eq!((block.offset, block.used), (0, 24));
    }

    #[test]
    fn stop_is_checked_between_ticks() {
        let mut renderer = Renderer::headless(config(1024));
        let count = Rc::new(Cell::new(0u32));
        let seen = count.clone();
        renderer
            .add_layer(
                from_fn(move |ctx: &mut LayerCtx<'_>| {
                    seen.set(seen.get() + 1);
                    if ctx.time().frame_index == 2 {
                        ctx.stop();
                    }
                    Ok(())
                }),
                LayerOptions::default(),
            )
            .unwrap();
        let later = renderer
            .add_layer(bytes_layer(Rc::new(Cell::new(0))), LayerOptions::default())
            .unwrap();
        let mut backend = RecordingBackend::new();

        let ticks = renderer.run_until_stopped(&mut backend).unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(count.get(), 3);
        assert_eq!(backend.draws_of(later).count(), 3);
    }

    #[test]
    fn clear_layers_empties_the_region() {
        let mut renderer = Renderer::headless(config(1024));
        for n in [8, 16, 24] {
            renderer
                .add_layer(bytes_layer(Rc::new(Cell::new(n))), LayerOptions::default())
                .unwrap();
        }
        renderer.tick(&mut RecordingBackend::new()).unwrap();

        renderer.clear_layers().unwrap();
        assert!(renderer.layers().is_empty());
        assert!(renderer.region().is_empty());
    }

    // ── atlas and viewport ────────────────────────────────────────────────

    #[test]
    fn registrations_during_generation_are_flushed_before_the_draw() {
        let mut renderer = Renderer::headless(config(4096));
        renderer
            .add_layer(
                from_fn(|ctx: &mut LayerCtx<'_>| {
                    let sprite = MemoryImage::new("sprite", Pixels::transparent(4, 4));
                    let handle = ctx.atlas().resolve_image(&sprite)?;
                    ctx.painter()
                        .rect(Vec2::zero(), Vec2::new(4.0, 4.0), handle, RectFlags::default());
                    Ok(())
                }),
                LayerOptions::default(),
            )
            .unwrap();
        let mut backend = RecordingBackend::new();

        renderer.tick(&mut backend).unwrap();
        renderer.tick(&mut backend).unwrap();

        assert_eq!(backend.canvas_uploads, 1);
        assert_eq!(backend.canvas_size, (4, 4));
        assert_eq!(backend.dimension_uploads.len(), 1);
        assert_eq!(backend.dimension_uploads[0].0, TextureHandle(1));
        assert_eq!(backend.draws[0].vertex_count, 6);
        assert_eq!(renderer.atlas().len(), 1);
    }

    #[test]
    fn resize_reaches_the_backend_once() {
        let mut renderer = Renderer::headless(config(64));
        let mut backend = RecordingBackend::new();
        renderer.resize(800, 600);
        renderer.resize(800, 600);
        renderer.tick(&mut backend).unwrap();
        renderer.tick(&mut backend).unwrap();
        assert_eq!(backend.viewports, [Viewport::new(800, 600)]);
    }
}
