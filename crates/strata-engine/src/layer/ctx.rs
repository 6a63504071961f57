use crate::atlas::AtlasManager;
use crate::coords::Viewport;
use crate::error::Result;
use crate::frame::FrameTime;

use super::depth::Depth;
use super::painter::Painter;
use super::scratch::ScratchBuffer;
use super::vertex::VertexFormat;

/// Stable identity of a registered layer.
///
/// Ids are never reused; later registrations get larger ids.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LayerId(pub(crate) u64);

impl LayerId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Hands out [`LayerId`]s.
#[derive(Debug, Default)]
pub(crate) struct LayerIds {
    next: u64,
}

impl LayerIds {
    pub(crate) fn next(&mut self) -> LayerId {
        let id = LayerId(self.next);
        self.next += 1;
        id
    }
}

/// Fixed per-layer drawing parameters.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LayerOptions {
    pub depth: Depth,
    /// World-space layers go through the camera; screen-space ones don't.
    pub world_space: bool,
}

/// Content generator of one layer.
///
/// Called once per tick. Whatever it appends to the scratch buffer replaces
/// the layer's previous geometry; appending nothing keeps the previous
/// geometry on the GPU unless a redraw was requested.
pub trait Layer {
    fn generate(&mut self, ctx: &mut LayerCtx<'_>) -> Result<()>;
}

impl<L: Layer + ?Sized> Layer for Box<L> {
    fn generate(&mut self, ctx: &mut LayerCtx<'_>) -> Result<()> {
        (**self).generate(ctx)
    }
}

/// Adapter turning a closure into a [`Layer`].
pub struct FnLayer<F>(pub F);

impl<F> Layer for FnLayer<F>
where
    F: FnMut(&mut LayerCtx<'_>) -> Result<()>,
{
    fn generate(&mut self, ctx: &mut LayerCtx<'_>) -> Result<()> {
        (self.0)(ctx)
    }
}

/// Wraps a closure as a layer.
pub fn from_fn<F>(f: F) -> FnLayer<F>
where
    F: FnMut(&mut LayerCtx<'_>) -> Result<()>,
{
    FnLayer(f)
}

pub(crate) enum LayerCommand {
    Add {
        id: LayerId,
        layer: Box<dyn Layer>,
        options: LayerOptions,
    },
    Remove(LayerId),
    Stop,
}

/// Per-layer frame context.
///
/// Commands are buffered and applied after the layer's step returns.
pub struct LayerCtx<'a> {
    pub(crate) id: LayerId,
    pub(crate) scratch: &'a mut ScratchBuffer,
    pub(crate) atlas: &'a mut AtlasManager,
    pub(crate) ids: &'a mut LayerIds,
    pub(crate) commands: &'a mut Vec<LayerCommand>,
    pub(crate) redraw: bool,
    pub(crate) format: VertexFormat,
    pub(crate) time: FrameTime,
    pub(crate) viewport: Viewport,
}

impl<'a> LayerCtx<'a> {
    /// Id of the layer being generated.
    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    #[inline]
    pub fn time(&self) -> FrameTime {
        self.time
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn format(&self) -> VertexFormat {
        self.format
    }

    /// Raw access to this tick's vertex bytes.
    #[inline]
    pub fn scratch(&mut self) -> &mut ScratchBuffer {
        &mut *self.scratch
    }

    /// The shared atlas; registrations made here are visible to later layers
    /// in the same tick.
    #[inline]
    pub fn atlas(&mut self) -> &mut AtlasManager {
        &mut *self.atlas
    }

    pub fn painter(&mut self) -> Painter<'_> {
        Painter::new(&mut *self.scratch, self.format, &*self.atlas)
    }

    /// Uploads this tick's bytes even if there are none, clearing the layer.
    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Registers a new layer after this step; it is generated later in the
    /// same tick.
    pub fn add_layer(&mut self, layer: impl Layer + 'static, options: LayerOptions) -> LayerId {
        let id = self.ids.next();
        self.commands.push(LayerCommand::Add {
            id,
            layer: Box::new(layer),
            options,
        });
        id
    }

    /// Deregisters a layer (possibly this one) after this step.
    pub fn remove_layer(&mut self, id: LayerId) {
        self.commands.push(LayerCommand::Remove(id));
    }

    /// Stops the frame loop once the current tick completes.
    pub fn stop(&mut self) {
        self.commands.push(LayerCommand::Stop);
    }
}
