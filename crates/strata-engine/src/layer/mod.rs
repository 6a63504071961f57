//! Layers and the per-layer vertex pipeline.
//!
//! A layer owns one region block, a [`ScratchBuffer`] it refills every tick,
//! a [`Depth`] key and a world/screen-space flag. Geometry is written as
//! [`Vertex`] records serialized by a [`VertexFormat`], usually through a
//! [`Painter`].

mod ctx;
mod depth;
mod painter;
mod registry;
mod scratch;
mod vertex;

pub use ctx::{from_fn, FnLayer, Layer, LayerCtx, LayerId, LayerOptions};
pub use depth::Depth;
pub use painter::{Painter, RectFlags, TextStyle};
pub use registry::LayerRegistry;
pub use scratch::ScratchBuffer;
pub use vertex::{Vertex, VertexFormat};

pub(crate) use ctx::LayerCommand;
