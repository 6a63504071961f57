//! Frame driving.
//!
//! [`Renderer`] is the one context object of the engine: it owns the vertex
//! region, the atlas and the layer registry, and runs the per-layer
//! generate / reconcile / draw protocol once per tick.

mod clock;
mod renderer;

pub use clock::{FrameClock, FrameTime};
pub use renderer::{Renderer, RendererConfig};
