//! Small value types shared by layers and the render backend.
//!
//! Layer space is whatever the layer's projection says it is: screen pixels
//! for screen-space layers, world units otherwise. The engine never
//! transforms positions itself.

mod color;
mod vec2;
mod viewport;

pub use color::Color;
pub use vec2::Vec2;
pub use viewport::Viewport;
