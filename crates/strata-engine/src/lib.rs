//! Strata engine crate.
//!
//! GPU memory and texture atlas management for layered 2D rendering:
//! - [`memory`]: a compacting block allocator over one vertex region
//! - [`atlas`]: a shelf packer and the shared texture atlas
//! - [`layer`] and [`frame`]: layers bound to blocks, driven once per tick
//! - [`render`] and [`device`]: the wgpu side of uploads and draws

pub mod atlas;
pub mod coords;
pub mod device;
pub mod frame;
pub mod layer;
pub mod logging;
pub mod memory;
pub mod render;

mod error;

pub use error::{Error, Result};
