//! GPU upload and draw surface.
//!
//! The renderer never talks to wgpu directly outside of region storage. It
//! drives a [`Backend`]: atlas pixels and dimension records go up when they
//! change, and every layer issues one [`DrawCall`] per tick.

mod backend;
mod wgpu_backend;

pub use backend::{Backend, DrawCall, RecordingBackend};
pub use wgpu_backend::WgpuBackend;
