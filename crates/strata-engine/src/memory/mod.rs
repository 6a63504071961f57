//! Fixed-capacity vertex memory.
//!
//! A [`Region`] partitions one contiguous range of bytes into blocks that are
//! always packed back to back, so the region never fragments. Resizing or
//! removing a block moves every byte behind it.
//!
//! Where the bytes actually live is decided by a [`RegionStorage`]:
//! - [`HostStorage`] keeps a CPU mirror (tests, headless runs)
//! - [`WgpuStorage`] drives a GPU vertex buffer

mod region;
mod storage;
mod wgpu_storage;

pub use region::{Block, Region};
pub use storage::{HostStorage, RegionStorage};
pub use wgpu_storage::WgpuStorage;
