//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - handing device + queue to the region storage and the atlas backend

mod gpu;
mod init;

pub use gpu::GpuContext;
pub use init::GpuInit;
