/// Initialization parameters for the headless GPU context.
///
/// Only options the vertex region and atlas actually depend on live here.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter preference.
    pub power_preference: wgpu::PowerPreference,

    /// Allow falling back to a software adapter when no hardware one exists.
    ///
    /// Useful for CI machines without a GPU.
    pub allow_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    ///
    /// The vertex region and the dimensions table are single buffers, so
    /// `max_buffer_size` and `max_storage_buffer_binding_size` bound their
    /// capacities.
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            allow_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}
