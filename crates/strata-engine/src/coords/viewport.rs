/// Size of the render target in physical pixels.
///
/// Reported by the host on window resize; the projection stage outside the
/// engine turns it into a matrix.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero-sized viewport.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or 1.0 for an empty viewport.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}
