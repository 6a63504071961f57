/// Depth key of a layer.
///
/// Higher values are drawn in front. The shading stage receives the key
/// normalized to `[0, 1]` by dividing by [`Depth::MAX`] and should test with
/// `wgpu::CompareFunction::GreaterEqual` against a depth cleared to 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Depth(pub u16);

impl Depth {
    pub const MAX: Self = Self(u16::MAX);

    #[inline]
    pub const fn new(v: u16) -> Self {
        Self(v)
    }

    #[inline]
    pub fn normalized(self) -> f32 {
        f32::from(self.0) / f32::from(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_covers_unit_range() {
        assert_eq!(Depth::default().normalized(), 0.0);
        assert_eq!(Depth::MAX.normalized(), 1.0);
        assert!(Depth::new(100) < Depth::new(200));
    }

    #[test]
    fn front_layers_normalize_higher() {
        let back = Depth::new(10).normalized();
        let front = Depth::new(20_000).normalized();
        assert!(front > back);
    }
}
