/// Straight-alpha RGBA8 modulate color.
///
/// Packed into one `u32` per vertex (red in the low byte), which is the
/// layout `unpack4x8unorm` reads back in WGSL.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Converts `[0, 1]` float channels, clamping out-of-range values.
    pub fn from_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(r), q(g), q(b), q(a))
    }

    #[inline]
    pub const fn pack(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    #[inline]
    pub const fn unpack(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self::new(r, g, b, a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
