use bytemuck::{Pod, Zeroable};

/// Stable registry index of an atlas entry.
///
/// Index 0 is reserved as "none": drawing with it produces untextured
/// geometry.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    /// The reserved invalid handle.
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Placement of an entry inside the canvas, in pixels (bottom-left origin).
///
/// This is also the element layout of the dimensions side buffer read by the
/// shading stage: four tightly packed `u32`s per registry index.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct TextureDimensions {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// What an entry was registered from.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum EntrySource {
    /// An image, identified by its path or name.
    Image(String),
    /// One glyph of a font.
    Glyph { font: String, codepoint: u32 },
}

/// Immutable record of a placed image or glyph.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AtlasEntry {
    pub handle: TextureHandle,
    pub source: EntrySource,
    pub dimensions: TextureDimensions,
}
