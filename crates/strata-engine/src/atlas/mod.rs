//! Texture atlas.
//!
//! Every image and glyph the layers draw with lives in one RGBA8 canvas:
//!
//! - [`RectanglePacker`] decides where a batch of rectangles goes
//! - [`Canvas`] holds the pixels (bottom row first)
//! - [`AtlasManager`] ties them together and hands out [`TextureHandle`]s
//!
//! Sources are abstract ([`ImageSource`], [`GlyphSource`]); file decoding
//! uses the `image` crate and font rasterization uses `fontdue`.

mod canvas;
mod entry;
mod font;
mod manager;
mod packer;
mod source;

pub use canvas::{Canvas, RowOrder, CHANNELS};
pub use entry::{AtlasEntry, EntrySource, TextureDimensions, TextureHandle};
pub use font::{BitmapFont, EncodingRange, FontGlyphs, Glyph, GlyphSource, MemoryGlyphs};
pub use manager::AtlasManager;
pub use packer::{PackRect, RectanglePacker};
pub use source::{ImageFile, ImageSource, MemoryImage, Pixels};
