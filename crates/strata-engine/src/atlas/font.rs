use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{Error, Result};

use super::entry::TextureHandle;
use super::source::Pixels;

/// Maps a run of consecutive codepoints to consecutive registry indices.
///
/// Codepoint `c` in `start..=end` resolves to `start_index + (c - start)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EncodingRange {
    pub start: u32,
    pub end: u32,
    pub start_index: u32,
}

impl EncodingRange {
    #[inline]
    pub fn contains(&self, codepoint: u32) -> bool {
        (self.start..=self.end).contains(&codepoint)
    }

    #[inline]
    pub fn resolve(&self, codepoint: u32) -> Option<TextureHandle> {
        self.contains(codepoint)
            .then(|| TextureHandle(self.start_index + (codepoint - self.start)))
    }

    /// Builds ranges from `(codepoint, index)` pairs sorted by codepoint.
    ///
    /// A pair extends the current range only when both its codepoint and its
    /// index follow the range's last ones.
    pub fn coalesce(pairs: impl IntoIterator<Item = (u32, u32)>) -> Vec<Self> {
        let mut ranges: Vec<Self> = Vec::new();
        for (codepoint, index) in pairs {
            match ranges.last_mut() {
                Some(range)
                    if range.end.checked_add(1) == Some(codepoint)
                        && range.start_index + (range.end - range.start) + 1 == index =>
                {
                    range.end = codepoint;
                }
                _ => ranges.push(Self {
                    start: codepoint,
                    end: codepoint,
                    start_index: index,
                }),
            }
        }
        ranges
    }
}

/// Codepoint lookup for a font registered in the atlas.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BitmapFont {
    pub identity: String,
    /// Widest glyph of the font, in pixels.
    pub max_width: u32,
    /// Tallest glyph of the font, in pixels.
    pub max_height: u32,
    pub glyph_count: u32,
    pub ranges: Vec<EncodingRange>,
}

impl BitmapFont {
    /// Registry handle of `codepoint`.
    ///
    /// Linear scan over the ranges; fonts rarely have more than a handful.
    pub fn lookup(&self, codepoint: u32) -> Result<TextureHandle> {
        self.ranges
            .iter()
            .find_map(|range| range.resolve(codepoint))
            .ok_or(Error::UnsupportedCharacter(codepoint))
    }

    #[inline]
    pub fn glyph(&self, c: char) -> Result<TextureHandle> {
        self.lookup(c as u32)
    }
}

/// One rasterized glyph, RGBA8 top row first.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Glyph {
    pub codepoint: u32,
    pub pixels: Pixels,
}

/// Something the atlas can register as a font.
pub trait GlyphSource {
    /// Identity used to find an already registered font.
    fn identity(&self) -> String;

    /// Every glyph of the font, in any order.
    fn glyphs(&self) -> Result<Vec<Glyph>>;
}

/// Pre-rasterized glyphs registered under a name.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MemoryGlyphs {
    pub name: String,
    pub glyphs: Vec<Glyph>,
}

impl MemoryGlyphs {
    pub fn new(name: impl Into<String>, glyphs: Vec<Glyph>) -> Self {
        Self { name: name.into(), glyphs }
    }
}

impl GlyphSource for MemoryGlyphs {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn glyphs(&self) -> Result<Vec<Glyph>> {
        Ok(self.glyphs.clone())
    }
}

/// TrueType/OpenType font rasterized with fontdue at a fixed pixel size.
///
/// Every glyph becomes a cell `advance` wide and one line tall with the
/// coverage drawn at its baseline position, so glyph quads can be laid out
/// side by side without per-glyph offsets.
pub struct FontGlyphs {
    name: String,
    font: fontdue::Font,
    px: f32,
    chars: RangeInclusive<char>,
}

impl FontGlyphs {
    /// Parses a font from raw bytes.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        px: f32,
        chars: RangeInclusive<char>,
    ) -> Result<Self> {
        let name = name.into();
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| Error::invalid_source(&name, e))?;
        Ok(Self { name, font, px, chars })
    }

    /// Reads and parses a font file; the path is the identity.
    pub fn from_file(path: impl AsRef<Path>, px: f32, chars: RangeInclusive<char>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::invalid_source(path.display(), e))?;
        Self::from_bytes(path.display().to_string(), &bytes, px, chars)
    }

    fn rasterize(&self, c: char, baseline: i32, cell_height: u32) -> Glyph {
        let (metrics, coverage) = self.font.rasterize(c, self.px);

        let advance = metrics.advance_width.ceil().max(0.0) as u32;
        let width = advance
            .max((metrics.xmin.max(0) as usize + metrics.width) as u32)
            .max(1);
        let mut pixels = Pixels::transparent(width, cell_height);

        // Row of the bitmap's top edge, counted from the top of the cell.
        let top = baseline - (metrics.ymin + metrics.height as i32);
        let left = metrics.xmin.max(0) as u32;

        for (row, line) in coverage.chunks(metrics.width.max(1)).enumerate() {
            let y = top + row as i32;
            if y < 0 || y >= cell_height as i32 {
                continue;
            }
            for (col, &alpha) in line.iter().enumerate() {
                let x = left + col as u32;
                if x >= width {
                    break;
                }
                let i = (y as usize * width as usize + x as usize) * 4;
                pixels.data[i..i + 4].copy_from_slice(&[255, 255, 255, alpha]);
            }
        }

        Glyph {
            codepoint: c as u32,
            pixels,
        }
    }
}

impl GlyphSource for FontGlyphs {
    fn identity(&self) -> String {
        format!("{}@{}", self.name, self.px)
    }

    fn glyphs(&self) -> Result<Vec<Glyph>> {
        let line = self
            .font
            .horizontal_line_metrics(self.px)
            .ok_or_else(|| Error::invalid_source(&self.name, "font has no horizontal metrics"))?;

        let baseline = line.ascent.ceil() as i32;
        let cell_height = ((line.ascent - line.descent).ceil() as u32).max(1);

        let glyphs: Vec<_> = self
            .chars
            .clone()
            .filter(|&c| self.font.lookup_glyph_index(c) != 0)
            .map(|c| self.rasterize(c, baseline, cell_height))
            .collect();

        log::debug!(
            "font {}: rasterized {} glyphs at {}px",
            self.name,
            glyphs.len(),
            self.px
        );
        Ok(glyphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── ranges ────────────────────────────────────────────────────────────

    #[test]
    fn consecutive_codepoints_coalesce() {
        let ranges = EncodingRange::coalesce([(65, 10), (66, 11), (67, 12), (70, 13)]);
        assert_eq!(
            ranges,
            [
                EncodingRange { start: 65, end: 67, start_index: 10 },
                EncodingRange { start: 70, end: 70, start_index: 13 },
            ]
        );
    }

    #[test]
    fn index_gap_splits_a_range() {
        let ranges = EncodingRange::coalesce([(1, 5), (2, 7)]);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].start_index, 7);
    }

    #[test]
    fn empty_input_gives_no_ranges() {
        assert!(EncodingRange::coalesce([]).is_empty());
    }

    // ── lookup ────────────────────────────────────────────────────────────

    #[test]
    fn lookup_resolves_inside_ranges() {
        let font = BitmapFont {
            ranges: EncodingRange::coalesce([(65, 10), (66, 11), (67, 12), (70, 13)]),
            ..BitmapFont::default()
        };
        assert_eq!(font.glyph('B').unwrap(), TextureHandle(11));
        assert_eq!(font.glyph('F').unwrap(), TextureHandle(13));
    }

    #[test]
    fn lookup_miss_is_unsupported_character() {
        let font = BitmapFont {
            ranges: vec![EncodingRange { start: 65, end: 67, start_index: 1 }],
            ..BitmapFont::default()
        };
        assert!(matches!(font.lookup(68), Err(Error::UnsupportedCharacter(68))));
    }

    #[test]
    fn garbage_font_bytes_are_invalid_source() {
        let err = FontGlyphs::from_bytes("junk", &[0, 1, 2, 3], 16.0, 'a'..='z').err();
        assert!(matches!(err, Some(Error::InvalidSource { .. })));
    }
}
