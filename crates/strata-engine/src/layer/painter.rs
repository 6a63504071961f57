use crate::atlas::{AtlasManager, BitmapFont, TextureHandle};
use crate::coords::{Color, Vec2};
use crate::error::Result;

use super::scratch::ScratchBuffer;
use super::vertex::{Vertex, VertexFormat};

/// Texture mapping applied by [`Painter::rect`].
///
/// `swap_xy` is applied first, then the mirrors.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RectFlags {
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub swap_xy: bool,
    /// Tile the texture at its pixel size instead of stretching it. UVs run
    /// past 1 and the shading stage wraps them.
    pub repeat: bool,
}

impl RectFlags {
    fn map(self, uv: Vec2) -> Vec2 {
        let uv = if self.swap_xy { Vec2::new(uv.y, uv.x) } else { uv };
        Vec2::new(
            if self.mirror_x { 1.0 - uv.x } else { uv.x },
            if self.mirror_y { 1.0 - uv.y } else { uv.y },
        )
    }
}

/// Text layout options for [`Painter::text`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextStyle {
    /// Multiplier applied to glyph pixel sizes.
    pub scale: f32,
    /// Drawn in place of characters the font does not cover.
    pub fallback: Option<char>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            scale: 1.0,
            fallback: None,
        }
    }
}

/// Triangle-list geometry writer over a layer's scratch buffer.
///
/// Coordinates are in layer space with +Y up. Every primitive is emitted as
/// independent triangles; nothing is indexed.
pub struct Painter<'a> {
    out: &'a mut ScratchBuffer,
    format: VertexFormat,
    atlas: &'a AtlasManager,
    color: Color,
}

impl<'a> Painter<'a> {
    pub fn new(out: &'a mut ScratchBuffer, format: VertexFormat, atlas: &'a AtlasManager) -> Self {
        Self {
            out,
            format,
            atlas,
            color: Color::WHITE,
        }
    }

    /// Modulate color for following primitives (ignored by [`VertexFormat::V1`]).
    pub fn set_color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Writes one raw vertex.
    pub fn vertex(&mut self, vertex: &Vertex) {
        self.format.write(vertex, self.out);
    }

    pub fn triangle(&mut self, positions: [Vec2; 3], uvs: [Vec2; 3], texture: TextureHandle) {
        for (position, uv) in positions.into_iter().zip(uvs) {
            self.vertex(&Vertex {
                position,
                uv,
                texture,
                color: self.color,
            });
        }
    }

    /// Axis-aligned quad with its bottom-left corner at `origin`.
    pub fn rect(&mut self, origin: Vec2, size: Vec2, texture: TextureHandle, flags: RectFlags) {
        let corners = [
            origin,
            origin + Vec2::new(size.x, 0.0),
            origin + size,
            origin + Vec2::new(0.0, size.y),
        ];
        let tiles = if flags.repeat { self.tiles(size, texture, flags.swap_xy) } else { Vec2::new(1.0, 1.0) };
        self.quad(corners, texture, flags, tiles);
    }

    /// Quad the size of the atlas entry, in pixels.
    pub fn image(&mut self, origin: Vec2, texture: TextureHandle) {
        let size = self
            .atlas
            .dimensions(texture)
            .map_or(Vec2::zero(), |d| Vec2::new(d.width as f32, d.height as f32));
        self.rect(origin, size, texture, RectFlags::default());
    }

    /// Untextured line drawn as a quad `thickness` wide.
    pub fn line(&mut self, from: Vec2, to: Vec2, thickness: f32) {
        let n = (to - from).normalized().perp() * (thickness * 0.5);
        let corners = [from - n, to - n, to + n, from + n];
        self.quad(corners, TextureHandle::NONE, RectFlags::default(), Vec2::new(1.0, 1.0));
    }

    /// Lays out `text` starting with the bottom-left of its first line at
    /// `origin`; each `'\n'` moves down by the font's tallest glyph.
    ///
    /// Every character is resolved before anything is written, so a miss
    /// leaves the scratch buffer as it was.
    pub fn text(&mut self, origin: Vec2, text: &str, font: &BitmapFont, style: TextStyle) -> Result<()> {
        let glyphs = text
            .chars()
            .filter(|&c| c != '\r')
            .map(|c| {
                if c == '\n' {
                    return Ok(None);
                }
                match (font.glyph(c), style.fallback) {
                    (Ok(handle), _) => Ok(Some(handle)),
                    (Err(err), Some(fallback)) => font.glyph(fallback).map(Some).map_err(|_| err),
                    (Err(err), None) => Err(err),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let line_height = font.max_height as f32 * style.scale;
        let mut pen = origin;
        for glyph in glyphs {
            let Some(handle) = glyph else {
                pen = Vec2::new(origin.x, pen.y - line_height);
                continue;
            };
            let Some(d) = self.atlas.dimensions(handle) else {
                continue;
            };
            let size = Vec2::new(d.width as f32, d.height as f32) * style.scale;
            self.rect(pen, size, handle, RectFlags::default());
            pen.x += size.x;
        }
        Ok(())
    }

    /// How many times the texture fits along each of its own axes.
    fn tiles(&self, size: Vec2, texture: TextureHandle, swap_xy: bool) -> Vec2 {
        let Some(d) = self.atlas.dimensions(texture).filter(|d| d.width > 0 && d.height > 0) else {
            return Vec2::new(1.0, 1.0);
        };
        let (along_x, along_y) = if swap_xy { (size.y, size.x) } else { (size.x, size.y) };
        Vec2::new(along_x.abs() / d.width as f32, along_y.abs() / d.height as f32)
    }

    fn quad(&mut self, corners: [Vec2; 4], texture: TextureHandle, flags: RectFlags, tiles: Vec2) {
        let uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]
        .map(|uv| {
            let uv = flags.map(uv);
            Vec2::new(uv.x * tiles.x, uv.y * tiles.y)
        });

        let [a, b, c, d] = corners;
        let [ua, ub, uc, ud] = uvs;
        self.triangle([a, b, c], [ua, ub, uc], texture);
        self.triangle([a, c, d], [ua, uc, ud], texture);
    }
}
