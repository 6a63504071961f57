use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::render::Backend;

use super::canvas::{Canvas, RowOrder};
use super::entry::{AtlasEntry, EntrySource, TextureDimensions, TextureHandle};
use super::font::{BitmapFont, EncodingRange, GlyphSource};
use super::packer::{PackRect, RectanglePacker};
use super::source::{self, ImageSource, Pixels};

/// Decoded item waiting to be placed.
struct Pending {
    source: EntrySource,
    pixels: Pixels,
}

/// Single texture atlas shared by every layer.
///
/// Images and glyphs are packed into one growing [`Canvas`]; each receives a
/// [`TextureHandle`] that stays valid for the life of the manager. The
/// dimensions side table is indexed by handle and index 0 is a reserved
/// all-zero record.
///
/// Registration is batched and all-or-nothing: every source of a batch is
/// validated and decoded before the atlas changes.
///
/// Nothing reaches the GPU until [`upload`](Self::upload) flushes the pending
/// changes to a [`Backend`].
#[derive(Debug)]
pub struct AtlasManager {
    packer: RectanglePacker,
    canvas: Canvas,
    entries: Vec<AtlasEntry>,
    dimensions: Vec<TextureDimensions>,
    fonts: Vec<BitmapFont>,
    max_entries: usize,
    dirty: BTreeSet<u32>,
    canvas_dirty: bool,
}

impl AtlasManager {
    /// Creates an empty atlas holding at most `max_entries` registered
    /// entries (the reserved index 0 excluded).
    pub fn new(max_entries: usize) -> Self {
        Self {
            packer: RectanglePacker::new(),
            canvas: Canvas::new(),
            entries: Vec::new(),
            dimensions: vec![TextureDimensions::default()],
            fonts: Vec::new(),
            max_entries,
            dirty: BTreeSet::new(),
            canvas_dirty: false,
        }
    }

    #[inline]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Number of registered entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn entries(&self) -> &[AtlasEntry] {
        &self.entries
    }

    pub fn entry(&self, handle: TextureHandle) -> Option<&AtlasEntry> {
        (handle.0 as usize).checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn dimensions(&self, handle: TextureHandle) -> Option<TextureDimensions> {
        self.dimensions.get(handle.0 as usize).copied()
    }

    /// Whole side table, index 0 included.
    pub fn dimensions_table(&self) -> &[TextureDimensions] {
        &self.dimensions
    }

    pub fn fonts(&self) -> &[BitmapFont] {
        &self.fonts
    }

    pub fn font(&self, identity: &str) -> Option<&BitmapFont> {
        self.fonts.iter().find(|f| f.identity == identity)
    }

    /// Whether the next [`upload`](Self::upload) has anything to send.
    pub fn is_dirty(&self) -> bool {
        self.canvas_dirty || !self.dirty.is_empty()
    }

    /// Registers a batch of images.
    ///
    /// Handles are returned in input order and assigned increasing indices in
    /// that order. On error the atlas is left untouched.
    pub fn register_images<S: ImageSource>(&mut self, sources: &[S]) -> Result<Vec<TextureHandle>> {
        // Cheap probe first so a bad file fails the batch before any decode.
        let sizes = sources
            .iter()
            .map(|s| s.dimensions())
            .collect::<Result<Vec<_>>>()?;

        let mut pending = Vec::with_capacity(sources.len());
        for (source, (width, height)) in sources.iter().zip(sizes) {
            let identity = source.identity();
            let pixels = source.decode()?;
            if (pixels.width, pixels.height) != (width, height) {
                return Err(Error::invalid_source(
                    &identity,
                    format_args!(
                        "decoded as {}x{}, probed as {width}x{height}",
                        pixels.width, pixels.height
                    ),
                ));
            }
            pixels.validate(&identity)?;
            if width == 0 || height == 0 {
                log::warn!("atlas: image {identity} has zero area");
            }
            pending.push(Pending {
                source: EntrySource::Image(identity),
                pixels,
            });
        }

        self.insert(pending, false)
    }

    /// Registers every `.png`, `.jpeg`, `.jpg` and `.bmp` file below `dir`,
    /// recursively, in path order.
    pub fn register_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<TextureHandle>> {
        let files = source::collect_image_files(dir.as_ref())?;
        log::info!("atlas: registering {} images from {}", files.len(), dir.as_ref().display());
        self.register_images(&files)
    }

    /// Returns the handle of an image with the same identity, registering it
    /// if it is not in the atlas yet.
    pub fn resolve_image<S: ImageSource>(&mut self, source: &S) -> Result<TextureHandle> {
        let identity = EntrySource::Image(source.identity());
        if let Some(entry) = self.entries.iter().find(|e| e.source == identity) {
            return Ok(entry.handle);
        }

        let handles = self.register_images(std::slice::from_ref(source))?;
        handles
            .first()
            .copied()
            .ok_or_else(|| Error::invalid_source(source.identity(), "registration produced no entry"))
    }

    /// Registers every glyph of a font as one batch.
    ///
    /// Indices are assigned in codepoint order so runs of consecutive
    /// codepoints collapse into few [`EncodingRange`]s.
    pub fn register_font<G: GlyphSource + ?Sized>(&mut self, source: &G) -> Result<BitmapFont> {
        let identity = source.identity();
        let mut glyphs = source.glyphs()?;
        for glyph in &glyphs {
            glyph.pixels.validate(&identity)?;
        }
        glyphs.sort_by_key(|g| g.codepoint);
        glyphs.dedup_by_key(|g| g.codepoint);

        let max_width = glyphs.iter().map(|g| g.pixels.width).max().unwrap_or(0);
        let max_height = glyphs.iter().map(|g| g.pixels.height).max().unwrap_or(0);
        let codepoints: Vec<u32> = glyphs.iter().map(|g| g.codepoint).collect();

        let pending = glyphs
            .into_iter()
            .map(|g| Pending {
                source: EntrySource::Glyph {
                    font: identity.clone(),
                    codepoint: g.codepoint,
                },
                pixels: g.pixels,
            })
            .collect();
        let handles = self.insert(pending, true)?;

        let font = BitmapFont {
            identity,
            max_width,
            max_height,
            glyph_count: handles.len() as u32,
            ranges: EncodingRange::coalesce(
                codepoints.into_iter().zip(handles.iter().map(|h| h.index())),
            ),
        };
        log::info!(
            "atlas: font {} registered, {} glyphs in {} ranges",
            font.identity,
            font.glyph_count,
            font.ranges.len()
        );

        self.fonts.push(font.clone());
        Ok(font)
    }

    /// Returns the font registered under the same identity, registering it
    /// if needed.
    pub fn resolve_font<G: GlyphSource + ?Sized>(&mut self, source: &G) -> Result<BitmapFont> {
        if let Some(font) = self.font(&source.identity()) {
            return Ok(font.clone());
        }
        self.register_font(source)
    }

    /// Sends pending dimension records and, if it changed, the canvas.
    pub fn upload<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for index in std::mem::take(&mut self.dirty) {
            backend.upload_dimensions(TextureHandle(index), self.dimensions[index as usize]);
        }
        if self.canvas_dirty {
            backend.upload_canvas(&self.canvas);
            self.canvas_dirty = false;
        }
    }

    fn insert(&mut self, pending: Vec<Pending>, clear_first: bool) -> Result<Vec<TextureHandle>> {
        let required = self.entries.len() + pending.len();
        if required > self.max_entries {
            return Err(Error::OutOfMemory {
                required: required as u64,
                capacity: self.max_entries as u64,
            });
        }
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut rects: Vec<_> = pending
            .iter()
            .enumerate()
            .map(|(i, p)| PackRect::new(p.pixels.width, p.pixels.height, i))
            .collect();
        self.packer.pack(&mut rects);
        self.canvas
            .grow(self.packer.total_width(), self.packer.total_height());

        // Back to input order so indices follow it.
        rects.sort_by_key(|r| r.data);

        let mut handles = Vec::with_capacity(rects.len());
        for (rect, item) in rects.iter().zip(pending) {
            if clear_first {
                self.canvas.clear_rect(rect.x, rect.y, rect.width, rect.height)?;
            }
            self.canvas.blit(
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                &item.pixels.data,
                RowOrder::TopFirst,
            )?;

            let handle = TextureHandle(self.dimensions.len() as u32);
            let dimensions = TextureDimensions {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            };
            self.dimensions.push(dimensions);
            self.entries.push(AtlasEntry {
                handle,
                source: item.source,
                dimensions,
            });
            self.dirty.insert(handle.0);
            handles.push(handle);
        }
        self.canvas_dirty = true;

        log::debug!(
            "atlas: {} entries placed, canvas {}x{}",
            handles.len(),
            self.canvas.width(),
            self.canvas.height()
        );
        Ok(handles)
    }
}
