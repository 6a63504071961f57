use crate::error::{Error, Result};

/// Bytes per canvas pixel (RGBA8).
pub const CHANNELS: usize = 4;

/// Row order of a pixel buffer handed to [`Canvas::blit`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowOrder {
    /// First row in memory is the top of the image (decoded files, glyphs).
    TopFirst,
    /// First row in memory is the bottom of the image (canvas layout).
    BottomFirst,
}

/// Growable RGBA8 pixel storage of the atlas.
///
/// Convention: row 0 is the **bottom** row, matching a bottom-left texture
/// origin. Top-first sources are flipped vertically on blit so they display
/// upright; the rectangle `(x, y, w, h)` always covers rows `y..y + h`.
///
/// The canvas only grows. Growing reallocates and copies old pixels to the
/// same coordinates, so placed entries never move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw pixels, bottom row first, tightly packed.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGBA value at `(x, y)` (bottom-left origin).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[i..i + CHANNELS]);
        Some(out)
    }

    /// Grows the canvas to at least `width`x`height`.
    ///
    /// Returns `true` if the canvas was reallocated.
    pub fn grow(&mut self, width: u32, height: u32) -> bool {
        let width = width.max(self.width);
        let height = height.max(self.height);
        if width == self.width && height == self.height {
            return false;
        }

        let mut grown = Canvas {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * CHANNELS],
        };

        let old_row = self.width as usize * CHANNELS;
        for (y, row) in self.pixels.chunks_exact(old_row.max(1)).enumerate() {
            let start = grown.index(0, y as u32);
            grown.pixels[start..start + old_row].copy_from_slice(row);
        }

        log::debug!(
            "atlas canvas: {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        *self = grown;
        true
    }

    /// Copies a tightly packed RGBA8 buffer into the rectangle at `(x, y)`.
    pub fn blit(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        src: &[u8],
        order: RowOrder,
    ) -> Result<()> {
        self.check_bounds(x, y, width, height)?;

        let row = width as usize * CHANNELS;
        let needed = row * height as usize;
        if src.len() < needed {
            return Err(Error::invalid_source(
                "pixel buffer",
                format_args!("{} bytes given, {needed} needed for {width}x{height}", src.len()),
            ));
        }
        if row == 0 {
            return Ok(());
        }

        for i in 0..height {
            let src_row = (match order {
                RowOrder::TopFirst => height - i - 1,
                RowOrder::BottomFirst => i,
            }) as usize;
            let dst = self.index(x, y + i);
            self.pixels[dst..dst + row].copy_from_slice(&src[src_row * row..(src_row + 1) * row]);
        }
        Ok(())
    }

    /// Zeroes every channel of every pixel in the rectangle.
    pub fn clear_rect(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        self.check_bounds(x, y, width, height)?;

        let row = width as usize * CHANNELS;
        for i in 0..height {
            let dst = self.index(x, y + i);
            self.pixels[dst..dst + row].fill(0);
        }
        Ok(())
    }

    fn check_bounds(&self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        let fits_x = x.checked_add(width).is_some_and(|r| r <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|t| t <= self.height);
        if fits_x && fits_y {
            return Ok(());
        }

        debug_assert!(false, "atlas write out of bounds: {width}x{height} at ({x}, {y})");
        Err(Error::AtlasBoundsExceeded {
            x,
            y,
            width,
            height,
            canvas_width: self.width,
            canvas_height: self.height,
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Vec<u8> {
        vec![value; width as usize * height as usize * CHANNELS]
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn starts_empty() {
        let canvas = Canvas::new();
        assert!(canvas.is_empty());
        assert!(canvas.pixels().is_empty());
    }

    #[test]
    fn grow_preserves_existing_pixels() {
        let mut canvas = Canvas::new();
        canvas.grow(3, 2);
        let src: Vec<u8> = (0..24).collect();
        canvas.blit(0, 0, 3, 2, &src, RowOrder::BottomFirst).unwrap();
        let before: Vec<_> = (0..2)
            .flat_map(|y| (0..3).map(move |x| (x, y)))
            .map(|(x, y)| canvas.pixel(x, y))
            .collect();

        assert!(canvas.grow(5, 4));

        let after: Vec<_> = (0..2)
            .flat_map(|y| (0..3).map(move |x| (x, y)))
            .map(|(x, y)| canvas.pixel(x, y))
            .collect();
        assert_eq!(before, after);
        assert_eq!(canvas.pixel(4, 3), Some([0; 4]));
    }

    #[test]
    fn grow_never_shrinks() {
        let mut canvas = Canvas::new();
        canvas.grow(8, 8);
        assert!(!canvas.grow(4, 4));
        assert!(canvas.grow(4, 10));
        assert_eq!((canvas.width(), canvas.height()), (8, 10));
    }

    // ── blit ──────────────────────────────────────────────────────────────

    #[test]
    fn top_first_source_is_flipped() {
        let mut canvas = Canvas::new();
        canvas.grow(1, 2);
        // Top row red, bottom row blue.
        let src = [255, 0, 0, 255, 0, 0, 255, 255];
        canvas.blit(0, 0, 1, 2, &src, RowOrder::TopFirst).unwrap();

        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(0, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn blit_at_offset() {
        let mut canvas = Canvas::new();
        canvas.grow(4, 4);
        canvas.blit(2, 1, 2, 2, &solid(2, 2, 7), RowOrder::TopFirst).unwrap();
        assert_eq!(canvas.pixel(2, 1), Some([7; 4]));
        assert_eq!(canvas.pixel(3, 2), Some([7; 4]));
        assert_eq!(canvas.pixel(1, 1), Some([0; 4]));
        assert_eq!(canvas.pixel(2, 3), Some([0; 4]));
    }

    #[test]
    fn short_source_is_rejected() {
        let mut canvas = Canvas::new();
        canvas.grow(4, 4);
        let err = canvas.blit(0, 0, 2, 2, &[0; 8], RowOrder::TopFirst).unwrap_err();
        assert!(matches!(err, Error::InvalidSource { .. }));
    }

    #[test]
    fn clear_rect_zeroes_only_the_rect() {
        let mut canvas = Canvas::new();
        canvas.grow(3, 3);
        canvas.blit(0, 0, 3, 3, &solid(3, 3, 9), RowOrder::TopFirst).unwrap();
        canvas.clear_rect(1, 1, 1, 1).unwrap();
        assert_eq!(canvas.pixel(1, 1), Some([0; 4]));
        assert_eq!(canvas.pixel(0, 0), Some([9; 4]));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "out of bounds"))]
    fn out_of_bounds_write_is_an_invariant_violation() {
        let mut canvas = Canvas::new();
        canvas.grow(2, 2);
        let err = canvas.clear_rect(1, 1, 2, 1).unwrap_err();
        assert!(matches!(err, Error::AtlasBoundsExceeded { canvas_width: 2, .. }));
    }
}
