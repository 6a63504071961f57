/// Rectangle handed to [`RectanglePacker::pack`].
///
/// `data` is an opaque tag that lets the caller find its source again after
/// the packer has reordered the batch.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PackRect<T> {
    /// Set by the packer.
    pub x: u32,
    /// Set by the packer.
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub data: T,
}

impl<T> PackRect<T> {
    #[inline]
    pub const fn new(width: u32, height: u32, data: T) -> Self {
        Self { x: 0, y: 0, width, height, data }
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> u32 {
        self.y + self.height
    }
}

/// Horizontal run of exposed top edge: `width` pixels starting at `x`,
/// with nothing placed at or above `y`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Shelf {
    x: u32,
    y: u32,
    width: u32,
}

/// Greedy shelf packer growing a virtual canvas.
///
/// Not optimal, but every placement is valid: the shelves always partition
/// the columns of the canvas, each one sitting on top of everything already
/// placed in its columns.
///
/// State persists across [`pack`](Self::pack) calls, so a later batch is laid
/// out around earlier ones. Call [`reset`](Self::reset) before packing an
/// unrelated batch.
#[derive(Debug, Clone, Default)]
pub struct RectanglePacker {
    shelves: Vec<Shelf>,
    total_width: u32,
    total_height: u32,
}

impl RectanglePacker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn total_width(&self) -> u32 {
        self.total_width
    }

    #[inline]
    pub fn total_height(&self) -> u32 {
        self.total_height
    }

    /// Forgets every previous placement.
    pub fn reset(&mut self) {
        self.shelves.clear();
        self.total_width = 0;
        self.total_height = 0;
    }

    /// Places every rect of the batch, writing `x`/`y` in place.
    ///
    /// The slice is reordered: widest first, equal widths keep their order.
    pub fn pack<T>(&mut self, rects: &mut [PackRect<T>]) {
        rects.sort_by(|a, b| b.width.cmp(&a.width));

        for rect in rects.iter_mut() {
            self.place(rect);
        }

        log::debug!(
            "packer: placed {} rects, canvas is now {}x{} ({} shelves)",
            rects.len(),
            self.total_width,
            self.total_height,
            self.shelves.len()
        );
    }

    fn place<T>(&mut self, rect: &mut PackRect<T>) {
        // Extending the canvas to the right always fits.
        self.shelves.push(Shelf {
            x: self.total_width,
            y: 0,
            width: rect.width,
        });
        let candidate = self.shelves.len() - 1;

        let fallback = self.choice(candidate, rect.width, rect.height);
        let (_, index, dx, dy) = self
            .shelves
            .iter()
            .enumerate()
            .filter(|(_, shelf)| shelf.width >= rect.width)
            .map(|(i, _)| self.choice(i, rect.width, rect.height))
            .min_by_key(|&(cost, i, _, _)| (cost, i))
            .unwrap_or(fallback);

        self.total_width += dx;
        self.total_height += dy;

        let Shelf { x, y, .. } = self.shelves[index];
        rect.x = x;
        rect.y = y;

        if index != candidate {
            self.shelves.pop();
        }

        let shelf = &mut self.shelves[index];
        shelf.x += rect.width;
        shelf.width -= rect.width;
        if shelf.width == 0 {
            self.shelves.remove(index);
        }

        if rect.width > 0 {
            self.shelves.push(Shelf {
                x: rect.x,
                y: rect.top(),
                width: rect.width,
            });
        }
    }

    /// `(cost, index, dx, dy)` of placing a `width`x`height` rect on shelf
    /// `index`; cost is the canvas area the placement would add.
    fn choice(&self, index: usize, width: u32, height: u32) -> (u64, usize, u32, u32) {
        let shelf = self.shelves[index];
        let dx = (shelf.x + width).saturating_sub(self.total_width);
        let dy = (shelf.y + height).saturating_sub(self.total_height);

        let (dx64, dy64) = (u64::from(dx), u64::from(dy));
        let cost = dx64 * u64::from(self.total_height)
            + dy64 * u64::from(self.total_width)
            + dx64 * dy64;

        (cost, index, dx, dy)
    }
}
