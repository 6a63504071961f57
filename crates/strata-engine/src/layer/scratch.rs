/// Per-layer CPU staging buffer for vertex bytes.
///
/// `used` is reset at the start of every tick; the allocation is kept and
/// only grows, to `max(2 * capacity, used + appended)` on overflow.
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer {
    bytes: Vec<u8>,
    used: usize,
}

impl ScratchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            used: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes written since the last [`reset`](Self::reset).
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.used]
    }

    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Appends raw bytes, growing the buffer if needed.
    pub fn push_bytes(&mut self, data: &[u8]) {
        let end = self.used + data.len();
        if end > self.bytes.len() {
            let grown = (2 * self.bytes.len()).max(end);
            log::trace!("scratch buffer: {} -> {grown} bytes", self.bytes.len());
            self.bytes.resize(grown, 0);
        }
        self.bytes[self.used..end].copy_from_slice(data);
        self.used = end;
    }

    #[inline]
    pub fn push_f32(&mut self, value: f32) {
        self.push_bytes(&value.to_ne_bytes());
    }

    #[inline]
    pub fn push_u32(&mut self, value: u32) {
        self.push_bytes(&value.to_ne_bytes());
    }
}
