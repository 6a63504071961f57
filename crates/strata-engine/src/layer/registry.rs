use crate::error::Result;
use crate::memory::{Region, RegionStorage};

use super::ctx::{Layer, LayerId, LayerIds, LayerOptions};
use super::scratch::ScratchBuffer;

pub(crate) struct LayerSlot {
    pub(crate) id: LayerId,
    pub(crate) layer: Box<dyn Layer>,
    pub(crate) options: LayerOptions,
    /// Index of the layer's block in the region.
    pub(crate) block: usize,
    pub(crate) scratch: ScratchBuffer,
    /// Sticky until the next upload.
    pub(crate) redraw: bool,
}

/// Registered layers in generation order, each bound to one region block.
///
/// Slots are kept sorted by id, which is also registration order.
#[derive(Default)]
pub struct LayerRegistry {
    pub(crate) slots: Vec<LayerSlot>,
    pub(crate) ids: LayerIds,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids in generation order.
    pub fn ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.slots.iter().map(|s| s.id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.position(id).is_some()
    }

    pub fn options(&self, id: LayerId) -> Option<LayerOptions> {
        self.slot(id).map(|s| s.options)
    }

    /// Region block index currently bound to `id`.
    pub fn block_index(&self, id: LayerId) -> Option<usize> {
        self.slot(id).map(|s| s.block)
    }

    /// Marks a layer for upload on the next tick even if it produces nothing.
    pub fn request_redraw(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(i) => {
                self.slots[i].redraw = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn next_id(&mut self) -> LayerId {
        self.ids.next()
    }

    /// Binds `layer` to a fresh block of `block_size` bytes.
    ///
    /// `id` must come from [`next_id`](Self::next_id) so slots stay sorted.
    pub(crate) fn insert<S: RegionStorage>(
        &mut self,
        region: &mut Region<S>,
        id: LayerId,
        layer: Box<dyn Layer>,
        options: LayerOptions,
        block_size: u64,
        scratch_capacity: usize,
    ) -> Result<()> {
        debug_assert!(self.slots.last().is_none_or(|s| s.id < id));

        let block = region.add_block(block_size)?;
        self.slots.push(LayerSlot {
            id,
            layer,
            options,
            block,
            scratch: ScratchBuffer::with_capacity(scratch_capacity),
            redraw: true,
        });
        log::debug!("layer {}: registered on block {block}", id.0);
        Ok(())
    }

    /// Releases the layer's block and compacts the region.
    ///
    /// Returns `false` if `id` is not registered.
    pub(crate) fn remove<S: RegionStorage>(&mut self, region: &mut Region<S>, id: LayerId) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            return Ok(false);
        };

        let block = self.slots[pos].block;
        region.remove_block(block)?;
        for slot in &mut self.slots {
            if slot.block > block {
                slot.block -= 1;
            }
        }
        self.slots.remove(pos);

        log::debug!("layer {}: removed, block {block} released", id.0);
        Ok(true)
    }

    pub(crate) fn position(&self, id: LayerId) -> Option<usize> {
        self.slots.binary_search_by_key(&id, |s| s.id).ok()
    }

    fn slot(&self, id: LayerId) -> Option<&LayerSlot> {
        self.position(id).map(|i| &self.slots[i])
    }
}
