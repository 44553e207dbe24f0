//! One side of the book: dense level index, summary bitmap, cached best.
//!
//! Prices are bounded small integers on a tick grid, so a dense array
//! indexed directly by price beats an ordered map: exact lookups are one
//! array access, and best-price discovery is a bit scan over the summary
//! bitmap instead of a tree walk.

use crate::bitmap::PriceBitmap;
use crate::pool::{PoolIndex, NULL_INDEX};
use crate::types::{Price, Side};

/// Dense per-side price ladder.
///
/// `slots[p]` holds the pool handle of the level resting at price `p`, or
/// `NULL_INDEX`; a set bitmap bit mirrors an occupied slot. `best` caches
/// the side's best price: 0 means "no bid" on the buy side, `max_price`
/// means "no ask" on the sell side.
pub struct Ladder {
    side: Side,
    slots: Box<[PoolIndex]>,
    bits: PriceBitmap,
    best: Price,
    max_price: Price,
}

impl Ladder {
    pub fn new(side: Side, max_price: usize) -> Self {
        let best = match side {
            Side::Buy => 0,
            Side::Sell => max_price as Price,
        };
        Self {
            side,
            slots: vec![NULL_INDEX; max_price].into_boxed_slice(),
            bits: PriceBitmap::new(max_price),
            best,
            max_price: max_price as Price,
        }
    }

    /// Cached best price, in this side's sentinel convention.
    #[inline]
    pub fn best(&self) -> Price {
        self.best
    }

    /// Handle of the level at `price`, or `NULL_INDEX`.
    #[inline]
    pub fn level_at(&self, price: Price) -> PoolIndex {
        self.slots[price as usize]
    }

    /// Install a freshly acquired level and pull the best cache toward it.
    #[inline]
    pub fn install(&mut self, price: Price, level: PoolIndex) {
        debug_assert!(self.slots[price as usize] == NULL_INDEX);
        self.slots[price as usize] = level;
        self.bits.set(price as usize);
        let better = match self.side {
            Side::Buy => price > self.best,
            Side::Sell => price < self.best,
        };
        if better {
            self.best = price;
        }
    }

    /// Vacate the slot and bitmap bit at `price`.
    ///
    /// Leaves the best cache alone; the caller refreshes when `price`
    /// was the cached best.
    #[inline]
    pub fn clear_slot(&mut self, price: Price) {
        self.slots[price as usize] = NULL_INDEX;
        self.bits.unset(price as usize);
    }

    /// Drop a bitmap bit that had no backing slot.
    #[inline]
    pub fn drop_stale_bit(&mut self, price: Price) {
        self.bits.unset(price as usize);
    }

    /// Re-derive the best cache after the level at the cached best went
    /// away. Scans away from the old best; falls back to the sentinel.
    pub fn refresh_best(&mut self) {
        match self.side {
            Side::Buy => {
                self.best = if self.best > 0 {
                    self.bits
                        .scan_desc(self.best as usize - 1)
                        .map_or(0, |p| p as Price)
                } else {
                    0
                };
            }
            Side::Sell => {
                self.best = self
                    .bits
                    .scan_asc(self.best as usize + 1)
                    .map_or(self.max_price, |p| p as Price);
            }
        }
    }

    /// Best price computed from a full bitmap scan, ignoring the cache.
    /// Diagnostic aid for invariant checks.
    pub fn scan_best(&self) -> Price {
        match self.side {
            Side::Buy => self
                .bits
                .scan_desc(self.max_price as usize - 1)
                .map_or(0, |p| p as Price),
            Side::Sell => self
                .bits
                .scan_asc(0)
                .map_or(self.max_price, |p| p as Price),
        }
    }

    /// Whether the bitmap marks `price` as occupied.
    #[inline]
    pub fn is_marked(&self, price: Price) -> bool {
        self.bits.is_set(price as usize)
    }

    /// Vacate every slot and reset the best cache to the sentinel.
    pub fn clear(&mut self) {
        self.slots.fill(NULL_INDEX);
        self.bits.clear();
        self.best = match self.side {
            Side::Buy => 0,
            Side::Sell => self.max_price,
        };
    }
}
