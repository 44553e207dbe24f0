//! Price-level record: a FIFO queue of orders at a single price.
//!
//! The queue is an intrusive doubly-linked list threaded through the
//! order records, so append and removal touch only the affected nodes.
//! FIFO order equals arrival order (price-time priority); `head` is the
//! next order to be matched.

use crate::order::OrderNode;
use crate::pool::{FreeLink, Pool, PoolIndex, NULL_INDEX};
use crate::types::{Price, Qty};

/// One non-empty price level.
///
/// `size` counts the live orders in the queue and `total_volume` sums
/// their remaining quantities; `size == 0` iff `head == tail == null`.
#[derive(Clone, Copy, Debug)]
pub struct LevelNode {
    pub price: Price,
    /// Number of live orders in the queue.
    pub size: u32,
    /// Sum of remaining quantities across the queue.
    pub total_volume: u64,
    /// Oldest order (first to match).
    pub head: PoolIndex,
    /// Newest order (last to match).
    pub tail: PoolIndex,
}

impl LevelNode {
    #[inline]
    pub fn new(price: Price) -> Self {
        Self {
            price,
            size: 0,
            total_volume: 0,
            head: NULL_INDEX,
            tail: NULL_INDEX,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Append an order at the tail and point it back at this level.
    ///
    /// `self_idx` is this level's own pool handle, recorded in the order
    /// so cancel can find its way back without a price lookup.
    ///
    /// # Complexity
    /// O(1)
    pub fn push_back(
        &mut self,
        self_idx: PoolIndex,
        orders: &mut Pool<OrderNode>,
        order_idx: PoolIndex,
    ) {
        let qty = orders.get(order_idx).qty;

        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            self.head = order_idx;
            self.tail = order_idx;
            let order = orders.get_mut(order_idx);
            order.prev = NULL_INDEX;
            order.next = NULL_INDEX;
            order.level = self_idx;
        } else {
            orders.get_mut(self.tail).next = order_idx;
            let order = orders.get_mut(order_idx);
            order.prev = self.tail;
            order.next = NULL_INDEX;
            order.level = self_idx;
            self.tail = order_idx;
        }

        self.size += 1;
        self.total_volume += qty as u64;
    }

    /// Unlink an order from anywhere in the queue.
    ///
    /// Handles all positions: only node, head, tail, middle. The order
    /// record itself is NOT released; the caller owns that step.
    ///
    /// Returns `true` when the level is empty afterwards.
    ///
    /// # Complexity
    /// O(1)
    pub fn remove(&mut self, orders: &mut Pool<OrderNode>, order_idx: PoolIndex) -> bool {
        let node = *orders.get(order_idx);
        let prev_idx = node.prev;
        let next_idx = node.next;

        if prev_idx == NULL_INDEX && next_idx == NULL_INDEX {
            // Only node in the level
            debug_assert!(self.head == order_idx && self.tail == order_idx);
            self.head = NULL_INDEX;
            self.tail = NULL_INDEX;
        } else if prev_idx == NULL_INDEX {
            // Head
            debug_assert!(self.head == order_idx);
            self.head = next_idx;
            orders.get_mut(next_idx).prev = NULL_INDEX;
        } else if next_idx == NULL_INDEX {
            // Tail
            debug_assert!(self.tail == order_idx);
            self.tail = prev_idx;
            orders.get_mut(prev_idx).next = NULL_INDEX;
        } else {
            // Middle: stitch neighbors together
            orders.get_mut(prev_idx).next = next_idx;
            orders.get_mut(next_idx).prev = prev_idx;
        }

        self.size -= 1;
        self.total_volume -= node.qty as u64;

        let order = orders.get_mut(order_idx);
        order.prev = NULL_INDEX;
        order.next = NULL_INDEX;
        order.level = NULL_INDEX;

        self.size == 0
    }

    /// Account for a partial fill applied directly to an order's `qty`.
    #[inline]
    pub fn reduce_volume(&mut self, qty: Qty) {
        debug_assert!(self.total_volume >= qty as u64);
        self.total_volume -= qty as u64;
    }
}

impl Default for LevelNode {
    fn default() -> Self {
        Self::new(0)
    }
}

// The free list borrows `head` while the record is not live.
impl FreeLink for LevelNode {
    fn free_next(&self) -> PoolIndex {
        self.head
    }
    fn set_free_next(&mut self, next: PoolIndex) {
        self.head = next;
    }
}
