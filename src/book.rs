//! The order book and matching engine.
//!
//! Implements the cross/rest algorithm:
//! 1. CROSSING: drain the opposing side while the taker is profitable
//! 2. RESTING: post any limit-order remainder on the taker's own side
//!
//! Market-order remainders are discarded (fill-and-kill). All state is
//! exclusively owned by the book instance; every operation is synchronous
//! and single-threaded.

use rustc_hash::FxHashMap;

use crate::ladder::Ladder;
use crate::level::LevelNode;
use crate::order::OrderNode;
use crate::pool::{Pool, PoolExhausted, PoolIndex, NULL_INDEX};
use crate::types::{OrderId, Price, Qty, Side, Trade};

/// Synchronous trade observer, invoked once per fill in match order.
/// Must not call back into the book.
pub type TradeHook = Box<dyn FnMut(&Trade)>;

/// Single-instrument limit order book.
///
/// Orders and price levels live in fixed-capacity pools; the two ladders
/// hold non-owning handles into them. Releasing a record back to its pool
/// is the single authoritative destruction point.
pub struct OrderBook {
    orders: Pool<OrderNode>,
    levels: Pool<LevelNode>,
    bids: Ladder,
    asks: Ladder,
    /// OrderId -> order handle, for O(1) cancel.
    order_index: FxHashMap<OrderId, PoolIndex>,
    trade_hook: Option<TradeHook>,
    max_price: Price,
}

impl OrderBook {
    /// Create a book accepting up to `max_orders` concurrently live
    /// orders on the tick grid `[0, max_price)`.
    pub fn new(max_orders: usize, max_price: usize) -> Self {
        assert!(max_price > 0, "price grid must be non-empty");
        Self {
            orders: Pool::new(max_orders),
            // Resting bids and asks never overlap in price, so both
            // sides together hold at most one level per tick.
            levels: Pool::new(max_price),
            bids: Ladder::new(Side::Buy, max_price),
            asks: Ladder::new(Side::Sell, max_price),
            order_index: FxHashMap::with_capacity_and_hasher(max_orders, Default::default()),
            trade_hook: None,
            max_price: max_price as Price,
        }
    }

    /// Install (or replace) the trade observer.
    pub fn set_trade_hook(&mut self, hook: impl FnMut(&Trade) + 'static) {
        self.trade_hook = Some(Box::new(hook));
    }

    /// Submit a limit order: cross against the opposing side, then rest
    /// any remainder at `price` on the order's own side.
    ///
    /// `id` must not already be live and `price` must sit on the grid;
    /// both are the caller's contract, checked only in debug builds.
    pub fn add_limit(
        &mut self,
        id: OrderId,
        price: Price,
        qty: Qty,
        side: Side,
    ) -> Result<(), PoolExhausted> {
        debug_assert!(
            price >= 0 && price < self.max_price,
            "limit price {} outside the tick grid",
            price
        );
        debug_assert!(
            !self.order_index.contains_key(&id),
            "order id {} is already live",
            id
        );
        if qty == 0 {
            return Ok(());
        }
        let remaining = self.execute(id, price, qty, side);
        if remaining > 0 {
            self.post(id, price, remaining, side)?;
        }
        Ok(())
    }

    /// Submit a market order. Fill-and-kill: whatever the opposing side
    /// cannot supply is discarded, never posted.
    pub fn add_market(&mut self, id: OrderId, qty: Qty, side: Side) {
        let lim = match side {
            Side::Buy => self.max_price,
            Side::Sell => 0,
        };
        self.execute(id, lim, qty, side);
    }

    /// Cancel a resting order. Unknown ids are a silent no-op; real-world
    /// feeds routinely cancel orders that were already filled.
    pub fn cancel(&mut self, id: OrderId) {
        let Some(&order_idx) = self.order_index.get(&id) else {
            return;
        };
        let node = *self.orders.get(order_idx);

        let now_empty = self
            .levels
            .get_mut(node.level)
            .remove(&mut self.orders, order_idx);

        if now_empty {
            self.levels.release(node.level);
            let ladder = self.ladder_mut(node.side);
            ladder.clear_slot(node.price);
            // Only a cancel at the cached best forces a rescan.
            if node.price == ladder.best() {
                ladder.refresh_best();
            }
        }

        self.order_index.remove(&id);
        self.orders.release(order_idx);
    }

    /// Drain the opposing side while the taker remains profitable against
    /// `lim`. Returns the unmatched remainder.
    fn execute(&mut self, taker_id: OrderId, lim: Price, mut qty: Qty, side: Side) -> Qty {
        let max_price = self.max_price;
        while qty > 0 {
            let opp = self.ladder_mut(side.opposite());
            let best = opp.best();

            // Opposing side empty, or the best price is no longer
            // profitable for the taker.
            match side {
                Side::Buy => {
                    if best >= max_price || best > lim {
                        break;
                    }
                }
                Side::Sell => {
                    if best == 0 || best < lim {
                        break;
                    }
                }
            }

            let level_idx = opp.level_at(best);
            if level_idx == NULL_INDEX {
                // Set bit over a vacated slot: drop it and rescan.
                opp.drop_stale_bit(best);
                opp.refresh_best();
                continue;
            }

            // Drain the FIFO head until the level or the taker is spent.
            while qty > 0 {
                let maker_idx = {
                    let level = self.levels.get(level_idx);
                    if level.size == 0 {
                        break;
                    }
                    level.head
                };
                let maker = *self.orders.get(maker_idx);
                let trade_qty = qty.min(maker.qty);

                let trade = Trade {
                    taker_id,
                    maker_id: maker.id,
                    price: best,
                    qty: trade_qty,
                };
                if let Some(hook) = self.trade_hook.as_mut() {
                    hook(&trade);
                }

                if maker.qty > qty {
                    // Maker partially filled; the taker is spent.
                    self.orders.get_mut(maker_idx).fill(qty);
                    self.levels.get_mut(level_idx).reduce_volume(qty);
                    qty = 0;
                } else {
                    // Maker fully filled: unlink, forget, release.
                    qty -= maker.qty;
                    self.levels
                        .get_mut(level_idx)
                        .remove(&mut self.orders, maker_idx);
                    self.order_index.remove(&maker.id);
                    self.orders.release(maker_idx);
                }
            }

            if self.levels.get(level_idx).is_empty() {
                self.levels.release(level_idx);
                let opp = self.ladder_mut(side.opposite());
                opp.clear_slot(best);
                opp.refresh_best();
            }
        }
        qty
    }

    #[inline]
    fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline]
    fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Rest the unmatched remainder on the taker's own side.
    fn post(&mut self, id: OrderId, price: Price, qty: Qty, side: Side) -> Result<(), PoolExhausted> {
        let order_idx = self.orders.acquire(OrderNode::new(id, price, qty, side))?;

        let ladder = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let mut level_idx = ladder.level_at(price);
        if level_idx == NULL_INDEX {
            level_idx = match self.levels.acquire(LevelNode::new(price)) {
                Ok(idx) => idx,
                Err(e) => {
                    self.orders.release(order_idx);
                    return Err(e);
                }
            };
            ladder.install(price, level_idx);
        }

        self.levels
            .get_mut(level_idx)
            .push_back(level_idx, &mut self.orders, order_idx);
        self.order_index.insert(id, order_idx);
        Ok(())
    }

    // ========================================================================
    // Inspectors
    // ========================================================================

    /// Best bid price; 0 when no bid rests.
    #[inline]
    pub fn best_bid(&self) -> Price {
        self.bids.best()
    }

    /// Best ask price; `max_price` when no ask rests.
    #[inline]
    pub fn best_ask(&self) -> Price {
        self.asks.best()
    }

    /// Upper bound of the tick grid.
    #[inline]
    pub fn max_price(&self) -> Price {
        self.max_price
    }

    /// Best-ask minus best-bid, when both sides hold liquidity.
    pub fn spread(&self) -> Option<Price> {
        let bid = self.bids.best();
        let ask = self.asks.best();
        if bid > 0 && ask < self.max_price {
            Some(ask - bid)
        } else {
            None
        }
    }

    /// Number of live resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    #[inline]
    pub fn contains_order(&self, id: OrderId) -> bool {
        self.order_index.contains_key(&id)
    }

    /// Remaining quantity of a live order.
    pub fn order_qty(&self, id: OrderId) -> Option<Qty> {
        self.order_index.get(&id).map(|&idx| self.orders.get(idx).qty)
    }

    /// `(total volume, order count)` resting at `price`.
    pub fn depth_at(&self, side: Side, price: Price) -> (u64, u32) {
        let idx = self.ladder(side).level_at(price);
        if idx == NULL_INDEX {
            return (0, 0);
        }
        let level = self.levels.get(idx);
        (level.total_volume, level.size)
    }

    /// Ids and remaining quantities at `price`, head (oldest) first.
    pub fn level_orders(&self, side: Side, price: Price) -> Vec<(OrderId, Qty)> {
        let idx = self.ladder(side).level_at(price);
        let mut out = Vec::new();
        if idx == NULL_INDEX {
            return out;
        }
        let mut cur = self.levels.get(idx).head;
        while cur != NULL_INDEX {
            let order = self.orders.get(cur);
            out.push((order.id, order.qty));
            cur = order.next;
        }
        out
    }

    // ========================================================================
    // Lifecycle helpers
    // ========================================================================

    /// Return the book to its freshly constructed state. Pool slots are
    /// re-threaded; every outstanding handle is invalidated.
    pub fn clear(&mut self) {
        self.orders.reset();
        self.levels.reset();
        self.bids.clear();
        self.asks.clear();
        self.order_index.clear();
    }

    /// Pre-fault pool pages before a measured run.
    pub fn warm_up(&self) {
        self.orders.warm_up();
        self.levels.warm_up();
    }

    /// Digest of top-of-book and live counts, for determinism checks.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.bids.best().hash(&mut hasher);
        self.asks.best().hash(&mut hasher);
        self.order_index.len().hash(&mut hasher);
        self.orders.live().hash(&mut hasher);
        hasher.finish()
    }

    /// Walk every structural invariant and panic on the first violation.
    ///
    /// Diagnostic aid for randomized tests; O(max_price) plus a full FIFO
    /// walk, so keep it off the hot path.
    pub fn validate(&self) {
        let mut seen_orders = 0u32;
        for (side, ladder) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for price in 0..self.max_price {
                let idx = ladder.level_at(price);
                assert_eq!(
                    ladder.is_marked(price),
                    idx != NULL_INDEX,
                    "bitmap and slot disagree at {:?} {}",
                    side,
                    price
                );
                if idx == NULL_INDEX {
                    continue;
                }
                let level = self.levels.get(idx);
                assert!(level.size > 0, "empty level resting at {:?} {}", side, price);
                assert_eq!(level.price, price);

                let mut cur = level.head;
                let mut prev = NULL_INDEX;
                let mut count = 0u32;
                let mut volume = 0u64;
                while cur != NULL_INDEX {
                    let order = self.orders.get(cur);
                    assert_eq!(order.prev, prev);
                    assert_eq!(order.price, price);
                    assert_eq!(order.side, side);
                    assert_eq!(order.level, idx);
                    assert!(!order.is_filled(), "resting order {} with zero qty", order.id);
                    assert_eq!(
                        self.order_index.get(&order.id),
                        Some(&cur),
                        "order {} missing from the identity index",
                        order.id
                    );
                    volume += order.qty as u64;
                    count += 1;
                    prev = cur;
                    cur = order.next;
                }
                assert_eq!(prev, level.tail);
                assert_eq!(count, level.size);
                assert_eq!(volume, level.total_volume);
                seen_orders += count;
            }
            assert_eq!(
                ladder.best(),
                ladder.scan_best(),
                "best cache diverged on {:?}",
                side
            );
        }
        assert_eq!(seen_orders as usize, self.order_index.len());
        assert_eq!(seen_orders, self.orders.live());
    }
}
