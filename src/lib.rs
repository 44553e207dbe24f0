//! # tick-lob
//!
//! A single-instrument limit order book matching engine over a dense
//! integer tick grid.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **O(1) Operations**: insert, cancel, and per-fill matching all run
//!   in constant time
//! - **Bit-Scan Best Price**: a summary bitmap per side makes best-price
//!   discovery a hardware bit-scan, not a tree walk
//! - **Pool Allocation**: order and level records come from fixed
//!   pre-allocated pools; the hot path never touches the heap
//!
//! ## Architecture
//!
//! ```text
//! add_limit/add_market/cancel
//!         |
//!     [OrderBook] -- order_index: id -> order handle
//!       /      \
//!   [Ladder]  [Ladder]      dense price -> level slots + summary bitmap
//!      |          |              + cached best bid / best ask
//!   [LevelNode FIFO of OrderNode]   intrusive doubly-linked queues
//!      |          |
//!   [Pool<LevelNode>] [Pool<OrderNode>]
//! ```
//!
//! Trades are observed through an optional synchronous hook installed
//! with [`OrderBook::set_trade_hook`].

pub mod bitmap;
pub mod book;
pub mod ladder;
pub mod level;
pub mod order;
pub mod pool;
pub mod types;

// Re-exports for convenience
pub use bitmap::PriceBitmap;
pub use book::{OrderBook, TradeHook};
pub use ladder::Ladder;
pub use level::LevelNode;
pub use order::OrderNode;
pub use pool::{Pool, PoolExhausted, PoolIndex, NULL_INDEX};
pub use types::{OrderId, Price, Qty, Side, Trade};
