//! End-to-end matching scenarios.
//!
//! Each test drives the public surface only and checks the resulting
//! book state through the inspector methods, with trades captured
//! through the observation hook.

use std::cell::RefCell;
use std::rc::Rc;

use tick_lob::{OrderBook, Side, Trade};

const MAX_PRICE: usize = 20_000;

fn book_with_log() -> (OrderBook, Rc<RefCell<Vec<Trade>>>) {
    let mut book = OrderBook::new(100_000, MAX_PRICE);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    book.set_trade_hook(move |t| sink.borrow_mut().push(*t));
    (book, log)
}

fn trade(taker_id: u64, maker_id: u64, price: i32, qty: u32) -> Trade {
    Trade { taker_id, maker_id, price, qty }
}

#[test]
fn full_symmetric_match() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 100, Side::Sell).unwrap();
    book.add_limit(2, 100, 100, Side::Buy).unwrap();

    assert_eq!(*log.borrow(), vec![trade(2, 1, 100, 100)]);
    assert!(!book.contains_order(1));
    assert!(!book.contains_order(2));
    assert_eq!(book.order_count(), 0);
    assert_eq!(book.best_bid(), 0);
    assert_eq!(book.best_ask(), MAX_PRICE as i32);
    book.validate();
}

#[test]
fn taker_larger_than_maker() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 50, Side::Sell).unwrap();
    book.add_limit(2, 100, 100, Side::Buy).unwrap();

    assert_eq!(*log.borrow(), vec![trade(2, 1, 100, 50)]);
    assert!(!book.contains_order(1));
    assert_eq!(book.order_qty(2), Some(50));
    assert_eq!(book.best_bid(), 100);
    assert_eq!(book.best_ask(), MAX_PRICE as i32);
    book.validate();
}

#[test]
fn price_time_priority() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_limit(2, 100, 10, Side::Sell).unwrap();
    book.add_limit(3, 100, 15, Side::Buy).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![trade(3, 1, 100, 10), trade(3, 2, 100, 5)]
    );
    assert!(!book.contains_order(1));
    assert_eq!(book.order_qty(2), Some(5));
    assert!(!book.contains_order(3));
    book.validate();
}

#[test]
fn market_sweep_across_levels() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_limit(2, 101, 10, Side::Sell).unwrap();
    book.add_limit(3, 102, 10, Side::Sell).unwrap();
    book.add_market(4, 25, Side::Buy);

    assert_eq!(
        *log.borrow(),
        vec![
            trade(4, 1, 100, 10),
            trade(4, 2, 101, 10),
            trade(4, 3, 102, 5),
        ]
    );
    assert_eq!(book.order_qty(3), Some(5));
    assert_eq!(book.best_ask(), 102);
    book.validate();
}

#[test]
fn market_exceeding_liquidity_is_killed() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_market(2, 50, Side::Buy);

    assert_eq!(*log.borrow(), vec![trade(2, 1, 100, 10)]);
    assert!(!book.contains_order(1));
    assert!(!book.contains_order(2));
    assert_eq!(book.order_count(), 0);
    assert_eq!(book.best_ask(), MAX_PRICE as i32);
    book.validate();
}

#[test]
fn cancel_middle_of_fifo() {
    let (mut book, _log) = book_with_log();

    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_limit(2, 100, 10, Side::Sell).unwrap();
    book.add_limit(3, 100, 10, Side::Sell).unwrap();
    book.cancel(2);

    assert!(!book.contains_order(2));
    // Head is 1, tail is 3, and they are stitched together.
    assert_eq!(book.level_orders(Side::Sell, 100), vec![(1, 10), (3, 10)]);
    assert_eq!(book.depth_at(Side::Sell, 100), (20, 2));
    book.validate();
}

#[test]
fn cancel_is_idempotent() {
    let (mut book, log) = book_with_log();

    // Never-seen id
    book.cancel(77);

    // Filled id
    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_limit(2, 100, 10, Side::Buy).unwrap();
    book.cancel(1);
    book.cancel(2);

    // Already-canceled id
    book.add_limit(3, 100, 10, Side::Sell).unwrap();
    book.cancel(3);
    book.cancel(3);

    assert_eq!(log.borrow().len(), 1);
    assert_eq!(book.order_count(), 0);
    book.validate();
}

#[test]
fn post_then_cancel_restores_state() {
    let (mut book, _log) = book_with_log();
    let baseline = book.state_hash();

    book.add_limit(1, 100, 10, Side::Buy).unwrap();
    book.add_limit(2, 150, 20, Side::Sell).unwrap();
    book.add_limit(3, 100, 5, Side::Buy).unwrap();
    book.cancel(3);
    book.cancel(1);
    book.cancel(2);

    assert_eq!(book.state_hash(), baseline);
    assert_eq!(book.order_count(), 0);
    assert_eq!(book.best_bid(), 0);
    assert_eq!(book.best_ask(), MAX_PRICE as i32);
    assert_eq!(book.depth_at(Side::Buy, 100), (0, 0));
    assert_eq!(book.depth_at(Side::Sell, 150), (0, 0));
    book.validate();
}

#[test]
fn taker_never_matches_beyond_its_limit() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 100, 10, Side::Sell).unwrap();
    book.add_limit(2, 103, 10, Side::Sell).unwrap();

    // Buy limited to 101: consumes the 100 level, never the 103 one.
    book.add_limit(3, 101, 30, Side::Buy).unwrap();

    for t in log.borrow().iter() {
        assert!(t.price <= 101);
    }
    assert_eq!(book.order_qty(2), Some(10));
    assert_eq!(book.order_qty(3), Some(20));
    assert_eq!(book.best_bid(), 101);
    assert_eq!(book.best_ask(), 103);
    book.validate();
}

#[test]
fn trade_reports_maker_resting_price() {
    let (mut book, log) = book_with_log();

    book.add_limit(1, 95, 10, Side::Buy).unwrap();
    // Aggressive sell at 90 executes at the bid's resting price.
    book.add_limit(2, 90, 10, Side::Sell).unwrap();

    assert_eq!(*log.borrow(), vec![trade(2, 1, 95, 10)]);
    assert_eq!(book.order_count(), 0);
    book.validate();
}
