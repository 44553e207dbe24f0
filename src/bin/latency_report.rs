//! Throughput and tick-to-trade latency report.
//!
//! Drives the book with a pre-generated action stream (70% limit,
//! 25% cancel, 5% market) so RNG and allocation stay off the measured
//! path. With `--latency`, each trade's latency is taken from the moment
//! its taker was submitted, recorded through the trade hook into an HDR
//! histogram.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use hdrhistogram::Histogram;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};

use tick_lob::{OrderBook, OrderId, Price, Qty, Side};

const ORDER_COUNT: usize = 2_000_000;
const MAX_PRICE: usize = 20_000;
const ITERATIONS: usize = 10;
const SEED: u64 = 42;

#[derive(Clone, Copy, Debug)]
enum Action {
    Limit { id: OrderId, price: Price, qty: Qty, side: Side },
    Market { id: OrderId, qty: Qty, side: Side },
    Cancel { id: OrderId },
}

/// Pre-generate the action stream: normal prices around the midpoint,
/// log-normal quantities skewed right, uniform sides, cancels aimed at
/// random still-live ids.
fn pregenerate(count: usize) -> Vec<Action> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let price_dist = Normal::new(10_000.0, 30.0).unwrap();
    let qty_dist = LogNormal::new(3.0, 0.5).unwrap();

    let mut actions = Vec::with_capacity(count);
    let mut active_ids: Vec<OrderId> = Vec::new();
    let mut next_id: OrderId = 1;

    for _ in 0..count {
        let roll = rng.gen_range(0..100u32);
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let qty = (qty_dist.sample(&mut rng) as f64).max(1.0) as Qty;

        if roll < 70 || active_ids.is_empty() {
            let price = (price_dist.sample(&mut rng) as Price).clamp(1, MAX_PRICE as Price - 1);
            actions.push(Action::Limit { id: next_id, price, qty, side });
            active_ids.push(next_id);
            next_id += 1;
        } else if roll < 95 {
            let idx = rng.gen_range(0..active_ids.len());
            let id = active_ids.swap_remove(idx);
            actions.push(Action::Cancel { id });
        } else {
            actions.push(Action::Market { id: next_id, qty, side });
            next_id += 1;
        }
    }

    actions
}

/// Pin to the last available core; it is the least likely to carry OS
/// interrupt load.
fn pin_thread() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(last) = core_ids.last() {
            if core_affinity::set_for_current(*last) {
                println!("Pinned to core {}", last.id);
            } else {
                eprintln!("Warning: failed to pin to core {}", last.id);
            }
        }
    }
}

fn apply(book: &mut OrderBook, action: &Action) {
    match *action {
        Action::Limit { id, price, qty, side } => {
            book.add_limit(id, price, qty, side)
                .expect("order pool sized to the action stream");
        }
        Action::Market { id, qty, side } => book.add_market(id, qty, side),
        Action::Cancel { id } => book.cancel(id),
    }
}

struct IterationStats {
    throughput: f64,
    latency: Option<Histogram<u64>>,
}

fn run_iteration(actions: &[Action], measure_latency: bool) -> IterationStats {
    let mut book = OrderBook::new(ORDER_COUNT + 1_000, MAX_PRICE);
    book.warm_up();

    // Tick timestamp shared with the trade hook; every fill inherits the
    // submit time of its taker.
    let tick = Rc::new(Cell::new(Instant::now()));
    let histogram = Rc::new(RefCell::new(
        Histogram::<u64>::new_with_bounds(1, 1_000_000_000, 3).unwrap(),
    ));

    if measure_latency {
        let tick = Rc::clone(&tick);
        let histogram = Rc::clone(&histogram);
        book.set_trade_hook(move |_trade| {
            let nanos = tick.get().elapsed().as_nanos() as u64;
            let _ = histogram.borrow_mut().record(nanos.max(1));
        });
    }

    let start = Instant::now();
    for action in actions {
        if measure_latency {
            tick.set(Instant::now());
        }
        apply(&mut book, action);
    }
    let elapsed = start.elapsed();

    IterationStats {
        throughput: actions.len() as f64 / elapsed.as_secs_f64(),
        latency: measure_latency.then(|| histogram.borrow().clone()),
    }
}

fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn main() {
    let measure_latency = std::env::args().any(|a| a == "--latency" || a == "-l");

    pin_thread();

    println!("Pre-generating {} actions...", format_count(ORDER_COUNT as u64));
    let actions = pregenerate(ORDER_COUNT);

    // Warm-up book: churn the pools and the branch predictor before the
    // measured runs.
    {
        let mut warmup = OrderBook::new(100_000, MAX_PRICE);
        warmup.warm_up();
        for i in 0..1_000_000u64 {
            warmup
                .add_limit(i, 10_000 + (i % 10) as Price, 1, Side::Buy)
                .expect("warm-up book holds one live order per cycle");
            warmup.cancel(i);
        }
    }

    println!("Running benchmark...");
    if measure_latency {
        println!("Latency tracking enabled");
    }

    let mut throughputs = Vec::with_capacity(ITERATIONS);
    let mut combined = Histogram::<u64>::new_with_bounds(1, 1_000_000_000, 3).unwrap();

    for iteration in 0..ITERATIONS {
        let stats = run_iteration(&actions, measure_latency);
        throughputs.push(stats.throughput);

        print!(
            "Iteration {:2} | Tput: {:>10} ops/s",
            iteration,
            format_count(stats.throughput as u64)
        );
        if let Some(hist) = stats.latency {
            if hist.is_empty() {
                print!(" | [no trades occurred]");
            } else {
                print!(
                    " | Latency(ns) [p50: {} | p90: {} | p99: {} | max: {}]",
                    hist.value_at_quantile(0.50),
                    hist.value_at_quantile(0.90),
                    hist.value_at_quantile(0.99),
                    hist.max()
                );
                combined.add(hist).unwrap();
            }
        }
        println!();
    }

    let avg_tput = throughputs.iter().sum::<f64>() / throughputs.len() as f64;

    println!();
    println!("============================================");
    println!("             BENCHMARK SUMMARY              ");
    println!("============================================");
    println!("Actions per run   : {}", format_count(ORDER_COUNT as u64));
    println!("Total runs        : {}", ITERATIONS);
    println!("Avg throughput    : {} ops/sec", format_count(avg_tput as u64));
    if measure_latency && !combined.is_empty() {
        println!("--------------------------------------------");
        println!("p50 latency       : {} ns", format_count(combined.value_at_quantile(0.50)));
        println!("p90 latency       : {} ns", format_count(combined.value_at_quantile(0.90)));
        println!("p99 latency       : {} ns", format_count(combined.value_at_quantile(0.99)));
        println!("max latency       : {} ns", format_count(combined.max()));
    }
    println!("============================================");
}
