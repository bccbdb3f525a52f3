//! Basic gateway example
//!
//! A background operation fans out to 100 worker threads. Each worker bumps
//! a counter that is only ever touched on the main thread, by marshaling
//! the increment through the gateway.
//!
//! # Environment Variables
//!
//! - `KEEPER_FLUSH_EPRINT=1` - Flush debug output immediately (useful for crash debugging)
//! - `KEEPER_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `KEEPER_POLL_INTERVAL_MS=5` - Degraded polling instead of pure event-driven waiting

use keeper::{block_on, GatewayConfig, KeeperError};
use keeper::{kinfo, kdebug, kerror};
use std::cell::Cell;
use std::thread;

// KEEPER_LOG_LEVEL=debug KEEPER_FLUSH_EPRINT=1 cargo run -p keeper-basic
fn main() {
    println!("=== Keeper Basic Example ===\n");

    let workers: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let config = GatewayConfig::default().debug_logging(true);
    config.print();

    // Owner-only state: a Cell is not Sync, so only the owner may touch it
    let counter = &OwnerCounter::default();
    let main_id = thread::current().id();

    let result = block_on(config, |gw, token| {
        kinfo!("Spawning {} workers...", workers);

        thread::scope(|s| {
            for i in 0..workers {
                s.spawn(move || {
                    token.check()?;
                    gw.call(|| {
                        assert_eq!(thread::current().id(), main_id);
                        counter.bump();
                    })?;
                    kdebug!("[worker {}] increment delivered", i);
                    Ok::<(), KeeperError>(())
                });
            }
        });

        gw.call(|| counter.get())
    });

    match result {
        Ok(total) => {
            println!("\nCounter: {} (expected {})", total, workers);
            let ok = total == workers;
            println!("{}", if ok { "OK" } else { "MISMATCH" });
            if !ok {
                std::process::exit(1);
            }
        }
        Err(e) => {
            kerror!("operation failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Counter that is only sound to use from the owner thread
#[derive(Default)]
struct OwnerCounter(Cell<usize>);

// Safety: every access goes through `Gateway::call`, which runs on the owner
unsafe impl Sync for OwnerCounter {}

impl OwnerCounter {
    fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    fn get(&self) -> usize {
        self.0.get()
    }
}
