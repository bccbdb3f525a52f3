//! Stress test - many concurrent requesters
//!
//! Hammers one owner thread with blocking calls and posts from many
//! threads and reports throughput.

use keeper::{Gateway, GatewayConfig, GatewayStats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

fn main() {
    println!("=== Keeper Stress Test ===\n");

    let mut args = std::env::args().skip(1);
    let threads: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(16);
    let calls_per_thread: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10_000);

    println!("{} threads x {} calls", threads, calls_per_thread);

    let gateway = match Gateway::with_config(GatewayConfig::default()) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("bad config: {}", e);
            std::process::exit(1);
        }
    };
    let gw = &gateway;
    let posted = Arc::new(AtomicU64::new(0));
    let checksum = Mutex::new(0u64);

    let start = Instant::now();
    let run = gateway.run_to_completion(|token| {
        thread::scope(|s| {
            for t in 0..threads {
                let checksum = &checksum;
                let posted = Arc::clone(&posted);
                s.spawn(move || {
                    for i in 0..calls_per_thread {
                        if token.is_cancelled() {
                            break;
                        }
                        if i % 10 == 0 {
                            let posted = Arc::clone(&posted);
                            let sent = gw.post(move || {
                                posted.fetch_add(1, Ordering::Relaxed);
                            });
                            if sent.is_err() {
                                break;
                            }
                        } else if gw.call(|| *checksum.lock().unwrap() += t as u64).is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Ok(())
    });
    let elapsed = start.elapsed();
    // Snapshot after the final drain, so every accepted post is counted
    let stats = gateway.stats();
    let sum = checksum.into_inner().unwrap_or_else(PoisonError::into_inner);

    match run {
        Ok(()) => report(&stats, sum, posted.load(Ordering::Relaxed), elapsed),
        Err(e) => {
            eprintln!("stress run failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn report(stats: &GatewayStats, sum: u64, posted: u64, elapsed: std::time::Duration) {
    let served = stats.calls_completed + stats.posts_run;
    println!("\n=== Results ===");
    println!("Calls completed: {}", stats.calls_completed);
    println!("Posts run:       {} (observed {})", stats.posts_run, posted);
    println!("Abandoned:       {}", stats.calls_abandoned);
    println!("Drain passes:    {}", stats.drains);
    println!("Checksum:        {}", sum);
    println!("Total time:      {:?}", elapsed);
    println!(
        "Throughput:      {:.0} calls/sec",
        served as f64 / elapsed.as_secs_f64()
    );
}
