//! Solana Vanity Address Generator CLI
//!
//! Usage:
//!   sol_vanity -p So1            # Find address starting with "So1"
//!   sol_vanity -s pump           # Find address ending with "pump"
//!   sol_vanity -p ab -s yz -n 3  # Find 3 addresses starting "ab" and ending "yz"

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use sol_vanity::{Config, Criterion, MatchResult, SearchEvent, SearchOutcome, WorkerPool};

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    }

    let request = config.search_request();
    let criterion = match Criterion::try_from(request.criteria.clone()) {
        Ok(criterion) => criterion,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    // Print startup info
    println!("Solana Vanity Address Generator");
    println!("===============================");
    println!("Pattern:    {}", criterion);
    println!("Difficulty: {}", criterion.difficulty_description());
    println!("Workers:    {}", config.worker_count());
    println!("Batch size: {}", config.batch_size);
    match config.attempts {
        Some(n) => println!("Target:     {} address(es) within {} attempts", config.matches, n),
        None => println!("Target:     {} address(es)", config.matches),
    }
    println!();

    let mut pool = match WorkerPool::new(config.worker_count(), request) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Failed to start workers: {}", e);
            process::exit(1);
        }
    };

    // Set up ctrl-c handler
    ctrlc_handler(pool.stop_flag_clone());

    println!("Searching... (Press Ctrl+C to stop)\n");

    let mut found = 0;
    let mut report_timer = ReportTimer::new(
        Duration::from_secs(config.report_interval.max(1)),
        Instant::now(),
    );

    while !pool.is_finished() {
        // Wait for an event, but never past the next progress report
        if let Some(event) = pool.next_event(report_timer.timeout(Instant::now())) {
            match event.event {
                SearchEvent::Match(result) => {
                    found += 1;
                    print_result(&result, event.worker_id, found);

                    if config.matches > 0 && found >= config.matches && !pool.is_stopped() {
                        println!("Target reached! Found {} address(es).\n", found);
                        pool.stop();
                    }
                }
                SearchEvent::Progress(_) => {}
                SearchEvent::Finished(SearchOutcome::Exited(_)) => {}
                SearchEvent::Finished(SearchOutcome::Failed(message)) => {
                    error!(worker = event.worker_id, %message, "worker failed");
                }
            }
        }

        let now = Instant::now();
        if report_timer.is_due(now) {
            print_progress(&pool);
            report_timer.reset(now);
        }
    }

    if pool.is_stopped() && (config.matches == 0 || found < config.matches) {
        warn!("stopped before reaching the target");
    }

    // Print final stats
    println!("\n--- Final Statistics ---");
    println!("Total keys generated: {}", format_number(pool.total_attempts()));
    println!("Total matches found:  {}", pool.total_matches());
    println!("Time elapsed:         {:.2}s", pool.elapsed().as_secs_f64());
    println!(
        "Average speed:        {}/s",
        format_number(pool.attempts_per_second() as u64)
    );

    pool.join();
}

/// Decides when the next progress line is due, independent of event traffic.
struct ReportTimer {
    interval: Duration,
    last_report: Instant,
}

impl ReportTimer {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_report: now,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_report) >= self.interval
    }

    /// Time left until the next report, zero if one is already due.
    fn timeout(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_report))
    }

    fn reset(&mut self, now: Instant) {
        self.last_report = now;
    }
}

fn print_result(result: &MatchResult, worker_id: usize, index: usize) {
    println!("=== Match #{} ===", index);
    match result.address() {
        Ok(address) => println!("Address:     {}", address),
        Err(e) => println!("Address:     <{}>", e),
    }
    println!("Secret Key:  {}", result.to_base58());
    println!("Keypair:     {}", result.to_json_array());
    println!("Worker:      {}", worker_id);
    println!();
}

fn print_progress(pool: &WorkerPool) {
    let keys = pool.total_attempts();
    let rate = pool.attempts_per_second();
    let elapsed = pool.elapsed().as_secs();

    println!(
        "[{:>4}s] Generated {} keys ({}/s)",
        elapsed,
        format_number(keys),
        format_number(rate as u64)
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    });
    if let Err(e) = result {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}
