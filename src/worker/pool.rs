//! Worker pool management.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::config::SearchRequest;

use super::{SearchController, SearchEvent, SearchOutcome, WorkerEvent};

/// Capacity of the shared event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Splits `total` attempts into `parts` shares that differ by at most one.
pub fn split_count(total: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let parts_u64 = parts as u64;
    let base = total / parts_u64;
    let extra = total % parts_u64;
    (0..parts_u64)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Runs independent searches in parallel and aggregates their events.
pub struct WorkerPool {
    /// Number of workers
    num_workers: usize,
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<()>>>,
    /// Channel receiver for events
    event_rx: Receiver<WorkerEvent>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Last attempt count reported by each worker
    attempts: Vec<u64>,
    /// Workers whose terminal event has arrived
    finished: Vec<bool>,
    /// Matches received so far
    matches: u64,
    /// Start time
    start_time: Instant,
}

impl WorkerPool {
    /// Starts `num_workers` searches, sharing the request's attempt count between them.
    pub fn new(num_workers: usize, request: SearchRequest) -> io::Result<Self> {
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let stop_flag = Arc::new(AtomicBool::new(false));

        let handles = match Self::spawn_workers(num_workers, &request, event_tx, stop_flag.clone()) {
            Ok(handles) => handles,
            Err(e) => {
                stop_flag.store(true, Ordering::Relaxed);
                return Err(e);
            }
        };

        Ok(Self {
            num_workers,
            handles: Some(handles),
            event_rx,
            stop_flag,
            attempts: vec![0; num_workers],
            finished: vec![false; num_workers],
            matches: 0,
            start_time: Instant::now(),
        })
    }

    /// Spawns worker threads.
    fn spawn_workers(
        num_workers: usize,
        request: &SearchRequest,
        event_tx: Sender<WorkerEvent>,
        stop_flag: Arc<AtomicBool>,
    ) -> io::Result<Vec<JoinHandle<()>>> {
        split_count(request.count, num_workers)
            .into_iter()
            .enumerate()
            .map(|(id, count)| {
                let request = SearchRequest {
                    count,
                    ..request.clone()
                };
                let event_tx = event_tx.clone();
                let stop_flag = stop_flag.clone();

                thread::Builder::new()
                    .name(format!("vanity-worker-{}", id))
                    .spawn(move || {
                        let controller = SearchController::new(id, event_tx, stop_flag);
                        controller.run(request);
                    })
            })
            .collect()
    }

    /// Waits for the next event with a timeout.
    ///
    /// Returns `None` if the timeout expires or every worker has finished.
    pub fn next_event(&mut self, timeout: Duration) -> Option<WorkerEvent> {
        if self.is_finished() {
            return None;
        }
        let event = self.event_rx.recv_timeout(timeout).ok()?;
        self.record(&event);
        Some(event)
    }

    fn record(&mut self, event: &WorkerEvent) {
        let Some(attempts) = self.attempts.get_mut(event.worker_id) else {
            warn!(worker = event.worker_id, "event from unknown worker");
            return;
        };

        match &event.event {
            SearchEvent::Match(_) => self.matches += 1,
            SearchEvent::Progress(progress) => *attempts = progress.attempts,
            SearchEvent::Finished(outcome) => {
                if let SearchOutcome::Exited(count) = outcome {
                    *attempts = *count;
                }
                self.finished[event.worker_id] = true;
                debug!(worker = event.worker_id, ?outcome, "worker finished");
            }
        }
    }

    /// Signals all workers to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Waits for all workers to complete.
    pub fn join(mut self) {
        self.stop();
        self.join_handles();
    }

    fn join_handles(&mut self) {
        if let Some(handles) = self.handles.take() {
            // Unblock workers waiting on a full channel.
            while !self.is_finished() {
                match self.event_rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(event) => self.record(&event),
                    Err(_) if handles.iter().all(|h| h.is_finished()) => break,
                    Err(_) => {}
                }
            }
            for handle in handles {
                let _ = handle.join();
            }
        }
    }

    /// Returns the number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns true once every worker has sent its terminal event.
    pub fn is_finished(&self) -> bool {
        self.finished.iter().all(|&done| done)
    }

    /// Returns the total attempts reported across all workers.
    pub fn total_attempts(&self) -> u64 {
        self.attempts.iter().sum()
    }

    /// Returns the total matches received.
    pub fn total_matches(&self) -> u64 {
        self.matches
    }

    /// Returns the elapsed time since the pool was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the current generation rate (keys per second).
    pub fn attempts_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_attempts() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns a clone of the stop flag for external use (e.g., signal handlers).
    pub fn stop_flag_clone(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Returns true if the pool has been signaled to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
        // Wait for workers to finish if they haven't been joined
        self.join_handles();
    }
}
