//! The search loop run by a single worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::config::{SearchConfig, SearchRequest};
use crate::crypto::{
    AddressDeriver, Base58Deriver, KeyExporter, KeyGenerator, Keypair, Pkcs8Exporter,
    RngKeyGenerator,
};
use crate::matcher::MatchPredicate;

use super::{SearchEvent, SearchOutcome, SearchProgress, WorkerEvent};

/// Lifecycle of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    /// Constructed, no request received yet
    Idle,
    /// Generating and testing batches
    Running,
    /// Stop condition observed, terminal event not yet sent
    Stopping,
    /// Terminal event sent; nothing else is emitted
    Stopped,
}

/// Drives batches of keypairs through derivation, matching and export.
///
/// One controller runs one search. Per-attempt faults are logged and skipped;
/// the caller always receives exactly one [`SearchEvent::Finished`], last.
pub struct SearchController<G = RngKeyGenerator, D = Base58Deriver, E = Pkcs8Exporter> {
    /// Worker ID
    id: usize,
    generator: G,
    deriver: D,
    exporter: E,
    /// Channel to send events
    events: Sender<WorkerEvent>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    state: SearchState,
    attempts: u64,
    /// Set once the event receiver is gone
    disconnected: bool,
}

impl SearchController {
    /// Creates a controller using OS-seeded Ed25519 keys and Solana addresses.
    pub fn new(id: usize, events: Sender<WorkerEvent>, stop_flag: Arc<AtomicBool>) -> Self {
        Self::with_parts(
            id,
            RngKeyGenerator::from_entropy(),
            Base58Deriver,
            Pkcs8Exporter,
            events,
            stop_flag,
        )
    }
}

impl<G, D, E> SearchController<G, D, E>
where
    G: KeyGenerator,
    D: AddressDeriver,
    E: KeyExporter,
{
    /// Creates a controller from explicit collaborators.
    pub fn with_parts(
        id: usize,
        generator: G,
        deriver: D,
        exporter: E,
        events: Sender<WorkerEvent>,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            generator,
            deriver,
            exporter,
            events,
            stop_flag,
            state: SearchState::Idle,
            attempts: 0,
            disconnected: false,
        }
    }

    /// Runs the search to completion and returns the outcome that was emitted.
    pub fn run(mut self, request: SearchRequest) -> SearchOutcome {
        let outcome = match SearchConfig::try_from(request) {
            Ok(config) => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| self.search(&config)));
                match result {
                    Ok(()) => SearchOutcome::Exited(self.attempts),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(worker = self.id, %message, "search aborted");
                        SearchOutcome::Failed(message)
                    }
                }
            }
            Err(e) => {
                warn!(worker = self.id, error = %e, "rejected search request");
                SearchOutcome::Failed(e.to_string())
            }
        };

        self.state = SearchState::Stopping;
        self.emit(SearchEvent::Finished(outcome.clone()));
        self.state = SearchState::Stopped;
        debug!(worker = self.id, state = ?self.state, ?outcome, "search finished");

        outcome
    }

    fn search(&mut self, config: &SearchConfig) {
        let predicate = config.criterion.compile();
        self.state = SearchState::Running;
        debug!(
            worker = self.id,
            target = config.target_count,
            batch_size = config.batch_size,
            criterion = %config.criterion,
            "search started"
        );

        while self.state == SearchState::Running {
            if self.attempts >= config.target_count || self.is_cancelled() {
                self.state = SearchState::Stopping;
                break;
            }

            let remaining = config.target_count - self.attempts;
            let batch_size = remaining.min(config.batch_size as u64) as usize;

            match self.generator.generate_batch(batch_size) {
                Ok(batch) => self.process_batch(batch, &predicate, config),
                Err(e) => warn!(worker = self.id, error = %e, "skipping batch"),
            }
        }
    }

    fn process_batch(
        &mut self,
        batch: Vec<Keypair>,
        predicate: &MatchPredicate,
        config: &SearchConfig,
    ) {
        for keypair in batch {
            let address = match self.deriver.derive(&keypair.public_key_bytes()) {
                Ok(address) => address,
                Err(e) => {
                    warn!(worker = self.id, error = %e, "skipping keypair");
                    continue;
                }
            };

            if predicate.matches(&address) {
                match self.exporter.pack(&keypair) {
                    Ok(result) => {
                        info!(worker = self.id, %address, "match found");
                        self.emit(SearchEvent::Match(result));
                    }
                    Err(e) => warn!(worker = self.id, %address, error = %e, "dropping match"),
                }
            }

            self.attempts += 1;
            if self.attempts % config.progress_interval == 0 {
                self.emit(SearchEvent::Progress(SearchProgress {
                    attempts: self.attempts,
                }));
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.disconnected || self.stop_flag.load(Ordering::Relaxed)
    }

    fn emit(&mut self, event: SearchEvent) {
        let event = WorkerEvent {
            worker_id: self.id,
            event,
        };
        if self.events.send(event).is_err() && !self.disconnected {
            debug!(worker = self.id, "event receiver dropped, stopping");
            self.disconnected = true;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "search panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use crossbeam_channel::{unbounded, Receiver};

    use super::*;
    use crate::crypto::{CryptoError, MatchResult};
    use crate::matcher::Criteria;

    fn keypair(n: u8) -> Keypair {
        Keypair::from_seed([n; 32])
    }

    /// Returns scripted batches, then freshly seeded keypairs.
    #[derive(Default)]
    struct ScriptedGenerator {
        script: VecDeque<Result<Vec<Keypair>, CryptoError>>,
        requests: Vec<usize>,
        next_seed: u8,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<Vec<Keypair>, CryptoError>>) -> Self {
            Self {
                script: script.into(),
                next_seed: 100,
                ..Default::default()
            }
        }
    }

    impl KeyGenerator for &mut ScriptedGenerator {
        fn generate_batch(&mut self, n: usize) -> Result<Vec<Keypair>, CryptoError> {
            self.requests.push(n);
            if let Some(batch) = self.script.pop_front() {
                return batch;
            }
            Ok((0..n)
                .map(|_| {
                    self.next_seed = self.next_seed.wrapping_add(1);
                    keypair(self.next_seed)
                })
                .collect())
        }
    }

    /// Looks addresses up in a table; unknown keys get a non-matching address.
    #[derive(Default)]
    struct TableDeriver {
        table: HashMap<[u8; 32], Result<String, CryptoError>>,
    }

    impl TableDeriver {
        fn with(mut self, keypair: &Keypair, address: Result<&str, CryptoError>) -> Self {
            self.table
                .insert(keypair.public_key_bytes(), address.map(String::from));
            self
        }
    }

    impl AddressDeriver for TableDeriver {
        fn derive(&self, public_key: &[u8; 32]) -> Result<String, CryptoError> {
            self.table
                .get(public_key)
                .cloned()
                .unwrap_or_else(|| Ok(format!("zz{}", hex::encode(public_key))))
        }
    }

    struct FailingExporter;

    impl KeyExporter for FailingExporter {
        fn pack(&self, _keypair: &Keypair) -> Result<MatchResult, CryptoError> {
            Err(CryptoError::Export("unsupported".into()))
        }
    }

    struct PanickingGenerator;

    impl KeyGenerator for PanickingGenerator {
        fn generate_batch(&mut self, _n: usize) -> Result<Vec<Keypair>, CryptoError> {
            panic!("entropy source exploded");
        }
    }

    fn request(
        count: u64,
        batch_size: usize,
        start: Option<&str>,
        end: Option<&str>,
    ) -> SearchRequest {
        SearchRequest {
            count,
            batch_size: Some(batch_size),
            progress_interval: None,
            criteria: Criteria {
                start: start.map(Into::into),
                end: end.map(Into::into),
            },
        }
    }

    fn channel() -> (Sender<WorkerEvent>, Receiver<WorkerEvent>, Arc<AtomicBool>) {
        let (tx, rx) = unbounded();
        (tx, rx, Arc::new(AtomicBool::new(false)))
    }

    fn drain(rx: &Receiver<WorkerEvent>) -> Vec<SearchEvent> {
        rx.try_iter().map(|e| e.event).collect()
    }

    fn progress_counts(events: &[SearchEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Progress(p) => Some(p.attempts),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_match_in_batch() {
        let batch: Vec<Keypair> = (1..=5).map(keypair).collect();
        let matching = batch[2].clone();
        let mut generator = ScriptedGenerator::new(vec![Ok(batch)]);
        let deriver = TableDeriver::default().with(&matching, Ok("1111111111ABCDEF"));
        let (tx, rx, stop) = channel();

        let outcome = SearchController::with_parts(0, &mut generator, deriver, Pkcs8Exporter, tx, stop)
            .run(request(5, 5, Some("1111111111"), None));

        assert_eq!(outcome, SearchOutcome::Exited(5));
        let events = drain(&rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            SearchEvent::Match(result) => {
                assert_eq!(result.as_bytes().len(), 64);
                assert_eq!(result.public_key_bytes(), matching.public_key_bytes());
                assert_eq!(result.secret_bytes(), &matching.secret_bytes()[..]);
            }
            other => panic!("expected match, got {:?}", other),
        }
        assert_eq!(events[1], SearchEvent::Finished(SearchOutcome::Exited(5)));
        assert_eq!(generator.requests, vec![5]);
    }

    #[test]
    fn test_zero_count_exits_immediately() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();

        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(0, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(0));
        assert_eq!(drain(&rx), vec![SearchEvent::Finished(SearchOutcome::Exited(0))]);
        assert!(generator.requests.is_empty());
    }

    #[test]
    fn test_missing_criteria_fails() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();

        let outcome =
            SearchController::with_parts(3, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(100, 10, None, None));

        assert!(matches!(outcome, SearchOutcome::Failed(_)));
        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].worker_id, 3);
        assert!(matches!(events[0].event, SearchEvent::Finished(SearchOutcome::Failed(_))));
        assert!(generator.requests.is_empty());
    }

    #[test]
    fn test_progress_cadence() {
        let (tx, rx, stop) = channel();

        let outcome = SearchController::with_parts(
            0,
            RngKeyGenerator::seeded(1),
            Base58Deriver,
            Pkcs8Exporter,
            tx,
            stop,
        )
        .run(request(350, 10, Some("this-never-matches"), None));

        assert_eq!(outcome, SearchOutcome::Exited(350));
        let events = drain(&rx);
        assert_eq!(progress_counts(&events), vec![100, 200, 300]);
        assert!(events.last().unwrap().is_terminal());
    }

    #[test]
    fn test_custom_progress_interval() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();
        let mut req = request(30, 4, None, Some("never"));
        req.progress_interval = Some(7);

        SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
            .run(req);

        assert_eq!(progress_counts(&drain(&rx)), vec![7, 14, 21, 28]);
    }

    #[test]
    fn test_count_never_exceeds_target() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, _rx, stop) = channel();

        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(25, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(25));
        assert_eq!(generator.requests, vec![10, 10, 5]);
    }

    #[test]
    fn test_generation_fault_skips_batch() {
        let mut generator = ScriptedGenerator::new(vec![
            Ok((1..=10).map(keypair).collect()),
            Err(CryptoError::Generation("rng offline".into())),
        ]);
        let (tx, rx, stop) = channel();

        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(20, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(20));
        // The faulted batch is retried as a whole rather than counted.
        assert_eq!(generator.requests, vec![10, 10, 10]);
        assert_eq!(drain(&rx), vec![SearchEvent::Finished(SearchOutcome::Exited(20))]);
    }

    #[test]
    fn test_derivation_fault_skips_keypair() {
        let batch: Vec<Keypair> = (1..=10).map(keypair).collect();
        let deriver = TableDeriver::default()
            .with(&batch[4], Err(CryptoError::Derivation("bad key".into())));
        let mut generator = ScriptedGenerator::new(vec![Ok(batch)]);
        let (tx, _rx, stop) = channel();

        let outcome = SearchController::with_parts(0, &mut generator, deriver, Pkcs8Exporter, tx, stop)
            .run(request(10, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(10));
        assert_eq!(generator.requests, vec![10, 1]);
    }

    #[test]
    fn test_export_fault_drops_match_but_counts_attempt() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();

        // Every generated address starts with "zz".
        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), FailingExporter, tx, stop)
                .run(request(5, 5, Some("zz"), None));

        assert_eq!(outcome, SearchOutcome::Exited(5));
        assert_eq!(drain(&rx), vec![SearchEvent::Finished(SearchOutcome::Exited(5))]);
    }

    #[test]
    fn test_every_attempt_matches() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();

        SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
            .run(request(12, 5, Some("zz"), None));

        let matches = drain(&rx)
            .into_iter()
            .filter(|e| matches!(e, SearchEvent::Match(_)))
            .count();
        assert_eq!(matches, 12);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();
        stop.store(true, Ordering::Relaxed);

        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(1_000, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(0));
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn test_cancellation_at_batch_boundary() {
        struct CancellingGenerator {
            stop: Arc<AtomicBool>,
        }

        impl KeyGenerator for CancellingGenerator {
            fn generate_batch(&mut self, n: usize) -> Result<Vec<Keypair>, CryptoError> {
                // Cancel mid-batch; the batch still completes.
                self.stop.store(true, Ordering::Relaxed);
                Ok((0..n).map(|i| keypair(i as u8)).collect())
            }
        }

        let (tx, _rx, stop) = channel();
        let generator = CancellingGenerator { stop: stop.clone() };

        let outcome =
            SearchController::with_parts(0, generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(1_000, 10, Some("A"), None));

        assert_eq!(outcome, SearchOutcome::Exited(10));
    }

    #[test]
    fn test_dropped_receiver_stops_search() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let (tx, rx, stop) = channel();
        drop(rx);

        let outcome =
            SearchController::with_parts(0, &mut generator, TableDeriver::default(), Pkcs8Exporter, tx, stop)
                .run(request(10_000, 10, Some("A"), None));

        // The first failed send is the progress event at 100.
        assert_eq!(outcome, SearchOutcome::Exited(100));
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let (tx, rx, stop) = channel();

        let outcome =
            SearchController::with_parts(0, PanickingGenerator, Base58Deriver, Pkcs8Exporter, tx, stop)
                .run(request(10, 10, Some("A"), None));

        assert_eq!(
            outcome,
            SearchOutcome::Failed("entropy source exploded".into())
        );
        assert_eq!(drain(&rx), vec![SearchEvent::Finished(outcome)]);
    }

    #[test]
    fn test_matches_round_trip_through_deriver() {
        let (tx, rx, stop) = channel();

        SearchController::with_parts(
            0,
            RngKeyGenerator::seeded(99),
            Base58Deriver,
            Pkcs8Exporter,
            tx,
            stop,
        )
        .run(request(3_000, 10, None, Some("A")));

        let predicate = crate::matcher::Criterion::Suffix("A".into()).compile();
        for event in drain(&rx) {
            if let SearchEvent::Match(result) = event {
                let address = Base58Deriver.derive(&result.public_key_bytes()).unwrap();
                assert!(predicate.matches(&address));

                let mut seed = [0u8; 32];
                seed.copy_from_slice(result.secret_bytes());
                assert_eq!(
                    Keypair::from_seed(seed).public_key_bytes(),
                    result.public_key_bytes()
                );
            }
        }
    }
}
