//! The single owner of the aggregate map.
//!
//! The map lives on the aggregator thread and only leaves it by value when the
//! thread returns, so nothing else can observe it while entries are in flight.

use crossbeam_channel::{never, select, Receiver, Sender};

use crate::record::Entry;
use crate::stats::{fold_entry, AggregateMap};

/// Channel ends the aggregator needs.
pub struct AggregatorIo {
    pub entries: Receiver<Entry>,
    /// Total number of dispatched records, sent once dispatch is over.
    pub target: Receiver<u64>,
    /// Acknowledges that `processed` reached the target.
    pub converged: Sender<u64>,
    pub done: Receiver<()>,
}

#[derive(Debug, Default)]
pub struct Aggregator {
    stats: AggregateMap,
    processed: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, entry: Entry) {
        fold_entry(&mut self.stats, entry);
        self.processed += 1;
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn stats(&self) -> &AggregateMap {
        &self.stats
    }

    pub fn into_stats(self) -> AggregateMap {
        self.stats
    }

    /// Folds entries until the `done` broadcast, acking convergence on the way.
    pub fn run(mut self, io: AggregatorIo) -> Self {
        log::debug!("[aggregator] started");
        let mut entries = io.entries;
        let mut target_rx = io.target;
        let mut target = None;
        let mut acked = false;

        loop {
            if !acked && target == Some(self.processed) {
                log::debug!("[aggregator] converged at {} entries", self.processed);
                let _ = io.converged.send(self.processed);
                acked = true;
            }
            select! {
                recv(io.done) -> _ => break,
                recv(entries) -> msg => match msg {
                    Ok(e) => self.apply(e),
                    Err(_) => entries = never(),
                },
                recv(target_rx) -> msg => {
                    if let Ok(n) = msg {
                        target = Some(n);
                    }
                    target_rx = never();
                }
            }
        }

        log::debug!("[aggregator] stopped after {} entries, {} keys", self.processed, self.stats.len());
        self
    }
}
