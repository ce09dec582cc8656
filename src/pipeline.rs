//! Orchestration: line source → N parser workers → aggregator.
//!
//! ```text
//!  source ──► records (bounded N) ──► worker × N ──► entries ──► aggregator
//!                                        │                          ▲
//!                                        └── faults ──► orchestrator ┘ target / converged
//! ```
//!
//! Shutdown is a broadcast: dropping the `done` sender disconnects every
//! receiver at once. It is only sent after the aggregator acknowledged that it
//! folded as many entries as records were dispatched, or after a fault.

use std::thread;

use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};

use crate::aggregator::{Aggregator, AggregatorIo};
use crate::buffer::BufferPool;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::record::{Dispatch, Record};
use crate::report::Reporter;
use crate::source::LineSource;
use crate::stats::AggregateMap;
use crate::worker::{ParserWorker, WorkerIo, WorkerReport};

#[derive(Debug)]
pub struct PipelineSummary {
    pub stats: AggregateMap,
    pub dispatched: u64,
    pub folded: u64,
    pub workers: Vec<WorkerReport>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs the pipeline and hands the finished map to `reporter`.
    pub fn run_and_report<S, R>(&self, source: &mut S, reporter: &mut R) -> Result<PipelineSummary>
    where
        S: LineSource + ?Sized,
        R: Reporter + ?Sized,
    {
        let summary = self.run(source)?;
        reporter.report(&summary.stats)?;
        Ok(summary)
    }

    pub fn run<S: LineSource + ?Sized>(&self, source: &mut S) -> Result<PipelineSummary> {
        let n = self.config.workers;
        let (rec_tx, rec_rx) = bounded::<Dispatch>(n);
        let (ent_tx, ent_rx) = bounded(n);
        let (done_tx, done_rx) = bounded::<()>(0);
        let (fault_tx, fault_rx) = unbounded();
        let (target_tx, target_rx) = bounded(1);
        let (ack_tx, ack_rx) = bounded(1);
        // enough for a full channel, one in hand per worker, one being filled
        let pool = BufferPool::new(2 * n + 1, self.config.max_line_len);

        log::debug!("starting {} parser workers", n);

        thread::scope(|s| {
            let workers: Vec<_> = (1..=n)
                .map(|id| {
                    let io = WorkerIo {
                        records: rec_rx.clone(),
                        entries: ent_tx.clone(),
                        done: done_rx.clone(),
                        faults: fault_tx.clone(),
                        pool: pool.clone(),
                    };
                    let worker = ParserWorker::new(id, self.config.max_line_len, self.config.strategy);
                    s.spawn(move || worker.run(io))
                })
                .collect();

            let agg_io = AggregatorIo {
                entries: ent_rx,
                target: target_rx,
                converged: ack_tx,
                done: done_rx,
            };
            let aggregator = s.spawn(move || Aggregator::new().run(agg_io));

            // only workers hold these now
            drop(rec_rx);
            drop(ent_tx);
            drop(fault_tx);

            let outcome = self
                .dispatch(source, &rec_tx, &fault_rx, &pool)
                .and_then(|dispatched| {
                    for _ in 0..n {
                        send_or_fault(&rec_tx, Dispatch::Stop, &fault_rx)?;
                    }
                    target_tx
                        .send(dispatched)
                        .map_err(|_| PipelineError::ChannelClosed("aggregator"))?;
                    await_convergence(&ack_rx, &fault_rx).map(|folded| (dispatched, folded))
                });

            drop(done_tx);

            let mut reports = Vec::with_capacity(n);
            for handle in workers {
                reports.push(handle.join().map_err(|_| PipelineError::WorkerPanicked("parser"))?);
            }
            let aggregator = aggregator
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("aggregator"))?;

            let (dispatched, folded) = outcome?;
            debug_assert_eq!(aggregator.processed(), folded);
            let stats = aggregator.into_stats();
            log::info!(
                "pipeline finished: {} records, {} keys, {} workers",
                dispatched,
                stats.len(),
                n
            );
            Ok(PipelineSummary { stats, dispatched, folded, workers: reports })
        })
    }

    /// Feeds every line to the record channel. Returns how many were sent.
    fn dispatch<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        records: &Sender<Dispatch>,
        faults: &Receiver<PipelineError>,
        pool: &BufferPool,
    ) -> Result<u64> {
        let mut num = 0u64;
        loop {
            if let Ok(fault) = faults.try_recv() {
                return Err(fault);
            }
            let line = match source.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => return Err(PipelineError::Read { line: num, source }),
            };
            num += 1;

            let mut buf = pool.take();
            buf.fill(line);
            send_or_fault(records, Dispatch::Record(Record { num, line: buf }), faults)?;
        }
        log::debug!("source exhausted after {} lines", num);
        Ok(num)
    }
}

/// Blocks on `records` while also watching for worker faults.
fn send_or_fault(
    records: &Sender<Dispatch>,
    msg: Dispatch,
    faults: &Receiver<PipelineError>,
) -> Result<()> {
    select! {
        // a dead worker pool most likely left its reason on the fault channel
        send(records, msg) -> res => res.map_err(|_| {
            faults.try_recv().unwrap_or(PipelineError::ChannelClosed("record"))
        }),
        recv(faults) -> fault => Err(fault.unwrap_or(PipelineError::ChannelClosed("fault"))),
    }
}

fn await_convergence(ack: &Receiver<u64>, faults: &Receiver<PipelineError>) -> Result<u64> {
    let mut faults = faults.clone();
    loop {
        select! {
            recv(ack) -> folded => {
                return folded.map_err(|_| PipelineError::ChannelClosed("aggregator"));
            }
            recv(faults) -> fault => match fault {
                Ok(fault) => return Err(fault),
                // every worker has stopped cleanly
                Err(_) => faults = never(),
            },
        }
    }
}
