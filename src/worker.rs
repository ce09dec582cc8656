//! Parser workers: record channel in, entry channel out.

use crossbeam_channel::{select, Receiver, Sender};

use crate::buffer::{BufferPool, RecordBuffer};
use crate::error::{ParseError, PipelineError, Result};
use crate::parse::{parse_value, ParseStrategy};
use crate::record::{Dispatch, Entry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Received its `Dispatch::Stop`.
    Terminated,
    /// Global shutdown, or the record channel went away.
    Shutdown,
    /// Hit a bad record and reported it on the fault channel.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub parsed: u64,
    pub reason: StopReason,
}

/// Channel ends a worker needs.
pub struct WorkerIo {
    pub records: Receiver<Dispatch>,
    pub entries: Sender<Entry>,
    pub done: Receiver<()>,
    pub faults: Sender<PipelineError>,
    pub pool: BufferPool,
}

pub struct ParserWorker {
    id: usize,
    buffer: RecordBuffer,
    strategy: ParseStrategy,
}

impl ParserWorker {
    pub fn new(id: usize, max_line_len: usize, strategy: ParseStrategy) -> Self {
        Self { id, buffer: RecordBuffer::new(max_line_len), strategy }
    }

    pub fn run(mut self, io: WorkerIo) -> WorkerReport {
        log::debug!("[parsing] worker #{} started", self.id);
        let _guard = FaultOnPanic(io.faults.clone());
        let strategy = self.strategy;
        let mut parsed = 0u64;

        let reason = loop {
            let msg = select! {
                recv(io.done) -> _ => break StopReason::Shutdown,
                recv(io.records) -> msg => msg,
            };
            let record = match msg {
                Ok(Dispatch::Record(r)) => r,
                Ok(Dispatch::Stop) => break StopReason::Terminated,
                Err(_) => break StopReason::Shutdown,
            };

            let line = self.buffer.fill(record.line.as_bytes());
            io.pool.give(record.line);
            log::trace!("parsing line {:5}: {}", record.num, String::from_utf8_lossy(line));

            let entry = match decode_record(record.num, line, strategy) {
                Ok(e) => e,
                Err(e) => {
                    log::error!("[parsing] worker #{}: {}", self.id, e);
                    let _ = io.faults.send(e);
                    break StopReason::Failed;
                }
            };

            select! {
                send(io.entries, entry) -> res => {
                    if res.is_err() {
                        break StopReason::Shutdown;
                    }
                }
                recv(io.done) -> _ => break StopReason::Shutdown,
            }
            parsed += 1;
        };

        log::debug!("[parsing] worker #{} stopped ({:?}, {} parsed)", self.id, reason, parsed);
        WorkerReport { id: self.id, parsed, reason }
    }
}

/// Turns a panicking worker into a fault, so the orchestrator never waits on
/// entries that will not come.
struct FaultOnPanic(Sender<PipelineError>);

impl Drop for FaultOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let _ = self.0.send(PipelineError::WorkerPanicked("parser"));
        }
    }
}

/// Splits `key;value` on the first separator and parses the value.
pub fn decode_record(num: u64, line: &[u8], strategy: ParseStrategy) -> Result<Entry> {
    let sep = line
        .iter()
        .position(|&b| b == b';')
        .ok_or_else(|| PipelineError::malformed(num, line))?;
    let (name, value) = (&line[..sep], &line[sep + 1..]);

    let name = std::str::from_utf8(name).map_err(|_| PipelineError::malformed(num, line))?;
    if value.is_empty() {
        return Err(PipelineError::invalid_number(num, line, ParseError::Empty));
    }
    let reading =
        parse_value(value, strategy).map_err(|e| PipelineError::invalid_number(num, line, e))?;
    Ok(Entry::new(name, reading))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crossbeam_channel::{bounded, unbounded, TrySendError};

    #[test]
    fn decodes_key_and_value() {
        let e = decode_record(1, b"Hamburg;12.0", ParseStrategy::Exact).unwrap();
        assert_eq!(e, Entry::new("Hamburg", 12.0));

        let e = decode_record(2, b"X;-3.5", ParseStrategy::Exact).unwrap();
        assert_eq!(e.reading, -3.5);
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = decode_record(1, b"NoSeparatorHere", ParseStrategy::Exact).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn empty_value_is_invalid_number() {
        let err = decode_record(4, b"Oslo;", ParseStrategy::Exact).unwrap_err();
        match err {
            PipelineError::InvalidNumberFormat { line, content, reason } => {
                assert_eq!(line, 4);
                assert_eq!(content, "Oslo;");
                assert_eq!(reason, ParseError::Empty);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn value_without_point_is_invalid_number() {
        let err = decode_record(9, b"Oslo;12", ParseStrategy::Exact).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidNumberFormat { line: 9, .. }));
    }

    struct Harness {
        records: Sender<Dispatch>,
        entries: Receiver<Entry>,
        done: Sender<()>,
        faults: Receiver<PipelineError>,
        pool: BufferPool,
    }

    fn spawn(max_line_len: usize) -> (Harness, std::thread::JoinHandle<WorkerReport>) {
        let (rec_tx, rec_rx) = bounded(1);
        let (ent_tx, ent_rx) = unbounded();
        let (done_tx, done_rx) = bounded(0);
        let (fault_tx, fault_rx) = unbounded();
        let pool = BufferPool::new(2, max_line_len);
        let io = WorkerIo {
            records: rec_rx,
            entries: ent_tx,
            done: done_rx,
            faults: fault_tx,
            pool: pool.clone(),
        };
        let worker = ParserWorker::new(1, max_line_len, ParseStrategy::Exact);
        let handle = std::thread::spawn(move || worker.run(io));
        let h = Harness { records: rec_tx, entries: ent_rx, done: done_tx, faults: fault_rx, pool };
        (h, handle)
    }

    fn send_line(h: &Harness, num: u64, line: &[u8]) {
        let mut buf = h.pool.take();
        buf.fill(line);
        h.records.send(Dispatch::Record(Record { num, line: buf })).unwrap();
    }

    #[test]
    fn parses_until_stop() {
        let (h, handle) = spawn(100);
        send_line(&h, 1, b"Hamburg;12.0");
        send_line(&h, 2, b"Palermo;5.0");
        h.records.send(Dispatch::Stop).unwrap();

        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::Terminated);
        assert_eq!(report.parsed, 2);
        let got: Vec<_> = h.entries.try_iter().collect();
        assert_eq!(got, vec![Entry::new("Hamburg", 12.0), Entry::new("Palermo", 5.0)]);
        assert_eq!(h.pool.available(), 2);
    }

    #[test]
    fn stops_on_shutdown_broadcast() {
        let (h, handle) = spawn(100);
        drop(h.done);
        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::Shutdown);
        assert_eq!(report.parsed, 0);
    }

    #[test]
    fn reports_bad_record_as_fault() {
        let (h, handle) = spawn(100);
        send_line(&h, 1, b"NoSeparatorHere");
        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::Failed);
        let fault = h.faults.recv().unwrap();
        assert_eq!(fault.line(), Some(1));
    }

    #[test]
    fn long_lines_are_truncated_before_parsing() {
        // "Key;1.0" cut to "Key;1." no longer carries a fractional digit
        let (h, handle) = spawn(6);
        send_line(&h, 1, b"Key;1.0");
        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::Failed);
        assert!(matches!(h.faults.recv().unwrap(), PipelineError::InvalidNumberFormat { .. }));
    }

    #[test]
    fn full_record_channel_holds_sender_until_worker_takes_one() {
        let (rec_tx, rec_rx) = bounded(1);
        let (ent_tx, ent_rx) = unbounded();
        let (_done_tx, done_rx) = bounded::<()>(0);
        let (fault_tx, _fault_rx) = unbounded();
        let pool = BufferPool::new(2, 100);

        let mut buf = pool.take();
        buf.fill(b"Abha;1.0");
        rec_tx.send(Dispatch::Record(Record { num: 1, line: buf })).unwrap();
        let mut pending = match rec_tx.try_send(Dispatch::Stop) {
            Err(TrySendError::Full(msg)) => msg,
            other => panic!("channel accepted a second message: {other:?}"),
        };

        let io = WorkerIo { records: rec_rx, entries: ent_tx, done: done_rx, faults: fault_tx, pool };
        let worker = ParserWorker::new(1, 100, ParseStrategy::Exact);
        let handle = std::thread::spawn(move || worker.run(io));

        // room opens up only once the worker has taken the first record
        loop {
            match rec_tx.try_send(pending) {
                Ok(()) => break,
                Err(TrySendError::Full(msg)) => {
                    pending = msg;
                    std::thread::yield_now();
                }
                Err(TrySendError::Disconnected(_)) => panic!("worker hung up"),
            }
        }

        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::Terminated);
        assert_eq!(report.parsed, 1);
        assert_eq!(ent_rx.try_iter().collect::<Vec<_>>(), vec![Entry::new("Abha", 1.0)]);
    }
}
