use crate::buffer::RecordBuffer;

/// One input line, tagged with its 1-based line number.
#[derive(Debug)]
pub struct Record {
    pub num: u64,
    pub line: RecordBuffer,
}

/// What the orchestrator puts on the record channel.
#[derive(Debug)]
pub enum Dispatch {
    Record(Record),
    /// Sent once per worker after the last record.
    Stop,
}

/// A decoded `key;value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub reading: f64,
}

impl Entry {
    pub fn new(name: impl Into<String>, reading: f64) -> Self {
        Self { name: name.into(), reading }
    }
}
