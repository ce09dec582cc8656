//! Streaming `key;value` aggregation.
//!
//! The main engine is [`Pipeline`]: a line source feeds N parser workers over a
//! bounded channel, workers feed one aggregator that owns the per-key
//! [`Statistics`], and the finished map goes to a [`Reporter`].
//! [`chunked::aggregate_chunked`] is the data-parallel alternative for inputs
//! that fit in memory.

pub mod aggregator;
pub mod buffer;
pub mod chunked;
pub mod config;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod source;
pub mod stats;
pub mod worker;

pub use aggregator::Aggregator;
pub use buffer::{BufferPool, RecordBuffer};
pub use config::{PipelineConfig, MAX_LINE_LEN};
pub use error::{ParseError, PipelineError, Result};
pub use parse::{parse_value, ParseStrategy};
pub use pipeline::{Pipeline, PipelineSummary};
pub use record::{Entry, Record};
pub use report::{format_summary, Reporter, WriterReporter};
pub use source::{LineSource, ReaderLineSource};
pub use stats::{AggregateMap, Statistics};
pub use worker::ParserWorker;
