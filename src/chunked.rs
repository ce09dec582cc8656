//! Whole-input engine: read everything, split into newline-aligned chunks, fold
//! each chunk into its own map on the rayon pool, then merge.
//!
//! Same record rules as the pipeline (truncation, separator, value format), so
//! both engines agree on every input.

use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stats::{fold_entry, merge_maps, AggregateMap};
use crate::worker::decode_record;

/// Splits `raw` into at most about `n` pieces, each ending on a `\n` (except
/// possibly the last).
pub fn split_chunks(raw: &[u8], n: usize) -> Vec<&[u8]> {
    let chunk_size = raw.len() / n.max(1) + 1;
    let mut tks = Vec::with_capacity(n);
    let mut pos = 0;
    while pos < raw.len() {
        let target = (pos + chunk_size).min(raw.len());
        let end = match raw[target..].iter().position(|&b| b == b'\n') {
            Some(i) => target + i + 1,
            None => raw.len(),
        };
        tks.push(&raw[pos..end]);
        pos = end;
    }
    tks
}

/// Aggregates an in-memory input with `config.workers` chunks.
pub fn aggregate_chunked(raw: &[u8], config: &PipelineConfig) -> Result<AggregateMap> {
    config.validate()?;
    let tks = split_chunks(raw, config.workers);

    // 1-based number of each chunk's first line
    let mut first_line = Vec::with_capacity(tks.len());
    let mut next = 1u64;
    for ck in &tks {
        first_line.push(next);
        next += ck.iter().filter(|&&b| b == b'\n').count() as u64;
    }

    let maps = tks
        .par_iter()
        .zip(first_line.par_iter())
        .map(|(ck, &first)| fold_chunk(ck, first, config))
        .collect::<Result<Vec<_>>>()?;

    let out = maps.into_iter().fold(AggregateMap::default(), |mut a, b| {
        merge_maps(&mut a, b);
        a
    });
    log::info!("chunked engine: {} chunks, {} keys", tks.len(), out.len());
    Ok(out)
}

pub fn aggregate_file_chunked(path: &Path, config: &PipelineConfig) -> Result<AggregateMap> {
    let raw = fs::read(path)
        .map_err(|source| PipelineError::FileOpen { path: path.to_path_buf(), source })?;
    aggregate_chunked(&raw, config)
}

fn fold_chunk(ck: &[u8], first: u64, config: &PipelineConfig) -> Result<AggregateMap> {
    let mut out = AggregateMap::default();
    let body = ck.strip_suffix(b"\n").unwrap_or(ck);
    for (i, raw) in body.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let raw = &raw[..raw.len().min(config.max_line_len)];
        fold_entry(&mut out, decode_record(first + i as u64, raw, config.strategy)?);
    }
    Ok(out)
}
