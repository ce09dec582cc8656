//! Rendering of the finished map as `{name=min/mean/max, ...}`.

use std::io::Write;

use itertools::Itertools;

use crate::error::{PipelineError, Result};
use crate::stats::{AggregateMap, Statistics};

/// Receives the finished map once the pipeline is done.
pub trait Reporter {
    fn report(&mut self, stats: &AggregateMap) -> Result<()>;
}

/// Entries in ascending byte order of their key.
pub fn sorted(stats: &AggregateMap) -> Vec<(&str, &Statistics)> {
    let mut out = stats.iter().map(|(k, v)| (k.as_str(), v)).collect::<Vec<_>>();
    out.sort_unstable_by_key(|x| x.0);
    out
}

pub fn format_summary(stats: &AggregateMap) -> String {
    let out = sorted(stats)
        .into_iter()
        .map(|(name, s)| format!("{}={:.1}/{:.1}/{:.1}", name, s.min, s.mean(), s.max))
        .join(", ");
    format!("{{{out}}}")
}

/// Writes the summary line to any writer, stdout in the binary.
pub struct WriterReporter<W> {
    out: W,
}

impl<W: Write> WriterReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for WriterReporter<W> {
    fn report(&mut self, stats: &AggregateMap) -> Result<()> {
        writeln!(self.out, "{}", format_summary(stats)).map_err(PipelineError::Report)?;
        self.out.flush().map_err(PipelineError::Report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Entry;
    use crate::stats::fold_entry;

    fn map(readings: &[(&str, f64)]) -> AggregateMap {
        let mut m = AggregateMap::default();
        for (k, v) in readings {
            fold_entry(&mut m, Entry::new(*k, *v));
        }
        m
    }

    #[test]
    fn formats_sorted_with_one_decimal() {
        let m = map(&[("Palermo", 5.0), ("Hamburg", 12.0), ("Hamburg", 14.0)]);
        assert_eq!(format_summary(&m), "{Hamburg=12.0/13.0/14.0, Palermo=5.0/5.0/5.0}");
    }

    #[test]
    fn keys_sort_bytewise() {
        let m = map(&[("b", 1.0), ("B", 1.0), ("a", 1.0), ("Ärhus", 1.0)]);
        let keys: Vec<_> = sorted(&m).into_iter().map(|x| x.0).collect();
        assert_eq!(keys, vec!["B", "a", "b", "Ärhus"]);
    }

    #[test]
    fn empty_map_is_braces() {
        assert_eq!(format_summary(&AggregateMap::default()), "{}");
    }

    #[test]
    fn writer_reporter_emits_one_line() {
        let m = map(&[("X", -3.5)]);
        let mut r = WriterReporter::new(Vec::new());
        r.report(&m).unwrap();
        assert_eq!(String::from_utf8(r.into_inner()).unwrap(), "{X=-3.5/-3.5/-3.5}\n");
    }
}
