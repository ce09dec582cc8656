use rustc_hash::FxHashMap;

use crate::record::Entry;

/// Per-key min/max/sum/count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

/// Key → statistics, unordered while accumulating.
pub type AggregateMap = FxHashMap<String, Statistics>;

impl Statistics {
    pub fn new(reading: f64) -> Self {
        Self { min: reading, max: reading, sum: reading, count: 1 }
    }

    pub fn add(&mut self, reading: f64) {
        self.sum += reading;
        self.count += 1;
        self.min = reading.min(self.min);
        self.max = reading.max(self.max);
    }

    pub fn merge(&mut self, other: &Statistics) {
        self.sum += other.sum;
        self.count += other.count;
        self.min = other.min.min(self.min);
        self.max = other.max.max(self.max);
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Folds one entry into `map`, moving its key in for unseen names.
pub fn fold_entry(map: &mut AggregateMap, entry: Entry) {
    if let Some(s) = map.get_mut(&entry.name) {
        s.add(entry.reading);
    } else {
        map.insert(entry.name, Statistics::new(entry.reading));
    }
}

/// Merges `from` into `into`.
pub fn merge_maps(into: &mut AggregateMap, from: AggregateMap) {
    for (k, v) in from {
        if let Some(s) = into.get_mut(&k) {
            s.merge(&v);
        } else {
            into.insert(k, v);
        }
    }
}
