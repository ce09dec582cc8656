use crate::error::{PipelineError, Result};
use crate::parse::ParseStrategy;

/// Longest line accepted as-is; longer lines are truncated.
pub const MAX_LINE_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of parser workers, also the bound of the record channel.
    pub workers: usize,
    pub max_line_len: usize,
    pub strategy: ParseStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            max_line_len: MAX_LINE_LEN,
            strategy: ParseStrategy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_strategy(mut self, strategy: ParseStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.max_line_len == 0 {
            return Err(PipelineError::InvalidConfig("max_line_len must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let c = PipelineConfig::default();
        assert!(c.workers >= 1);
        assert_eq!(c.max_line_len, MAX_LINE_LEN);
        assert_eq!(c.strategy, ParseStrategy::Exact);
        c.validate().unwrap();
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(PipelineConfig::default().with_workers(0).validate().is_err());
        assert!(PipelineConfig::default().with_max_line_len(0).validate().is_err());
    }
}
