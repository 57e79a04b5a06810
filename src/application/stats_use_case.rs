// ============================================================
// Layer 2 — StatsUseCase
// ============================================================
// Runs only the load and filter steps, so a corpus can be
// checked before committing to a training run.

use anyhow::Result;

use crate::application::train_use_case::TrainConfig;
use crate::data::loader::CsvCorpusLoader;
use crate::domain::traits::CorpusSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// (author, surviving samples), in order of first appearance
    pub authors:   Vec<(String, usize)>,
}

pub struct StatsUseCase {
    config: TrainConfig,
}

impl StatsUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<CorpusStats> {
        let cfg     = &self.config;
        let records = CsvCorpusLoader::new(&cfg.data_path, cfg.schema()).load_all()?;
        let rows_read = records.len();

        let corpus = cfg.filter().apply(records)?;
        tracing::info!("{} of {} rows kept", corpus.len(), rows_read);

        Ok(CorpusStats {
            rows_read,
            rows_kept: corpus.len(),
            authors:   corpus.support(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counts_survivors() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");

        let mut csv = String::from("code,user_id,newline_count\n");
        for i in 0..11 {
            csv.push_str(&format!("x{i},keep,3\n"));
        }
        for i in 0..10 {
            csv.push_str(&format!("y{i},drop,3\n"));
        }
        csv.push_str("z,keep,2\n");
        std::fs::write(&path, csv).unwrap();

        let cfg   = TrainConfig { data_path: path.to_string_lossy().into_owned(), ..TrainConfig::default() };
        let stats = StatsUseCase::new(cfg).execute().unwrap();

        assert_eq!(stats.rows_read, 22);
        assert_eq!(stats.rows_kept, 11);
        assert_eq!(stats.authors, vec![("keep".to_string(), 11)]);
    }
}
