use log::debug;

use cache::TableCache;
use error::AgrihandaResult;
use pipeline::{Pipeline, RunReport};
use query::Lookup;
use search::{LabelSearchParams, SearchResults};
use summary::BarangaySummary;
use tables::Tables;

use crate::config::Config;

// Re-exports
pub use column_names as COL;

// Modules
pub mod barangay;
pub mod cache;
pub mod column_names;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod expand;
pub mod flatten;
pub mod formatters;
pub mod group;
pub mod hierarchy;
pub mod label;
pub mod library;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod search;
pub mod selection;
pub mod sheet;
pub mod summary;
pub mod tables;

/// Entry point for cleaning the workbooks and querying the cleaned tables
pub struct Agrihanda {
    pub config: Config,
    cache: TableCache,
}

impl Agrihanda {
    /// Setup the Agrihanda object with default configuration
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Setup the Agrihanda object with custom configuration
    pub fn new_with_config(config: Config) -> Self {
        debug!("config: {config:?}");
        Self {
            config,
            cache: TableCache::new(),
        }
    }

    /// Runs the cleaning pipeline and writes the outputs to the configured output directory
    pub fn clean(&mut self) -> AgrihandaResult<RunReport> {
        let (_, report) = Pipeline::new(&self.config).run()?;
        self.cache.invalidate();
        Ok(report)
    }

    /// The tables in the output directory, read on first use and whenever they change
    pub fn tables(&mut self) -> AgrihandaResult<&Tables> {
        self.cache.get_or_load(&self.config.output_dir)
    }

    /// Searches the column labels of the cleaned tables
    pub fn search(&mut self, params: LabelSearchParams) -> AgrihandaResult<SearchResults> {
        params.search(&self.tables()?.label_index)
    }

    /// Summary of one barangay, `Unknown` if no barangay has this ID
    pub fn summary(&mut self, bid: i64) -> AgrihandaResult<Lookup<BarangaySummary<'_>>> {
        let tables = self.tables()?;
        Ok(BarangaySummary::new(
            &tables.hierarchical,
            &tables.library,
            bid,
        ))
    }
}

impl Default for Agrihanda {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::sample_table;
    use crate::label::Level;
    use crate::search::{LevelFilter, SearchConfig};
    use nonempty::nonempty;

    fn agrihanda_with_tables() -> anyhow::Result<(tempfile::TempDir, Agrihanda)> {
        let dir = tempfile::tempdir()?;
        Tables::from_hierarchical(sample_table())?.write(dir.path(), false)?;
        let agrihanda = Agrihanda::new_with_config(Config {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        Ok((dir, agrihanda))
    }

    #[test]
    fn agrihanda_should_search_cached_tables() -> anyhow::Result<()> {
        let (_dir, mut agrihanda) = agrihanda_with_tables()?;
        let results = agrihanda.search(LabelSearchParams {
            filters: vec![LevelFilter {
                level: Level::Hazard,
                values: nonempty!["flood".to_string()],
                config: SearchConfig::default(),
            }],
            include_barangay: false,
        })?;
        assert_eq!(results.len(), 1);
        agrihanda.tables()?;
        assert_eq!(agrihanda.cache.load_count(), 1);
        Ok(())
    }

    #[test]
    fn agrihanda_should_summarize_barangays() -> anyhow::Result<()> {
        let (_dir, mut agrihanda) = agrihanda_with_tables()?;
        let summary = agrihanda.summary(4)?.known().map(|summary| summary.name());
        assert_eq!(summary, Some(Lookup::Known("Dahican".to_string())));
        assert!(agrihanda.summary(99)?.known().is_none());
        Ok(())
    }
}
