//! Read-through cache of the persisted tables.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use log::{debug, info};

use crate::error::AgrihandaResult;
use crate::tables::{paths, Tables};

/// SHA-256 digest of the directory path, the flat table and the label index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_dir(dir: &Path) -> AgrihandaResult<Self> {
        let mut bytes = dir.to_string_lossy().as_bytes().to_vec();
        for file in [paths::FLAT, paths::LABEL_INDEX] {
            bytes.push(0);
            bytes.extend(std::fs::read(dir.join(file))?);
        }
        Ok(Self(sha256::digest(bytes.as_slice())))
    }
}

#[derive(Debug, Default)]
pub struct TableCache {
    entry: Option<(PathBuf, Fingerprint, Tables)>,
    loads: usize,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tables persisted in `dir`, re-read only when their fingerprint changed.
    pub fn get_or_load(&mut self, dir: &Path) -> AgrihandaResult<&Tables> {
        let fingerprint = Fingerprint::of_dir(dir)?;
        let fresh = matches!(
            &self.entry,
            Some((cached_dir, cached, _)) if cached_dir == dir && *cached == fingerprint
        );
        if fresh {
            debug!("Using cached tables for {}", dir.display());
        } else {
            info!("Loading tables from {}", dir.display());
            let tables = Tables::read(dir)?;
            self.loads += 1;
            self.entry = Some((dir.to_path_buf(), fingerprint, tables));
        }
        self.entry
            .as_ref()
            .map(|(_, _, tables)| tables)
            .ok_or_else(|| anyhow!("Table cache is empty after loading").into())
    }

    /// Forces the next `get_or_load` to re-read.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of times tables were read from disk.
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::sample_table;

    #[test]
    fn cache_reloads_only_on_change() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tables = Tables::from_hierarchical(sample_table())?;
        tables.write(dir.path(), false)?;

        let mut cache = TableCache::new();
        assert_eq!(cache.get_or_load(dir.path())?.label_index.len(), 4);
        cache.get_or_load(dir.path())?;
        assert_eq!(cache.load_count(), 1);

        cache.invalidate();
        cache.get_or_load(dir.path())?;
        assert_eq!(cache.load_count(), 2);

        let flat = dir.path().join(paths::FLAT);
        let contents = std::fs::read_to_string(&flat)?;
        std::fs::write(&flat, contents.replace("Ambago", "Ambago Proper"))?;
        let reloaded = cache.get_or_load(dir.path())?;
        assert_eq!(
            reloaded.hierarchical.barangay_name(1),
            Some("Ambago Proper".to_string())
        );
        assert_eq!(cache.load_count(), 3);
        Ok(())
    }
}
