//! Fetches JSONL training shards listed in a data access manifest and joins them
//! into the single file the trainer reads.

pub mod combine;
pub mod download;
pub mod error;
pub mod manifest;
pub mod mock;

pub use download::Downloader;
pub use error::{PrepareError, Result};
pub use manifest::{DataAccessManifest, DEFAULT_MANIFEST_PATH};

use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const COMBINED_FILE: &str = "combined.jsonl";

/// Where a run reads its manifest and writes its files.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub manifest: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl DataLayout {
    pub fn new<M: Into<PathBuf>, D: Into<PathBuf>>(manifest: M, data_dir: D) -> Self {
        Self {
            manifest: manifest.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Per-URL download target, indexed by manifest position.
    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.data_dir.join(format!("dataset_{}.jsonl", index))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.data_dir.join(COMBINED_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// The manifest listed no URLs; synthetic data was written instead.
    Mock { path: PathBuf, samples: usize },
    Combined {
        path: PathBuf,
        shards: usize,
        lines: usize,
    },
}

/// Runs one preparation pass over `layout`.
pub fn prepare(layout: &DataLayout, downloader: &Downloader) -> Result<Prepared> {
    let manifest = DataAccessManifest::from_file(&layout.manifest)?;
    fs::create_dir_all(&layout.data_dir)?;

    let combined = layout.combined_path();

    if manifest.urls.is_empty() {
        warn!(
            "No URLs provided in {}, creating mock dataset for testing",
            layout.manifest.display()
        );
        let samples = mock::write_mock_dataset(&combined)?;
        return Ok(Prepared::Mock {
            path: combined,
            samples,
        });
    }

    let mut downloaded = Vec::with_capacity(manifest.urls.len());
    for (index, url) in manifest.urls.iter().enumerate() {
        let shard = layout.shard_path(index);
        match downloader.fetch(url, &shard) {
            Ok(_) => downloaded.push(shard),
            Err(e) => error!("Failed to download {}: {}", url, e),
        }
    }

    if downloaded.is_empty() {
        return Err(PrepareError::NoDownloads);
    }

    let lines = combine::combine_jsonl(&downloaded, &combined)?;

    let is_empty = fs::metadata(&combined).map(|m| m.len() == 0).unwrap_or(true);
    if is_empty {
        return Err(PrepareError::EmptyCombined(combined));
    }

    for shard in &downloaded {
        match fs::remove_file(shard) {
            Ok(()) => info!("Cleaned up {}", shard.display()),
            Err(e) => warn!("Could not remove {}: {}", shard.display(), e),
        }
    }

    info!("Data download and preparation completed successfully");
    Ok(Prepared::Combined {
        path: combined,
        shards: downloaded.len(),
        lines,
    })
}
