use log::{info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Sequential HTTP fetcher. Requests carry no timeout and are never retried.
pub struct Downloader {
    client: reqwest::blocking::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client })
    }

    /// Streams the body of `url` into `dest` and returns the number of bytes written.
    ///
    /// A partially written file is removed when the transfer fails.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, dest.display());
        let result = self.stream_to(url, dest);
        if result.is_err() && dest.exists() {
            if let Err(e) = fs::remove_file(dest) {
                warn!("Could not remove partial download {}: {}", dest.display(), e);
            }
        }
        result
    }

    fn stream_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut writer = BufWriter::new(File::create(dest)?);
        let written = response.copy_to(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        info!("Successfully downloaded {} ({} bytes)", dest.display(), written);
        Ok(written)
    }
}
