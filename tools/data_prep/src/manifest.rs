use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::error::{PrepareError, Result};

pub const DEFAULT_MANIFEST_PATH: &str = "/workspace/data_access.json";

/// Source URLs for one preparation run, in download order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DataAccessManifest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urls: Vec<String>,
}

/// `"urls": null` reads the same as a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl DataAccessManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PrepareError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PrepareError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
