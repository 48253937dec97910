use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("failed to read data access manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse data access manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no files were successfully downloaded")]
    NoDownloads,

    #[error("combined dataset {0} is empty or missing")]
    EmptyCombined(PathBuf),
}

pub type Result<T> = std::result::Result<T, PrepareError>;
