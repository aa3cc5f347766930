use mapdata::DataError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid font data{}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Font { path: Option<PathBuf> },
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
