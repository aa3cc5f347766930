use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ProvinceId;
use crate::color::ColorKey;

/// Asset integrity and decoding failures. All of these are fatal to map
/// initialisation; lookup misses are never reported through this type.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("missing asset: {0}")]
    MissingAsset(PathBuf),
    #[error("raster '{name}' is {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    DimensionMismatch {
        name: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("duplicate colour ({color}) shared by regions {first} and {second}")]
    DuplicateColor {
        color: ColorKey,
        first: ProvinceId,
        second: ProvinceId,
    },
    #[error("duplicate region id {0} in definition table")]
    DuplicateRegionId(ProvinceId),
    #[error("malformed definition row {line}: {reason}")]
    MalformedDefinition { line: u64, reason: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}
