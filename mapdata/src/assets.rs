//! Raster and table loading for one map.
//!
//! Stage 1 decodes the independent rasters in parallel; stage 2 checks that
//! they agree on dimensions before anything is built on top of them.

use image::RgbaImage;
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::countries::CountryTable;
use crate::definitions::{RegionDefinition, load_definitions};
use crate::error::DataError;
use crate::ownership::OwnershipMap;

pub const PROVINCES_FILE: &str = "provinces.png";
pub const TERRAIN_FILE: &str = "terrain.png";
pub const WATER_FILE: &str = "water.png";
pub const RIVERS_FILE: &str = "rivers.png";
pub const DEFINITIONS_FILE: &str = "definition.csv";
pub const COUNTRIES_FILE: &str = "countries.json";
pub const OWNERSHIP_FILE: &str = "ownership.txt";

/// Asset locations. Optional entries set to `None` are simply not loaded;
/// a configured path that does not exist is a [`DataError::MissingAsset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub provinces: PathBuf,
    pub definitions: PathBuf,
    pub terrain: Option<PathBuf>,
    pub water: Option<PathBuf>,
    pub rivers: Option<PathBuf>,
    pub countries: Option<PathBuf>,
    pub ownership: Option<PathBuf>,
}

impl AssetPaths {
    /// The fixed file names under `root`. Optional assets are only
    /// configured when present on disk.
    pub fn in_dir(root: &Path) -> Self {
        let optional = |name: &str| {
            let path = root.join(name);
            path.exists().then_some(path)
        };
        AssetPaths {
            provinces: root.join(PROVINCES_FILE),
            definitions: root.join(DEFINITIONS_FILE),
            terrain: optional(TERRAIN_FILE),
            water: optional(WATER_FILE),
            rivers: optional(RIVERS_FILE),
            countries: optional(COUNTRIES_FILE),
            ownership: optional(OWNERSHIP_FILE),
        }
    }
}

/// Everything the map engine needs, decoded and validated.
#[derive(Debug, Clone)]
pub struct MapAssets {
    pub provinces: RgbaImage,
    pub terrain: Option<RgbaImage>,
    pub water: Option<RgbaImage>,
    pub rivers: Option<RgbaImage>,
    pub definitions: Vec<RegionDefinition>,
    pub countries: CountryTable,
    pub ownership: OwnershipMap,
}

impl MapAssets {
    pub fn load(paths: &AssetPaths) -> Result<Self, DataError> {
        let rasters: [(&str, Option<&Path>); 4] = [
            ("provinces", Some(paths.provinces.as_path())),
            ("terrain", paths.terrain.as_deref()),
            ("water", paths.water.as_deref()),
            ("rivers", paths.rivers.as_deref()),
        ];

        let decoded: Vec<Option<RgbaImage>> = rasters[..]
            .par_iter()
            .map(|(_, path)| path.map(load_raster).transpose())
            .collect::<Result<_, _>>()?;

        let mut decoded = decoded.into_iter();
        let provinces = decoded.next().flatten().ok_or_else(|| {
            DataError::MissingAsset(paths.provinces.clone())
        })?;
        let terrain = decoded.next().flatten();
        let water = decoded.next().flatten();
        let rivers = decoded.next().flatten();

        let expected = provinces.dimensions();
        for ((name, _), image) in rasters[1..]
            .iter()
            .zip([&terrain, &water, &rivers])
        {
            if let Some(image) = image {
                check_dimensions(name, expected, image.dimensions())?;
            }
        }

        let definitions = load_definitions(&paths.definitions)?;
        let countries = match &paths.countries {
            Some(path) => CountryTable::load(path)?,
            None => CountryTable::new(),
        };
        let ownership = match &paths.ownership {
            Some(path) => {
                let (map, skipped) = OwnershipMap::load_snapshot(path)?;
                if skipped > 0 {
                    warn!("{} unreadable lines in {}", skipped, path.display());
                }
                map
            }
            None => OwnershipMap::new(),
        };

        info!(
            "Loaded map assets: {}x{}, {} regions, {} countries, {} owned provinces",
            expected.0,
            expected.1,
            definitions.len(),
            countries.len(),
            ownership.len()
        );

        Ok(MapAssets {
            provinces,
            terrain,
            water,
            rivers,
            definitions,
            countries,
            ownership,
        })
    }
}

fn check_dimensions(name: &str, expected: (u32, u32), actual: (u32, u32)) -> Result<(), DataError> {
    if expected != actual {
        return Err(DataError::DimensionMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Decodes a raster to RGBA8.
pub fn load_raster(path: &Path) -> Result<RgbaImage, DataError> {
    if !path.exists() {
        return Err(DataError::MissingAsset(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|source| DataError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::fs;
    use tempfile::tempdir;

    fn write_minimal(dir: &Path) {
        RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]))
            .save(dir.join(PROVINCES_FILE))
            .unwrap();
        fs::write(dir.join(DEFINITIONS_FILE), "1;255;0;0;land\n").unwrap();
    }

    #[test]
    fn test_in_dir_only_configures_present_optionals() {
        let dir = tempdir().unwrap();
        write_minimal(dir.path());
        fs::write(dir.path().join(OWNERSHIP_FILE), "1=RED\n").unwrap();
        let paths = AssetPaths::in_dir(dir.path());
        assert!(paths.terrain.is_none());
        assert_eq!(paths.ownership, Some(dir.path().join(OWNERSHIP_FILE)));
    }

    #[test]
    fn test_load_minimal() {
        let dir = tempdir().unwrap();
        write_minimal(dir.path());
        fs::write(dir.path().join(OWNERSHIP_FILE), "1=RED\n").unwrap();
        let assets = MapAssets::load(&AssetPaths::in_dir(dir.path())).unwrap();
        assert_eq!(assets.provinces.dimensions(), (2, 2));
        assert_eq!(assets.definitions.len(), 1);
        assert_eq!(assets.ownership.owner(1), Some("RED"));
        assert!(assets.rivers.is_none());
    }

    #[test]
    fn test_missing_province_raster() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFINITIONS_FILE), "1;255;0;0;land\n").unwrap();
        let err = MapAssets::load(&AssetPaths::in_dir(dir.path())).unwrap_err();
        match err {
            DataError::MissingAsset(path) => assert!(path.ends_with(PROVINCES_FILE)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_configured_optional_must_exist() {
        let dir = tempdir().unwrap();
        write_minimal(dir.path());
        let mut paths = AssetPaths::in_dir(dir.path());
        paths.rivers = Some(dir.path().join("nope.png"));
        assert!(matches!(
            MapAssets::load(&paths),
            Err(DataError::MissingAsset(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_names_raster() {
        let dir = tempdir().unwrap();
        write_minimal(dir.path());
        RgbaImage::new(3, 2).save(dir.path().join(TERRAIN_FILE)).unwrap();
        let err = MapAssets::load(&AssetPaths::in_dir(dir.path())).unwrap_err();
        match err {
            DataError::DimensionMismatch {
                name,
                expected,
                actual,
            } => {
                assert_eq!(name, "terrain");
                assert_eq!(expected, (2, 2));
                assert_eq!(actual, (3, 2));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
