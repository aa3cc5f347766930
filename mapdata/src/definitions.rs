use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ProvinceId;
use crate::color::ColorKey;
use crate::error::DataError;

/// Region classification from the definition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RegionCategory {
    Land,
    Sea,
    Lake,
    Ocean,
    Other(String),
}

impl RegionCategory {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "land" => RegionCategory::Land,
            "sea" => RegionCategory::Sea,
            "lake" => RegionCategory::Lake,
            "ocean" => RegionCategory::Ocean,
            other => RegionCategory::Other(other.to_string()),
        }
    }

    /// Sea, lake and ocean regions are drawn with the water tint and never
    /// form political borders.
    pub fn is_water(&self) -> bool {
        matches!(
            self,
            RegionCategory::Sea | RegionCategory::Lake | RegionCategory::Ocean
        )
    }
}

/// One row of the region definition table:
/// `id;r;g;b;category;coastal;terrain;continent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDefinition {
    pub id: ProvinceId,
    pub color: ColorKey,
    pub category: RegionCategory,
    pub coastal: bool,
    pub terrain: String,
    pub continent: String,
}

/// Loads region definitions from a `;`-separated file.
pub fn load_definitions(path: &Path) -> Result<Vec<RegionDefinition>, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    parse_definitions(file)
}

/// Parses region definitions.
///
/// A first row with a non-numeric id is a header and is skipped. Id `0` is
/// the reserved background region and is skipped too. Any other row that
/// cannot be read is a [`DataError::MalformedDefinition`].
pub fn parse_definitions<R: Read>(reader: R) -> Result<Vec<RegionDefinition>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut definitions = Vec::new();
    let mut seen = HashSet::new();

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row as u64 + 1);
        if record.iter().all(str::is_empty) {
            continue;
        }

        let id_field = record.get(0).unwrap_or_default();
        let id: ProvinceId = match id_field.parse() {
            Ok(id) => id,
            Err(_) if row == 0 => {
                debug!("Skipping definition header: {:?}", id_field);
                continue;
            }
            Err(_) => {
                return Err(DataError::MalformedDefinition {
                    line,
                    reason: format!("non-numeric region id '{}'", id_field),
                });
            }
        };
        if id == 0 {
            continue;
        }
        if record.len() < 5 {
            return Err(DataError::MalformedDefinition {
                line,
                reason: format!("expected at least 5 fields, found {}", record.len()),
            });
        }

        let channel = |i: usize, name: &str| -> Result<u8, DataError> {
            record[i]
                .parse::<u8>()
                .map_err(|_| DataError::MalformedDefinition {
                    line,
                    reason: format!("invalid {} component '{}'", name, &record[i]),
                })
        };
        let color = ColorKey::from_rgb(channel(1, "red")?, channel(2, "green")?, channel(3, "blue")?);

        if !seen.insert(id) {
            return Err(DataError::DuplicateRegionId(id));
        }

        definitions.push(RegionDefinition {
            id,
            color,
            category: RegionCategory::parse(&record[4]),
            coastal: record
                .get(5)
                .is_some_and(|s| s.eq_ignore_ascii_case("true")),
            terrain: record
                .get(6)
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string(),
            continent: record.get(7).unwrap_or_default().to_string(),
        });
    }

    debug!("Parsed {} region definitions", definitions.len());
    Ok(definitions)
}
