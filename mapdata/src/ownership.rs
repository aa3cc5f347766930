//! Province → country assignments, plus the two text formats they travel in:
//! the `id=TAG` snapshot and the `id;r;g;b;name;...` bulk import.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::color::ColorKey;
use crate::error::DataError;
use crate::index::ProvinceIndex;
use crate::{CountryTag, ProvinceId};

/// How many unmatched provinces an import lists in its log line.
const UNMATCHED_LOG_LIMIT: usize = 20;

/// Record of one effective ownership mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipChange {
    pub province: ProvinceId,
    pub previous: Option<CountryTag>,
    pub current: Option<CountryTag>,
}

impl OwnershipChange {
    /// Countries whose territory changed shape.
    pub fn affected(&self) -> impl Iterator<Item = &str> {
        self.previous.iter().chain(self.current.iter()).map(String::as_str)
    }
}

/// Province id → owning country. Absent entries are unowned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipMap {
    owners: BTreeMap<ProvinceId, CountryTag>,
}

impl FromIterator<(ProvinceId, CountryTag)> for OwnershipMap {
    fn from_iter<T: IntoIterator<Item = (ProvinceId, CountryTag)>>(iter: T) -> Self {
        OwnershipMap {
            owners: iter.into_iter().collect(),
        }
    }
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, province: ProvinceId) -> Option<&str> {
        self.owners.get(&province).map(String::as_str)
    }

    /// Sets or clears the owner. Returns `None` when nothing changed.
    pub fn assign(
        &mut self,
        province: ProvinceId,
        owner: Option<CountryTag>,
    ) -> Option<OwnershipChange> {
        if self.owners.get(&province) == owner.as_ref() {
            return None;
        }
        let previous = match &owner {
            Some(tag) => self.owners.insert(province, tag.clone()),
            None => self.owners.remove(&province),
        };
        Some(OwnershipChange {
            province,
            previous,
            current: owner,
        })
    }

    pub fn provinces_of(&self, tag: &str) -> Vec<ProvinceId> {
        self.owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == tag)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Every owning country with its provinces in ascending id order.
    pub fn territories(&self) -> BTreeMap<&str, Vec<ProvinceId>> {
        let mut out: BTreeMap<&str, Vec<ProvinceId>> = BTreeMap::new();
        for (&id, tag) in &self.owners {
            out.entry(tag.as_str()).or_default().push(id);
        }
        out
    }

    pub fn countries(&self) -> BTreeSet<&str> {
        self.owners.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProvinceId, &str)> {
        self.owners.iter().map(|(&id, tag)| (id, tag.as_str()))
    }

    /// Serialises to `id=TAG` lines in ascending numeric id order.
    pub fn to_snapshot(&self) -> String {
        let mut out = String::from("# province ownership snapshot\n");
        for (id, tag) in &self.owners {
            out.push_str(&format!("{}={}\n", id, tag));
        }
        out
    }

    /// Reads an `id=TAG` snapshot. Returns the map and the number of lines
    /// that could not be read.
    pub fn parse_snapshot(text: &str) -> (Self, usize) {
        let mut map = OwnershipMap::new();
        let mut skipped = 0;
        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed = line.split_once('=').and_then(|(id, tag)| {
                let tag = tag.trim();
                let id = id.trim().parse::<ProvinceId>().ok()?;
                (!tag.is_empty()).then(|| (id, tag.to_string()))
            });
            match parsed {
                Some((id, tag)) => {
                    map.owners.insert(id, tag);
                }
                None => {
                    warn!("Skipping snapshot line {}: {:?}", n + 1, raw);
                    skipped += 1;
                }
            }
        }
        (map, skipped)
    }

    pub fn load_snapshot(path: &Path) -> Result<(Self, usize), DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Ok(Self::parse_snapshot(&text))
    }

    /// Re-imports assignments from `id;r;g;b;name;...` rows.
    ///
    /// The province is re-derived from the rgb key (the id column is only
    /// informational) and the owner is detected from the name with `rules`.
    /// The first line is a header. Malformed rows are skipped and counted.
    pub fn import_delimited(
        &mut self,
        text: &str,
        index: &ProvinceIndex,
        rules: &CountryRules,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for raw in text.lines().skip(1) {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(';').map(str::trim).collect();
            if parts.len() < 5 {
                report.skipped += 1;
                continue;
            }
            let rgb: Option<Vec<u8>> = parts[1..4].iter().map(|s| s.parse().ok()).collect();
            let Some(rgb) = rgb else {
                report.skipped += 1;
                continue;
            };
            let key = ColorKey::from_rgb(rgb[0], rgb[1], rgb[2]);
            let Some(province) = index.by_color(key).filter(|p| !p.is_water()) else {
                report.skipped += 1;
                continue;
            };

            let name = parts[4];
            match rules.detect(name) {
                Some(tag) => {
                    if let Some(change) = self.assign(province.id, Some(tag.to_string())) {
                        report.changes.push(change);
                    }
                    report.assigned += 1;
                }
                None => {
                    report.unmatched += 1;
                    report
                        .unmatched_provinces
                        .push(format!("{}: {}", province.id, name));
                }
            }
        }

        info!(
            "Import: {} assigned, {} unmatched, {} skipped",
            report.assigned, report.unmatched, report.skipped
        );
        if !report.unmatched_provinces.is_empty() {
            let shown: Vec<&str> = report
                .unmatched_provinces
                .iter()
                .take(UNMATCHED_LOG_LIMIT)
                .map(String::as_str)
                .collect();
            warn!("Unmatched provinces: {}", shown.join(", "));
        }
        report
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows whose province received an owner (including unchanged owners).
    pub assigned: usize,
    /// Land rows whose name matched no detection rule.
    pub unmatched: usize,
    /// Malformed rows and rows whose colour is unknown or water.
    pub skipped: usize,
    /// `"id: name"` for each unmatched row.
    pub unmatched_provinces: Vec<String>,
    /// Effective mutations, in row order.
    pub changes: Vec<OwnershipChange>,
}

/// One name-detection rule: any keyword found in a province name assigns
/// that province to `country`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountryRule {
    pub country: CountryTag,
    pub keywords: Vec<String>,
}

/// Ordered keyword rules used by bulk import. The first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CountryRules {
    rules: Vec<CountryRule>,
}

impl CountryRules {
    pub fn new(rules: Vec<CountryRule>) -> Self {
        CountryRules { rules }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Case-insensitive substring match of each keyword against `name`.
    pub fn detect(&self, name: &str) -> Option<&str> {
        let name = name.trim().to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| !k.is_empty() && name.contains(&k.to_lowercase()))
            })
            .map(|rule| rule.country.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
