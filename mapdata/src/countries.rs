use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::CountryTag;
use crate::color::fallback_country_color;
use crate::error::DataError;

/// Display data for one country.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CountryInfo {
    pub name: String,
    /// Written as `#RRGGBB` in JSON.
    #[serde(with = "hex_color")]
    pub color: [u8; 3],
}

/// Country tag → name and colour. Read-only for the map engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CountryTable {
    countries: BTreeMap<CountryTag, CountryInfo>,
}

impl CountryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{ "TAG": { "name": "...", "color": "#RRGGBB" }, ... }`.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn insert(&mut self, tag: impl Into<CountryTag>, name: impl Into<String>, color: [u8; 3]) {
        self.countries.insert(
            tag.into(),
            CountryInfo {
                name: name.into(),
                color,
            },
        );
    }

    pub fn get(&self, tag: &str) -> Option<&CountryInfo> {
        self.countries.get(tag)
    }

    /// Table colour, or a stable hashed colour for unknown tags.
    pub fn color_of(&self, tag: &str) -> [u8; 3] {
        self.get(tag)
            .map(|c| c.color)
            .unwrap_or_else(|| fallback_country_color(tag))
    }

    /// Display name, falling back to the tag itself.
    pub fn name_of<'a>(&'a self, tag: &'a str) -> &'a str {
        self.get(tag).map(|c| c.name.as_str()).unwrap_or(tag)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CountryInfo)> {
        self.countries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

mod hex_color {
    use crate::color::parse_hex_color;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(color: &[u8; 3], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 3], D::Error> {
        let s = String::deserialize(d)?;
        parse_hex_color(&s).ok_or_else(|| D::Error::custom(format!("invalid hex colour '{}'", s)))
    }
}
