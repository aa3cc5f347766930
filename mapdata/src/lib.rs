//! Data layer for the political map: region definitions, the colour-keyed
//! province index, ownership assignments and the country colour table.

pub mod assets;
pub mod color;
pub mod countries;
pub mod definitions;
pub mod error;
pub mod index;
pub mod ownership;

/// Stable region identifier from the definition table.
pub type ProvinceId = u32;

/// Country identifier, usually a short upper-case tag such as `USA`.
pub type CountryTag = String;

pub use assets::{AssetPaths, MapAssets};
pub use color::ColorKey;
pub use countries::{CountryInfo, CountryTable};
pub use definitions::{RegionCategory, RegionDefinition};
pub use error::DataError;
pub use index::{Province, ProvinceIndex};
pub use ownership::{CountryRules, ImportReport, OwnershipChange, OwnershipMap};
