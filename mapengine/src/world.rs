use mapdata::index::NO_SLOT;
use mapdata::{CountryTable, DataError, MapAssets, OwnershipMap, ProvinceIndex};

/// The state every derived layer is a function of.
#[derive(Debug, Clone)]
pub struct World {
    pub index: ProvinceIndex,
    pub ownership: OwnershipMap,
    pub countries: CountryTable,
}

impl World {
    pub fn new(index: ProvinceIndex, ownership: OwnershipMap, countries: CountryTable) -> Self {
        Self {
            index,
            ownership,
            countries,
        }
    }

    /// Builds the province index from loaded assets and takes over their
    /// ownership and colour tables.
    pub fn from_assets(assets: &MapAssets) -> Result<Self, DataError> {
        let index = ProvinceIndex::build(&assets.definitions, &assets.provinces)?;
        Ok(Self::new(
            index,
            assets.ownership.clone(),
            assets.countries.clone(),
        ))
    }

    /// Owner of the province occupying `slot`.
    pub fn owner_of_slot(&self, slot: u32) -> Option<&str> {
        let province = self.index.province(slot)?;
        self.ownership.owner(province.id)
    }

    /// Snapshot of every slot's owner as a small integer, for per-pixel scans.
    pub fn slot_owners(&self) -> SlotOwners {
        let mut tags: Vec<String> = Vec::new();
        let codes = self
            .index
            .iter()
            .map(|province| {
                if province.is_water() {
                    return SlotOwners::WATER;
                }
                match self.ownership.owner(province.id) {
                    None => SlotOwners::UNOWNED,
                    Some(tag) => match tags.iter().position(|t| t == tag) {
                        Some(i) => i as u32 + 1,
                        None => {
                            tags.push(tag.to_string());
                            tags.len() as u32
                        }
                    },
                }
            })
            .collect();
        SlotOwners { codes, tags }
    }
}

/// Per-slot owner codes: [`SlotOwners::UNOWNED`], [`SlotOwners::WATER`], or a
/// 1-based country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOwners {
    codes: Vec<u32>,
    tags: Vec<String>,
}

impl SlotOwners {
    pub const UNOWNED: u32 = 0;
    pub const WATER: u32 = u32::MAX - 1;
    /// Code returned for background pixels.
    pub const BACKGROUND: u32 = u32::MAX;

    /// Code for a slot from the index's slot buffer (which may be `NO_SLOT`).
    #[inline]
    pub fn code(&self, slot: u32) -> u32 {
        if slot == NO_SLOT {
            return Self::BACKGROUND;
        }
        self.codes
            .get(slot as usize)
            .copied()
            .unwrap_or(Self::BACKGROUND)
    }

    pub fn code_of(&self, tag: &str) -> Option<u32> {
        self.tags.iter().position(|t| t == tag).map(|i| i as u32 + 1)
    }

    pub fn tag(&self, code: u32) -> Option<&str> {
        let i = code.checked_sub(1)? as usize;
        self.tags.get(i).map(String::as_str)
    }
}
