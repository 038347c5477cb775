use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Producible unit and structure types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Infantry,
    Mech,
    Fighter,
    Destroyer,
    Cruiser,
    Carrier,
    Dreadnought,
    WarSun,
    Flagship,
    Pds,
    SpaceDock,
}

impl UnitType {
    pub const ALL: [UnitType; 11] = [
        UnitType::Infantry,
        UnitType::Mech,
        UnitType::Fighter,
        UnitType::Destroyer,
        UnitType::Cruiser,
        UnitType::Carrier,
        UnitType::Dreadnought,
        UnitType::WarSun,
        UnitType::Flagship,
        UnitType::Pds,
        UnitType::SpaceDock,
    ];

    /// Structures are placed rather than produced.
    pub fn is_structure(&self) -> bool {
        matches!(self, Self::Pds | Self::SpaceDock)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infantry => "infantry",
            Self::Mech => "mech",
            Self::Fighter => "fighter",
            Self::Destroyer => "destroyer",
            Self::Cruiser => "cruiser",
            Self::Carrier => "carrier",
            Self::Dreadnought => "dreadnought",
            Self::WarSun => "war_sun",
            Self::Flagship => "flagship",
            Self::Pds => "pds",
            Self::SpaceDock => "space_dock",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str() == normalized)
            .ok_or_else(|| TypeError::UnknownUnitType(s.to_string()))
    }
}
