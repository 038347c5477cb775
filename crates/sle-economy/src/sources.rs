use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sle_types::PlanetId;

/// Breakdown of where a player's spendable resources come from.
///
/// Derived on demand; never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSources {
    pub planets: BTreeMap<PlanetId, u32>,
    pub trade_currency: u32,
}

impl ResourceSources {
    pub fn planet_total(&self) -> u32 {
        self.planets
            .values()
            .fold(0u32, |acc, value| acc.saturating_add(*value))
    }

    pub fn total(&self) -> u32 {
        self.planet_total().saturating_add(self.trade_currency)
    }
}

/// Breakdown of where a player's spendable influence comes from.
///
/// With `for_voting` set, trade currency contributes nothing: votes may not
/// be funded by the fungible currency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceSources {
    pub planets: BTreeMap<PlanetId, u32>,
    pub trade_currency: u32,
    pub for_voting: bool,
}

impl InfluenceSources {
    pub fn planet_total(&self) -> u32 {
        self.planets
            .values()
            .fold(0u32, |acc, value| acc.saturating_add(*value))
    }

    /// Trade currency that may actually be counted.
    pub fn usable_trade_currency(&self) -> u32 {
        if self.for_voting {
            0
        } else {
            self.trade_currency
        }
    }

    pub fn total(&self) -> u32 {
        self.planet_total()
            .saturating_add(self.usable_trade_currency())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_ignores_trade_currency() {
        let mut sources = InfluenceSources {
            planets: BTreeMap::from([(PlanetId::from("Mecatol Rex"), 6)]),
            trade_currency: 4,
            for_voting: false,
        };
        assert_eq!(sources.total(), 10);
        sources.for_voting = true;
        assert_eq!(sources.total(), 6);
    }

    #[test]
    fn resource_totals_saturate() {
        let sources = ResourceSources {
            planets: BTreeMap::from([(PlanetId::from("a"), u32::MAX), (PlanetId::from("b"), 5)]),
            trade_currency: 1,
        };
        assert_eq!(sources.total(), u32::MAX);
    }
}
