use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::{PlanetId, PlayerId};

/// A seat at the table.
///
/// The player's own wallet holds only trade currency and commodities;
/// resources and influence come from the planets it controls. Balances are
/// unsigned, so a player can never hold a negative amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub trade_currency: u32,
    pub commodities: u32,
    pub commodity_cap: u32,
    pub controlled_planets: BTreeSet<PlanetId>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            trade_currency: 0,
            commodities: 0,
            commodity_cap: 0,
            controlled_planets: BTreeSet::new(),
        }
    }

    /// Copy with the given trade currency balance.
    pub fn with_trade_currency(&self, amount: u32) -> Self {
        Self {
            trade_currency: amount,
            ..self.clone()
        }
    }

    /// Copy with the given commodity holding and cap.
    pub fn with_commodities(&self, commodities: u32, cap: u32) -> Self {
        Self {
            commodities: commodities.min(cap),
            commodity_cap: cap,
            ..self.clone()
        }
    }

    /// Copy that additionally controls `planet`.
    pub fn with_planet(&self, planet: impl Into<PlanetId>) -> Self {
        let mut next = self.clone();
        next.controlled_planets.insert(planet.into());
        next
    }

    /// Copy with commodities refilled to the cap.
    pub fn replenish_commodities(&self) -> Self {
        Self {
            commodities: self.commodity_cap,
            ..self.clone()
        }
    }

    pub fn controls(&self, planet: &PlanetId) -> bool {
        self.controlled_planets.contains(planet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_style_copies_do_not_alias() {
        let base = Player::new("hacan").with_trade_currency(3);
        let richer = base.with_trade_currency(7);
        assert_eq!(base.trade_currency, 3);
        assert_eq!(richer.trade_currency, 7);
    }

    #[test]
    fn commodities_are_clamped_to_cap() {
        let player = Player::new("hacan").with_commodities(9, 6);
        assert_eq!(player.commodities, 6);

        let spent = Player {
            commodities: 0,
            ..player.clone()
        };
        assert_eq!(spent.replenish_commodities().commodities, 6);
    }

    #[test]
    fn controls_tracks_planets() {
        let player = Player::new("jol-nar").with_planet("Jol").with_planet("Nar");
        assert!(player.controls(&PlanetId::from("Jol")));
        assert!(!player.controls(&PlanetId::from("Mecatol Rex")));
        assert_eq!(player.controlled_planets.len(), 2);
    }
}
