use std::collections::BTreeMap;

use sle_types::{Planet, PlanetId, Player, PlayerId};

/// Read boundary the economy computes over.
///
/// The authoritative game state implements this; [`EconomySnapshot`] is a
/// standalone implementation for setup code and tests.
pub trait ResourceView {
    fn player(&self, id: &PlayerId) -> Option<&Player>;

    fn planet(&self, id: &PlanetId) -> Option<&Planet>;

    /// Planets in `player`'s controlled set, in id order. Ids with no
    /// matching planet are skipped.
    fn controlled_planets<'a>(&'a self, player: &'a Player) -> Vec<&'a Planet> {
        player
            .controlled_planets
            .iter()
            .filter_map(|id| self.planet(id))
            .collect()
    }
}

/// Plain players-and-planets view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EconomySnapshot {
    pub players: BTreeMap<PlayerId, Player>,
    pub planets: BTreeMap<PlanetId, Planet>,
}

impl EconomySnapshot {
    pub fn new(
        players: impl IntoIterator<Item = Player>,
        planets: impl IntoIterator<Item = Planet>,
    ) -> Self {
        Self {
            players: players.into_iter().map(|p| (p.id.clone(), p)).collect(),
            planets: planets.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }
}

impl ResourceView for EconomySnapshot {
    fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    fn planet(&self, id: &PlanetId) -> Option<&Planet> {
        self.planets.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controlled_planets_skips_unknown_ids() {
        let player = Player::new("sol").with_planet("Jord").with_planet("Nowhere");
        let snapshot = EconomySnapshot::new(
            vec![player.clone()],
            vec![Planet::new("Jord", 4, 2).with_owner("sol")],
        );
        let planets = snapshot.controlled_planets(&player);
        assert_eq!(planets.len(), 1);
        assert_eq!(planets[0].name, PlanetId::from("Jord"));
    }
}
