use serde::{Deserialize, Serialize};

use crate::identity::{PlanetId, PlayerId};

/// A planet on the map.
///
/// Planets are the exhaustible source of resources and influence. An
/// exhausted planet contributes nothing until it is readied again, which
/// normally happens during the status phase at the start of a round.
/// [`Planet::ready`] and [`Planet::exhaust`] are the only mutators of the
/// exhaustion flag, and both return an updated copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    pub name: PlanetId,
    pub owner: Option<PlayerId>,
    pub resource_value: u32,
    pub influence_value: u32,
    exhausted: bool,
}

impl Planet {
    /// An unowned, ready planet.
    pub fn new(name: impl Into<PlanetId>, resource_value: u32, influence_value: u32) -> Self {
        Self {
            name: name.into(),
            owner: None,
            resource_value,
            influence_value,
            exhausted: false,
        }
    }

    /// Copy of this planet controlled by `owner`.
    pub fn with_owner(&self, owner: impl Into<PlayerId>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..self.clone()
        }
    }

    /// Copy of this planet with the exhaustion flag cleared.
    pub fn ready(&self) -> Self {
        Self {
            exhausted: false,
            ..self.clone()
        }
    }

    /// Copy of this planet with the exhaustion flag set.
    pub fn exhaust(&self) -> Self {
        Self {
            exhausted: true,
            ..self.clone()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        self.owner.as_ref() == Some(player)
    }

    /// Resources this planet can contribute right now.
    pub fn available_resources(&self) -> u32 {
        if self.exhausted {
            0
        } else {
            self.resource_value
        }
    }

    /// Influence this planet can contribute right now.
    pub fn available_influence(&self) -> u32 {
        if self.exhausted {
            0
        } else {
            self.influence_value
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn exhausted_planet_contributes_nothing() {
        let planet = Planet::new("Mecatol Rex", 1, 6).exhaust();
        assert!(planet.is_exhausted());
        assert_eq!(planet.available_resources(), 0);
        assert_eq!(planet.available_influence(), 0);

        let readied = planet.ready();
        assert_eq!(readied.available_resources(), 1);
        assert_eq!(readied.available_influence(), 6);
    }

    #[test]
    fn exhaust_leaves_original_untouched() {
        let planet = Planet::new("Jord", 4, 2);
        let exhausted = planet.exhaust();
        assert!(!planet.is_exhausted());
        assert!(exhausted.is_exhausted());
    }

    #[test]
    fn ownership_helpers() {
        let planet = Planet::new("Arc Prime", 4, 0).with_owner("barony");
        assert!(planet.is_owned_by(&PlayerId::from("barony")));
        assert!(!planet.is_owned_by(&PlayerId::from("hacan")));
    }

    #[test]
    fn serde_roundtrip_keeps_exhaustion() {
        let planet = Planet::new("Lodor", 3, 1).exhaust();
        let json = serde_json::to_string(&planet).unwrap();
        let parsed: Planet = serde_json::from_str(&json).unwrap();
        assert_eq!(planet, parsed);
    }

    proptest! {
        #[test]
        fn exhaust_and_ready_are_idempotent(
            r in 0u32..10,
            i in 0u32..10,
            start_exhausted in any::<bool>(),
        ) {
            let planet = Planet::new("Quann", r, i);
            let planet = if start_exhausted { planet.exhaust() } else { planet };

            prop_assert_eq!(planet.exhaust().exhaust(), planet.exhaust());
            prop_assert_eq!(planet.ready().ready(), planet.ready());
            prop_assert_eq!(planet.exhaust().ready().available_resources(), r);
            prop_assert_eq!(planet.exhaust().available_influence(), 0);
        }
    }
}
