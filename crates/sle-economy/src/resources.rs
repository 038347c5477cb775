use std::collections::BTreeMap;

use sle_types::{Planet, PlanetId, Player};
use tracing::debug;

use crate::error::{EconomyError, SpendPool};
use crate::plan::{SpendingOutcome, SpendingPlan};
use crate::sources::{InfluenceSources, ResourceSources};
use crate::view::ResourceView;

/// Pure resource/influence computation over a [`ResourceView`].
///
/// The manager never changes what it views. [`Self::execute_spending_plan`]
/// hands back fresh copies that the owner of the view substitutes in.
pub struct ResourceManager<'a, V: ResourceView + ?Sized> {
    view: &'a V,
}

/// Where a ready planet's value goes in one candidate allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Use {
    Idle,
    Resources,
    Influence,
}

/// Cheapest known assignment reaching one (resources, influence) coverage.
#[derive(Clone, Debug)]
struct Route {
    /// Planet value committed across both pools.
    spent: u64,
    /// Value the committed planets had in the pool they were not used for.
    forgone: u64,
    uses: Vec<Use>,
}

impl Route {
    fn rank(&self) -> (u64, u64) {
        (self.spent, self.forgone)
    }

    fn then(&self, used: Use, spent: u32, forgone: u32) -> Self {
        let mut uses = self.uses.clone();
        uses.push(used);
        Self {
            spent: self.spent + u64::from(spent),
            forgone: self.forgone + u64::from(forgone),
            uses,
        }
    }
}

struct Allocation {
    resource_exhaust: BTreeMap<PlanetId, u32>,
    influence_exhaust: BTreeMap<PlanetId, u32>,
    trade_currency_for_resources: u32,
    trade_currency_for_influence: u32,
    shortfall: Option<String>,
}

impl<'a, V: ResourceView + ?Sized> ResourceManager<'a, V> {
    pub fn new(view: &'a V) -> Self {
        Self { view }
    }

    /// Per-planet breakdown of `player`'s spendable resources.
    pub fn resource_sources(&self, player: &Player) -> ResourceSources {
        let planets = self
            .view
            .controlled_planets(player)
            .into_iter()
            .filter(|planet| planet.available_resources() > 0)
            .map(|planet| (planet.name.clone(), planet.available_resources()))
            .collect();
        ResourceSources {
            planets,
            trade_currency: player.trade_currency,
        }
    }

    /// Per-planet breakdown of `player`'s spendable influence.
    pub fn influence_sources(&self, player: &Player, for_voting: bool) -> InfluenceSources {
        let planets = self
            .view
            .controlled_planets(player)
            .into_iter()
            .filter(|planet| planet.available_influence() > 0)
            .map(|planet| (planet.name.clone(), planet.available_influence()))
            .collect();
        InfluenceSources {
            planets,
            trade_currency: player.trade_currency,
            for_voting,
        }
    }

    /// Resource value of unexhausted controlled planets plus trade currency.
    pub fn calculate_available_resources(&self, player: &Player) -> u32 {
        self.resource_sources(player).total()
    }

    /// Influence value of unexhausted controlled planets, plus trade currency
    /// unless the influence is for voting.
    pub fn calculate_available_influence(&self, player: &Player, for_voting: bool) -> u32 {
        self.influence_sources(player, for_voting).total()
    }

    /// Choose planets and trade currency covering the requested amounts.
    ///
    /// Every assignment of ready planets to the two pools is considered, each
    /// planet going to at most one pool. The chosen assignment needs the
    /// least trade currency, then overspends planet value the least, then
    /// gives up the least value in the other pool. Whatever the planets leave
    /// uncovered is paid with trade currency (never for voting influence).
    /// The plan is invalid only when no assignment is payable, and then
    /// carries a message naming the missing amount.
    pub fn create_spending_plan(
        &self,
        player: &Player,
        resource_amount: u32,
        influence_amount: u32,
        for_voting: bool,
    ) -> SpendingPlan {
        let allocation = self.allocate(player, resource_amount, influence_amount, for_voting);
        if let Some(message) = allocation.shortfall {
            debug!(
                player = %player.id,
                resource_amount,
                influence_amount,
                for_voting,
                %message,
                "spending plan rejected"
            );
            return SpendingPlan::invalid(
                player.id.clone(),
                resource_amount,
                influence_amount,
                for_voting,
                message,
            );
        }

        SpendingPlan::committed(
            player.id.clone(),
            resource_amount,
            influence_amount,
            for_voting,
            allocation.resource_exhaust,
            allocation.influence_exhaust,
            allocation.trade_currency_for_resources,
            allocation.trade_currency_for_influence,
        )
    }

    /// Whether [`Self::create_spending_plan`] would produce a valid plan.
    pub fn can_afford_spending(
        &self,
        player: &Player,
        resource_amount: u32,
        influence_amount: u32,
        for_voting: bool,
    ) -> bool {
        self.allocate(player, resource_amount, influence_amount, for_voting)
            .shortfall
            .is_none()
    }

    /// Exhaust every planet the plan names and deduct its trade currency, as
    /// one unit.
    ///
    /// Either every check passes and the outcome carries the updated copies,
    /// or an error is returned and nothing has been produced. Checks are run
    /// against the current view, so a planet exhausted since the plan was
    /// created fails the whole plan.
    pub fn execute_spending_plan(
        &self,
        plan: &SpendingPlan,
    ) -> Result<SpendingOutcome, EconomyError> {
        if !plan.is_valid() {
            return Err(EconomyError::InvalidPlan(
                plan.error().unwrap_or("plan is not valid").to_string(),
            ));
        }
        if plan.for_voting() && plan.trade_currency_for_influence() > 0 {
            return Err(EconomyError::InvalidPlan(
                "voting influence cannot be paid with trade currency".into(),
            ));
        }

        let player = self
            .view
            .player(plan.owner())
            .ok_or_else(|| EconomyError::UnknownPlayer(plan.owner().clone()))?;

        let mut planets = Vec::new();
        for id in plan.planets_to_exhaust() {
            let planet = self
                .view
                .planet(&id)
                .ok_or_else(|| EconomyError::UnknownPlanet(id.clone()))?;

            let foreign_owner = planet
                .owner
                .as_ref()
                .is_some_and(|owner| owner != &player.id);
            if !player.controls(&id) || foreign_owner {
                return Err(EconomyError::PlanetNotControlled {
                    planet: id,
                    player: player.id.clone(),
                });
            }
            if planet.is_exhausted() {
                return Err(EconomyError::PlanetExhausted(id));
            }
            if let Some(&amount) = plan.resource_exhaust().get(&id) {
                if amount > planet.resource_value {
                    return Err(EconomyError::ExceedsPlanetValue {
                        planet: id,
                        pool: SpendPool::Resources,
                        amount,
                        value: planet.resource_value,
                    });
                }
            }
            if let Some(&amount) = plan.influence_exhaust().get(&id) {
                if amount > planet.influence_value {
                    return Err(EconomyError::ExceedsPlanetValue {
                        planet: id,
                        pool: SpendPool::Influence,
                        amount,
                        value: planet.influence_value,
                    });
                }
            }
            planets.push(planet.exhaust());
        }

        let spent = plan.trade_currency_total();
        if spent > player.trade_currency {
            return Err(EconomyError::Insufficient {
                player: player.id.clone(),
                pool: SpendPool::TradeCurrency,
                requested: spent,
                available: player.trade_currency,
            });
        }

        let exhausted: Vec<PlanetId> = planets.iter().map(|p| p.name.clone()).collect();
        debug!(
            player = %player.id,
            exhausted = exhausted.len(),
            trade_currency_spent = spent,
            "spending plan executed"
        );

        Ok(SpendingOutcome {
            player: player.with_trade_currency(player.trade_currency - spent),
            planets,
            exhausted,
            trade_currency_spent: spent,
        })
    }

    fn allocate(
        &self,
        player: &Player,
        resource_amount: u32,
        influence_amount: u32,
        for_voting: bool,
    ) -> Allocation {
        let mut ready: Vec<&Planet> = self
            .view
            .controlled_planets(player)
            .into_iter()
            .filter(|planet| !planet.is_exhausted())
            .collect();
        ready.sort_by(|a, b| a.name.cmp(&b.name));

        let routes = cover(&ready, resource_amount, influence_amount);
        let best = routes.into_iter().min_by_key(|((resources, influence), route)| {
            let voting_gap = if for_voting {
                influence_amount - influence
            } else {
                0
            };
            let trade_currency =
                u64::from(resource_amount - resources) + u64::from(influence_amount - influence);
            let overspend = route.spent - u64::from(*resources) - u64::from(*influence);
            (voting_gap, trade_currency, overspend, route.forgone)
        });
        let ((resources_covered, influence_covered), route) = best.unwrap_or_else(|| {
            let idle = Route {
                spent: 0,
                forgone: 0,
                uses: vec![Use::Idle; ready.len()],
            };
            ((0, 0), idle)
        });

        let mut resource_exhaust = BTreeMap::new();
        let mut influence_exhaust = BTreeMap::new();
        for (planet, used) in ready.iter().zip(&route.uses) {
            match used {
                Use::Resources => {
                    resource_exhaust.insert(planet.name.clone(), planet.resource_value);
                }
                Use::Influence => {
                    influence_exhaust.insert(planet.name.clone(), planet.influence_value);
                }
                Use::Idle => {}
            }
        }

        let trade_currency_for_resources = resource_amount - resources_covered;
        let trade_currency_for_influence = influence_amount - influence_covered;

        let shortfall = self.describe_shortfall(
            player,
            resource_amount,
            influence_amount,
            for_voting,
            trade_currency_for_resources,
            trade_currency_for_influence,
        );

        Allocation {
            resource_exhaust,
            influence_exhaust,
            trade_currency_for_resources,
            trade_currency_for_influence,
            shortfall,
        }
    }

    fn describe_shortfall(
        &self,
        player: &Player,
        resource_amount: u32,
        influence_amount: u32,
        for_voting: bool,
        trade_currency_for_resources: u32,
        trade_currency_for_influence: u32,
    ) -> Option<String> {
        let needed = trade_currency_for_resources.saturating_add(trade_currency_for_influence);
        let voting_gap = for_voting && trade_currency_for_influence > 0;
        if !voting_gap && needed <= player.trade_currency {
            return None;
        }

        let mut reasons = Vec::new();
        let available_resources = self.calculate_available_resources(player);
        if resource_amount > available_resources {
            reasons.push(format!(
                "insufficient resources for {}: requested {resource_amount}, available {available_resources} (short by {})",
                player.id,
                resource_amount - available_resources
            ));
        }
        let available_influence = self.calculate_available_influence(player, for_voting);
        if influence_amount > available_influence {
            let qualifier = if for_voting { " for voting" } else { "" };
            reasons.push(format!(
                "insufficient influence{qualifier} for {}: requested {influence_amount}, available {available_influence} (short by {})",
                player.id,
                influence_amount - available_influence
            ));
        }
        if reasons.is_empty() {
            // Each pool is coverable on its own, but not both together.
            let usable = if voting_gap { 0 } else { player.trade_currency };
            let gap = if voting_gap {
                trade_currency_for_influence
            } else {
                needed - usable
            };
            reasons.push(format!(
                "insufficient combined value for {}: {resource_amount} resources and {influence_amount} influence need {needed} trade currency, {} held (short by {gap})",
                player.id, player.trade_currency
            ));
        }
        Some(reasons.join("; "))
    }
}

/// Every reachable (resources covered, influence covered) pair with the
/// cheapest planet assignment reaching it.
///
/// Coverage is capped at the requested amounts, so a pool that is already
/// covered takes no further planets. Planets are visited in id order and an
/// equally cheap route found earlier is kept.
fn cover(
    ready: &[&Planet],
    resource_target: u32,
    influence_target: u32,
) -> BTreeMap<(u32, u32), Route> {
    let mut routes = BTreeMap::new();
    routes.insert(
        (0, 0),
        Route {
            spent: 0,
            forgone: 0,
            uses: Vec::with_capacity(ready.len()),
        },
    );

    for planet in ready {
        let mut next: BTreeMap<(u32, u32), Route> = BTreeMap::new();
        for (&(resources, influence), route) in &routes {
            let mut options = vec![((resources, influence), route.then(Use::Idle, 0, 0))];
            if planet.resource_value > 0 && resources < resource_target {
                let covered = resources
                    .saturating_add(planet.resource_value)
                    .min(resource_target);
                options.push((
                    (covered, influence),
                    route.then(Use::Resources, planet.resource_value, planet.influence_value),
                ));
            }
            if planet.influence_value > 0 && influence < influence_target {
                let covered = influence
                    .saturating_add(planet.influence_value)
                    .min(influence_target);
                options.push((
                    (resources, covered),
                    route.then(Use::Influence, planet.influence_value, planet.resource_value),
                ));
            }

            for (key, candidate) in options {
                match next.get(&key) {
                    Some(existing) if existing.rank() <= candidate.rank() => {}
                    _ => {
                        next.insert(key, candidate);
                    }
                }
            }
        }
        routes = next;
    }

    routes
}
