use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sle_types::{Planet, PlanetId, Player, PlayerId};

/// Immutable description of exactly which planets and how much trade
/// currency a spend will consume.
///
/// Plans come from [`ResourceManager::create_spending_plan`] or from
/// [`SpendingPlan::builder`]. An invalid plan keeps the requested amounts
/// and a human-readable shortfall message but commits nothing.
///
/// A planet may appear in both exhaust maps; it is still exhausted exactly
/// once (see [`SpendingPlan::planets_to_exhaust`]).
///
/// [`ResourceManager::create_spending_plan`]: crate::ResourceManager::create_spending_plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingPlan {
    owner: PlayerId,
    requested_resources: u32,
    requested_influence: u32,
    for_voting: bool,
    resource_exhaust: BTreeMap<PlanetId, u32>,
    influence_exhaust: BTreeMap<PlanetId, u32>,
    trade_currency_for_resources: u32,
    trade_currency_for_influence: u32,
    valid: bool,
    error: Option<String>,
}

impl SpendingPlan {
    /// Start a hand-built plan for `owner`.
    pub fn builder(owner: impl Into<PlayerId>) -> SpendingPlanBuilder {
        SpendingPlanBuilder {
            owner: owner.into(),
            for_voting: false,
            resource_exhaust: BTreeMap::new(),
            influence_exhaust: BTreeMap::new(),
            trade_currency_for_resources: 0,
            trade_currency_for_influence: 0,
        }
    }

    /// A plan that commits nothing and explains why.
    pub fn invalid(
        owner: PlayerId,
        requested_resources: u32,
        requested_influence: u32,
        for_voting: bool,
        error: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            requested_resources,
            requested_influence,
            for_voting,
            resource_exhaust: BTreeMap::new(),
            influence_exhaust: BTreeMap::new(),
            trade_currency_for_resources: 0,
            trade_currency_for_influence: 0,
            valid: false,
            error: Some(error.into()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn committed(
        owner: PlayerId,
        requested_resources: u32,
        requested_influence: u32,
        for_voting: bool,
        resource_exhaust: BTreeMap<PlanetId, u32>,
        influence_exhaust: BTreeMap<PlanetId, u32>,
        trade_currency_for_resources: u32,
        trade_currency_for_influence: u32,
    ) -> Self {
        Self {
            owner,
            requested_resources,
            requested_influence,
            for_voting,
            resource_exhaust,
            influence_exhaust,
            trade_currency_for_resources,
            trade_currency_for_influence,
            valid: true,
            error: None,
        }
    }

    /// A valid plan that spends nothing.
    pub fn empty(owner: PlayerId) -> Self {
        Self::committed(owner, 0, 0, false, BTreeMap::new(), BTreeMap::new(), 0, 0)
    }

    pub fn owner(&self) -> &PlayerId {
        &self.owner
    }

    pub fn requested_resources(&self) -> u32 {
        self.requested_resources
    }

    pub fn requested_influence(&self) -> u32 {
        self.requested_influence
    }

    pub fn for_voting(&self) -> bool {
        self.for_voting
    }

    pub fn resource_exhaust(&self) -> &BTreeMap<PlanetId, u32> {
        &self.resource_exhaust
    }

    pub fn influence_exhaust(&self) -> &BTreeMap<PlanetId, u32> {
        &self.influence_exhaust
    }

    pub fn trade_currency_for_resources(&self) -> u32 {
        self.trade_currency_for_resources
    }

    pub fn trade_currency_for_influence(&self) -> u32 {
        self.trade_currency_for_influence
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every planet the plan touches, each listed once.
    pub fn planets_to_exhaust(&self) -> BTreeSet<PlanetId> {
        self.resource_exhaust
            .keys()
            .chain(self.influence_exhaust.keys())
            .cloned()
            .collect()
    }

    pub fn trade_currency_total(&self) -> u32 {
        self.trade_currency_for_resources
            .saturating_add(self.trade_currency_for_influence)
    }

    /// Resources the plan commits (planets plus trade currency).
    pub fn committed_resources(&self) -> u32 {
        sum(&self.resource_exhaust).saturating_add(self.trade_currency_for_resources)
    }

    /// Influence the plan commits (planets plus trade currency).
    pub fn committed_influence(&self) -> u32 {
        sum(&self.influence_exhaust).saturating_add(self.trade_currency_for_influence)
    }

    pub fn is_empty(&self) -> bool {
        self.resource_exhaust.is_empty()
            && self.influence_exhaust.is_empty()
            && self.trade_currency_total() == 0
    }
}

fn sum(map: &BTreeMap<PlanetId, u32>) -> u32 {
    map.values().fold(0u32, |acc, v| acc.saturating_add(*v))
}

/// Hand-assembles a [`SpendingPlan`].
///
/// Structural checks happen in [`SpendingPlanBuilder::build`]; checks that
/// need planet values happen when the plan is executed.
#[derive(Clone, Debug)]
pub struct SpendingPlanBuilder {
    owner: PlayerId,
    for_voting: bool,
    resource_exhaust: BTreeMap<PlanetId, u32>,
    influence_exhaust: BTreeMap<PlanetId, u32>,
    trade_currency_for_resources: u32,
    trade_currency_for_influence: u32,
}

impl SpendingPlanBuilder {
    pub fn exhaust_for_resources(mut self, planet: impl Into<PlanetId>, amount: u32) -> Self {
        self.resource_exhaust.insert(planet.into(), amount);
        self
    }

    pub fn exhaust_for_influence(mut self, planet: impl Into<PlanetId>, amount: u32) -> Self {
        self.influence_exhaust.insert(planet.into(), amount);
        self
    }

    pub fn trade_currency_for_resources(mut self, amount: u32) -> Self {
        self.trade_currency_for_resources = amount;
        self
    }

    pub fn trade_currency_for_influence(mut self, amount: u32) -> Self {
        self.trade_currency_for_influence = amount;
        self
    }

    pub fn for_voting(mut self, for_voting: bool) -> Self {
        self.for_voting = for_voting;
        self
    }

    /// Finish the plan. The requested amounts are the committed totals.
    pub fn build(self) -> SpendingPlan {
        let requested_resources =
            sum(&self.resource_exhaust).saturating_add(self.trade_currency_for_resources);
        let requested_influence =
            sum(&self.influence_exhaust).saturating_add(self.trade_currency_for_influence);

        if self.for_voting && self.trade_currency_for_influence > 0 {
            return SpendingPlan::invalid(
                self.owner,
                requested_resources,
                requested_influence,
                true,
                format!(
                    "voting influence cannot be paid with trade currency ({} requested)",
                    self.trade_currency_for_influence
                ),
            );
        }

        if let Some((planet, _)) = self
            .resource_exhaust
            .iter()
            .chain(self.influence_exhaust.iter())
            .find(|(_, amount)| **amount == 0)
        {
            return SpendingPlan::invalid(
                self.owner,
                requested_resources,
                requested_influence,
                self.for_voting,
                format!("planet {planet} is listed with a zero amount"),
            );
        }

        SpendingPlan::committed(
            self.owner,
            requested_resources,
            requested_influence,
            self.for_voting,
            self.resource_exhaust,
            self.influence_exhaust,
            self.trade_currency_for_resources,
            self.trade_currency_for_influence,
        )
    }
}

/// Fresh values produced by executing a plan.
///
/// The caller substitutes these into its own snapshot; nothing the plan was
/// computed against has been changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendingOutcome {
    pub player: Player,
    pub planets: Vec<Planet>,
    pub exhausted: Vec<PlanetId>,
    pub trade_currency_spent: u32,
}
