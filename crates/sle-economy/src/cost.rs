use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sle_types::{Faction, Player, Technology, UnitType};
use tracing::debug;

use crate::config::EconomyConfig;
use crate::error::EconomyError;
use crate::plan::SpendingPlan;
use crate::resources::ResourceManager;
use crate::view::ResourceView;

/// Price of one production order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCost {
    pub unit_type: UnitType,
    /// Units asked for.
    pub quantity: u32,
    /// Cost payments needed to cover `quantity`.
    pub payments: u32,
    /// Modified cost of one payment.
    pub unit_cost: u32,
    pub total_cost: u32,
    /// Units the payments actually yield; can exceed `quantity` for
    /// dual-yield units.
    pub units_produced: u32,
}

/// Affordability verdict for a [`ProductionCost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostValidationResult {
    pub affordable: bool,
    pub required: u32,
    pub available: u32,
    pub shortfall: u32,
    pub reason: Option<String>,
    /// A plan that pays the cost, when one exists.
    pub suggested_plan: Option<SpendingPlan>,
}

impl CostValidationResult {
    fn rejected(required: u32, available: u32, reason: String) -> Self {
        Self {
            affordable: false,
            required,
            available,
            shortfall: required.saturating_sub(available),
            reason: Some(reason),
            suggested_plan: None,
        }
    }
}

/// Computes modified unit and production costs and checks affordability.
#[derive(Clone, Debug)]
pub struct CostValidator {
    config: EconomyConfig,
    cost_exempt_placement: BTreeSet<UnitType>,
}

impl Default for CostValidator {
    fn default() -> Self {
        Self::standard()
    }
}

impl CostValidator {
    pub fn new(config: EconomyConfig) -> Self {
        Self {
            config,
            cost_exempt_placement: BTreeSet::new(),
        }
    }

    pub fn standard() -> Self {
        Self::new(EconomyConfig::standard())
    }

    /// Validator for a cost-exempt placement of `types`: those unit types
    /// are produced for free.
    pub fn with_cost_exempt_placement(mut self, types: impl IntoIterator<Item = UnitType>) -> Self {
        self.cost_exempt_placement.extend(types);
        self
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Base cost of `unit` with every applicable modifier, floored at zero.
    pub fn get_unit_cost(
        &self,
        unit: UnitType,
        faction: Option<&Faction>,
        upgrades: &[Technology],
    ) -> Result<u32, EconomyError> {
        let entry = self
            .config
            .units
            .get(unit)
            .ok_or(EconomyError::UnknownUnitCost(unit))?;

        let modified = self
            .config
            .modifiers
            .iter()
            .filter(|modifier| modifier.applies(unit, faction, upgrades))
            .fold(i64::from(entry.cost), |cost, modifier| cost + i64::from(modifier.delta));

        Ok(u32::try_from(modified.max(0)).unwrap_or(u32::MAX))
    }

    /// Price `quantity` units of `unit`.
    ///
    /// Payments are rounded up, so a single unit of a dual-yield type still
    /// costs one full payment. Cost-exempt-only types are refused unless a
    /// cost-exempt placement is active for them, in which case they are free.
    pub fn get_production_cost(
        &self,
        unit: UnitType,
        quantity: u32,
        faction: Option<&Faction>,
        upgrades: &[Technology],
    ) -> Result<ProductionCost, EconomyError> {
        if quantity == 0 {
            return Err(EconomyError::InvalidQuantity(quantity));
        }

        if self.can_produce_without_cost(unit) {
            return Ok(ProductionCost {
                unit_type: unit,
                quantity,
                payments: 0,
                unit_cost: 0,
                total_cost: 0,
                units_produced: quantity,
            });
        }
        if self.config.cost_exempt_only.contains(&unit) {
            return Err(EconomyError::CostExemptOnly(unit));
        }

        let unit_cost = self.get_unit_cost(unit, faction, upgrades)?;
        let per_payment = self
            .config
            .units
            .get(unit)
            .map(|entry| entry.yield_per_payment.max(1))
            .unwrap_or(1);
        let payments = quantity.div_ceil(per_payment);

        Ok(ProductionCost {
            unit_type: unit,
            quantity,
            payments,
            unit_cost,
            total_cost: payments.saturating_mul(unit_cost),
            units_produced: payments.saturating_mul(per_payment),
        })
    }

    /// Check `cost` against what `player` can spend.
    ///
    /// An affordable result carries the plan that would pay for it; an
    /// unaffordable one carries the shortfall and the reason.
    pub fn validate_production_cost<V: ResourceView + ?Sized>(
        &self,
        resources: &ResourceManager<'_, V>,
        player: &Player,
        cost: &ProductionCost,
    ) -> CostValidationResult {
        let available = resources.calculate_available_resources(player);

        if self.can_produce_without_cost(cost.unit_type) {
            return CostValidationResult {
                affordable: true,
                required: 0,
                available,
                shortfall: 0,
                reason: None,
                suggested_plan: Some(SpendingPlan::empty(player.id.clone())),
            };
        }
        if self.config.cost_exempt_only.contains(&cost.unit_type) {
            return CostValidationResult::rejected(
                cost.total_cost,
                available,
                EconomyError::CostExemptOnly(cost.unit_type).to_string(),
            );
        }

        let plan = resources.create_spending_plan(player, cost.total_cost, 0, false);
        if !plan.is_valid() {
            let reason = plan
                .error()
                .unwrap_or("production cost cannot be covered")
                .to_string();
            debug!(
                player = %player.id,
                unit = %cost.unit_type,
                required = cost.total_cost,
                available,
                "production not affordable"
            );
            return CostValidationResult::rejected(cost.total_cost, available, reason);
        }

        CostValidationResult {
            affordable: true,
            required: cost.total_cost,
            available,
            shortfall: 0,
            reason: None,
            suggested_plan: Some(plan),
        }
    }

    /// True only while a cost-exempt placement is active for `unit`.
    pub fn can_produce_without_cost(&self, unit: UnitType) -> bool {
        self.cost_exempt_placement.contains(&unit)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sle_types::Planet;

    use super::*;
    use crate::config::CostModifier;
    use crate::view::EconomySnapshot;

    #[test]
    fn single_dual_yield_unit_pays_full_price() {
        let validator = CostValidator::standard();
        let cost = validator
            .get_production_cost(UnitType::Fighter, 1, None, &[])
            .unwrap();
        assert_eq!(cost.payments, 1);
        assert_eq!(cost.total_cost, 1);
        assert_eq!(cost.units_produced, 2);

        let cost = validator
            .get_production_cost(UnitType::Fighter, 3, None, &[])
            .unwrap();
        assert_eq!(cost.payments, 2);
        assert_eq!(cost.total_cost, 2);
    }

    #[test]
    fn modifiers_apply_and_floor_at_zero() {
        let validator = CostValidator::new(
            EconomyConfig::standard()
                .with_modifier(CostModifier::faction("sol", UnitType::Destroyer, -3))
                .with_modifier(CostModifier::technology("war_sun_ii", UnitType::WarSun, -2)),
        );
        let sol = Faction::from("sol");
        assert_eq!(validator.get_unit_cost(UnitType::Destroyer, Some(&sol), &[]).unwrap(), 0);
        assert_eq!(validator.get_unit_cost(UnitType::Destroyer, None, &[]).unwrap(), 1);
        assert_eq!(
            validator
                .get_unit_cost(UnitType::WarSun, None, &[Technology::from("war_sun_ii")])
                .unwrap(),
            10
        );
    }

    #[test]
    fn unknown_unit_and_zero_quantity() {
        let config = EconomyConfig {
            units: crate::config::CostTable::default(),
            ..EconomyConfig::standard()
        };
        let validator = CostValidator::new(config);
        assert_eq!(
            validator.get_unit_cost(UnitType::Mech, None, &[]),
            Err(EconomyError::UnknownUnitCost(UnitType::Mech))
        );
        assert_eq!(
            CostValidator::standard().get_production_cost(UnitType::Mech, 0, None, &[]),
            Err(EconomyError::InvalidQuantity(0))
        );
    }

    #[test]
    fn cost_exempt_only_units_need_a_placement() {
        let validator = CostValidator::standard();
        assert!(!validator.can_produce_without_cost(UnitType::SpaceDock));
        assert_eq!(
            validator.get_production_cost(UnitType::SpaceDock, 1, None, &[]),
            Err(EconomyError::CostExemptOnly(UnitType::SpaceDock))
        );

        let placement = validator.with_cost_exempt_placement([UnitType::SpaceDock]);
        assert!(placement.can_produce_without_cost(UnitType::SpaceDock));
        let cost = placement
            .get_production_cost(UnitType::SpaceDock, 1, None, &[])
            .unwrap();
        assert_eq!(cost.total_cost, 0);
    }

    fn economy() -> (Player, EconomySnapshot) {
        let player = Player::new("P")
            .with_planet("A")
            .with_planet("B")
            .with_trade_currency(2);
        let snapshot = EconomySnapshot::new(
            vec![player.clone()],
            vec![
                Planet::new("A", 2, 1).with_owner("P"),
                Planet::new("B", 1, 3).with_owner("P").exhaust(),
            ],
        );
        (player, snapshot)
    }

    #[test]
    fn validation_reports_shortfall() {
        let (player, snapshot) = economy();
        let manager = ResourceManager::new(&snapshot);
        let validator = CostValidator::standard();

        let cost = validator
            .get_production_cost(UnitType::Dreadnought, 2, None, &[])
            .unwrap();
        let result = validator.validate_production_cost(&manager, &player, &cost);
        assert!(!result.affordable);
        assert_eq!(result.required, 8);
        assert_eq!(result.available, 4);
        assert_eq!(result.shortfall, 4);
        assert!(result.reason.unwrap().contains("short by 4"));
        assert!(result.suggested_plan.is_none());
    }

    #[test]
    fn validation_suggests_plan() {
        let (player, snapshot) = economy();
        let manager = ResourceManager::new(&snapshot);
        let validator = CostValidator::standard();

        let cost = validator
            .get_production_cost(UnitType::Carrier, 1, None, &[])
            .unwrap();
        let result = validator.validate_production_cost(&manager, &player, &cost);
        assert!(result.affordable);
        assert_eq!(result.shortfall, 0);
        let plan = result.suggested_plan.unwrap();
        assert!(plan.committed_resources() >= 3);
        manager.execute_spending_plan(&plan).unwrap();
    }

    #[test]
    fn validation_rejects_hand_built_exempt_cost() {
        let (player, snapshot) = economy();
        let manager = ResourceManager::new(&snapshot);
        let cost = ProductionCost {
            unit_type: UnitType::Pds,
            quantity: 1,
            payments: 0,
            unit_cost: 0,
            total_cost: 0,
            units_produced: 1,
        };
        let result = CostValidator::standard().validate_production_cost(&manager, &player, &cost);
        assert!(!result.affordable);
        assert!(result.reason.unwrap().contains("cost-exempt"));

        let result = CostValidator::standard()
            .with_cost_exempt_placement([UnitType::Pds])
            .validate_production_cost(&manager, &player, &cost);
        assert!(result.affordable);
        assert!(result.suggested_plan.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn payments_always_cover_quantity(
            quantity in 1u32..50,
            unit in prop::sample::select(UnitType::ALL.to_vec()),
        ) {
            let validator = CostValidator::standard();
            match validator.get_production_cost(unit, quantity, None, &[]) {
                Ok(cost) => {
                    prop_assert!(cost.units_produced >= quantity);
                    prop_assert!(cost.payments >= 1);
                    prop_assert_eq!(cost.total_cost, cost.payments * cost.unit_cost);
                }
                Err(e) => prop_assert_eq!(e, EconomyError::CostExemptOnly(unit)),
            }
        }
    }
}
