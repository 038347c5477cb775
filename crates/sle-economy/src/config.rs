use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sle_types::{Faction, Technology, UnitType};

use crate::error::EconomyError;

fn one() -> u32 {
    1
}

/// Base production cost of one unit type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCostEntry {
    pub unit: UnitType,
    /// Cost of one payment.
    pub cost: u32,
    /// Units produced per payment; 2 for dual-yield units.
    #[serde(default = "one")]
    pub yield_per_payment: u32,
}

impl UnitCostEntry {
    pub fn new(unit: UnitType, cost: u32) -> Self {
        Self {
            unit,
            cost,
            yield_per_payment: 1,
        }
    }

    pub fn dual_yield(unit: UnitType, cost: u32) -> Self {
        Self {
            unit,
            cost,
            yield_per_payment: 2,
        }
    }
}

/// Base cost entries, one per unit type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostTable(Vec<UnitCostEntry>);

impl CostTable {
    pub fn new(entries: impl IntoIterator<Item = UnitCostEntry>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn get(&self, unit: UnitType) -> Option<&UnitCostEntry> {
        self.0.iter().find(|entry| entry.unit == unit)
    }

    pub fn entries(&self) -> &[UnitCostEntry] {
        &self.0
    }

    /// Replace (or add) the entry for `entry.unit`.
    pub fn with_entry(mut self, entry: UnitCostEntry) -> Self {
        self.0.retain(|existing| existing.unit != entry.unit);
        self.0.push(entry);
        self
    }
}

/// What a cost modifier is keyed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierSource {
    Faction(Faction),
    Technology(Technology),
}

/// Signed adjustment to one unit type's cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModifier {
    pub source: ModifierSource,
    pub unit: UnitType,
    pub delta: i32,
}

impl CostModifier {
    pub fn faction(faction: impl Into<Faction>, unit: UnitType, delta: i32) -> Self {
        Self {
            source: ModifierSource::Faction(faction.into()),
            unit,
            delta,
        }
    }

    pub fn technology(technology: impl Into<Technology>, unit: UnitType, delta: i32) -> Self {
        Self {
            source: ModifierSource::Technology(technology.into()),
            unit,
            delta,
        }
    }

    /// Whether this modifier is in effect for the given faction and upgrades.
    pub fn applies(
        &self,
        unit: UnitType,
        faction: Option<&Faction>,
        upgrades: &[Technology],
    ) -> bool {
        if self.unit != unit {
            return false;
        }
        match &self.source {
            ModifierSource::Faction(f) => faction == Some(f),
            ModifierSource::Technology(t) => upgrades.contains(t),
        }
    }
}

/// Pricing configuration for unit production.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Unit types that can only enter play through a cost-exempt placement.
    #[serde(default)]
    pub cost_exempt_only: BTreeSet<UnitType>,
    pub units: CostTable,
    #[serde(default)]
    pub modifiers: Vec<CostModifier>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EconomyConfig {
    /// The base-game cost table. Fighters and infantry are dual-yield; PDS
    /// and space docks are placed, never produced.
    pub fn standard() -> Self {
        Self {
            units: CostTable::new([
                UnitCostEntry::dual_yield(UnitType::Infantry, 1),
                UnitCostEntry::new(UnitType::Mech, 2),
                UnitCostEntry::dual_yield(UnitType::Fighter, 1),
                UnitCostEntry::new(UnitType::Destroyer, 1),
                UnitCostEntry::new(UnitType::Cruiser, 2),
                UnitCostEntry::new(UnitType::Carrier, 3),
                UnitCostEntry::new(UnitType::Dreadnought, 4),
                UnitCostEntry::new(UnitType::WarSun, 12),
                UnitCostEntry::new(UnitType::Flagship, 8),
                UnitCostEntry::new(UnitType::Pds, 0),
                UnitCostEntry::new(UnitType::SpaceDock, 0),
            ]),
            modifiers: Vec::new(),
            cost_exempt_only: [UnitType::Pds, UnitType::SpaceDock].into_iter().collect(),
        }
    }

    pub fn with_modifier(mut self, modifier: CostModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Parse and validate a TOML document.
    ///
    /// ```toml
    /// cost_exempt_only = ["pds"]
    ///
    /// [[units]]
    /// unit = "fighter"
    /// cost = 1
    /// yield_per_payment = 2
    ///
    /// [[modifiers]]
    /// source = { faction = "sol" }
    /// unit = "fighter"
    /// delta = -1
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, EconomyError> {
        let config: Self = toml::from_str(text).map_err(|e| EconomyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, EconomyError> {
        toml::to_string(self).map_err(|e| EconomyError::Config(e.to_string()))
    }

    /// Reject duplicate unit entries and zero yields.
    pub fn validate(&self) -> Result<(), EconomyError> {
        let mut seen = BTreeSet::new();
        for entry in self.units.entries() {
            if !seen.insert(entry.unit) {
                return Err(EconomyError::Config(format!(
                    "duplicate cost entry for {}",
                    entry.unit
                )));
            }
            if entry.yield_per_payment == 0 {
                return Err(EconomyError::Config(format!(
                    "{} must yield at least one unit per payment",
                    entry.unit
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_covers_every_unit() {
        let config = EconomyConfig::standard();
        for unit in UnitType::ALL {
            assert!(config.units.get(unit).is_some(), "missing {unit}");
        }
        assert_eq!(config.units.get(UnitType::Fighter).unwrap().yield_per_payment, 2);
        assert!(config.cost_exempt_only.contains(&UnitType::SpaceDock));
        config.validate().unwrap();
    }

    #[test]
    fn parses_toml() {
        let config = EconomyConfig::from_toml_str(
            r#"
            cost_exempt_only = ["pds"]

            [[units]]
            unit = "fighter"
            cost = 1
            yield_per_payment = 2

            [[units]]
            unit = "war_sun"
            cost = 12

            [[modifiers]]
            source = { faction = "sol" }
            unit = "fighter"
            delta = -1
            "#,
        )
        .unwrap();

        assert_eq!(config.units.get(UnitType::WarSun).unwrap().yield_per_payment, 1);
        assert_eq!(config.modifiers, vec![CostModifier::faction("sol", UnitType::Fighter, -1)]);
        assert!(config.cost_exempt_only.contains(&UnitType::Pds));
    }

    #[test]
    fn rejects_duplicates_and_zero_yield() {
        let duplicate = r#"
            [[units]]
            unit = "mech"
            cost = 2

            [[units]]
            unit = "mech"
            cost = 3
        "#;
        assert!(matches!(
            EconomyConfig::from_toml_str(duplicate),
            Err(EconomyError::Config(msg)) if msg.contains("duplicate")
        ));

        let zero = r#"
            [[units]]
            unit = "mech"
            cost = 2
            yield_per_payment = 0
        "#;
        assert!(EconomyConfig::from_toml_str(zero).is_err());
        assert!(EconomyConfig::from_toml_str("units = 3").is_err());
    }

    #[test]
    fn standard_survives_toml() {
        let config = EconomyConfig::standard()
            .with_modifier(CostModifier::technology("war_sun_ii", UnitType::WarSun, -2));
        let text = config.to_toml_string().unwrap();
        assert_eq!(EconomyConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn modifier_matching() {
        let faction = CostModifier::faction("sol", UnitType::Infantry, -1);
        assert!(faction.applies(UnitType::Infantry, Some(&Faction::from("sol")), &[]));
        assert!(!faction.applies(UnitType::Infantry, Some(&Faction::from("hacan")), &[]));
        assert!(!faction.applies(UnitType::Mech, Some(&Faction::from("sol")), &[]));

        let tech = CostModifier::technology("cruiser_ii", UnitType::Cruiser, 1);
        assert!(tech.applies(UnitType::Cruiser, None, &[Technology::from("cruiser_ii")]));
        assert!(!tech.applies(UnitType::Cruiser, None, &[]));
    }
}
