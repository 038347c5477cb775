//! Resource and influence accounting for the Strategy Ledger Engine.
//!
//! Value in SLE is sourced from controlled-but-exhaustible planets rather
//! than a personal wallet. This crate computes what a player can afford,
//! turns a requirement into an explicit [`SpendingPlan`], executes plans as
//! a single all-or-nothing unit, and prices unit production.
//!
//! Everything here is pure computation over a [`ResourceView`]: executing a
//! plan yields fresh [`Player`](sle_types::Player) and
//! [`Planet`](sle_types::Planet) copies in a [`SpendingOutcome`] and leaves
//! the viewed values untouched.
//!
//! # Quick Start
//!
//! ```rust
//! use sle_economy::{EconomySnapshot, ResourceManager};
//! use sle_types::{Planet, Player};
//!
//! let player = Player::new("hacan").with_planet("Arretze").with_trade_currency(1);
//! let snapshot = EconomySnapshot::new(
//!     vec![player.clone()],
//!     vec![Planet::new("Arretze", 2, 0).with_owner("hacan")],
//! );
//! let manager = ResourceManager::new(&snapshot);
//! assert_eq!(manager.calculate_available_resources(&player), 3);
//!
//! let plan = manager.create_spending_plan(&player, 3, 0, false);
//! assert!(plan.is_valid());
//! let outcome = manager.execute_spending_plan(&plan).unwrap();
//! assert_eq!(outcome.player.trade_currency, 0);
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod plan;
pub mod resources;
pub mod sources;
pub mod view;

pub use config::{CostModifier, CostTable, EconomyConfig, ModifierSource, UnitCostEntry};
pub use cost::{CostValidationResult, CostValidator, ProductionCost};
pub use error::{EconomyError, SpendPool};
pub use plan::{SpendingOutcome, SpendingPlan, SpendingPlanBuilder};
pub use resources::ResourceManager;
pub use sources::{InfluenceSources, ResourceSources};
pub use view::{EconomySnapshot, ResourceView};
