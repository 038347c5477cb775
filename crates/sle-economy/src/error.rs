use std::fmt;

use sle_types::{PlanetId, PlayerId, UnitType};

/// Which pool a spend draws on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpendPool {
    Resources,
    Influence,
    TradeCurrency,
}

impl fmt::Display for SpendPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resources => write!(f, "resources"),
            Self::Influence => write!(f, "influence"),
            Self::TradeCurrency => write!(f, "trade currency"),
        }
    }
}

/// Errors produced by economy operations.
///
/// Every variant is a validation failure: it is detected before any value is
/// changed and names the amount, planet or unit that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EconomyError {
    #[error("insufficient {pool} for {player}: requested {requested}, available {available}")]
    Insufficient {
        player: PlayerId,
        pool: SpendPool,
        requested: u32,
        available: u32,
    },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("unknown planet {0}")]
    UnknownPlanet(PlanetId),

    #[error("planet {planet} is not controlled by {player}")]
    PlanetNotControlled { planet: PlanetId, player: PlayerId },

    #[error("planet {0} is already exhausted")]
    PlanetExhausted(PlanetId),

    #[error("plan takes {amount} {pool} from {planet}, which only provides {value}")]
    ExceedsPlanetValue {
        planet: PlanetId,
        pool: SpendPool,
        amount: u32,
        value: u32,
    },

    #[error("invalid spending plan: {0}")]
    InvalidPlan(String),

    #[error("no cost entry for unit type {0}")]
    UnknownUnitCost(UnitType),

    #[error("{0} can only be placed through a cost-exempt placement")]
    CostExemptOnly(UnitType),

    #[error("production quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EconomyError {
    /// Missing amount for an [`EconomyError::Insufficient`] error.
    pub fn shortfall(&self) -> Option<u32> {
        match self {
            Self::Insufficient {
                requested,
                available,
                ..
            } => Some(requested.saturating_sub(*available)),
            _ => None,
        }
    }
}
