//! Foundation types for the Strategy Ledger Engine (SLE).
//!
//! This crate provides the identity and value types shared by every other
//! SLE crate. All of them are plain, cloneable, serializable values: a
//! "mutation" always returns an updated copy and never touches a value that
//! another snapshot still holds.
//!
//! # Key Types
//!
//! - [`PlayerId`], [`PlanetId`], [`NoteId`]: string-backed identities
//! - [`TransactionId`]: UUID v7 transaction identifier
//! - [`Planet`]: resource/influence values plus the exhaustion flag
//! - [`Player`]: controlled planets, trade currency, commodities
//! - [`Transaction`]: a bilateral exchange with a lifecycle status
//! - [`ExchangeNote`]: a tradeable note issued by one player
//! - [`UnitType`], [`Faction`], [`Technology`]: production vocabulary

pub mod error;
pub mod identity;
pub mod note;
pub mod planet;
pub mod player;
pub mod transaction;
pub mod unit;

pub use error::TypeError;
pub use identity::{Faction, NoteId, PlanetId, PlayerId, Technology, TransactionId};
pub use note::ExchangeNote;
pub use planet::Planet;
pub use player::Player;
pub use transaction::{Transaction, TransactionItems, TransactionStatus};
pub use unit::UnitType;
