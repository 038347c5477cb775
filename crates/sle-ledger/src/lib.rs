//! Authoritative game-state ledger for the Strategy Ledger Engine (SLE).
//!
//! This crate holds the one source of truth for a game. It provides:
//! - `GameState`, an immutable snapshot of players, planets, exchange notes,
//!   pending transactions and history, with copy-on-write updates
//! - `apply_transaction_effects`, which computes, checks and only then
//!   commits a transaction's effects
//! - `TransactionManager` for the propose / accept / reject / cancel
//!   lifecycle and observer notification
//! - Whole-state validation and history projections (player ledger, audit
//!   index)
//! - Lossless binary and JSON snapshots with a BLAKE3 fingerprint

pub mod config;
mod effects;
pub mod error;
pub mod manager;
pub mod notes;
pub mod observer;
pub mod projection;
pub mod state;
pub mod validation;

pub use config::LedgerConfig;
pub use error::{LedgerError, ObserverError};
pub use manager::TransactionManager;
pub use notes::ExchangeNoteManager;
pub use observer::{FnObserver, NoOpObserver, TransactionObserver};
pub use projection::{AuditIndexEntry, PlayerLedger, ProjectionBuilder};
pub use state::{GameState, GameStateBuilder};
pub use validation::{StateValidator, ValidationReport, Violation, ViolationKind};
