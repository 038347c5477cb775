use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::{NoteId, PlayerId, TransactionId};

/// One side of a bilateral exchange.
///
/// - `trade_currency` moves from giver to receiver as-is.
/// - `commodities` leave the giver's commodities and arrive as trade
///   currency.
/// - `resources` and `influence` are funded by the giver's planets (or trade
///   currency) and arrive as trade currency.
/// - `exchange_notes` change holder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItems {
    pub trade_currency: u32,
    pub commodities: u32,
    pub resources: u32,
    pub influence: u32,
    pub exchange_notes: BTreeSet<NoteId>,
}

impl TransactionItems {
    pub fn trade_currency(amount: u32) -> Self {
        Self {
            trade_currency: amount,
            ..Self::default()
        }
    }

    pub fn commodities(amount: u32) -> Self {
        Self {
            commodities: amount,
            ..Self::default()
        }
    }

    pub fn resources(amount: u32) -> Self {
        Self {
            resources: amount,
            ..Self::default()
        }
    }

    pub fn influence(amount: u32) -> Self {
        Self {
            influence: amount,
            ..Self::default()
        }
    }

    pub fn note(id: impl Into<NoteId>) -> Self {
        Self::default().with_note(id)
    }

    pub fn with_note(mut self, id: impl Into<NoteId>) -> Self {
        self.exchange_notes.insert(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.trade_currency == 0
            && self.commodities == 0
            && self.resources == 0
            && self.influence == 0
            && self.exchange_notes.is_empty()
    }

    /// Trade currency the receiving side ends up with.
    pub fn credited_trade_currency(&self) -> u64 {
        u64::from(self.trade_currency)
            + u64::from(self.commodities)
            + u64::from(self.resources)
            + u64::from(self.influence)
    }
}

/// Lifecycle status of a transaction.
///
/// `Proposed -> {Accepted | Rejected | Cancelled}`; the last three are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Proposed,
    Accepted,
    Rejected,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Proposed)
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(self, Self::Proposed) && next.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A proposed economic exchange between two players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub proposer: PlayerId,
    pub counterparty: PlayerId,
    /// What the proposer gives.
    pub offered: TransactionItems,
    /// What the proposer asks for in return.
    pub requested: TransactionItems,
    pub status: TransactionStatus,
    pub proposed_round: u32,
    pub proposed_at: DateTime<Utc>,
    pub resolved_round: Option<u32>,
    /// Set when this transaction reverses an earlier accepted one.
    pub compensates: Option<TransactionId>,
}

impl Transaction {
    /// A new transaction in the `Proposed` state.
    pub fn propose(
        id: TransactionId,
        proposer: impl Into<PlayerId>,
        counterparty: impl Into<PlayerId>,
        offered: TransactionItems,
        requested: TransactionItems,
        round: u32,
    ) -> Self {
        Self {
            id,
            proposer: proposer.into(),
            counterparty: counterparty.into(),
            offered,
            requested,
            status: TransactionStatus::Proposed,
            proposed_round: round,
            proposed_at: Utc::now(),
            resolved_round: None,
            compensates: None,
        }
    }

    /// Copy of this transaction moved to `next`.
    pub fn transition(&self, next: TransactionStatus, round: u32) -> Result<Self, TypeError> {
        if !self.status.can_transition_to(next) {
            return Err(TypeError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(Self {
            status: next,
            resolved_round: Some(round),
            ..self.clone()
        })
    }

    /// Draft of the exchange that reverses this one.
    ///
    /// Everything the receivers were credited arrived as trade currency, so
    /// the reversal returns trade currency plus the exchanged notes.
    pub fn compensating(&self, id: TransactionId, round: u32) -> Result<Self, TypeError> {
        let to_u32 = |value: u64| {
            u32::try_from(value)
                .map_err(|_| TypeError::Overflow(format!("compensation of {} too large", self.id)))
        };
        let offered = TransactionItems {
            trade_currency: to_u32(self.requested.credited_trade_currency())?,
            exchange_notes: self.requested.exchange_notes.clone(),
            ..TransactionItems::default()
        };
        let requested = TransactionItems {
            trade_currency: to_u32(self.offered.credited_trade_currency())?,
            exchange_notes: self.offered.exchange_notes.clone(),
            ..TransactionItems::default()
        };
        let mut draft = Self::propose(
            id,
            self.proposer.clone(),
            self.counterparty.clone(),
            offered,
            requested,
            round,
        );
        draft.compensates = Some(self.id.clone());
        Ok(draft)
    }

    /// Whether `other` is this transaction at some point of its lifecycle:
    /// everything but the status and resolution round agrees.
    pub fn same_terms(&self, other: &Transaction) -> bool {
        self.id == other.id
            && self.proposer == other.proposer
            && self.counterparty == other.counterparty
            && self.offered == other.offered
            && self.requested == other.requested
            && self.proposed_round == other.proposed_round
            && self.proposed_at == other.proposed_at
            && self.compensates == other.compensates
    }

    pub fn involves(&self, player: &PlayerId) -> bool {
        &self.proposer == player || &self.counterparty == player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::propose(
            TransactionId::new(),
            "hacan",
            "sol",
            TransactionItems::trade_currency(3).with_note("hacan-ta"),
            TransactionItems::commodities(2),
            1,
        )
    }

    #[test]
    fn only_proposed_can_transition() {
        let tx = sample();
        let accepted = tx.transition(TransactionStatus::Accepted, 2).unwrap();
        assert_eq!(accepted.status, TransactionStatus::Accepted);
        assert_eq!(accepted.resolved_round, Some(2));
        assert_eq!(tx.status, TransactionStatus::Proposed);

        let err = accepted
            .transition(TransactionStatus::Cancelled, 2)
            .unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidTransition {
                from: "accepted".into(),
                to: "cancelled".into()
            }
        );
    }

    #[test]
    fn proposed_is_not_a_transition_target() {
        let tx = sample();
        assert!(tx.transition(TransactionStatus::Proposed, 1).is_err());
    }

    #[test]
    fn empty_items() {
        assert!(TransactionItems::default().is_empty());
        assert!(!TransactionItems::note("x").is_empty());
        assert!(!TransactionItems::influence(1).is_empty());
    }

    #[test]
    fn compensating_reverses_credited_value() {
        let tx = sample();
        let reverse = tx.compensating(TransactionId::new(), 3).unwrap();
        assert_eq!(reverse.compensates, Some(tx.id.clone()));
        assert_eq!(reverse.proposer, tx.proposer);
        // proposer received 2 commodities as trade currency, gives 2 back
        assert_eq!(reverse.offered.trade_currency, 2);
        assert!(reverse.offered.exchange_notes.is_empty());
        assert_eq!(reverse.requested.trade_currency, 3);
        assert!(reverse.requested.exchange_notes.contains(&NoteId::from("hacan-ta")));
    }

    #[test]
    fn same_terms_ignores_only_lifecycle_fields() {
        let tx = sample();
        let accepted = tx.transition(TransactionStatus::Accepted, 4).unwrap();
        assert!(tx.same_terms(&accepted));

        let altered = Transaction {
            offered: TransactionItems::default(),
            ..accepted.clone()
        };
        assert!(!tx.same_terms(&altered));

        let other_id = Transaction {
            id: TransactionId::new(),
            ..accepted
        };
        assert!(!tx.same_terms(&other_id));
    }

    #[test]
    fn involves_both_parties() {
        let tx = sample();
        assert!(tx.involves(&PlayerId::from("hacan")));
        assert!(tx.involves(&PlayerId::from("sol")));
        assert!(!tx.involves(&PlayerId::from("muaat")));
    }
}
