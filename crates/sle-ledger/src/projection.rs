use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sle_types::{NoteId, PlayerId, TransactionId, TransactionItems};

use crate::state::GameState;

/// One player's view of the accepted history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLedger {
    pub player: PlayerId,
    pub accepted_count: usize,
    /// Trade currency credited to the player by accepted transactions.
    pub trade_currency_in: u64,
    /// Value the player gave away (trade currency, commodities, resources
    /// and influence).
    pub trade_currency_out: u64,
    pub notes_received: BTreeSet<NoteId>,
    pub notes_given: BTreeSet<NoteId>,
}

impl PlayerLedger {
    /// Net trade-currency flow; positive when the player gained.
    pub fn net(&self) -> i128 {
        i128::from(self.trade_currency_in) - i128::from(self.trade_currency_out)
    }
}

/// Row in the audit index, one per history entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditIndexEntry {
    pub position: usize,
    pub id: TransactionId,
    pub proposer: PlayerId,
    pub counterparty: PlayerId,
    pub proposed_round: u32,
    pub resolved_round: Option<u32>,
    pub compensates: Option<TransactionId>,
    pub summary: String,
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn player_ledger(state: &GameState, player: &PlayerId) -> PlayerLedger {
        let mut ledger = PlayerLedger {
            player: player.clone(),
            accepted_count: 0,
            trade_currency_in: 0,
            trade_currency_out: 0,
            notes_received: BTreeSet::new(),
            notes_given: BTreeSet::new(),
        };

        for tx in state.history().iter().filter(|tx| tx.involves(player)) {
            ledger.accepted_count += 1;
            let (given, received) = if &tx.proposer == player {
                (&tx.offered, &tx.requested)
            } else {
                (&tx.requested, &tx.offered)
            };
            if tx.proposer == tx.counterparty {
                continue;
            }
            ledger.trade_currency_out += given.credited_trade_currency();
            ledger.trade_currency_in += received.credited_trade_currency();
            ledger.notes_given.extend(given.exchange_notes.iter().cloned());
            ledger.notes_received.extend(received.exchange_notes.iter().cloned());
        }
        ledger
    }

    pub fn audit_index(state: &GameState) -> Vec<AuditIndexEntry> {
        state
            .history()
            .iter()
            .enumerate()
            .map(|(position, tx)| AuditIndexEntry {
                position,
                id: tx.id.clone(),
                proposer: tx.proposer.clone(),
                counterparty: tx.counterparty.clone(),
                proposed_round: tx.proposed_round,
                resolved_round: tx.resolved_round,
                compensates: tx.compensates.clone(),
                summary: format!(
                    "{} gives {}; {} gives {}",
                    tx.proposer,
                    describe(&tx.offered),
                    tx.counterparty,
                    describe(&tx.requested)
                ),
            })
            .collect()
    }
}

fn describe(items: &TransactionItems) -> String {
    let mut parts = Vec::new();
    for (amount, label) in [
        (items.trade_currency, "trade currency"),
        (items.commodities, "commodities"),
        (items.resources, "resources"),
        (items.influence, "influence"),
    ] {
        if amount > 0 {
            parts.push(format!("{amount} {label}"));
        }
    }
    if !items.exchange_notes.is_empty() {
        let ids: Vec<_> = items.exchange_notes.iter().map(NoteId::as_str).collect();
        parts.push(format!("notes [{}]", ids.join(", ")));
    }
    if parts.is_empty() {
        "nothing".into()
    } else {
        parts.join(", ")
    }
}
