use std::collections::BTreeSet;

use sle_types::TransactionStatus;

use crate::state::GameState;

/// Result of checking a snapshot's whole-state invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub version: u64,
    pub round: u32,
    pub players_checked: usize,
    pub planets_checked: usize,
    pub transactions_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violation description, joined on one line.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.subject, v.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Id of the player, planet, note or transaction at fault.
    pub subject: String,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    OwnershipMismatch,
    UnknownPlayer,
    UnknownPlanet,
    DuplicateTransaction,
    UnexpectedStatus,
    UnknownNoteHolder,
    BlankIdentifier,
}

/// Whole-state invariant checker.
pub struct StateValidator;

impl StateValidator {
    pub fn validate(state: &GameState) -> ValidationReport {
        let mut violations = Vec::new();
        let mut push = |subject: String, kind: ViolationKind, description: String| {
            violations.push(Violation {
                subject,
                kind,
                description,
            })
        };

        let blank_players = state.players().keys().filter(|id| id.is_blank()).count();
        let blank_planets = state.planets().keys().filter(|id| id.is_blank()).count();
        let blank_notes = state.notes().iter().filter(|note| note.id.is_blank()).count();
        for (count, what) in [
            (blank_players, "player"),
            (blank_planets, "planet"),
            (blank_notes, "note"),
        ] {
            if count > 0 {
                push(
                    what.to_string(),
                    ViolationKind::BlankIdentifier,
                    format!("{count} {what} id(s) are blank"),
                );
            }
        }

        for player in state.players().values() {
            for id in &player.controlled_planets {
                match state.planets().get(id) {
                    None => push(
                        player.id.to_string(),
                        ViolationKind::UnknownPlanet,
                        format!("controls unknown planet {id}"),
                    ),
                    Some(planet) if planet.owner.as_ref() != Some(&player.id) => push(
                        id.to_string(),
                        ViolationKind::OwnershipMismatch,
                        format!(
                            "controlled by {} but owned by {}",
                            player.id,
                            planet
                                .owner
                                .as_ref()
                                .map_or_else(|| "nobody".to_string(), ToString::to_string)
                        ),
                    ),
                    Some(_) => {}
                }
            }
        }

        for planet in state.planets().values() {
            let Some(owner) = &planet.owner else { continue };
            match state.players().get(owner) {
                None => push(
                    planet.name.to_string(),
                    ViolationKind::UnknownPlayer,
                    format!("owned by unknown player {owner}"),
                ),
                Some(player) if !player.controls(&planet.name) => push(
                    planet.name.to_string(),
                    ViolationKind::OwnershipMismatch,
                    format!("owned by {owner} but missing from its controlled planets"),
                ),
                Some(_) => {}
            }
        }

        let mut seen = BTreeSet::new();
        for tx in state.history() {
            if !seen.insert(tx.id.clone()) {
                push(
                    tx.id.to_string(),
                    ViolationKind::DuplicateTransaction,
                    "appears more than once in history".into(),
                );
            }
            if tx.status != TransactionStatus::Accepted {
                push(
                    tx.id.to_string(),
                    ViolationKind::UnexpectedStatus,
                    format!("history entry is {}", tx.status),
                );
            }
        }
        for (id, tx) in state.pending_transactions() {
            if seen.contains(id) {
                push(
                    id.to_string(),
                    ViolationKind::DuplicateTransaction,
                    "both pending and in history".into(),
                );
            }
            if tx.status != TransactionStatus::Proposed {
                push(
                    id.to_string(),
                    ViolationKind::UnexpectedStatus,
                    format!("pending entry is {}", tx.status),
                );
            }
        }
        for tx in state.pending_transactions().values().chain(state.history()) {
            for party in [&tx.proposer, &tx.counterparty] {
                if !state.players().contains_key(party) {
                    push(
                        tx.id.to_string(),
                        ViolationKind::UnknownPlayer,
                        format!("involves unknown player {party}"),
                    );
                }
            }
        }

        for note in state.notes().iter() {
            for party in [&note.issuer, &note.holder] {
                if !state.players().contains_key(party) {
                    push(
                        note.id.to_string(),
                        ViolationKind::UnknownNoteHolder,
                        format!("refers to unknown player {party}"),
                    );
                }
            }
        }

        ValidationReport {
            version: state.version(),
            round: state.round(),
            players_checked: state.players().len(),
            planets_checked: state.planets().len(),
            transactions_checked: state.pending_transactions().len() + state.history().len(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sle_types::{ExchangeNote, Planet, Player, Transaction, TransactionId, TransactionItems};

    use super::*;
    use crate::notes::ExchangeNoteManager;

    fn valid() -> GameState {
        GameState::builder()
            .player(Player::new("P"))
            .player(Player::new("Q"))
            .planet(Planet::new("A", 2, 1).with_owner("P"))
            .build()
            .unwrap()
    }

    #[test]
    fn valid_state_passes() {
        let report = StateValidator::validate(&valid());
        assert!(report.is_valid());
        assert_eq!(report.players_checked, 2);
        assert_eq!(report.planets_checked, 1);
        assert_eq!(report.summary(), "");
    }

    #[test]
    fn detects_transaction_in_pending_and_history() {
        let mut state = valid();
        let tx = Transaction::propose(
            TransactionId::new(),
            "P",
            "Q",
            TransactionItems::trade_currency(1),
            TransactionItems::default(),
            1,
        );
        let accepted = tx.transition(TransactionStatus::Accepted, 1).unwrap();
        Arc::make_mut(&mut state.pending).insert(tx.id.clone(), tx);
        Arc::make_mut(&mut state.history).push(accepted);

        let report = StateValidator::validate(&state);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::DuplicateTransaction);
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let err = GameState::builder()
            .player(Player::new(""))
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::LedgerError::Validation(msg) if msg.contains("blank")));

        let mut state = valid();
        Arc::make_mut(&mut state.planets).insert(" ".into(), Planet::new(" ", 1, 1));
        let report = StateValidator::validate(&state);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::BlankIdentifier);
        assert_eq!(report.summary(), "planet: 1 planet id(s) are blank");
    }

    #[test]
    fn detects_ownership_and_note_problems() {
        let mut state = valid();
        Arc::make_mut(&mut state.planets)
            .insert("A".into(), Planet::new("A", 2, 1).with_owner("Q"));
        state.notes = Arc::new(
            ExchangeNoteManager::new()
                .issue(ExchangeNote::issue("x", "ghost", "Ceasefire"))
                .unwrap(),
        );

        let kinds: Vec<_> = StateValidator::validate(&state)
            .violations
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert!(kinds.contains(&ViolationKind::OwnershipMismatch));
        assert!(kinds.contains(&ViolationKind::UnknownNoteHolder));
    }
}
