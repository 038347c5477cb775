use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use sle_types::{PlayerId, Transaction, TransactionId, TransactionItems, TransactionStatus};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, ObserverError};
use crate::observer::TransactionObserver;
use crate::state::GameState;

/// Pending transaction ids per involved player, derived from one
/// [`GameState`] version.
#[derive(Clone, Debug, Default)]
struct PendingIndex {
    version: u64,
    by_player: BTreeMap<PlayerId, BTreeSet<TransactionId>>,
}

impl PendingIndex {
    fn build(state: &GameState) -> Self {
        let mut by_player: BTreeMap<PlayerId, BTreeSet<TransactionId>> = BTreeMap::new();
        for (id, tx) in state.pending_transactions() {
            by_player.entry(tx.proposer.clone()).or_default().insert(id.clone());
            by_player.entry(tx.counterparty.clone()).or_default().insert(id.clone());
        }
        Self {
            version: state.version(),
            by_player,
        }
    }
}

/// Drives the transaction lifecycle over the current [`GameState`].
///
/// ```text
/// Proposed ──accept──▶ Accepted   (effects applied, moved to history)
///     │
///     ├──reject──▶ Rejected       (removed from pending)
///     └──cancel──▶ Cancelled      (removed from pending; also used on expiry)
/// ```
///
/// Operations take effect in the order they are called. The manager owns no
/// transaction data of its own: the pending index is rebuilt from the state
/// whenever the state's version changes.
pub struct TransactionManager {
    state: GameState,
    config: LedgerConfig,
    observers: Vec<Box<dyn TransactionObserver>>,
    index: Option<PendingIndex>,
}

impl TransactionManager {
    pub fn new(state: GameState) -> Self {
        Self::with_config(state, LedgerConfig::default())
    }

    pub fn with_config(state: GameState, config: LedgerConfig) -> Self {
        let mut manager = Self {
            state,
            config,
            observers: Vec::new(),
            index: None,
        };
        manager.refresh_index();
        manager
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Replace the current state, e.g. with the result of
    /// [`GameState::advance_round`].
    pub fn set_state(&mut self, state: GameState) {
        self.state = state;
        self.refresh_index();
    }

    pub fn add_observer(&mut self, observer: impl TransactionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Propose an exchange under a freshly allocated id.
    pub fn propose(
        &mut self,
        proposer: impl Into<PlayerId>,
        counterparty: impl Into<PlayerId>,
        offered: TransactionItems,
        requested: TransactionItems,
    ) -> Result<Transaction, LedgerError> {
        self.propose_with_id(TransactionId::new(), proposer, counterparty, offered, requested)
    }

    /// Propose an exchange under an externally allocated id.
    pub fn propose_with_id(
        &mut self,
        id: TransactionId,
        proposer: impl Into<PlayerId>,
        counterparty: impl Into<PlayerId>,
        offered: TransactionItems,
        requested: TransactionItems,
    ) -> Result<Transaction, LedgerError> {
        let tx = Transaction::propose(
            id,
            proposer,
            counterparty,
            offered,
            requested,
            self.state.round(),
        );
        self.submit(tx)
    }

    /// Propose the exchange that reverses the accepted transaction `id`.
    pub fn propose_compensation(&mut self, id: &TransactionId) -> Result<Transaction, LedgerError> {
        let original = self
            .state
            .history_entry(id)
            .ok_or_else(|| LedgerError::TransactionNotFound(id.clone()))?;
        let draft = original.compensating(TransactionId::new(), self.state.round())?;
        self.submit(draft)
    }

    fn submit(&mut self, tx: Transaction) -> Result<Transaction, LedgerError> {
        if self.state.contains_transaction(&tx.id) {
            warn!(tx = %tx.id, "duplicate transaction id rejected");
            return Err(LedgerError::DuplicateId(tx.id));
        }
        self.validate_proposal(&tx)?;

        let next = self.state.add_pending_transaction(tx.clone())?;
        self.commit(next);
        info!(
            tx = %tx.id,
            proposer = %tx.proposer,
            counterparty = %tx.counterparty,
            round = tx.proposed_round,
            "transaction proposed"
        );
        Ok(tx)
    }

    fn validate_proposal(&self, tx: &Transaction) -> Result<(), LedgerError> {
        for party in [&tx.proposer, &tx.counterparty] {
            if !self.state.players().contains_key(party) {
                return Err(LedgerError::Validation(format!("unknown player {party}")));
            }
        }
        if tx.proposer == tx.counterparty && !self.config.allow_self_trade {
            return Err(LedgerError::Validation(format!(
                "{} cannot trade with themselves",
                tx.proposer
            )));
        }
        if tx.offered.is_empty() && tx.requested.is_empty() {
            return Err(LedgerError::Validation(
                "transaction must offer or request at least one item".into(),
            ));
        }

        let notes = self.state.notes();
        let sides = [
            (&tx.offered, &tx.proposer),
            (&tx.requested, &tx.counterparty),
        ];
        for (items, holder) in sides {
            for id in &items.exchange_notes {
                match notes.get(id) {
                    None => {
                        return Err(LedgerError::Validation(format!(
                            "unknown exchange note {id}"
                        )))
                    }
                    Some(note) if &note.holder != holder => {
                        return Err(LedgerError::Validation(format!(
                            "exchange note {id} is held by {}, not {holder}",
                            note.holder
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        let open = self
            .state
            .pending_transactions()
            .values()
            .filter(|pending| pending.proposer == tx.proposer)
            .count();
        if open >= self.config.max_pending_per_player {
            return Err(LedgerError::Validation(format!(
                "{} already has {open} open proposals (limit {})",
                tx.proposer, self.config.max_pending_per_player
            )));
        }
        Ok(())
    }

    /// Accept a pending transaction and apply its effects.
    ///
    /// On failure the transaction stays pending, the state is unchanged and
    /// the error from [`GameState::apply_transaction_effects`] is returned
    /// as-is.
    pub fn accept(&mut self, id: &TransactionId) -> Result<Transaction, LedgerError> {
        let pending = match self.state.pending_transaction(id) {
            Some(tx) => tx,
            None if self.state.history_entry(id).is_some() => {
                return Err(LedgerError::InvalidTransition(format!(
                    "transaction {id} was already accepted"
                )))
            }
            None => return Err(LedgerError::TransactionNotFound(id.clone())),
        };

        let accepted = pending.transition(TransactionStatus::Accepted, self.state.round())?;
        let next = match self.state.apply_transaction_effects(&accepted) {
            Ok(next) => next,
            Err(err) => {
                debug!(tx = %id, error = %err, "accept failed; transaction stays pending");
                return Err(err);
            }
        };

        self.commit(next);
        info!(tx = %id, version = self.state.version(), "transaction accepted");
        self.notify_observers(&accepted);
        Ok(accepted)
    }

    /// Reject a pending transaction. Returns `false` when `id` is not pending.
    pub fn reject(&mut self, id: &TransactionId) -> bool {
        self.resolve(id, TransactionStatus::Rejected).is_some()
    }

    /// Cancel a pending transaction. Returns `false` when `id` is not pending.
    pub fn cancel(&mut self, id: &TransactionId) -> bool {
        self.resolve(id, TransactionStatus::Cancelled).is_some()
    }

    /// Cancel every proposal older than `pending_ttl_rounds` at
    /// `current_round`, returning the cancelled transactions.
    pub fn expire_stale(&mut self, current_round: u32) -> Vec<Transaction> {
        let Some(ttl) = self.config.pending_ttl_rounds else {
            return Vec::new();
        };

        let stale: Vec<TransactionId> = self
            .state
            .pending_transactions()
            .values()
            .filter(|tx| current_round.saturating_sub(tx.proposed_round) > ttl)
            .map(|tx| tx.id.clone())
            .collect();

        let expired: Vec<Transaction> = stale
            .iter()
            .filter_map(|id| self.resolve(id, TransactionStatus::Cancelled))
            .collect();
        if !expired.is_empty() {
            info!(count = expired.len(), current_round, "stale proposals expired");
        }
        expired
    }

    fn resolve(&mut self, id: &TransactionId, status: TransactionStatus) -> Option<Transaction> {
        let Some((next, removed)) = self.state.remove_pending_transaction(id) else {
            debug!(tx = %id, %status, "no pending transaction to resolve");
            return None;
        };
        let resolved = match removed.transition(status, self.state.round()) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(tx = %id, error = %err, "pending transaction could not be resolved");
                return None;
            }
        };

        self.commit(next);
        info!(tx = %id, %status, "transaction resolved");
        self.notify_observers(&resolved);
        Some(resolved)
    }

    /// Pending transactions `player` proposed or was offered.
    pub fn pending_for(&self, player: &PlayerId) -> Vec<&Transaction> {
        match &self.index {
            Some(index) if index.version == self.state.version() => index
                .by_player
                .get(player)
                .into_iter()
                .flatten()
                .filter_map(|id| self.state.pending_transaction(id))
                .collect(),
            _ => self
                .state
                .pending_transactions()
                .values()
                .filter(|tx| tx.involves(player))
                .collect(),
        }
    }

    /// Deliver `transaction` to every observer in registration order.
    ///
    /// An observer that errors or panics is logged and skipped; the rest are
    /// still called. The logged failures are returned, in observer order.
    pub fn notify_observers(&self, transaction: &Transaction) -> Vec<LedgerError> {
        let mut failures = Vec::new();
        for observer in &self.observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_transaction(transaction)));
            let err = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|msg| (*msg).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "panicked".into());
                    ObserverError::new(observer.name(), format!("panicked: {message}"))
                }
            };
            let err = LedgerError::from(err);
            warn!(
                observer = observer.name(),
                tx = %transaction.id,
                error = %err,
                "observer failed"
            );
            failures.push(err);
        }
        failures
    }

    fn commit(&mut self, state: GameState) {
        self.state = state;
        self.refresh_index();
    }

    fn refresh_index(&mut self) {
        if !self.config.cache_enabled {
            self.index = None;
            return;
        }
        let stale = self
            .index
            .as_ref()
            .map_or(true, |index| index.version != self.state.version());
        if stale {
            self.index = Some(PendingIndex::build(&self.state));
        }
    }
}
