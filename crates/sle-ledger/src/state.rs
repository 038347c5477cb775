use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sle_economy::{ResourceManager, ResourceView, SpendingOutcome, SpendingPlan};
use sle_types::{
    ExchangeNote, Planet, PlanetId, Player, PlayerId, Transaction, TransactionId, TransactionStatus,
};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::notes::ExchangeNoteManager;
use crate::validation::StateValidator;

/// The single authoritative snapshot of a game.
///
/// A `GameState` is never changed after it is built. Every operation that
/// "changes" the game returns a new snapshot with a higher [`version`], and
/// collections the operation did not touch are shared with the previous
/// snapshot rather than copied.
///
/// A transaction id is in exactly one of pending or history while the
/// transaction is active.
///
/// [`version`]: GameState::version
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) round: u32,
    pub(crate) version: u64,
    pub(crate) players: Arc<BTreeMap<PlayerId, Player>>,
    pub(crate) planets: Arc<BTreeMap<PlanetId, Planet>>,
    pub(crate) pending: Arc<BTreeMap<TransactionId, Transaction>>,
    pub(crate) history: Arc<Vec<Transaction>>,
    pub(crate) notes: Arc<ExchangeNoteManager>,
}

impl GameState {
    pub fn builder() -> GameStateBuilder {
        GameStateBuilder::default()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Marker that increases with every snapshot derived from this one.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, Player> {
        &self.players
    }

    pub fn planets(&self) -> &BTreeMap<PlanetId, Planet> {
        &self.planets
    }

    pub fn pending_transactions(&self) -> &BTreeMap<TransactionId, Transaction> {
        &self.pending
    }

    /// Accepted transactions in the order they took effect.
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn notes(&self) -> &ExchangeNoteManager {
        &self.notes
    }

    pub fn pending_transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.pending.get(id)
    }

    pub fn history_entry(&self, id: &TransactionId) -> Option<&Transaction> {
        self.history.iter().find(|tx| &tx.id == id)
    }

    /// Whether `id` is pending or in history.
    pub fn contains_transaction(&self, id: &TransactionId) -> bool {
        self.pending.contains_key(id) || self.history_entry(id).is_some()
    }

    /// Snapshot with `transaction` added to pending.
    pub fn add_pending_transaction(&self, transaction: Transaction) -> Result<Self, LedgerError> {
        if self.contains_transaction(&transaction.id) {
            return Err(LedgerError::DuplicateId(transaction.id));
        }
        if transaction.status != TransactionStatus::Proposed {
            return Err(LedgerError::InvalidTransition(format!(
                "only proposed transactions can be pending, {} is {}",
                transaction.id, transaction.status
            )));
        }

        let mut next = self.successor();
        Arc::make_mut(&mut next.pending).insert(transaction.id.clone(), transaction);
        Ok(next)
    }

    /// Snapshot without the pending transaction `id`, plus the removed
    /// transaction. History is not touched.
    pub fn remove_pending_transaction(&self, id: &TransactionId) -> Option<(Self, Transaction)> {
        if !self.pending.contains_key(id) {
            return None;
        }
        let mut next = self.successor();
        let removed = Arc::make_mut(&mut next.pending).remove(id)?;
        Some((next, removed))
    }

    /// Execute `plan` and substitute the spent planets and player.
    pub fn execute_spending_plan(
        &self,
        plan: &SpendingPlan,
    ) -> Result<(Self, SpendingOutcome), LedgerError> {
        let outcome = ResourceManager::new(self).execute_spending_plan(plan)?;

        let mut next = self.successor();
        Arc::make_mut(&mut next.players).insert(outcome.player.id.clone(), outcome.player.clone());
        if !outcome.planets.is_empty() {
            let planets = Arc::make_mut(&mut next.planets);
            for planet in &outcome.planets {
                planets.insert(planet.name.clone(), planet.clone());
            }
        }
        Ok((next, outcome))
    }

    /// Status-phase step: ready every planet, refill every player's
    /// commodities and move to the next round.
    pub fn advance_round(&self) -> Self {
        let mut next = self.successor();
        next.round = self.round.saturating_add(1);

        if self.planets.values().any(Planet::is_exhausted) {
            next.planets = Arc::new(
                self.planets
                    .iter()
                    .map(|(id, planet)| (id.clone(), planet.ready()))
                    .collect(),
            );
        }
        if self.players.values().any(|p| p.commodities != p.commodity_cap) {
            next.players = Arc::new(
                self.players
                    .iter()
                    .map(|(id, player)| (id.clone(), player.replenish_commodities()))
                    .collect(),
            );
        }

        info!(round = next.round, version = next.version, "round advanced");
        next
    }

    /// Lossless binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a snapshot written by [`GameState::to_bytes`] and check its
    /// invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let state: Self = bincode::deserialize(bytes)?;
        let report = StateValidator::validate(&state);
        if !report.is_valid() {
            return Err(LedgerError::Validation(format!(
                "decoded snapshot is inconsistent: {}",
                report.summary()
            )));
        }
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hex-encoded BLAKE3 hash of the binary encoding.
    pub fn fingerprint(&self) -> Result<String, LedgerError> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// A copy sharing every collection, one version ahead.
    pub(crate) fn successor(&self) -> Self {
        Self {
            version: self.version + 1,
            ..self.clone()
        }
    }
}

impl ResourceView for GameState {
    fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    fn planet(&self, id: &PlanetId) -> Option<&Planet> {
        self.planets.get(id)
    }
}

/// Assembles the starting [`GameState`].
///
/// Planet ownership and player control are reconciled: a planet with an
/// owner is added to that player's controlled set, and a controlled planet
/// without an owner takes the controlling player as owner. Anything that
/// still disagrees fails [`GameStateBuilder::build`].
#[derive(Clone, Debug)]
pub struct GameStateBuilder {
    round: u32,
    players: Vec<Player>,
    planets: Vec<Planet>,
    notes: Vec<ExchangeNote>,
}

impl Default for GameStateBuilder {
    fn default() -> Self {
        Self {
            round: 1,
            players: Vec::new(),
            planets: Vec::new(),
            notes: Vec::new(),
        }
    }
}

impl GameStateBuilder {
    pub fn round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    pub fn player(mut self, player: Player) -> Self {
        self.players.push(player);
        self
    }

    pub fn planet(mut self, planet: Planet) -> Self {
        self.planets.push(planet);
        self
    }

    pub fn note(mut self, note: ExchangeNote) -> Self {
        self.notes.push(note);
        self
    }

    pub fn build(self) -> Result<GameState, LedgerError> {
        let mut players = BTreeMap::new();
        for player in self.players {
            if players.contains_key(&player.id) {
                return Err(LedgerError::Validation(format!("duplicate player {}", player.id)));
            }
            players.insert(player.id.clone(), player);
        }

        let mut planets = BTreeMap::new();
        for planet in self.planets {
            if planets.contains_key(&planet.name) {
                return Err(LedgerError::Validation(format!("duplicate planet {}", planet.name)));
            }
            planets.insert(planet.name.clone(), planet);
        }

        for planet in planets.values() {
            if let Some(player) = planet.owner.as_ref().and_then(|o| players.get_mut(o)) {
                player.controlled_planets.insert(planet.name.clone());
            }
        }
        for player in players.values() {
            for id in &player.controlled_planets {
                if let Some(planet) = planets.get_mut(id) {
                    if planet.owner.is_none() {
                        *planet = planet.with_owner(player.id.clone());
                    }
                }
            }
        }

        let mut notes = ExchangeNoteManager::new();
        for note in self.notes {
            notes = notes.issue(note)?;
        }

        let state = GameState {
            round: self.round,
            version: 0,
            players: Arc::new(players),
            planets: Arc::new(planets),
            pending: Arc::default(),
            history: Arc::default(),
            notes: Arc::new(notes),
        };

        let report = StateValidator::validate(&state);
        if !report.is_valid() {
            return Err(LedgerError::Validation(report.summary()));
        }

        debug!(
            players = state.players.len(),
            planets = state.planets.len(),
            notes = state.notes.len(),
            round = state.round,
            "game state built"
        );
        Ok(state)
    }
}
