use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sle_types::{ExchangeNote, NoteId, PlayerId};

use crate::error::LedgerError;

/// Every exchange note in the game, keyed by id.
///
/// A value type: each operation returns an updated copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeNoteManager {
    notes: BTreeMap<NoteId, ExchangeNote>,
}

impl ExchangeNoteManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with `note` added. Fails when the id is already taken.
    pub fn issue(&self, note: ExchangeNote) -> Result<Self, LedgerError> {
        if self.notes.contains_key(&note.id) {
            return Err(LedgerError::Validation(format!(
                "exchange note {} already issued",
                note.id
            )));
        }
        let mut next = self.clone();
        next.notes.insert(note.id.clone(), note);
        Ok(next)
    }

    pub fn get(&self, id: &NoteId) -> Option<&ExchangeNote> {
        self.notes.get(id)
    }

    pub fn held_by(&self, player: &PlayerId) -> Vec<&ExchangeNote> {
        self.notes
            .values()
            .filter(|note| &note.holder == player)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangeNote> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Copy with `note` moved from `from` to `to`.
    pub fn transfer(
        &self,
        note: &NoteId,
        from: &PlayerId,
        to: &PlayerId,
    ) -> Result<Self, LedgerError> {
        let current = self
            .notes
            .get(note)
            .ok_or_else(|| LedgerError::Validation(format!("unknown exchange note {note}")))?;
        if &current.holder != from {
            return Err(LedgerError::Validation(format!(
                "exchange note {note} is held by {}, not {from}",
                current.holder
            )));
        }
        let moved = current.held_by(to.clone());
        let mut next = self.clone();
        next.notes.insert(note.clone(), moved);
        Ok(next)
    }

    /// Copy with `note` back in its issuer's hands.
    pub fn return_to_issuer(&self, note: &NoteId) -> Result<Self, LedgerError> {
        let current = self
            .notes
            .get(note)
            .ok_or_else(|| LedgerError::Validation(format!("unknown exchange note {note}")))?;
        let returned = current.held_by(current.issuer.clone());
        let mut next = self.clone();
        next.notes.insert(note.clone(), returned);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ExchangeNoteManager {
        ExchangeNoteManager::new()
            .issue(ExchangeNote::issue("hacan-ta", "hacan", "Trade Agreement"))
            .unwrap()
    }

    #[test]
    fn duplicate_issue_is_rejected() {
        let err = manager()
            .issue(ExchangeNote::issue("hacan-ta", "hacan", "Trade Agreement"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("already issued")));
    }

    #[test]
    fn transfer_requires_current_holder() {
        let notes = manager();
        let hacan = PlayerId::from("hacan");
        let sol = PlayerId::from("sol");
        let id = NoteId::from("hacan-ta");

        let moved = notes.transfer(&id, &hacan, &sol).unwrap();
        assert_eq!(moved.get(&id).unwrap().holder, sol);
        assert_eq!(notes.get(&id).unwrap().holder, hacan);
        assert_eq!(moved.held_by(&sol).len(), 1);

        assert!(moved.transfer(&id, &hacan, &sol).is_err());
        assert!(notes.transfer(&NoteId::from("nope"), &hacan, &sol).is_err());
    }

    #[test]
    fn return_to_issuer_takes_note_out_of_circulation() {
        let id = NoteId::from("hacan-ta");
        let moved = manager()
            .transfer(&id, &PlayerId::from("hacan"), &PlayerId::from("sol"))
            .unwrap();
        assert!(moved.get(&id).unwrap().is_in_circulation());
        let back = moved.return_to_issuer(&id).unwrap();
        assert!(!back.get(&id).unwrap().is_in_circulation());
    }
}
