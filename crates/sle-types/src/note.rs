use serde::{Deserialize, Serialize};

use crate::identity::{NoteId, PlayerId};

/// A tradeable note issued by one player and held by (possibly) another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeNote {
    pub id: NoteId,
    pub issuer: PlayerId,
    pub holder: PlayerId,
    pub name: String,
}

impl ExchangeNote {
    /// A freshly issued note, held by its issuer.
    pub fn issue(
        id: impl Into<NoteId>,
        issuer: impl Into<PlayerId>,
        name: impl Into<String>,
    ) -> Self {
        let issuer = issuer.into();
        Self {
            id: id.into(),
            holder: issuer.clone(),
            issuer,
            name: name.into(),
        }
    }

    /// Copy of this note held by `holder`.
    pub fn held_by(&self, holder: PlayerId) -> Self {
        Self {
            holder,
            ..self.clone()
        }
    }

    /// `true` while the note sits with someone other than its issuer.
    pub fn is_in_circulation(&self) -> bool {
        self.holder != self.issuer
    }
}
