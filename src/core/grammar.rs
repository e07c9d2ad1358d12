/// Paragraph transition grammar: state keys, the move table, RON loading,
/// merging, and validation.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::schema::move_kind::MoveKind;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no transitions for state {0}")]
    MissingState(StateKey),
    #[error("state {0} has an empty candidate list")]
    EmptyCandidates(StateKey),
    #[error("end_paragraph is unreachable from state {0}")]
    Unterminated(StateKey),
    #[error("end_paragraph cannot be a state key")]
    EndParagraphKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// What the next move is chosen from: a paragraph position or the move
/// that came before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateKey {
    Start,
    EndChapter,
    EndNovel,
    After(MoveKind),
}

impl StateKey {
    pub const POSITIONAL: [StateKey; 3] = [StateKey::Start, StateKey::EndChapter, StateKey::EndNovel];
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::EndChapter => f.write_str("end-chapter"),
            Self::EndNovel => f.write_str("end-novel"),
            Self::After(m) => write!(f, "{m}"),
        }
    }
}

/// The transition table. Repeated moves in a candidate list weight the
/// uniform choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParagraphModel {
    transitions: BTreeMap<StateKey, Vec<MoveKind>>,
}

impl Default for ParagraphModel {
    fn default() -> Self {
        use MoveKind::*;
        let table = [
            (StateKey::Start, vec![Exposition, Awareness]),
            (
                StateKey::After(Exposition),
                vec![
                    Exposition,
                    Exposition,
                    Exposition,
                    ElaborateOnTopic,
                    ElaborateOnTopic,
                    Reminded,
                    Reminded,
                    Awareness,
                    EndParagraph,
                ],
            ),
            (
                StateKey::After(ElaborateOnTopic),
                vec![Exposition, Reminded, EndParagraph],
            ),
            (
                StateKey::After(Awareness),
                vec![
                    ElaborateOnTopic,
                    ElaborateOnTopic,
                    ElaborateOnTopic,
                    Reminded,
                    Reminded,
                    Exposition,
                    EndParagraph,
                ],
            ),
            (
                StateKey::After(Reminded),
                vec![ElaborateOnTopic, Exposition, EndParagraph],
            ),
            (StateKey::EndChapter, vec![Awareness, Exposition, Motion]),
            (
                StateKey::After(Motion),
                vec![Exposition, Exposition, Awareness, Awareness, EndParagraph],
            ),
            (StateKey::EndNovel, vec![Affection]),
            (StateKey::After(Affection), vec![Arrived]),
            (
                StateKey::After(Arrived),
                vec![Exposition, Exposition, Awareness, Awareness, EndParagraph],
            ),
        ];
        Self {
            transitions: table.into_iter().collect(),
        }
    }
}

impl ParagraphModel {
    /// A model with no transitions.
    pub fn empty() -> Self {
        Self {
            transitions: BTreeMap::new(),
        }
    }

    /// Load a model from a RON file. The result is not merged or validated.
    pub fn load_from_ron(path: &Path) -> Result<ParagraphModel, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a RON map of `StateKey: [MoveKind]` entries.
    pub fn parse_ron(input: &str) -> Result<ParagraphModel, ModelError> {
        let transitions: BTreeMap<StateKey, Vec<MoveKind>> = ron::from_str(input)?;
        Ok(Self { transitions })
    }

    /// Entries from `other` replace entries for the same key.
    pub fn merge(&mut self, other: ParagraphModel) {
        self.transitions.extend(other.transitions);
    }

    pub fn insert(&mut self, key: StateKey, candidates: Vec<MoveKind>) {
        self.transitions.insert(key, candidates);
    }

    pub fn candidates(&self, key: StateKey) -> Option<&[MoveKind]> {
        self.transitions.get(&key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.transitions.keys().copied()
    }

    /// Every move that can be chosen from some state.
    pub fn moves(&self) -> BTreeSet<MoveKind> {
        self.transitions.values().flatten().copied().collect()
    }

    /// Pick uniformly among the candidates for `key`.
    pub fn choose(&self, key: StateKey, rng: &mut StdRng) -> Result<MoveKind, ModelError> {
        let candidates = self
            .transitions
            .get(&key)
            .ok_or(ModelError::MissingState(key))?;
        candidates
            .choose(rng)
            .copied()
            .ok_or(ModelError::EmptyCandidates(key))
    }

    /// Check that the table can drive paragraph assembly to completion:
    /// positional states exist, every reachable move has a successor list,
    /// no list is empty, and `EndParagraph` is reachable from every state.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self
            .transitions
            .contains_key(&StateKey::After(MoveKind::EndParagraph))
        {
            return Err(ModelError::EndParagraphKey);
        }
        for key in StateKey::POSITIONAL {
            if !self.transitions.contains_key(&key) {
                return Err(ModelError::MissingState(key));
            }
        }
        for (&key, candidates) in &self.transitions {
            if candidates.is_empty() {
                return Err(ModelError::EmptyCandidates(key));
            }
        }
        for m in self.moves() {
            if m.produces_text() && !self.transitions.contains_key(&StateKey::After(m)) {
                return Err(ModelError::MissingState(StateKey::After(m)));
            }
        }

        // Grow the set of states that can end a paragraph until it settles.
        let mut terminating: BTreeSet<StateKey> = BTreeSet::new();
        loop {
            let before = terminating.len();
            for (&key, candidates) in &self.transitions {
                let ends = candidates.iter().any(|&m| {
                    m == MoveKind::EndParagraph || terminating.contains(&StateKey::After(m))
                });
                if ends {
                    terminating.insert(key);
                }
            }
            if terminating.len() == before {
                break;
            }
        }
        match self.keys().find(|k| !terminating.contains(k)) {
            Some(key) => Err(ModelError::Unterminated(key)),
            None => Ok(()),
        }
    }
}
