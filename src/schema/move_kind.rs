use serde::{Deserialize, Serialize};
use std::fmt;

/// The move taxonomy of the paragraph grammar.
///
/// Every sentence in a generated paragraph is produced by one move; the
/// paragraph model decides which move may follow which. `EndParagraph` is a
/// control signal and never produces text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoveKind {
    /// A corpus sentence, spliced with another entry's subject or phrase.
    Exposition,
    /// "we sensed a ..." introducing a new topic.
    Awareness,
    /// Continue on the current topic through a pronoun or its head noun.
    ElaborateOnTopic,
    /// Compare the current topic with some other subject.
    Reminded,
    /// The narrators move on.
    Motion,
    Affection,
    Arrived,
    EndParagraph,
}

impl MoveKind {
    pub const ALL: [MoveKind; 8] = [
        MoveKind::Exposition,
        MoveKind::Awareness,
        MoveKind::ElaborateOnTopic,
        MoveKind::Reminded,
        MoveKind::Motion,
        MoveKind::Affection,
        MoveKind::Arrived,
        MoveKind::EndParagraph,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exposition => "exposition",
            Self::Awareness => "awareness",
            Self::ElaborateOnTopic => "elaborate_on_topic",
            Self::Reminded => "reminded",
            Self::Motion => "motion",
            Self::Affection => "affection",
            Self::Arrived => "arrived",
            Self::EndParagraph => "end_paragraph",
        }
    }

    pub fn produces_text(&self) -> bool {
        !matches!(self, Self::EndParagraph)
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
