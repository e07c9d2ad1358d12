/// Lexical-semantic sentence filters built on the ontology interface.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::decompose::{self, Tense};
use crate::core::ontology::{Ontology, SynsetId, WordClass};
use crate::schema::span::Span;

pub const PERSON_ANCHOR: &str = "person";
pub const PHYSICAL_OBJECT_ANCHOR: &str = "physical object";
pub const GEOLOGICAL_FORMATION_ANCHOR: &str = "geological formation";
/// Anchors whose descendants count as nature.
pub const NATURE_ANCHORS: &[&str] = &[
    "natural object",
    "body of water",
    "geological formation",
    "location",
    "shape",
    "natural phenomenon",
    "land",
];

const COMMON_NOUN_TAGS: &[&str] = &["NN", "NNS"];
const PROPER_NOUN_TAGS: &[&str] = &["NNP", "NNPS"];
const PRONOUN_TAGS: &[&str] = &["PRP", "PRP$"];
const IMPERSONAL_PRONOUNS: &[&str] = &["it", "its"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("ontology has no synset for anchor {0:?}")]
    MissingAnchor(String),
}

/// The anchor synsets every predicate measures against, resolved once.
#[derive(Debug, Clone)]
pub struct Anchors {
    pub person: SynsetId,
    pub physical_object: SynsetId,
    pub geological_formation: SynsetId,
    pub nature: Vec<SynsetId>,
}

impl Anchors {
    /// Resolve each anchor to the first noun synset of its lemma.
    pub fn resolve<O: Ontology>(ontology: &O) -> Result<Self, ClassifyError> {
        let first = |lemma: &str| {
            ontology
                .synsets(lemma, WordClass::Noun)
                .into_iter()
                .next()
                .ok_or_else(|| ClassifyError::MissingAnchor(lemma.to_string()))
        };
        Ok(Self {
            person: first(PERSON_ANCHOR)?,
            physical_object: first(PHYSICAL_OBJECT_ANCHOR)?,
            geological_formation: first(GEOLOGICAL_FORMATION_ANCHOR)?,
            nature: NATURE_ANCHORS
                .iter()
                .map(|&lemma| first(lemma))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// How a lemma whose every sense is a proper name should be classified.
#[derive(Clone, Copy)]
enum AllProper {
    Accept,
    Reject,
}

/// Category predicates over lemmas and sentences.
///
/// Person detection treats a lemma whose every sense is a proper name as a
/// person; the other categories exclude such lemmas outright.
#[derive(Debug)]
pub struct Classifier<O> {
    ontology: O,
    anchors: Anchors,
}

impl<O: Ontology> Classifier<O> {
    pub fn new(ontology: O) -> Result<Self, ClassifyError> {
        let anchors = Anchors::resolve(&ontology)?;
        Ok(Self { ontology, anchors })
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    /// A synset is proper when any of its synonyms is capitalized.
    pub fn is_proper_synset(&self, synset: &SynsetId) -> bool {
        self.ontology
            .synonyms(synset)
            .iter()
            .any(|s| s.chars().next().is_some_and(char::is_uppercase))
    }

    fn descends_from(&self, synset: &SynsetId, anchors: &[SynsetId]) -> bool {
        anchors.contains(synset)
            || self
                .ontology
                .hypernyms(synset, true)
                .iter()
                .any(|h| anchors.contains(h))
    }

    fn lemma_is(&self, lemma: &str, anchors: &[SynsetId], all_proper: AllProper) -> bool {
        let synsets = self.ontology.synsets(lemma, WordClass::Noun);
        if !synsets.is_empty() && synsets.iter().all(|s| self.is_proper_synset(s)) {
            return matches!(all_proper, AllProper::Accept);
        }
        synsets
            .iter()
            .filter(|s| !self.is_proper_synset(s))
            .any(|s| self.descends_from(s, anchors))
    }

    pub fn is_person_lemma(&self, lemma: &str) -> bool {
        self.lemma_is(
            lemma,
            std::slice::from_ref(&self.anchors.person),
            AllProper::Accept,
        )
    }

    pub fn is_physical_object_lemma(&self, lemma: &str) -> bool {
        self.lemma_is(
            lemma,
            std::slice::from_ref(&self.anchors.physical_object),
            AllProper::Reject,
        )
    }

    pub fn is_geological_formation_lemma(&self, lemma: &str) -> bool {
        self.lemma_is(
            lemma,
            std::slice::from_ref(&self.anchors.geological_formation),
            AllProper::Reject,
        )
    }

    pub fn is_natural_lemma(&self, lemma: &str) -> bool {
        self.lemma_is(lemma, &self.anchors.nature, AllProper::Reject)
    }

    /// Proper nouns, capitals after the first token, person nouns, or any
    /// personal pronoun other than "it"/"its".
    pub fn has_people(&self, sentence: &Span) -> bool {
        let tokens = sentence.tokens();
        let proper = tokens.iter().any(|t| t.has_tag(PROPER_NOUN_TAGS));
        let capitalized = tokens
            .iter()
            .skip(1)
            .any(|t| t.text.chars().next().is_some_and(char::is_uppercase));
        let person_nouns = tokens
            .iter()
            .filter(|t| t.has_tag(COMMON_NOUN_TAGS))
            .any(|t| self.is_person_lemma(&t.lemma));
        let personal_pronouns = tokens
            .iter()
            .filter(|t| t.has_tag(PRONOUN_TAGS))
            .any(|t| !IMPERSONAL_PRONOUNS.contains(&t.lemma.as_str()));
        proper || capitalized || person_nouns || personal_pronouns
    }

    /// Lemmas of tokens labelled `nsubj`, or `None` when there are none.
    fn subject_lemmas<'s>(sentence: &'s Span) -> Option<Vec<&'s str>> {
        let lemmas: Vec<&str> = sentence
            .tokens()
            .iter()
            .filter(|t| t.dep == "nsubj")
            .map(|t| t.lemma.as_str())
            .collect();
        (!lemmas.is_empty()).then_some(lemmas)
    }

    pub fn subjects_are_natural(&self, sentence: &Span) -> bool {
        Self::subject_lemmas(sentence)
            .is_some_and(|lemmas| lemmas.iter().all(|l| self.is_natural_lemma(l)))
    }

    pub fn subjects_are_physical_objects(&self, sentence: &Span) -> bool {
        Self::subject_lemmas(sentence)
            .is_some_and(|lemmas| lemmas.iter().all(|l| self.is_physical_object_lemma(l)))
    }

    pub fn subjects_are_geological_formations(&self, sentence: &Span) -> bool {
        Self::subject_lemmas(sentence).is_some_and(|lemmas| {
            lemmas
                .iter()
                .all(|l| self.is_geological_formation_lemma(l))
        })
    }

    /// Common nouns in the sentence whose lemma is a physical object.
    pub fn physical_object_count(&self, sentence: &Span) -> usize {
        sentence
            .tokens()
            .iter()
            .filter(|t| t.has_tag(COMMON_NOUN_TAGS))
            .filter(|t| self.is_physical_object_lemma(&t.lemma))
            .count()
    }
}

/// True when the root has a personal-pronoun `nsubj` child.
pub fn has_pronoun_subject(sentence: &Span) -> bool {
    sentence.root().is_some_and(|root| {
        sentence
            .doc()
            .children(root.index)
            .any(|t| t.dep == "nsubj" && t.tag == "PRP")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TenseRequirement {
    #[default]
    Any,
    Past,
    Present,
}

impl TenseRequirement {
    pub fn admits(&self, sentence: &Span) -> bool {
        match self {
            Self::Any => true,
            Self::Past => decompose::tense(sentence) == Ok(Tense::Past),
            Self::Present => decompose::tense(sentence) == Ok(Tense::Present),
        }
    }
}

/// Acceptance policy for nature sentences drawn from source texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceFilter {
    /// Inclusive lower bound on rendered length, in characters.
    pub min_len: usize,
    /// Exclusive upper bound on rendered length, in characters.
    pub max_len: usize,
    pub tense: TenseRequirement,
}

impl Default for SentenceFilter {
    fn default() -> Self {
        Self {
            min_len: 20,
            max_len: 140,
            tense: TenseRequirement::Any,
        }
    }
}

impl SentenceFilter {
    pub fn accepts<O: Ontology>(&self, classifier: &Classifier<O>, sentence: &Span) -> bool {
        let text = sentence.text();
        let len = text.chars().count();
        !text.starts_with('"')
            && (self.min_len..self.max_len).contains(&len)
            && self.tense.admits(sentence)
            && !has_pronoun_subject(sentence)
            && !classifier.has_people(sentence)
            && classifier.subjects_are_natural(sentence)
    }
}
