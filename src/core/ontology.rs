/// Lexical ontology interface, an in-memory lexicon, and a lookup cache.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("duplicate synset id: {0}")]
    DuplicateSynset(SynsetId),
    #[error("synset {synset} names unknown hypernym {hypernym}")]
    UnknownHypernym { synset: SynsetId, hypernym: SynsetId },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Newtype wrapper for synset identifiers such as `tree.n.01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynsetId(pub String);

impl SynsetId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SynsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Part of speech as the ontology indexes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WordClass {
    #[default]
    Noun,
    Verb,
    Adjective,
    Adverb,
}

/// The external lexical ontology service. Lookups are pure functions of
/// their arguments, which is what makes [`CachedOntology`] sound.
pub trait Ontology {
    /// Synsets for a lemma, most common sense first.
    fn synsets(&self, lemma: &str, pos: WordClass) -> Vec<SynsetId>;
    /// Direct hypernyms, or the full closure when `recursive`.
    fn hypernyms(&self, synset: &SynsetId, recursive: bool) -> Vec<SynsetId>;
    fn synonyms(&self, synset: &SynsetId) -> Vec<String>;
}

impl<O: Ontology + ?Sized> Ontology for &O {
    fn synsets(&self, lemma: &str, pos: WordClass) -> Vec<SynsetId> {
        (**self).synsets(lemma, pos)
    }

    fn hypernyms(&self, synset: &SynsetId, recursive: bool) -> Vec<SynsetId> {
        (**self).hypernyms(synset, recursive)
    }

    fn synonyms(&self, synset: &SynsetId) -> Vec<String> {
        (**self).synonyms(synset)
    }
}

/// One synset as written in a lexicon file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynsetEntry {
    pub id: SynsetId,
    #[serde(default)]
    pub pos: WordClass,
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub hypernyms: Vec<SynsetId>,
}

/// In-memory ontology. Lemma lookups are case-insensitive and treat `_`
/// as a space; synsets keep their file order within a lemma.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: FxHashMap<SynsetId, SynsetEntry>,
    index: FxHashMap<(String, WordClass), Vec<SynsetId>>,
}

fn lemma_key(lemma: &str) -> String {
    lemma.trim().to_lowercase().replace('_', " ")
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lexicon from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Lexicon, OntologyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a lexicon from a RON list of synset entries.
    pub fn parse_ron(input: &str) -> Result<Lexicon, OntologyError> {
        let raw: Vec<SynsetEntry> = ron::from_str(input)?;
        let mut lexicon = Lexicon::new();
        for entry in raw {
            lexicon.insert(entry)?;
        }
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub fn insert(&mut self, entry: SynsetEntry) -> Result<(), OntologyError> {
        if self.entries.contains_key(&entry.id) {
            return Err(OntologyError::DuplicateSynset(entry.id));
        }
        for synonym in &entry.synonyms {
            let ids = self.index.entry((lemma_key(synonym), entry.pos)).or_default();
            if !ids.contains(&entry.id) {
                ids.push(entry.id.clone());
            }
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Every hypernym reference must name a known synset.
    pub fn validate(&self) -> Result<(), OntologyError> {
        for entry in self.entries.values() {
            if let Some(missing) = entry
                .hypernyms
                .iter()
                .find(|h| !self.entries.contains_key(*h))
            {
                return Err(OntologyError::UnknownHypernym {
                    synset: entry.id.clone(),
                    hypernym: missing.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &SynsetId) -> Option<&SynsetEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Ontology for Lexicon {
    fn synsets(&self, lemma: &str, pos: WordClass) -> Vec<SynsetId> {
        self.index
            .get(&(lemma_key(lemma), pos))
            .cloned()
            .unwrap_or_default()
    }

    fn hypernyms(&self, synset: &SynsetId, recursive: bool) -> Vec<SynsetId> {
        let direct = |id: &SynsetId| {
            self.entries
                .get(id)
                .map(|e| e.hypernyms.clone())
                .unwrap_or_default()
        };
        if !recursive {
            return direct(synset);
        }

        // Breadth-first closure; a cyclic file cannot loop.
        let mut seen: FxHashSet<SynsetId> = FxHashSet::default();
        let mut closure = Vec::new();
        let mut queue: VecDeque<SynsetId> = direct(synset).into();
        while let Some(next) = queue.pop_front() {
            if next == *synset || !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(direct(&next));
            closure.push(next);
        }
        closure
    }

    fn synonyms(&self, synset: &SynsetId) -> Vec<String> {
        self.entries
            .get(synset)
            .map(|e| e.synonyms.clone())
            .unwrap_or_default()
    }
}

/// Memoizing wrapper around an ontology. Construct one per run and hand it
/// to every consumer; synset lists and hypernym closures are computed once.
pub struct CachedOntology<O> {
    inner: O,
    synsets: RefCell<FxHashMap<(String, WordClass), Vec<SynsetId>>>,
    closures: RefCell<FxHashMap<SynsetId, Vec<SynsetId>>>,
}

impl<O: Ontology> CachedOntology<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            synsets: RefCell::new(FxHashMap::default()),
            closures: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Number of memoized lookups (synset lists plus closures).
    pub fn cached_entries(&self) -> usize {
        self.synsets.borrow().len() + self.closures.borrow().len()
    }
}

impl<O: Ontology> Ontology for CachedOntology<O> {
    fn synsets(&self, lemma: &str, pos: WordClass) -> Vec<SynsetId> {
        let key = (lemma.to_string(), pos);
        if let Some(hit) = self.synsets.borrow().get(&key) {
            return hit.clone();
        }
        let found = self.inner.synsets(lemma, pos);
        self.synsets.borrow_mut().insert(key, found.clone());
        found
    }

    fn hypernyms(&self, synset: &SynsetId, recursive: bool) -> Vec<SynsetId> {
        if !recursive {
            return self.inner.hypernyms(synset, false);
        }
        if let Some(hit) = self.closures.borrow().get(synset) {
            return hit.clone();
        }
        let closure = self.inner.hypernyms(synset, true);
        self.closures
            .borrow_mut()
            .insert(synset.clone(), closure.clone());
        closure
    }

    fn synonyms(&self, synset: &SynsetId) -> Vec<String> {
        self.inner.synonyms(synset)
    }
}

impl<O> fmt::Debug for CachedOntology<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedOntology")
            .field("synsets", &self.synsets.borrow().len())
            .field("closures", &self.closures.borrow().len())
            .finish()
    }
}
