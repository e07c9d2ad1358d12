/// Sentence corpus: decomposed sentence and clause records, sampling pools,
/// and the builder that ingests a parsed sentence stream.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::classify::{Classifier, ClassifyError, SentenceFilter};
use crate::core::decompose::{self, DecomposeError, Tense};
use crate::core::ontology::Ontology;
use crate::schema::doc::{ParseTable, Parser};
use crate::schema::span::Span;

/// Subjects shorter than this many characters may serve as chapter headings.
pub const SHORT_SUBJECT_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    #[error("sampling pool {0:?} is empty")]
    EmptyPool(Pool),
}

/// Named sampling pools over the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pool {
    /// Every record with a subject.
    WithSubject,
    Singular,
    Plural,
    NoSubject,
    /// Records with a subject and no was/were commitment.
    Unconstrained,
    AgreesWithSingular,
    AgreesWithPlural,
    /// Records whose subject can take an indefinite determiner.
    Indefinable,
    /// Records carrying prepositional phrases.
    WithPhrases,
}

impl Pool {
    pub const ALL: [Pool; 9] = [
        Pool::WithSubject,
        Pool::Singular,
        Pool::Plural,
        Pool::NoSubject,
        Pool::Unconstrained,
        Pool::AgreesWithSingular,
        Pool::AgreesWithPlural,
        Pool::Indefinable,
        Pool::WithPhrases,
    ];

    pub fn admits(&self, record: &SentenceRecord) -> bool {
        let has_subject = record.subject.is_some();
        match self {
            Self::WithSubject => has_subject,
            Self::Singular => has_subject && !record.plural,
            Self::Plural => has_subject && record.plural,
            Self::NoSubject => !has_subject,
            Self::Unconstrained => has_subject && !record.requires_agreement,
            Self::AgreesWithSingular => {
                has_subject && record.requires_agreement && !record.plural
            }
            Self::AgreesWithPlural => has_subject && record.requires_agreement && record.plural,
            Self::Indefinable => record.indefinite_subject.is_some(),
            Self::WithPhrases => !record.phrases.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Sentence,
    Clause,
}

/// One decomposed sentence or clause. Immutable once built.
#[derive(Debug, Clone)]
pub struct SentenceRecord {
    pub source: u64,
    /// The stream text of the originating sentence, verbatim. Clause
    /// records share their sentence's.
    pub source_text: String,
    /// Rendered text of `span`.
    pub text: String,
    pub span: Span,
    /// `None` when no nominal subject was found.
    pub subject: Option<Span>,
    /// Always false without a subject.
    pub plural: bool,
    pub requires_agreement: bool,
    pub tense: Tense,
    pub phrases: Vec<Span>,
    /// The subject rewritten with an indefinite determiner, when possible.
    pub indefinite_subject: Option<String>,
    pub kind: RecordKind,
}

impl SentenceRecord {
    /// Decompose a sentence or clause span. Clause records carry no phrases
    /// so the corpus does not extract them twice.
    pub fn decompose(
        source: u64,
        source_text: &str,
        span: Span,
        kind: RecordKind,
    ) -> Result<Self, DecomposeError> {
        let subject = match decompose::subject(&span) {
            Ok(subject) => Some(subject),
            Err(DecomposeError::NoSubjectFound) => None,
            Err(e) => return Err(e),
        };
        let phrases = match kind {
            RecordKind::Sentence => decompose::prepositional_phrases(&span)?,
            RecordKind::Clause => Vec::new(),
        };
        Ok(Self {
            source,
            source_text: source_text.to_string(),
            text: span.text(),
            plural: subject.as_ref().is_some_and(decompose::is_plural),
            requires_agreement: decompose::requires_past_agreement(&span)?,
            tense: decompose::tense(&span)?,
            indefinite_subject: subject
                .as_ref()
                .and_then(|s| decompose::indefinitize(s).ok()),
            phrases,
            subject,
            span,
            kind,
        })
    }

    pub fn subject_text(&self) -> Option<String> {
        self.subject.as_ref().map(Span::text)
    }

    /// Surface text with the subject replaced.
    pub fn with_subject(&self, replacement: &str) -> Option<String> {
        self.subject
            .as_ref()
            .map(|subject| decompose::replace_span(&self.span, subject, replacement))
    }
}

/// Counters from one corpus build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub read: usize,
    pub unparsed: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub sentences: usize,
    pub clauses: usize,
}

/// Read-only collection of records with precomputed pools. Share it across
/// generation runs behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SentenceCorpus {
    records: Vec<SentenceRecord>,
    pools: FxHashMap<Pool, Vec<usize>>,
    phrases: Vec<Span>,
    stats: BuildStats,
}

impl SentenceCorpus {
    pub fn from_records(records: Vec<SentenceRecord>) -> Self {
        let pools = Pool::ALL
            .iter()
            .map(|&pool| {
                let ids = records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| pool.admits(r))
                    .map(|(i, _)| i)
                    .collect();
                (pool, ids)
            })
            .collect();
        let phrases = records
            .iter()
            .flat_map(|r| r.phrases.iter().cloned())
            .collect();
        Self {
            records,
            pools,
            phrases,
            stats: BuildStats::default(),
        }
    }

    /// Build from a parse table, keeping only the sentences `policy`
    /// accepts under a classifier over `ontology`.
    pub fn from_nature_table<O: Ontology>(
        table: &ParseTable,
        ontology: O,
        policy: SentenceFilter,
    ) -> Result<Self, ClassifyError> {
        let classifier = Classifier::new(ontology)?;
        let corpus = CorpusBuilder::new()
            .nature_filter(&classifier, policy)
            .build(table, table.stream());
        Ok(corpus)
    }

    pub fn records(&self) -> &[SentenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Every prepositional phrase in the corpus, in record order.
    pub fn phrases(&self) -> &[Span] {
        &self.phrases
    }

    fn ids(&self, pool: Pool) -> &[usize] {
        self.pools.get(&pool).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool(&self, pool: Pool) -> impl Iterator<Item = &SentenceRecord> + '_ {
        self.ids(pool).iter().map(|&i| &self.records[i])
    }

    pub fn pool_len(&self, pool: Pool) -> usize {
        self.ids(pool).len()
    }

    pub fn query<'c, F>(&'c self, predicate: F) -> impl Iterator<Item = &'c SentenceRecord> + 'c
    where
        F: Fn(&SentenceRecord) -> bool + 'c,
    {
        self.records.iter().filter(move |r| predicate(r))
    }

    pub fn sample(&self, pool: Pool, rng: &mut StdRng) -> Result<&SentenceRecord, CorpusError> {
        self.ids(pool)
            .choose(rng)
            .map(|&i| &self.records[i])
            .ok_or(CorpusError::EmptyPool(pool))
    }

    /// Sample uniformly from the concatenation of several pools; a record in
    /// two of them is twice as likely.
    pub fn sample_union(
        &self,
        pools: &[Pool],
        rng: &mut StdRng,
    ) -> Result<&SentenceRecord, CorpusError> {
        let total: usize = pools.iter().map(|&p| self.pool_len(p)).sum();
        if total == 0 {
            return Err(CorpusError::EmptyPool(
                pools.first().copied().unwrap_or(Pool::WithSubject),
            ));
        }
        let mut pick = rng.gen_range(0..total);
        for &pool in pools {
            let ids = self.ids(pool);
            if pick < ids.len() {
                return Ok(&self.records[ids[pick]]);
            }
            pick -= ids.len();
        }
        Err(CorpusError::EmptyPool(pools[0]))
    }

    pub fn sample_phrase(&self, rng: &mut StdRng) -> Result<&Span, CorpusError> {
        self.phrases
            .choose(rng)
            .ok_or(CorpusError::EmptyPool(Pool::WithPhrases))
    }

    /// A companion whose subject can replace the primary's without breaking
    /// a was/were commitment in the primary.
    pub fn companion_for(
        &self,
        primary: &SentenceRecord,
        rng: &mut StdRng,
    ) -> Result<&SentenceRecord, CorpusError> {
        self.sample(Self::companion_pool(primary), rng)
    }

    pub fn companion_pool(primary: &SentenceRecord) -> Pool {
        match (primary.requires_agreement, primary.plural) {
            (true, true) => Pool::Plural,
            (true, false) => Pool::Singular,
            (false, _) => Pool::WithSubject,
        }
    }

    /// A record that can take a pronoun or noun of the given number as its
    /// subject.
    pub fn carrier_for(&self, plural: bool, rng: &mut StdRng) -> Result<&SentenceRecord, CorpusError> {
        self.sample_union(&Self::carrier_pools(plural), rng)
    }

    pub fn carrier_pools(plural: bool) -> [Pool; 2] {
        if plural {
            [Pool::Unconstrained, Pool::AgreesWithPlural]
        } else {
            [Pool::Unconstrained, Pool::AgreesWithSingular]
        }
    }

    /// Distinct subject texts shorter than [`SHORT_SUBJECT_LEN`] characters.
    pub fn short_subjects(&self) -> BTreeSet<String> {
        self.pool(Pool::WithSubject)
            .filter_map(SentenceRecord::subject_text)
            .filter(|text| text.chars().count() < SHORT_SUBJECT_LEN)
            .collect()
    }

    /// Succeed when at least one of `alternatives` is populated; otherwise
    /// report the first of them.
    pub fn validate_any(&self, alternatives: &[Pool]) -> Result<(), CorpusError> {
        if alternatives.iter().any(|&p| self.pool_len(p) > 0) {
            return Ok(());
        }
        match alternatives.first() {
            Some(&pool) => Err(CorpusError::EmptyPool(pool)),
            None => Ok(()),
        }
    }
}

type SpanFilter<'a> = Box<dyn Fn(&Span) -> bool + 'a>;

/// Builds a [`SentenceCorpus`] from an ordered `(source, text)` stream.
///
/// Without a filter the stream is trusted as already filtered. Unparseable
/// texts and parses without a root are skipped with a warning.
#[derive(Default)]
pub struct CorpusBuilder<'a> {
    filter: Option<SpanFilter<'a>>,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Span) -> bool + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Keep only sentences the nature policy accepts.
    pub fn nature_filter<O: Ontology + 'a>(
        self,
        classifier: &'a Classifier<O>,
        policy: SentenceFilter,
    ) -> Self {
        self.filter(move |span| policy.accepts(classifier, span))
    }

    pub fn build<'s, P, I>(&self, parser: &P, stream: I) -> SentenceCorpus
    where
        P: Parser + ?Sized,
        I: IntoIterator<Item = (u64, &'s str)>,
    {
        let mut stats = BuildStats::default();
        let mut records = Vec::new();

        for (source, text) in stream {
            stats.read += 1;
            let doc = match parser.parse(text) {
                Ok(doc) => Arc::new(doc),
                Err(e) => {
                    warn!(source, error = %e, "skipping unparseable sentence");
                    stats.unparsed += 1;
                    continue;
                }
            };
            let Some(sentence) = Span::first_sentence(&doc) else {
                warn!(source, text, "skipping parse with no root");
                stats.malformed += 1;
                continue;
            };
            if self.filter.as_ref().is_some_and(|accept| !accept(&sentence)) {
                stats.rejected += 1;
                continue;
            }

            let (record, clauses) = match decompose_sentence(source, text, sentence) {
                Ok(decomposed) => decomposed,
                Err(e) => {
                    warn!(source, text, error = %e, "skipping undecomposable sentence");
                    stats.malformed += 1;
                    continue;
                }
            };
            debug!(source, text, clauses = clauses.len(), "added sentence");
            stats.sentences += 1;
            stats.clauses += clauses.len();
            records.push(record);
            records.extend(clauses);
        }

        info!(
            read = stats.read,
            sentences = stats.sentences,
            clauses = stats.clauses,
            rejected = stats.rejected,
            skipped = stats.unparsed + stats.malformed,
            "corpus built"
        );
        let mut corpus = SentenceCorpus::from_records(records);
        corpus.stats = stats;
        corpus
    }
}

/// The sentence record, followed by one record per clause when the
/// sentence splits into more than one.
fn decompose_sentence(
    source: u64,
    source_text: &str,
    sentence: Span,
) -> Result<(SentenceRecord, Vec<SentenceRecord>), DecomposeError> {
    let clauses = decompose::clauses(&sentence)?;
    let record = SentenceRecord::decompose(source, source_text, sentence, RecordKind::Sentence)?;
    let clause_records = if clauses.len() > 1 {
        clauses
            .into_iter()
            .map(|clause| {
                SentenceRecord::decompose(source, source_text, clause, RecordKind::Clause)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };
    Ok((record, clause_records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::doc::{ParsedDoc, TokenRow};
    use rand::SeedableRng;
    use std::path::Path;

    fn table() -> ParseTable {
        ParseTable::load_from_ron(Path::new("tests/fixtures/parsed_sentences.ron")).unwrap()
    }

    fn corpus() -> SentenceCorpus {
        let table = table();
        CorpusBuilder::new().build(&table, table.stream())
    }

    fn record<'c>(corpus: &'c SentenceCorpus, text: &str) -> &'c SentenceRecord {
        corpus.records().iter().find(|r| r.text == text).unwrap()
    }

    #[test]
    fn malformed_parse_is_skipped() {
        let corpus = corpus();
        let stats = corpus.stats();
        assert_eq!(stats.read, 26);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.sentences, 25);
        assert!(corpus.records().iter().all(|r| r.text != "Broken parse here"));
    }

    #[test]
    fn multi_clause_sentences_register_each_clause() {
        let corpus = corpus();
        let texts: Vec<&str> = corpus
            .records()
            .iter()
            .filter(|r| r.source == 105)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec![
                "The sea was pretty calm; a slight breeze blew on land.",
                "a slight breeze blew on land",
                "The sea was pretty calm",
            ]
        );
        let clause = record(&corpus, "a slight breeze blew on land");
        assert_eq!(clause.kind, RecordKind::Clause);
        assert!(clause.phrases.is_empty());
    }

    #[test]
    fn records_keep_subjectless_sentences() {
        let corpus = corpus();
        let look = record(&corpus, "Look at the mountains.");
        assert!(look.subject.is_none());
        assert!(!look.plural);
        assert!(Pool::NoSubject.admits(look));
    }

    #[test]
    fn records_keep_the_stream_text() {
        let sea = "The sea was pretty calm; a slight breeze blew on land.";
        let fixture = corpus();
        assert!(fixture
            .records()
            .iter()
            .filter(|r| r.source == 105)
            .all(|r| r.source_text == sea));

        let raw = "The wave   broke .";
        let doc = ParsedDoc::from_rows(vec![
            TokenRow::new("The", "the", "DT", "det", 1),
            TokenRow::new("wave", "wave", "NN", "nsubj", 2),
            TokenRow::new("broke", "break", "VBD", "ROOT", 2),
            TokenRow::new(".", ".", ".", "punct", 2),
        ])
        .unwrap();
        let mut table = ParseTable::new();
        table.insert(1, raw.to_string(), doc);
        let built = CorpusBuilder::new().build(&table, table.stream());
        assert_eq!(built.len(), 1);
        assert_eq!(built.records()[0].source_text, raw);
        assert_eq!(built.records()[0].text, "The wave broke.");
    }

    #[test]
    fn record_metadata() {
        let corpus = corpus();
        let fish = record(&corpus, "The fish were hungry.");
        assert!(fish.plural && fish.requires_agreement);
        assert_eq!(fish.tense, Tense::Past);
        assert_eq!(fish.indefinite_subject.as_deref(), Some("some fish"));

        let rain = record(&corpus, "The rain in spain falls mainly on the plain");
        assert_eq!(rain.subject_text().as_deref(), Some("The rain in spain"));
        assert_eq!(rain.phrases.len(), 1);
        assert_eq!(
            rain.with_subject("the snow").as_deref(),
            Some("the snow falls mainly on the plain")
        );
    }

    #[test]
    fn subjects_lie_inside_their_records() {
        for r in corpus().records() {
            if let Some(subject) = &r.subject {
                assert!(r.span.contains_span(subject), "{}", r.text);
            }
        }
    }

    #[test]
    fn companions_honor_agreement() {
        let corpus = corpus();
        let mut rng = StdRng::seed_from_u64(7);
        for primary in corpus.pool(Pool::WithSubject) {
            for _ in 0..20 {
                let companion = corpus.companion_for(primary, &mut rng).unwrap();
                assert!(companion.subject.is_some());
                if primary.requires_agreement {
                    assert_eq!(companion.plural, primary.plural, "{}", primary.text);
                }
            }
        }
    }

    #[test]
    fn carriers_match_number() {
        let corpus = corpus();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let carrier = corpus.carrier_for(true, &mut rng).unwrap();
            assert!(!carrier.requires_agreement || carrier.plural);
            let carrier = corpus.carrier_for(false, &mut rng).unwrap();
            assert!(!carrier.requires_agreement || !carrier.plural);
        }
    }

    #[test]
    fn empty_pools_are_named() {
        let empty = SentenceCorpus::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            empty.sample(Pool::Plural, &mut rng).err(),
            Some(CorpusError::EmptyPool(Pool::Plural))
        );
        assert_eq!(
            empty.sample_phrase(&mut rng).err(),
            Some(CorpusError::EmptyPool(Pool::WithPhrases))
        );
        assert_eq!(
            empty.validate_any(&[Pool::Singular, Pool::Plural]),
            Err(CorpusError::EmptyPool(Pool::Singular))
        );
        let corpus = corpus();
        assert!(Pool::ALL.iter().all(|&p| corpus.validate_any(&[p]).is_ok()));
    }

    #[test]
    fn any_populated_alternative_suffices() {
        let table = table();
        let waves = CorpusBuilder::new()
            .filter(|span| span.text().starts_with("The w"))
            .build(&table, table.stream());
        assert!(waves.validate_any(&[Pool::NoSubject, Pool::WithSubject]).is_ok());
        assert_eq!(
            SentenceCorpus::default().validate_any(&[Pool::Unconstrained, Pool::AgreesWithPlural]),
            Err(CorpusError::EmptyPool(Pool::Unconstrained))
        );
    }

    #[test]
    fn short_subjects_are_bounded() {
        let subjects = corpus().short_subjects();
        assert!(subjects.contains("The wave"));
        assert!(subjects.iter().all(|s| s.chars().count() < SHORT_SUBJECT_LEN));
    }

    #[test]
    fn custom_filter_rejects() {
        let table = table();
        let corpus = CorpusBuilder::new()
            .filter(|span| span.text().starts_with("The w"))
            .build(&table, table.stream());
        assert!(corpus.records().iter().all(|r| r.text.starts_with("The w")));
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.stats().rejected, 22);
    }
}
