/// Move behavior: how each move of the paragraph grammar turns the corpus
/// and chapter state into one sentence.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::context::ChapterState;
use crate::core::corpus::{CorpusError, Pool, SentenceCorpus, SentenceRecord};
use crate::core::decompose::{self, replace_span};
use crate::schema::move_kind::MoveKind;
use crate::schema::span::Span;

const NARRATORS: &[&str] = &["you", "I", "we"];

const AWARENESS_VERBS: &[&str] = &[
    "became aware of",
    "sensed",
    "saw",
    "approached",
    "felt the presence of",
    "found",
    "came across",
    "heard",
    "encountered",
    "happened upon",
    "smelled",
    "perceived",
];
const AWARENESS_ADVERBS: &[&str] = &[
    "suddenly",
    "all at once",
    "gradually",
    "soon",
    "later",
    "then",
    "nearby",
    "in the distance",
    "meanwhile",
    "once in a while",
    "over and over",
    "again",
    "somewhere",
    "finally",
    "intermittently",
];

const REMINDED_VERBS: &[&str] = &[
    "reminded me of",
    "reminded you of",
    "reminded us of",
    "recalled",
    "brought to mind",
    "evoked",
    "suggested",
    "seemed like",
    "resembled",
    "had the quality of",
];
const REMINDED_ADVERBS: &[&str] = &["somehow", "at the time", "sometimes", "at first", "maybe"];

const MOTION_VERBS: &[&str] = &[
    "continue",
    "press on",
    "move on",
    "wander away",
    "float away",
    "ascend",
    "go up",
    "take flight",
    "leave",
    "descend",
    "go down",
    "proceed",
    "follow",
    "go around",
    "retreat",
];
const MOTION_MODALS: &[&str] = &["decided to", "resolved to", "agreed to", "elected to"];
const MOTION_ADVERBS: &[&str] = &[
    "reluctantly",
    "discreetly",
    "foolishly",
    "regretfully",
    "at last",
    "finally",
    "hastily",
];

const AFFECTIONS: &[&str] = &["we embraced", "we smiled", "we held hands"];
const ARRIVALS: &[&str] = &["we were home", "we had come home", "we had arrived"];
const ARRIVAL_ADVERBS: &[&str] = &["finally", "at last"];

/// What one application of a move yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Text(String),
    EndParagraph,
}

fn pick(words: &'static [&'static str], rng: &mut StdRng) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

/// True with probability `1 / n`.
fn one_in(n: u32, rng: &mut StdRng) -> bool {
    rng.gen_range(0..n) == 0
}

fn subject_of(record: &SentenceRecord, pool: Pool) -> Result<&Span, CorpusError> {
    record.subject.as_ref().ok_or(CorpusError::EmptyPool(pool))
}

/// "it" or "they" for the last topic, or "the <head>" when the previous
/// subject was already a pronoun.
fn topic_reference(state: &ChapterState<'_>) -> (String, bool) {
    let topic = state.last_topic();
    let plural = topic.is_some_and(decompose::is_plural);
    let pronoun = if plural { "they" } else { "it" };
    let head = topic
        .filter(|_| state.last_orth_is_pronoun())
        .and_then(|t| t.root())
        .map(|head| format!("the {}", head.text));
    (head.unwrap_or_else(|| pronoun.to_string()), plural)
}

impl MoveKind {
    /// Produce this move's sentence, or the paragraph-ending signal. Moves
    /// only ever push onto the chapter's topic and orthography stacks.
    pub fn apply(
        self,
        corpus: &SentenceCorpus,
        state: &mut ChapterState<'_>,
        rng: &mut StdRng,
    ) -> Result<MoveOutcome, CorpusError> {
        let text = match self {
            Self::Exposition => exposition(corpus, state, rng)?,
            Self::Awareness => awareness(corpus, state, rng)?,
            Self::ElaborateOnTopic => elaborate_on_topic(corpus, state, rng)?,
            Self::Reminded => reminded(corpus, state, rng)?,
            Self::Motion => motion(rng),
            Self::Affection => pick(AFFECTIONS, rng).to_string(),
            Self::Arrived => arrived(rng),
            Self::EndParagraph => return Ok(MoveOutcome::EndParagraph),
        };
        Ok(MoveOutcome::Text(text))
    }

    /// Pool requirements, each a set of alternatives of which at least one
    /// must be populated before this move can run.
    pub fn required_pools(self) -> &'static [&'static [Pool]] {
        match self {
            Self::Exposition => &[&[Pool::WithSubject], &[Pool::NoSubject]],
            Self::Awareness => &[&[Pool::Indefinable], &[Pool::WithPhrases]],
            Self::ElaborateOnTopic => &[
                &[Pool::Unconstrained, Pool::AgreesWithSingular],
                &[Pool::Unconstrained, Pool::AgreesWithPlural],
            ],
            Self::Reminded => &[&[Pool::WithSubject]],
            Self::Motion | Self::Affection | Self::Arrived | Self::EndParagraph => &[],
        }
    }
}

/// A corpus sentence spliced with a second entry: either one of its
/// phrases is swapped for a corpus-wide phrase, or its subject is replaced
/// by an agreeing companion's subject. One time in ten a subjectless entry
/// is used as is.
fn exposition(
    corpus: &SentenceCorpus,
    state: &mut ChapterState<'_>,
    rng: &mut StdRng,
) -> Result<String, CorpusError> {
    if one_in(10, rng) {
        return Ok(corpus.sample(Pool::NoSubject, rng)?.text.clone());
    }

    let primary = corpus.sample(Pool::WithSubject, rng)?;
    let companion = corpus.companion_for(primary, rng)?;
    let primary_subject = subject_of(primary, Pool::WithSubject)?;

    let (text, subject) = if !primary.phrases.is_empty() && one_in(2, rng) {
        let target = primary
            .phrases
            .choose(rng)
            .ok_or(CorpusError::EmptyPool(Pool::WithPhrases))?;
        let phrase = corpus.sample_phrase(rng)?;
        let text = replace_span(&primary.span, target, &phrase.text());
        (text, primary_subject)
    } else {
        let companion_subject = subject_of(companion, SentenceCorpus::companion_pool(primary))?;
        let text = replace_span(&primary.span, primary_subject, &companion_subject.text());
        (text, companion_subject)
    };

    state.push_topic(subject.clone());
    state.push_orth(subject.text());
    Ok(text)
}

/// "we sensed a ..." introducing a fresh topic.
fn awareness(
    corpus: &SentenceCorpus,
    state: &mut ChapterState<'_>,
    rng: &mut StdRng,
) -> Result<String, CorpusError> {
    let entry = corpus.sample(Pool::Indefinable, rng)?;
    let noun_phrase = entry
        .indefinite_subject
        .as_deref()
        .ok_or(CorpusError::EmptyPool(Pool::Indefinable))?;
    let subject = subject_of(entry, Pool::Indefinable)?;
    let verb = pick(AWARENESS_VERBS, rng);
    state.push_topic(subject.clone());

    let mut sentence = format!("{} {} {}", pick(NARRATORS, rng), verb, noun_phrase);
    if !state.is_first_paragraph() && state.last_topic().is_some() && one_in(3, rng) {
        sentence = format!("{} {}", pick(AWARENESS_ADVERBS, rng), sentence);
    }
    if one_in(3, rng) {
        sentence.push(' ');
        sentence.push_str(&corpus.sample_phrase(rng)?.text());
    }
    Ok(sentence)
}

/// Continue on the current topic in a carrier sentence that agrees with it.
fn elaborate_on_topic(
    corpus: &SentenceCorpus,
    state: &mut ChapterState<'_>,
    rng: &mut StdRng,
) -> Result<String, CorpusError> {
    let (reference, plural) = topic_reference(state);
    let carrier = corpus.carrier_for(plural, rng)?;
    let carrier_subject = subject_of(carrier, SentenceCorpus::carrier_pools(plural)[0])?;
    let text = replace_span(&carrier.span, carrier_subject, &reference);
    state.push_orth(reference);
    Ok(text)
}

/// Compare the current topic with some other subject.
fn reminded(
    corpus: &SentenceCorpus,
    state: &mut ChapterState<'_>,
    rng: &mut StdRng,
) -> Result<String, CorpusError> {
    let (reference, _) = topic_reference(state);
    state.push_orth(reference.clone());
    let verb = pick(REMINDED_VERBS, rng);
    let other = subject_of(corpus.sample(Pool::WithSubject, rng)?, Pool::WithSubject)?;
    let mut sentence = format!("{} {} {}", reference, verb, other.text());
    if one_in(6, rng) {
        sentence = format!("{} {}", pick(REMINDED_ADVERBS, rng), sentence);
    }
    Ok(sentence)
}

fn motion(rng: &mut StdRng) -> String {
    let modal = pick(MOTION_MODALS, rng);
    let verb = pick(MOTION_VERBS, rng);
    let sentence = format!("we {modal} {verb}");
    if one_in(3, rng) {
        format!("{} {}", pick(MOTION_ADVERBS, rng), sentence)
    } else {
        sentence
    }
}

fn arrived(rng: &mut StdRng) -> String {
    let sentence = pick(ARRIVALS, rng);
    if one_in(3, rng) {
        format!("{} {}", pick(ARRIVAL_ADVERBS, rng), sentence)
    } else {
        sentence.to_string()
    }
}
