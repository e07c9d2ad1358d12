/// Syntactic decomposition: subjects, clauses, prepositional phrases,
/// tense and agreement detection, and determiner indefinitization.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::schema::doc::render;
use crate::schema::span::Span;

/// Nominal subject labels, active and passive.
const SUBJECT_LABELS: &[&str] = &["nsubj", "nsubjpass"];
/// Children of a clause root that open a clause of their own.
const CLAUSE_LABELS: &[&str] = &["ccomp", "conj"];
/// Labels stripped from clause boundaries.
const TRIM_LABELS: &[&str] = &["punct", "cc"];
const PREP_LABELS: &[&str] = &["prep"];
const AUX_LABELS: &[&str] = &["aux", "auxpass"];
const PAST_COPULAS: &[&str] = &["was", "were"];
/// Only these determiners can be turned into an indefinite one.
const DEFINITE_DETERMINERS: &[&str] = &["the", "this", "these"];

/// Nesting limit for clause splitting.
pub const MAX_CLAUSE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecomposeError {
    #[error("no nominal subject found")]
    NoSubjectFound,
    #[error("subject has no definite or demonstrative determiner")]
    AmbiguousDeterminer,
    #[error("span has no root token")]
    NoRoot,
}

/// Tense of a sentence as read off its root tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tense {
    Past,
    Present,
    Other,
}

/// Extract the subject of a sentence or clause.
///
/// A token qualifies when its head chain reaches the span's root through a
/// nominal subject attachment. The result runs from the lowest to the highest
/// qualifying index inside the span.
pub fn subject(sentence: &Span) -> Result<Span, DecomposeError> {
    let root = sentence.root_index().ok_or(DecomposeError::NoRoot)?;
    let doc = sentence.doc();

    let qualifying = sentence.range().filter(|&i| {
        doc.attachment_under(i, root)
            .and_then(|top| doc.token(top))
            .is_some_and(|top| top.has_dep(SUBJECT_LABELS))
    });

    let (min, max) = qualifying.fold(None, |acc: Option<(usize, usize)>, i| match acc {
        None => Some((i, i)),
        Some((lo, hi)) => Some((lo.min(i), hi.max(i))),
    })
    .ok_or(DecomposeError::NoSubjectFound)?;

    sentence
        .with_range(min, max + 1)
        .ok_or(DecomposeError::NoSubjectFound)
}

/// A subject is plural when its head carries a plural noun tag.
pub fn is_plural(subject: &Span) -> bool {
    subject.root().is_some_and(|t| t.is_plural_noun())
}

/// Split a span into clauses, nested clauses first and the trimmed
/// remainder last.
///
/// Verb-headed `ccomp`/`conj` children of the root are carved out when their
/// subtree sits at either end of what is left (ignoring punctuation and
/// coordinators between it and the edge).
///
/// Every clause is one contiguous span, and the clauses are pairwise
/// disjoint; with the trimmed boundary tokens they cover the input. A
/// qualifying child buried in the middle of the remainder ("the guide said
/// the river was high yesterday") therefore stays in it, since carving it
/// out would leave a remainder in two pieces. Past [`MAX_CLAUSE_DEPTH`]
/// levels of nesting, whatever is left is emitted as a single clause.
pub fn clauses(span: &Span) -> Result<Vec<Span>, DecomposeError> {
    let root = span.root_index().ok_or(DecomposeError::NoRoot)?;
    let mut out = Vec::new();
    split(span, root, 0, &mut out);
    Ok(out)
}

fn split(span: &Span, root: usize, depth: usize, out: &mut Vec<Span>) {
    if depth >= MAX_CLAUSE_DEPTH {
        warn!(depth, text = %span, "clause nesting limit reached");
        push_trimmed(span, out);
        return;
    }

    let doc = span.doc();
    let mut pending: Vec<(usize, Span)> = doc
        .children(root)
        .filter(|t| t.has_dep(CLAUSE_LABELS) && t.is_verb())
        .filter_map(|t| Span::subtree(doc, t.index).map(|extent| (t.index, extent)))
        .filter(|(_, extent)| span.contains_span(extent))
        .collect();

    let mut rest = span.clone();
    while let Some(pos) = pending
        .iter()
        .position(|(_, extent)| carve(&rest, extent).is_some())
    {
        let (child, extent) = pending.remove(pos);
        if let Some(remaining) = carve(&rest, &extent) {
            split(&extent, child, depth + 1, out);
            rest = remaining;
        }
    }

    push_trimmed(&rest, out);
}

/// What remains of `rest` once `extent` is removed from one of its ends.
fn carve(rest: &Span, extent: &Span) -> Option<Span> {
    if !rest.contains_span(extent) {
        return None;
    }
    let doc = rest.doc();
    let only_trim = |range: std::ops::Range<usize>| {
        range
            .filter_map(|i| doc.token(i))
            .all(|t| t.has_dep(TRIM_LABELS))
    };

    if only_trim(extent.end()..rest.end()) {
        rest.with_range(rest.start(), extent.start())
    } else if only_trim(rest.start()..extent.start()) {
        rest.with_range(extent.end(), rest.end())
    } else {
        None
    }
}

/// Strip punctuation and coordinators from both ends.
pub fn trim(span: &Span) -> Span {
    let tokens = span.tokens();
    let lead = tokens
        .iter()
        .take_while(|t| t.has_dep(TRIM_LABELS))
        .count();
    let tail = tokens[lead..]
        .iter()
        .rev()
        .take_while(|t| t.has_dep(TRIM_LABELS))
        .count();
    span.with_range(span.start() + lead, span.end() - tail)
        .unwrap_or_else(|| span.clone())
}

fn push_trimmed(span: &Span, out: &mut Vec<Span>) {
    let trimmed = trim(span);
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// Full-subtree spans of the root's prepositional attachments, in token order.
pub fn prepositional_phrases(span: &Span) -> Result<Vec<Span>, DecomposeError> {
    let root = span.root_index().ok_or(DecomposeError::NoRoot)?;
    let doc = span.doc();
    Ok(doc
        .children(root)
        .filter(|t| t.has_dep(PREP_LABELS))
        .filter_map(|t| Span::subtree(doc, t.index))
        .filter(|phrase| span.contains_span(phrase))
        .collect())
}

pub fn tense(span: &Span) -> Result<Tense, DecomposeError> {
    let root = span.root().ok_or(DecomposeError::NoRoot)?;
    Ok(match root.tag.as_str() {
        "VBD" => Tense::Past,
        "VBP" | "VBZ" => Tense::Present,
        _ => Tense::Other,
    })
}

pub fn is_past(span: &Span) -> bool {
    tense(span) == Ok(Tense::Past)
}

pub fn is_present(span: &Span) -> bool {
    tense(span) == Ok(Tense::Present)
}

/// True when the root, or an auxiliary under it, is "was" or "were": a
/// substituted subject must then keep the sentence's number.
pub fn requires_past_agreement(span: &Span) -> Result<bool, DecomposeError> {
    let root = span.root().ok_or(DecomposeError::NoRoot)?;
    if PAST_COPULAS.contains(&root.lower.as_str()) {
        return Ok(true);
    }
    Ok(span
        .doc()
        .children(root.index)
        .any(|t| t.has_dep(AUX_LABELS) && PAST_COPULAS.contains(&t.lower.as_str())))
}

/// Rewrite a subject with an indefinite determiner: "the rain in spain"
/// becomes "a rain in spain", "all the windows" becomes "some windows".
pub fn indefinitize(subject: &Span) -> Result<String, DecomposeError> {
    let head = subject.root().ok_or(DecomposeError::NoRoot)?;
    let doc = subject.doc();

    let determiner = doc
        .children(head.index)
        .find(|t| {
            t.dep == "det"
                && DEFINITE_DETERMINERS.contains(&t.lower.as_str())
                && subject.contains(t.index)
        })
        .ok_or(DecomposeError::AmbiguousDeterminer)?;

    let article = if head.is_plural_noun() {
        "some"
    } else {
        let following = doc
            .token(determiner.index + 1)
            .ok_or(DecomposeError::AmbiguousDeterminer)?;
        indefinite_article(&following.lower)
    };

    Ok(render(
        subject
            .tokens()
            .iter()
            .filter(|t| t.dep != "predet")
            .map(|t| {
                let text = if t.index == determiner.index {
                    article
                } else {
                    t.text.as_str()
                };
                (text, t.space_after)
            }),
    ))
}

/// Words spelled with a vowel but pronounced with a consonant onset.
const CONSONANT_SOUND_PREFIXES: &[&str] = &[
    "uni", "use", "usu", "uti", "ura", "ure", "uro", "eu", "ewe", "one", "once", "ubiq",
];
/// Words spelled with a consonant but pronounced with a vowel onset.
const VOWEL_SOUND_PREFIXES: &[&str] = &["hour", "honest", "honor", "honour", "heir", "8", "11", "18"];

/// "a" or "an" for the word that follows, by its spoken onset.
pub fn indefinite_article(word: &str) -> &'static str {
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    if VOWEL_SOUND_PREFIXES.iter().any(|p| word.starts_with(p)) {
        "an"
    } else if CONSONANT_SOUND_PREFIXES.iter().any(|p| word.starts_with(p)) {
        "a"
    } else if word.starts_with(['a', 'e', 'i', 'o', 'u']) {
        "an"
    } else {
        "a"
    }
}

/// Replace the first textual occurrence of `target` in `sentence`.
///
/// Purely textual: a repeated substring is not disambiguated.
pub fn replace_span(sentence: &Span, target: &Span, replacement: &str) -> String {
    sentence.text().replacen(&target.text(), replacement, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::doc::{ParseTable, ParsedDoc, Parser, TokenRow};
    use std::sync::Arc;

    fn sentence(text: &str) -> Span {
        let path = std::path::PathBuf::from("tests/fixtures/parsed_sentences.ron");
        let table = ParseTable::load_from_ron(&path).unwrap();
        let doc = Arc::new(table.parse(text).unwrap());
        Span::first_sentence(&doc).unwrap()
    }

    fn texts(spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| s.text()).collect()
    }

    #[test]
    fn fish_were_hungry() {
        let s = sentence("The fish were hungry.");
        assert_eq!(tense(&s), Ok(Tense::Past));
        assert!(requires_past_agreement(&s).unwrap());
        let subj = subject(&s).unwrap();
        assert_eq!(subj.text(), "The fish");
        assert!(is_plural(&subj));
    }

    #[test]
    fn wave_was_tremendous() {
        let s = sentence("The wave was tremendous.");
        assert!(is_past(&s));
        assert!(requires_past_agreement(&s).unwrap());
        assert!(!is_plural(&subject(&s).unwrap()));
    }

    #[test]
    fn wave_broke_needs_no_agreement() {
        let s = sentence("The wave broke.");
        assert!(is_past(&s));
        assert!(!requires_past_agreement(&s).unwrap());
    }

    #[test]
    fn auxiliary_were_requires_agreement() {
        let s = sentence("The waves were getting larger.");
        assert!(!is_past(&s));
        assert!(requires_past_agreement(&s).unwrap());
        let s = sentence("all the windows were broken");
        assert!(requires_past_agreement(&s).unwrap());
    }

    #[test]
    fn present_tense_detected() {
        assert!(is_present(&sentence("The river runs past the old mill.")));
        assert!(is_present(&sentence("These rocks are older than the hills.")));
        assert!(!is_present(&sentence("The wave broke.")));
    }

    #[test]
    fn subject_includes_relative_clause() {
        let s = sentence("Annoyingly, the fish I ate yesterday swam.");
        assert_eq!(subject(&s).unwrap().text(), "the fish I ate yesterday");
    }

    #[test]
    fn subject_is_idempotent() {
        let s = sentence("The rain in spain falls mainly on the plain");
        let first = subject(&s).unwrap();
        let second = subject(&s).unwrap();
        assert_eq!(first.range(), second.range());
        assert_eq!(first.text(), "The rain in spain");
        assert!(s.contains_span(&first));
    }

    #[test]
    fn missing_subject_is_reported() {
        let s = sentence("Look at the mountains.");
        assert_eq!(subject(&s), Err(DecomposeError::NoSubjectFound));
    }

    #[test]
    fn indefinitize_singular_and_plural() {
        let s = sentence("The rain in spain falls mainly on the plain");
        assert_eq!(indefinitize(&subject(&s).unwrap()).unwrap(), "a rain in spain");

        let s = sentence("The umbrella in spain falls mainly on the plain");
        assert_eq!(
            indefinitize(&subject(&s).unwrap()).unwrap(),
            "an umbrella in spain"
        );

        let s = sentence("The buildings were delicious.");
        assert_eq!(indefinitize(&subject(&s).unwrap()).unwrap(), "some buildings");

        let s = sentence("This lake was frozen over.");
        assert_eq!(indefinitize(&subject(&s).unwrap()).unwrap(), "a lake");

        let s = sentence("These rocks are older than the hills.");
        assert_eq!(indefinitize(&subject(&s).unwrap()).unwrap(), "some rocks");
    }

    #[test]
    fn indefinitize_drops_predeterminer() {
        let s = sentence("all the windows were broken");
        let subj = subject(&s).unwrap();
        assert_eq!(subj.text(), "all the windows");
        assert_eq!(indefinitize(&subj).unwrap(), "some windows");
    }

    #[test]
    fn indefinitize_rejects_indefinite_determiner() {
        let s = sentence("Yesterday a man on the freeway lost his watch");
        let subj = subject(&s).unwrap();
        assert_eq!(subj.text(), "a man on the freeway");
        assert_eq!(indefinitize(&subj), Err(DecomposeError::AmbiguousDeterminer));
    }

    #[test]
    fn article_follows_pronunciation() {
        assert_eq!(indefinite_article("rain"), "a");
        assert_eq!(indefinite_article("umbrella"), "an");
        assert_eq!(indefinite_article("hour"), "an");
        assert_eq!(indefinite_article("unicorn"), "a");
        assert_eq!(indefinite_article("European"), "a");
        assert_eq!(indefinite_article("old"), "an");
    }

    #[test]
    fn clauses_split_coordination() {
        let s = sentence("The sea was pretty calm; a slight breeze blew on land.");
        let cs = clauses(&s).unwrap();
        assert_eq!(
            texts(&cs),
            vec!["a slight breeze blew on land", "The sea was pretty calm"]
        );
        assert_eq!(subject(&cs[0]).unwrap().text(), "a slight breeze");
        assert_eq!(subject(&cs[1]).unwrap().text(), "The sea");
    }

    #[test]
    fn clauses_recurse_into_nested_coordination() {
        let s = sentence("we went to the store; they were out of hotdogs and we left");
        let cs = clauses(&s).unwrap();
        assert_eq!(
            texts(&cs),
            vec!["we left", "they were out of hotdogs", "we went to the store"]
        );
    }

    #[test]
    fn simple_sentence_is_one_trimmed_clause() {
        let s = sentence("The wave broke.");
        let cs = clauses(&s).unwrap();
        assert_eq!(texts(&cs), vec!["The wave broke"]);
    }

    #[test]
    fn clauses_are_disjoint_and_cover_the_sentence() {
        let table =
            ParseTable::load_from_ron(std::path::Path::new("tests/fixtures/parsed_sentences.ron"))
                .unwrap();
        for (_, text) in table.stream() {
            let doc = Arc::new(table.parse(text).unwrap());
            let Some(s) = Span::first_sentence(&doc) else {
                continue;
            };
            let cs = clauses(&s).unwrap();
            assert!(!cs.is_empty(), "no clauses for {text}");

            let mut ordered = cs.clone();
            ordered.sort_by_key(|c| c.start());
            for pair in ordered.windows(2) {
                assert!(pair[0].end() <= pair[1].start(), "overlap in {text}");
            }
            for i in s.range() {
                let covered = cs.iter().any(|c| c.contains(i));
                let trimmable = doc.token(i).unwrap().has_dep(TRIM_LABELS);
                assert!(covered || trimmable, "token {i} lost in {text}");
            }
        }
    }

    fn parsed(rows: Vec<TokenRow>) -> Span {
        let doc = Arc::new(ParsedDoc::from_rows(rows).unwrap());
        Span::first_sentence(&doc).unwrap()
    }

    fn said(tail: &[TokenRow]) -> Span {
        let mut rows = vec![
            TokenRow::new("the", "the", "DT", "det", 1),
            TokenRow::new("guide", "guide", "NN", "nsubj", 2),
            TokenRow::new("said", "say", "VBD", "ROOT", 2),
            TokenRow::new("the", "the", "DT", "det", 4),
            TokenRow::new("river", "river", "NN", "nsubj", 5),
            TokenRow::new("was", "be", "VBD", "ccomp", 2),
            TokenRow::new("high", "high", "JJ", "acomp", 5),
        ];
        rows.extend_from_slice(tail);
        parsed(rows)
    }

    #[test]
    fn trailing_complement_is_split_off() {
        let s = said(&[TokenRow::new(".", ".", ".", "punct", 2)]);
        let cs = clauses(&s).unwrap();
        assert_eq!(texts(&cs), vec!["the river was high", "the guide said"]);
        assert_eq!(subject(&cs[0]).unwrap().text(), "the river");
    }

    #[test]
    fn buried_complement_stays_whole() {
        let s = said(&[
            TokenRow::new("yesterday", "yesterday", "NN", "npadvmod", 2),
            TokenRow::new(".", ".", ".", "punct", 2),
        ]);
        let cs = clauses(&s).unwrap();
        assert_eq!(texts(&cs), vec!["the guide said the river was high yesterday"]);
    }

    #[test]
    fn deep_coordination_hits_the_nesting_limit() {
        let links = MAX_CLAUSE_DEPTH + 8;
        let mut rows = Vec::new();
        for i in 0..links {
            let verb = 4 * i + 2;
            rows.push(TokenRow::new("the", "the", "DT", "det", verb - 1));
            rows.push(TokenRow::new("wave", "wave", "NN", "nsubj", verb));
            if i == 0 {
                rows.push(TokenRow::new("broke", "break", "VBD", "ROOT", verb));
            } else {
                rows.push(TokenRow::new("broke", "break", "VBD", "conj", verb - 4));
            }
            if i + 1 < links {
                rows.push(TokenRow::new("and", "and", "CC", "cc", verb));
            }
        }
        rows.push(TokenRow::new(".", ".", ".", "punct", 2));
        let s = parsed(rows);

        let cs = clauses(&s).unwrap();
        assert_eq!(cs.len(), MAX_CLAUSE_DEPTH + 1);
        assert_eq!(cs[0].text().matches("wave").count(), links - MAX_CLAUSE_DEPTH);
        assert!(cs.iter().all(|c| !c.is_empty()));

        let mut ordered = cs.clone();
        ordered.sort_by_key(|c| c.start());
        assert!(ordered.windows(2).all(|w| w[0].end() <= w[1].start()));
        for i in s.range() {
            let covered = cs.iter().any(|c| c.contains(i));
            assert!(covered || s.doc().tokens()[i].has_dep(TRIM_LABELS), "token {i}");
        }
    }

    #[test]
    fn prepositional_phrases_of_root() {
        let s = sentence("The blizzard continued throughout the afternoon.");
        let pps = prepositional_phrases(&s).unwrap();
        assert_eq!(texts(&pps), vec!["throughout the afternoon"]);

        let s = sentence("The rain in spain falls mainly on the plain");
        assert_eq!(texts(&prepositional_phrases(&s).unwrap()), vec!["on the plain"]);
    }

    #[test]
    fn replace_span_is_first_occurrence() {
        let s = sentence("The wave was tremendous.");
        let subj = subject(&s).unwrap();
        assert_eq!(replace_span(&s, &subj, "it"), "it was tremendous.");
    }
}
