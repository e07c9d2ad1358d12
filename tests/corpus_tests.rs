/// Corpus building integration tests: the parse table, the lexicon, and the
/// nature filter working together.
use nature_novel::core::classify::{Classifier, ClassifyError, SentenceFilter};
use nature_novel::core::corpus::{CorpusBuilder, Pool, RecordKind, SentenceCorpus};
use nature_novel::core::decompose::Tense;
use nature_novel::core::ontology::{CachedOntology, Lexicon};
use nature_novel::schema::doc::ParseTable;
use std::path::Path;

fn table() -> ParseTable {
    ParseTable::load_from_ron(Path::new("tests/fixtures/parsed_sentences.ron")).unwrap()
}

fn classifier() -> Classifier<CachedOntology<Lexicon>> {
    let lexicon = Lexicon::load_from_ron(Path::new("tests/fixtures/lexicon.ron")).unwrap();
    Classifier::new(CachedOntology::new(lexicon)).unwrap()
}

fn texts(corpus: &SentenceCorpus) -> Vec<&str> {
    corpus.records().iter().map(|r| r.text.as_str()).collect()
}

#[test]
fn nature_filter_keeps_only_nature_sentences() {
    let table = table();
    let classifier = classifier();
    let corpus = CorpusBuilder::new()
        .nature_filter(&classifier, SentenceFilter::default())
        .build(&table, table.stream());
    let texts = texts(&corpus);

    assert!(texts.contains(&"The wave was tremendous."));
    assert!(texts.contains(&"The river runs past the old mill."));
    for rejected in [
        "The banker kissed her wife",
        "The dog was unhappy with Jane",
        "Look at the mountains.",
        "The buildings were delicious.",
        "It is really awful",
        "The wave broke.",
    ] {
        assert!(!texts.contains(&rejected), "{rejected} should be filtered");
    }

    let stats = corpus.stats();
    assert_eq!(stats.read, 26);
    assert_eq!(stats.sentences + stats.rejected + stats.malformed + stats.unparsed, stats.read);
    assert_eq!(corpus.pool_len(Pool::NoSubject), 0);
    assert!(corpus.pool_len(Pool::WithSubject) > 0);
}

#[test]
fn filtered_sentences_have_natural_subjects() {
    let table = table();
    let classifier = classifier();
    let corpus = CorpusBuilder::new()
        .nature_filter(&classifier, SentenceFilter::default())
        .build(&table, table.stream());
    for record in corpus.query(|r| r.kind == RecordKind::Sentence) {
        assert!(classifier.subjects_are_natural(&record.span), "{}", record.text);
        assert!(!classifier.has_people(&record.span), "{}", record.text);
        let len = record.text.chars().count();
        assert!((20..140).contains(&len), "{}", record.text);
    }
}

#[test]
fn nature_table_owns_its_classifier() {
    let table = table();
    let classifier = classifier();
    let expected = CorpusBuilder::new()
        .nature_filter(&classifier, SentenceFilter::default())
        .build(&table, table.stream());

    let lexicon = Lexicon::load_from_ron(Path::new("tests/fixtures/lexicon.ron")).unwrap();
    let corpus = SentenceCorpus::from_nature_table(
        &table,
        CachedOntology::new(lexicon),
        SentenceFilter::default(),
    )
    .unwrap();
    assert_eq!(texts(&corpus), texts(&expected));
    assert_eq!(corpus.stats(), expected.stats());
}

#[test]
fn nature_table_needs_the_anchors() {
    let result = SentenceCorpus::from_nature_table(
        &table(),
        CachedOntology::new(Lexicon::new()),
        SentenceFilter::default(),
    );
    assert!(matches!(result, Err(ClassifyError::MissingAnchor(_))));
}

#[test]
fn build_is_order_preserving_and_repeatable() {
    let table = table();
    let first = CorpusBuilder::new().build(&table, table.stream());
    let second = CorpusBuilder::new().build(&table, table.stream());
    assert_eq!(texts(&first), texts(&second));
    assert_eq!(table.len(), 26);

    let sources: Vec<u64> = first.records().iter().map(|r| r.source).collect();
    assert!(sources.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn agreement_examples() {
    let table = table();
    let corpus = CorpusBuilder::new().build(&table, table.stream());
    let find = |text: &str| {
        corpus
            .records()
            .iter()
            .find(|r| r.text == text)
            .unwrap_or_else(|| panic!("missing record {text}"))
    };

    let fish = find("The fish were hungry.");
    assert_eq!(fish.tense, Tense::Past);
    assert!(fish.requires_agreement && fish.plural);
    assert_eq!(fish.subject_text().as_deref(), Some("The fish"));

    let wave = find("The wave was tremendous.");
    assert_eq!(wave.tense, Tense::Past);
    assert!(wave.requires_agreement && !wave.plural);

    let broke = find("The wave broke.");
    assert_eq!(broke.tense, Tense::Past);
    assert!(!broke.requires_agreement);

    assert_eq!(
        find("The rain in spain falls mainly on the plain")
            .indefinite_subject
            .as_deref(),
        Some("a rain in spain")
    );
    assert_eq!(
        find("The buildings were delicious.").indefinite_subject.as_deref(),
        Some("some buildings")
    );
    assert_eq!(
        find("The umbrella in spain falls mainly on the plain")
            .indefinite_subject
            .as_deref(),
        Some("an umbrella in spain")
    );
}

#[test]
fn subject_substitution_replaces_first_occurrence() {
    let table = table();
    let corpus = CorpusBuilder::new().build(&table, table.stream());
    let wave = corpus
        .records()
        .iter()
        .find(|r| r.text == "The wave was tremendous.")
        .unwrap();
    assert_eq!(
        wave.with_subject("The mesa").as_deref(),
        Some("The mesa was tremendous.")
    );
}
