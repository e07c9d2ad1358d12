/// Corpus Report: builds a sentence corpus and prints its pool populations.
///
/// Usage: corpus_report --sentences <parsed.ron> [--lexicon <lexicon.ron>] [--model <model.ron>]
///
/// With a lexicon the nature filter is applied while building. The report
/// ends with the pool requirements of the (default or merged) paragraph model.
use nature_novel::core::classify::SentenceFilter;
use nature_novel::core::corpus::{CorpusBuilder, Pool, RecordKind, SentenceCorpus};
use nature_novel::core::grammar::ParagraphModel;
use nature_novel::core::ontology::{CachedOntology, Lexicon};
use nature_novel::schema::doc::ParseTable;
use std::env;
use std::path::Path;
use std::process;

const USAGE: &str =
    "Usage: corpus_report --sentences <parsed.ron> [--lexicon <lexicon.ron>] [--model <model.ron>]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut sentences = None;
    let mut lexicon = None;
    let mut model = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sentences" if i + 1 < args.len() => {
                i += 1;
                sentences = Some(args[i].clone());
            }
            "--lexicon" if i + 1 < args.len() => {
                i += 1;
                lexicon = Some(args[i].clone());
            }
            "--model" if i + 1 < args.len() => {
                i += 1;
                model = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let sentences_path = sentences.unwrap_or_else(|| {
        eprintln!("Error: --sentences is required");
        eprintln!("{USAGE}");
        process::exit(1);
    });

    let table = ParseTable::load_from_ron(Path::new(&sentences_path)).unwrap_or_else(|e| {
        eprintln!("Error reading parsed sentences '{}': {}", sentences_path, e);
        process::exit(1);
    });

    let corpus = match lexicon {
        Some(ref path) => {
            let lexicon = Lexicon::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
                eprintln!("Error reading lexicon '{}': {}", path, e);
                process::exit(1);
            });
            println!("Lexicon: {} synsets", lexicon.len());
            SentenceCorpus::from_nature_table(
                &table,
                CachedOntology::new(lexicon),
                SentenceFilter::default(),
            )
            .unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                process::exit(1);
            })
        }
        None => CorpusBuilder::new().build(&table, table.stream()),
    };

    let stats = corpus.stats();
    println!("\n=== Corpus Report ===\n");
    println!("Read:       {}", stats.read);
    println!("Unparsed:   {}", stats.unparsed);
    println!("Malformed:  {}", stats.malformed);
    println!("Rejected:   {}", stats.rejected);
    println!("Sentences:  {}", stats.sentences);
    println!("Clauses:    {}", stats.clauses);
    println!(
        "Records:    {} ({} clause records)",
        corpus.len(),
        corpus.query(|r| r.kind == RecordKind::Clause).count()
    );
    println!("Phrases:    {}", corpus.phrases().len());
    println!("Headings:   {} short subjects", corpus.short_subjects().len());

    println!("\nPools:");
    for pool in Pool::ALL {
        println!("  {:<20} {}", format!("{:?}", pool), corpus.pool_len(pool));
    }

    let mut paragraph_model = ParagraphModel::default();
    if let Some(ref path) = model {
        match ParagraphModel::load_from_ron(Path::new(path)) {
            Ok(loaded) => paragraph_model.merge(loaded),
            Err(e) => {
                eprintln!("Error reading model '{}': {}", path, e);
                process::exit(1);
            }
        }
    }

    let mut missing = 0;
    println!("\nModel requirements:");
    for move_kind in paragraph_model.moves() {
        for alternatives in move_kind.required_pools() {
            let status = match corpus.validate_any(alternatives) {
                Ok(()) => "ok",
                Err(_) => {
                    missing += 1;
                    "EMPTY"
                }
            };
            println!("  {:<20} {:?} {}", move_kind.name(), alternatives, status);
        }
    }

    if missing > 0 {
        println!("\n{} requirement(s) unmet; generation would fail", missing);
        process::exit(1);
    }
}
