/// Novel: builds a corpus from pre-parsed sentences and prints a generated
/// novel as plain text.
///
/// Usage: novel --sentences <parsed.ron> [--config <config.ron>] [--model <model.ron>]
///              [--seed <n>] [--chapters <n>] [--lexicon <lexicon.ron> --nature-filter]
use nature_novel::core::classify::SentenceFilter;
use nature_novel::core::corpus::{CorpusBuilder, SentenceCorpus};
use nature_novel::core::ontology::{CachedOntology, Lexicon};
use nature_novel::core::pipeline::NovelEngine;
use nature_novel::schema::doc::ParseTable;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "Usage: novel --sentences <parsed.ron> [--config <config.ron>] \
[--model <model.ron>] [--seed <n>] [--chapters <n>] [--lexicon <lexicon.ron> --nature-filter]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut sentences = None;
    let mut config = None;
    let mut model = None;
    let mut lexicon = None;
    let mut seed = None;
    let mut chapters = None;
    let mut nature_filter = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sentences" if i + 1 < args.len() => {
                i += 1;
                sentences = Some(PathBuf::from(&args[i]));
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config = Some(PathBuf::from(&args[i]));
            }
            "--model" if i + 1 < args.len() => {
                i += 1;
                model = Some(PathBuf::from(&args[i]));
            }
            "--lexicon" if i + 1 < args.len() => {
                i += 1;
                lexicon = Some(PathBuf::from(&args[i]));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = Some(args[i].parse::<u64>().unwrap_or_else(|_| {
                    eprintln!("Error: --seed must be a non-negative integer");
                    process::exit(1);
                }));
            }
            "--chapters" if i + 1 < args.len() => {
                i += 1;
                chapters = Some(args[i].parse::<usize>().unwrap_or_else(|_| {
                    eprintln!("Error: --chapters must be a positive integer");
                    process::exit(1);
                }));
            }
            "--nature-filter" => nature_filter = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{USAGE}");
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
    if nature_filter && lexicon.is_none() {
        eprintln!("Error: --nature-filter needs --lexicon");
        process::exit(1);
    }

    let corpus = build_corpus(&sentences_path, lexicon.as_deref().filter(|_| nature_filter));

    let mut builder = NovelEngine::builder().with_corpus(corpus);
    if let Some(ref path) = config {
        builder = builder.config_file(path);
    }
    if let Some(ref path) = model {
        builder = builder.model_file(path);
    }
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    if let Some(count) = chapters {
        builder = builder.chapter_count(count);
    }

    let mut engine = builder.build().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    let novel = engine.generate_novel().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    for chapter in &novel {
        print!("{}", chapter.to_text());
    }
}

fn build_corpus(sentences: &Path, lexicon: Option<&Path>) -> SentenceCorpus {
    let table = ParseTable::load_from_ron(sentences).unwrap_or_else(|e| {
        eprintln!("Error reading parsed sentences '{}': {}", sentences.display(), e);
        process::exit(1);
    });

    let Some(lexicon_path) = lexicon else {
        return CorpusBuilder::new().build(&table, table.stream());
    };
    let lexicon = Lexicon::load_from_ron(lexicon_path).unwrap_or_else(|e| {
        eprintln!("Error reading lexicon '{}': {}", lexicon_path.display(), e);
        process::exit(1);
    });
    SentenceCorpus::from_nature_table(&table, CachedOntology::new(lexicon), SentenceFilter::default())
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        })
}
