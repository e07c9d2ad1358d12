/// Model Linter: validates a paragraph model file and reports its coverage.
///
/// Usage: model_linter <model.ron> [--standalone]
///
/// By default the file is merged over the built-in table, as the engine
/// does; `--standalone` checks the file on its own.
use nature_novel::core::grammar::{ParagraphModel, StateKey};
use nature_novel::schema::move_kind::MoveKind;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: model_linter <model.ron> [--standalone]");
        process::exit(0);
    }

    let model_path = Path::new(&args[1]);
    let standalone = args[2..].iter().any(|a| a == "--standalone");

    let loaded = match ParagraphModel::load_from_ron(model_path) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("ERROR: Failed to load model file: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} states from {}", loaded.keys().count(), model_path.display());

    let model = if standalone {
        loaded
    } else {
        let mut merged = ParagraphModel::default();
        merged.merge(loaded);
        merged
    };

    let (errors, warnings) = lint_model(&model);

    println!("\n=== Paragraph Model Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_model(model: &ParagraphModel) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Err(e) = model.validate() {
        errors.push(e.to_string());
    }

    let chosen = model.moves();
    for m in MoveKind::ALL {
        if m.produces_text() && !chosen.contains(&m) {
            warnings.push(format!("Move '{}' is never chosen", m));
        }
    }

    for key in model.keys() {
        let Some(candidates) = model.candidates(key) else {
            continue;
        };
        if let StateKey::After(m) = key {
            if !chosen.contains(&m) {
                warnings.push(format!("State '{}' is unreachable", key));
            }
        }
        // A single candidate is only expected on the closing path.
        let closing = key == StateKey::EndNovel || key == StateKey::After(MoveKind::Affection);
        if candidates.len() == 1 && !closing {
            warnings.push(format!(
                "State '{}' has only one candidate ({})",
                key, candidates[0]
            ));
        }
    }

    (errors, warnings)
}
