/// The novel pipeline: corpus + paragraph model → chapters.
///
/// Wires together move selection, move application, chapter headings, the
/// calendar, and surface rendering.
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::{ConfigError, NovelConfig};
use crate::core::context::{ChapterState, ContextError, NovelState};
use crate::core::corpus::{CorpusError, SentenceCorpus};
use crate::core::grammar::{ModelError, ParagraphModel};
use crate::core::moves::MoveOutcome;
use crate::core::surface::{self, Chapter, ChapterDraft};
use crate::schema::move_kind::MoveKind;

/// Paragraphs per chapter; drawn uniformly, so repeats weight the choice.
pub const PARAGRAPH_COUNTS: [usize; 19] = [1, 2, 2, 2, 3, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 6, 7, 8];

/// Days the calendar moves between chapters.
pub const DAY_STEPS: [u64; 9] = [1, 1, 1, 1, 2, 2, 3, 4, 5];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("paragraph model error: {0}")]
    Model(#[from] ModelError),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("calendar error: {0}")]
    Context(#[from] ContextError),
    #[error("no sentence corpus was supplied")]
    MissingCorpus,
    #[error("paragraph did not end within {limit} moves")]
    RunawayParagraph { limit: usize },
    #[error("no chapter headings available")]
    NoHeadings,
}

/// The top-level novel generator. Built via `NovelEngine::builder()`.
///
/// The corpus is read-only and may be shared by several engines; each
/// engine owns its random source, so a seed fixes its whole output.
pub struct NovelEngine {
    corpus: Arc<SentenceCorpus>,
    model: ParagraphModel,
    config: NovelConfig,
    headings: Vec<String>,
    rng: StdRng,
}

/// Builder for constructing a `NovelEngine`.
#[derive(Default)]
pub struct NovelEngineBuilder {
    corpus: Option<Arc<SentenceCorpus>>,
    /// Directly provided model, merged over the default table.
    model: Option<ParagraphModel>,
    model_path: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<NovelConfig>,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    chapter_count: Option<usize>,
}

impl NovelEngine {
    pub fn builder() -> NovelEngineBuilder {
        NovelEngineBuilder::default()
    }

    pub fn corpus(&self) -> &Arc<SentenceCorpus> {
        &self.corpus
    }

    pub fn model(&self) -> &ParagraphModel {
        &self.model
    }

    pub fn config(&self) -> &NovelConfig {
        &self.config
    }

    /// Heading candidates: short corpus subjects and the configured
    /// vocabulary, deduplicated and sorted.
    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    /// Generate a whole novel of `chapter_count` rendered chapters.
    pub fn generate_novel(&mut self) -> Result<Vec<Chapter>, GenerationError> {
        let start = match self.config.start_date {
            Some(date) => date,
            None => random_start_date(&mut self.rng)?,
        };
        let mut novel = NovelState::new(self.config.chapter_count, start);
        let mut chapters = Vec::with_capacity(novel.chapter_count());

        for index in 0..novel.chapter_count() {
            novel.begin_chapter(index);
            let draft = self.draft_chapter(&novel)?;
            debug!(
                chapter = index,
                heading = %draft.heading,
                paragraphs = draft.paragraphs.len(),
                "drafted chapter"
            );
            chapters.push(surface::surface_chapter(&draft, &mut self.rng));
            if !novel.is_final_chapter() {
                let step = DAY_STEPS.choose(&mut self.rng).copied().unwrap_or(1);
                novel.advance(step)?;
            }
        }

        info!(
            chapters = chapters.len(),
            paragraphs = chapters.iter().map(|c| c.paragraphs.len()).sum::<usize>(),
            start = %novel.start_date(),
            days = novel.elapsed_days() + 1,
            "novel complete"
        );
        Ok(chapters)
    }

    /// Draft one chapter at the novel's current position: a heading and a
    /// random number of assembled paragraphs.
    pub fn draft_chapter(&mut self, novel: &NovelState) -> Result<ChapterDraft, GenerationError> {
        let heading = self.chapter_heading(novel)?;
        let paragraph_count = PARAGRAPH_COUNTS.choose(&mut self.rng).copied().unwrap_or(1);
        let mut state = ChapterState::new(novel, paragraph_count);
        let mut paragraphs = Vec::with_capacity(paragraph_count);

        for index in 0..paragraph_count {
            state.begin_paragraph(index);
            paragraphs.push(assemble_paragraph(
                &self.corpus,
                &self.model,
                &mut state,
                &mut self.rng,
                self.config.max_paragraph_moves,
            )?);
        }

        Ok(ChapterDraft {
            heading,
            paragraphs,
        })
    }

    /// A random heading, sometimes followed by the calendar date and the
    /// day count.
    pub fn chapter_heading(&mut self, novel: &NovelState) -> Result<String, GenerationError> {
        let choice = self
            .headings
            .choose(&mut self.rng)
            .ok_or(GenerationError::NoHeadings)?;
        let mut heading = surface::ucfirst(&surface::normalize(choice));

        if self.rng.gen_range(0..3) == 0 {
            heading.push_str(&format!(". {}", novel.current_date().format("%A, %B %-d")));
        }
        if self.rng.gen_range(0..2) == 0 {
            heading.push_str(&format!(" (Day {})", novel.elapsed_days() + 1));
        }
        Ok(heading)
    }
}

/// Run the paragraph model until it signals the end of the paragraph,
/// collecting `(move, text)` pairs in order.
pub fn assemble_paragraph(
    corpus: &SentenceCorpus,
    model: &ParagraphModel,
    state: &mut ChapterState<'_>,
    rng: &mut StdRng,
    limit: usize,
) -> Result<Vec<(MoveKind, String)>, GenerationError> {
    let mut sentences = Vec::new();
    for _ in 0..limit {
        let next = model.choose(state.entry_key(), rng)?;
        match next.apply(corpus, state, rng)? {
            MoveOutcome::EndParagraph => return Ok(sentences),
            MoveOutcome::Text(text) => {
                sentences.push((next, text));
                state.record(next);
            }
        }
    }
    Err(GenerationError::RunawayParagraph { limit })
}

fn random_start_date(rng: &mut StdRng) -> Result<NaiveDate, ContextError> {
    let year = rng.gen_range(1950..2050);
    let month = rng.gen_range(1..13);
    let day = rng.gen_range(1..28);
    NaiveDate::from_ymd_opt(year, month, day).ok_or(ContextError::InvalidDate { year, month, day })
}

impl NovelEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn chapter_count(mut self, count: usize) -> Self {
        self.chapter_count = Some(count);
        self
    }

    pub fn with_corpus(mut self, corpus: impl Into<Arc<SentenceCorpus>>) -> Self {
        self.corpus = Some(corpus.into());
        self
    }

    /// Provide model entries directly; they override the default table.
    pub fn with_model(mut self, model: ParagraphModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model_file(mut self, path: &Path) -> Self {
        self.model_path = Some(path.to_path_buf());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: NovelConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    /// Load files, apply overrides, and check that the model and corpus can
    /// support a full run before any text is generated.
    pub fn build(self) -> Result<NovelEngine, GenerationError> {
        let corpus = self.corpus.ok_or(GenerationError::MissingCorpus)?;

        let mut config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => NovelConfig::load_from_ron(path)?,
            (None, None) => NovelConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(count) = self.chapter_count {
            config.chapter_count = count;
        }
        config.validate()?;

        // Default table, then directly provided entries, then the file.
        let mut model = ParagraphModel::default();
        if let Some(provided) = self.model {
            model.merge(provided);
        }
        if let Some(ref path) = self.model_path {
            model.merge(ParagraphModel::load_from_ron(path)?);
        }
        model.validate()?;

        for move_kind in model.moves() {
            for alternatives in move_kind.required_pools() {
                corpus.validate_any(alternatives)?;
            }
        }

        let headings: Vec<String> = corpus
            .short_subjects()
            .into_iter()
            .chain(config.heading_vocabulary.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if headings.is_empty() {
            return Err(GenerationError::NoHeadings);
        }

        debug!(
            seed = config.seed,
            chapters = config.chapter_count,
            headings = headings.len(),
            records = corpus.len(),
            "engine ready"
        );
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(NovelEngine {
            corpus,
            model,
            config,
            headings,
            rng,
        })
    }
}
