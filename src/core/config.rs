/// Novel configuration loaded from RON.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Nature-theme noun phrases offered as chapter headings alongside short
/// corpus subjects.
pub const DEFAULT_HEADING_VOCABULARY: &[&str] = &[
    "the archipelago",
    "the bay",
    "the beach",
    "the bluff",
    "the boulder",
    "the canyon",
    "the cave",
    "the cliff",
    "the cove",
    "the crater",
    "the creek",
    "the delta",
    "the dune",
    "the estuary",
    "the fjord",
    "the floodplain",
    "the geyser",
    "the glacier",
    "the gorge",
    "the grotto",
    "the gulf",
    "the headland",
    "the iceberg",
    "the inlet",
    "the island",
    "the lagoon",
    "the lake",
    "the ledge",
    "the marsh",
    "the meadow",
    "the mesa",
    "the moraine",
    "the mountain",
    "the oasis",
    "the peninsula",
    "the plateau",
    "the pond",
    "the rapids",
    "the ravine",
    "the reef",
    "the ridge",
    "the river",
    "the sandbar",
    "the shoal",
    "the spring",
    "the strait",
    "the summit",
    "the swamp",
    "the tarn",
    "the tundra",
    "the valley",
    "the volcano",
    "the waterfall",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chapter_count must be at least 1")]
    NoChapters,
    #[error("max_paragraph_moves must be at least 1")]
    NoMoveBudget,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Settings for one novel. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NovelConfig {
    pub seed: u64,
    pub chapter_count: usize,
    /// Drawn at random when absent.
    pub start_date: Option<NaiveDate>,
    pub heading_vocabulary: Vec<String>,
    /// Upper bound on moves in one paragraph.
    pub max_paragraph_moves: usize,
}

impl Default for NovelConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chapter_count: 10,
            start_date: None,
            heading_vocabulary: DEFAULT_HEADING_VOCABULARY
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_paragraph_moves: 10_000,
        }
    }
}

impl NovelConfig {
    pub fn load_from_ron(path: &Path) -> Result<NovelConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<NovelConfig, ConfigError> {
        let config: NovelConfig = ron::from_str(input)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chapter_count == 0 {
            return Err(ConfigError::NoChapters);
        }
        if self.max_paragraph_moves == 0 {
            return Err(ConfigError::NoMoveBudget);
        }
        Ok(())
    }
}
