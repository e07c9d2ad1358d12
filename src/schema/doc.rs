use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Dependency label carried by the designated root of a sentence.
pub const ROOT: &str = "ROOT";

/// Tokens that attach to the preceding word without whitespace when a
/// document is built from compact rows.
const NO_SPACE_BEFORE: &[&str] = &[".", ",", ";", ":", "!", "?", ")", "'s", "n't", "'"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("token {index} points at head {head} outside a document of {len} tokens")]
    HeadOutOfBounds { index: usize, head: usize, len: usize },
    #[error("parsed document has no tokens")]
    EmptyDocument,
    #[error("no parse available for text: {0}")]
    UnknownText(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One annotated token as produced by the external parser.
///
/// `head` is an index into the owning document, never an owning pointer.
/// A token whose head is itself is the root of its sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub text: String,
    pub lower: String,
    pub lemma: String,
    pub tag: String,
    pub dep: String,
    pub head: usize,
    #[serde(default = "default_space_after")]
    pub space_after: bool,
}

fn default_space_after() -> bool {
    true
}

impl Token {
    pub fn is_root(&self) -> bool {
        self.dep == ROOT
    }

    /// True for any Penn verb tag (VB, VBD, VBG, VBN, VBP, VBZ).
    pub fn is_verb(&self) -> bool {
        self.tag.starts_with("VB")
    }

    pub fn is_plural_noun(&self) -> bool {
        matches!(self.tag.as_str(), "NNS" | "NNPS")
    }

    pub fn has_dep(&self, labels: &[&str]) -> bool {
        labels.contains(&self.dep.as_str())
    }

    pub fn has_tag(&self, tags: &[&str]) -> bool {
        tags.contains(&self.tag.as_str())
    }
}

/// Compact `(text, lemma, tag, dep, head)` row, the form parse files use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRow(pub String, pub String, pub String, pub String, pub usize);

impl TokenRow {
    pub fn new(text: &str, lemma: &str, tag: &str, dep: &str, head: usize) -> Self {
        Self(
            text.to_string(),
            lemma.to_string(),
            tag.to_string(),
            dep.to_string(),
            head,
        )
    }
}

/// Token arena for one parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDoc {
    tokens: Vec<Token>,
}

impl ParsedDoc {
    /// Build a document from full tokens. Indices are reassigned from
    /// position and every head must land inside the document.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Result<Self, ParseError> {
        if tokens.is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        let len = tokens.len();
        for (i, token) in tokens.iter_mut().enumerate() {
            token.index = i;
            if token.head >= len {
                return Err(ParseError::HeadOutOfBounds {
                    index: i,
                    head: token.head,
                    len,
                });
            }
        }
        Ok(Self { tokens })
    }

    /// Build a document from compact rows, deriving the lowercase form and
    /// inter-token spacing.
    pub fn from_rows(rows: Vec<TokenRow>) -> Result<Self, ParseError> {
        let next_attaches: Vec<bool> = rows
            .iter()
            .skip(1)
            .map(|row| NO_SPACE_BEFORE.contains(&row.0.as_str()))
            .chain(std::iter::once(false))
            .collect();

        let tokens = rows
            .into_iter()
            .zip(next_attaches)
            .enumerate()
            .map(|(index, (TokenRow(text, lemma, tag, dep, head), attaches))| Token {
                index,
                lower: text.to_lowercase(),
                text,
                lemma,
                tag,
                dep,
                head,
                space_after: !attaches,
            })
            .collect();
        Self::from_tokens(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Immediate dependents of `index`, in token order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &Token> + '_ {
        self.tokens
            .iter()
            .filter(move |t| t.head == index && t.index != index)
    }

    /// Walk head references upward from `index` (exclusive).
    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            current: index,
            remaining: self.tokens.len(),
        }
    }

    /// Number of head steps from `index` to its sentence root.
    pub fn depth(&self, index: usize) -> usize {
        self.ancestors(index).count()
    }

    /// True when `index` is `root` or lies below it.
    pub fn in_subtree(&self, index: usize, root: usize) -> bool {
        index == root || self.ancestors(index).any(|a| a == root)
    }

    /// The child of `root` whose subtree contains `index`, if any.
    pub fn attachment_under(&self, index: usize, root: usize) -> Option<usize> {
        let mut below = index;
        for ancestor in self.ancestors(index) {
            if ancestor == root {
                return Some(below);
            }
            below = ancestor;
        }
        None
    }

    /// Inclusive `(left, right)` token edges of the subtree rooted at `index`.
    pub fn subtree_edges(&self, index: usize) -> (usize, usize) {
        self.tokens
            .iter()
            .filter(|t| self.in_subtree(t.index, index))
            .fold((index, index), |(l, r), t| (l.min(t.index), r.max(t.index)))
    }
}

/// Iterator over a token's heads, stopping at a self-headed token. Bounded by
/// the document length so a cyclic parse cannot loop forever.
pub struct Ancestors<'d> {
    doc: &'d ParsedDoc,
    current: usize,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let head = self.doc.tokens.get(self.current)?.head;
        if head == self.current {
            return None;
        }
        self.remaining -= 1;
        self.current = head;
        Some(head)
    }
}

/// Join `(text, space_after)` pieces into surface text.
pub fn render<'a>(pieces: impl IntoIterator<Item = (&'a str, bool)>) -> String {
    let mut out = String::new();
    for (text, space_after) in pieces {
        out.push_str(text);
        if space_after {
            out.push(' ');
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// The external syntactic parser.
pub trait Parser {
    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError>;
}

#[derive(Debug, Deserialize)]
struct RonParsedSentence {
    source: u64,
    text: String,
    tokens: Vec<TokenRow>,
}

/// Pre-parsed sentences keyed by their text, loaded from RON. Serves both
/// as the ordered `(source, text)` stream and as the parser for it.
#[derive(Debug, Clone, Default)]
pub struct ParseTable {
    order: Vec<(u64, String)>,
    docs: FxHashMap<String, ParsedDoc>,
}

impl ParseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a parse table from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ParseTable, ParseError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a table from a RON list of `(source, text, tokens)` records.
    pub fn parse_ron(input: &str) -> Result<ParseTable, ParseError> {
        let raw: Vec<RonParsedSentence> = ron::from_str(input)?;
        let mut table = ParseTable::new();
        for entry in raw {
            let doc = ParsedDoc::from_rows(entry.tokens)?;
            table.insert(entry.source, entry.text, doc);
        }
        Ok(table)
    }

    pub fn insert(&mut self, source: u64, text: String, doc: ParsedDoc) {
        if self.docs.insert(text.clone(), doc).is_none() {
            self.order.push((source, text));
        }
    }

    /// The sentences in load order, as the corpus builder consumes them.
    pub fn stream(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.order.iter().map(|(source, text)| (*source, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Parser for ParseTable {
    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError> {
        self.docs
            .get(text)
            .cloned()
            .ok_or_else(|| ParseError::UnknownText(text.to_string()))
    }
}
