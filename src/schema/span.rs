use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::doc::{render, ParsedDoc, Token};

/// A half-open token range over a shared document. Spans are views: they
/// never own tokens, and cloning one only bumps the document's refcount.
#[derive(Clone)]
pub struct Span {
    doc: Arc<ParsedDoc>,
    start: usize,
    end: usize,
}

impl Span {
    /// Returns `None` unless `start <= end <= doc.len()`.
    pub fn new(doc: Arc<ParsedDoc>, start: usize, end: usize) -> Option<Span> {
        (start <= end && end <= doc.len()).then_some(Span { doc, start, end })
    }

    /// The span covering the full subtree of `root`.
    pub fn subtree(doc: &Arc<ParsedDoc>, root: usize) -> Option<Span> {
        doc.token(root)?;
        let (left, right) = doc.subtree_edges(root);
        Span::new(Arc::clone(doc), left, right + 1)
    }

    /// The first sentence of a document: the subtree of its first
    /// ROOT-labelled token. `None` for a malformed parse with no root.
    pub fn first_sentence(doc: &Arc<ParsedDoc>) -> Option<Span> {
        let root = doc.tokens().iter().find(|t| t.is_root())?;
        Span::subtree(doc, root.index)
    }

    /// A narrower view over the same document.
    pub fn with_range(&self, start: usize, end: usize) -> Option<Span> {
        Span::new(Arc::clone(&self.doc), start, end)
    }

    pub fn doc(&self) -> &Arc<ParsedDoc> {
        &self.doc
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn tokens(&self) -> &[Token] {
        &self.doc.tokens()[self.start..self.end]
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }

    /// True when `other` lies over the same document and inside this range.
    pub fn contains_span(&self, other: &Span) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc) && other.start >= self.start && other.end <= self.end
    }

    /// Index of the span's root: the token whose head falls outside the
    /// span (or is itself), nearest the document root on ties.
    pub fn root_index(&self) -> Option<usize> {
        self.tokens()
            .iter()
            .filter(|t| t.head == t.index || !self.contains(t.head))
            .min_by_key(|t| self.doc.depth(t.index))
            .map(|t| t.index)
    }

    pub fn root(&self) -> Option<&Token> {
        self.root_index().and_then(|i| self.doc.token(i))
    }

    /// A sentence is a span whose root carries the ROOT label.
    pub fn is_sentence(&self) -> bool {
        self.root().is_some_and(|t| t.is_root())
    }

    /// Materialize the span's surface text.
    pub fn text(&self) -> String {
        render(self.tokens().iter().map(|t| (t.text.as_str(), t.space_after)))
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc) && self.start == other.start && self.end == other.end
    }
}

impl Eq for Span {}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span[{}..{}]({:?})", self.start, self.end, self.text())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
