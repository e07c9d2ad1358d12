//! Nature Novel: a generated novel recombined from parsed nature sentences.
//!
//! Sentences are decomposed along their dependency parse into subjects,
//! clauses, and prepositional phrases, filed into an agreement-aware corpus,
//! and spliced back together by a stochastic paragraph grammar.

pub mod core;
pub mod schema;
