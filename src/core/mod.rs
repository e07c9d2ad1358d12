pub mod classify;
pub mod config;
pub mod context;
pub mod corpus;
pub mod decompose;
pub mod grammar;
pub mod moves;
pub mod ontology;
pub mod pipeline;
pub mod surface;
