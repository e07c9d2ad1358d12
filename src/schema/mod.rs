pub mod doc;
pub mod move_kind;
pub mod span;
