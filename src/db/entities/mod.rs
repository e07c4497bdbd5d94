//! sea-orm entities for the three tables.
pub mod evaluations;
pub mod images;
pub mod prompts;
