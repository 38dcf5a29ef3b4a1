//! Command implementations for the chronicle CLI

pub mod drive;
pub mod parse;

pub use drive::run_drive;
pub use parse::run_parse;
