//! Core interfaces and pure helpers.

pub mod style;
pub mod terminal;
pub mod text;
