//! Text helpers (ANSI scanning, width calculations, wrapping).
//!
//! These helpers are pure (string in/string out) so panels and previews can share
//! them without touching the terminal.

pub mod ansi;
pub mod width;
