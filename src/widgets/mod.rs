//! Rendering building blocks used by the console.

pub mod panel;
pub mod preview;
pub mod spinner;

pub use panel::render_panel;
pub use preview::{highlight, unified_diff, Preview};
pub use spinner::{Spinner, SpinnerState};
