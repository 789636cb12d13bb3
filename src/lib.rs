//! Terminal output layer for the terminus shell.
//!
//! Invariant: single output gate. Only [`Console`] writes to the terminal, and it
//! pauses the spinner around every write.
//!
//! # Public API Overview
//! - [`Console`] status lines, panels, previews and the progress spinner.
//! - [`Terminal`] abstraction with a stdout-backed [`ProcessTerminal`].
//! - Interrupt hook primitives for SIGINT handling (unix).
//! - [`logging::init_logging`] for `tracing` output.
//! - Text and width helpers for ANSI-safe layout.

pub mod config;
pub mod console;
pub mod logging;

pub mod core;
pub mod platform;
pub mod widgets;

pub use crate::config::EnvConfig;
pub use crate::console::{Console, ConsoleOptions, OutputContext};
pub use crate::core::style::{Style, Tone};
pub use crate::core::terminal::Terminal;
pub use crate::platform::ProcessTerminal;
#[cfg(unix)]
pub use crate::platform::{install_interrupt_hook, restore_default_interrupt, InterruptHookGuard};
pub use crate::widgets::{Preview, SpinnerState};

/// Visible width helper that ignores ANSI control sequences.
pub use crate::core::text::width::visible_width;
