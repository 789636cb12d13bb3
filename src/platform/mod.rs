//! Platform-specific terminal and signal integrations.

pub mod process_terminal;
#[cfg(unix)]
pub mod signals;

pub use process_terminal::{stdout_is_tty, ProcessTerminal};
#[cfg(unix)]
pub use signals::{install_interrupt_hook, restore_default_interrupt, InterruptHookGuard};
