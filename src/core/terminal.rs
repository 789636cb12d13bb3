//! Terminal trait.

use std::sync::{Arc, Mutex, MutexGuard};

/// Minimal line-oriented terminal interface for the shell.
pub trait Terminal: Send {
    /// Write output to the terminal.
    fn write(&mut self, data: &str);

    /// Flush any buffered output.
    fn flush(&mut self) {}

    /// Terminal width in columns.
    fn columns(&self) -> u16;

    /// Whether the terminal is attached to an interactive device.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Terminal shared between the console and the spinner thread.
pub type SharedTerminal = Arc<Mutex<Box<dyn Terminal>>>;

pub(crate) fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
