//! Interrupt (SIGINT) hook primitives.
//!
//! Signals are received on a dedicated iterator thread, so the callback runs in a
//! normal thread context and may use channels and locks.

use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::iterator::Signals;

/// Guard for an installed interrupt hook; dropping it unregisters the hook.
pub struct InterruptHookGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for InterruptHookGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Installs `on_interrupt` to run once per delivered SIGINT.
pub fn install_interrupt_hook<F>(on_interrupt: F) -> io::Result<InterruptHookGuard>
where
    F: Fn() + Send + 'static,
{
    let mut signals = Signals::new([libc::SIGINT])?;
    let handle = signals.handle();

    let thread = thread::Builder::new()
        .name("terminus-sigint".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                on_interrupt();
            }
        })?;

    Ok(InterruptHookGuard {
        handle,
        thread: Some(thread),
    })
}

/// Restores the platform default disposition for SIGINT.
///
/// Only call this once no further hook will be installed in the process.
pub fn restore_default_interrupt() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}
