//! Signal bridge: turns SIGINT into a scheduler command.
//!
//! The hook runs on the signal-hook iterator thread. It only sets the shared
//! `sigint_received` flag and posts [`Command::Interrupt`]; deciding whether that
//! cancels a task or unwinds the REPL is the scheduler's job.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use terminus_ui::{install_interrupt_hook, restore_default_interrupt, InterruptHookGuard};
use tracing::debug;

use crate::runtime::{Command, RuntimeHandle};

pub struct SignalBridge {
    handle: RuntimeHandle,
    sigint: Arc<AtomicBool>,
    guard: Option<InterruptHookGuard>,
}

impl SignalBridge {
    pub fn install(handle: RuntimeHandle, sigint: Arc<AtomicBool>) -> io::Result<Self> {
        let guard = hook(handle.clone(), Arc::clone(&sigint))?;
        Ok(Self {
            handle,
            sigint,
            guard: Some(guard),
        })
    }

    /// Registers a fresh hook in place of the current one.
    pub fn reinstall(&mut self) -> io::Result<()> {
        self.guard = None;
        self.guard = Some(hook(self.handle.clone(), Arc::clone(&self.sigint))?);
        debug!("interrupt hook reinstalled");
        Ok(())
    }

    /// Removes the hook and hands SIGINT back to the platform default.
    pub fn restore_default(mut self) {
        self.guard = None;
        restore_default_interrupt();
        debug!("interrupt hook removed");
    }
}

fn hook(handle: RuntimeHandle, sigint: Arc<AtomicBool>) -> io::Result<InterruptHookGuard> {
    install_interrupt_hook(move || {
        sigint.store(true, Ordering::SeqCst);
        handle.dispatch(Command::Interrupt);
    })
}
