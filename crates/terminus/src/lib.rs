//! terminus: an interactive agent shell.
//!
//! The main thread is the scheduler. It owns the [`session::Session`], drains the
//! [`runtime::Runtime`] inbox, and runs one request at a time through the
//! [`controller::RequestController`]. The engine runs on a worker thread and reaches
//! the session only through inbox commands.

pub mod banner;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod error;
pub mod guide;
pub mod history;
pub mod providers;
pub mod repl;
pub mod runtime;
pub mod session;
pub mod signals;
pub mod tools;

pub use controller::{RequestController, RequestOutcome, RequestState, TaskHandle};
pub use repl::{Repl, ReplExit};
pub use runtime::{Command, InputLine, Runtime, RuntimeHandle};
pub use session::{CommandAllowList, Session, SessionError, WorkingDirectory};
