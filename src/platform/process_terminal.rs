//! Process-backed terminal writing to stdout.

use std::io::{self, Write};

#[cfg(unix)]
use libc::c_int;

use crate::core::terminal::Terminal;

const DEFAULT_COLUMNS: u16 = 80;

#[cfg(unix)]
fn read_columns(fd: c_int) -> Option<u16> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 {
        Some(size.ws_col)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn read_columns(_fd: i32) -> Option<u16> {
    None
}

/// Returns true when stdout is a terminal device.
#[cfg(unix)]
pub fn stdout_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}

#[cfg(not(unix))]
pub fn stdout_is_tty() -> bool {
    false
}

/// Terminal implementation over the process stdout.
pub struct ProcessTerminal {
    stdout: io::Stdout,
    interactive: bool,
}

impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            interactive: stdout_is_tty(),
        }
    }
}

impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for ProcessTerminal {
    fn write(&mut self, data: &str) {
        let mut out = self.stdout.lock();
        // A closed stdout leaves nothing to report to.
        let _ = out.write_all(data.as_bytes()).and_then(|()| out.flush());
    }

    fn flush(&mut self) {
        let _ = self.stdout.lock().flush();
    }

    fn columns(&self) -> u16 {
        #[cfg(unix)]
        let fd = libc::STDOUT_FILENO;
        #[cfg(not(unix))]
        let fd = 1;
        read_columns(fd).unwrap_or(DEFAULT_COLUMNS)
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}
