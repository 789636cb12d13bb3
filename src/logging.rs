//! Tracing setup: debug output through the console, optional log file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::console::Console;

const DEBUG_FILTER: &str = "terminus=debug,terminus_ui=debug,agent_provider=debug,agent_provider_mock=debug";
const FILE_FILTER: &str = "terminus=info,agent_provider_mock=info";
const DEBUG_PREFIX: &str = "⚙︎ ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Mirror events into the console as muted lines.
    pub debug: bool,
    /// Append events to this file.
    pub log_file: Option<PathBuf>,
}

/// Which sinks were installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSinks {
    pub console: bool,
    pub file: Option<PathBuf>,
}

/// Installs the global subscriber. Without any sink, nothing is installed.
pub fn init_logging(console: &Console, options: &LoggingOptions) -> io::Result<LogSinks> {
    if !options.debug && options.log_file.is_none() {
        return Ok(LogSinks::default());
    }

    let default_filter = if options.debug {
        DEBUG_FILTER
    } else {
        FILE_FILTER
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_layer = options.debug.then(|| {
        fmt::layer()
            .without_time()
            .with_ansi(false)
            .with_writer(ConsoleLogWriter::new(console.clone()))
    });

    let file_layer = match options.log_file.as_ref() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LogSinks {
        console: options.debug,
        file: options.log_file.clone(),
    })
}

/// Writer factory that routes formatted events through the console.
#[derive(Clone)]
pub struct ConsoleLogWriter {
    console: Console,
}

impl ConsoleLogWriter {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl<'a> MakeWriter<'a> for ConsoleLogWriter {
    type Writer = ConsoleLogLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLogLine {
            console: self.console.clone(),
            buffer: Vec::new(),
        }
    }
}

/// One formatted event; written to the console when dropped.
pub struct ConsoleLogLine {
    console: Console,
    buffer: Vec<u8>,
}

impl Write for ConsoleLogLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLogLine {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer);
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            self.console.muted(&format!("{DEBUG_PREFIX}{}", line.trim_start()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::{init_logging, ConsoleLogWriter, LogSinks, LoggingOptions};
    use crate::console::{Console, ConsoleOptions};
    use crate::core::terminal::Terminal;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<String>>);

    impl Terminal for Capture {
        fn write(&mut self, data: &str) {
            self.0.lock().expect("capture lock").push_str(data);
        }

        fn columns(&self) -> u16 {
            80
        }
    }

    #[test]
    fn console_writer_emits_prefixed_muted_lines() {
        let capture = Capture::default();
        let console = Console::new(capture.clone(), ConsoleOptions::default());
        let writer = ConsoleLogWriter::new(console);

        {
            let mut line = writer.make_writer();
            line.write_all(b" DEBUG terminus::controller: node appended\n")
                .expect("buffer write");
        }

        assert_eq!(
            capture.0.lock().expect("capture lock").as_str(),
            "⚙︎ DEBUG terminus::controller: node appended\n"
        );
    }

    #[test]
    fn no_sinks_installs_nothing() {
        let console = Console::new(Capture::default(), ConsoleOptions::default());
        let sinks = init_logging(&console, &LoggingOptions::default()).expect("noop init");
        assert_eq!(sinks, LogSinks::default());
    }
}
