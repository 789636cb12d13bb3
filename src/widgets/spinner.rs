//! Progress spinner drawn on the current terminal line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::style::{Style, Tone};
use crate::core::terminal::{lock_unpoisoned, SharedTerminal};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_INTERVAL: Duration = Duration::from_millis(80);
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Lifecycle of the spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
struct Rotation {
    messages: Vec<String>,
    period: Duration,
}

/// Spinner with pause/resume support.
///
/// When drawing is disabled (non-interactive output) the state machine still runs
/// so callers observe the same pause/resume semantics, but nothing is written.
pub struct Spinner {
    terminal: SharedTerminal,
    style: Style,
    draw: bool,
    state: SpinnerState,
    message: Arc<Mutex<String>>,
    rotation: Option<Rotation>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Spinner {
    pub fn new(terminal: SharedTerminal, style: Style, draw: bool) -> Self {
        Self {
            terminal,
            style,
            draw,
            state: SpinnerState::Stopped,
            message: Arc::new(Mutex::new(String::new())),
            rotation: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SpinnerState {
        self.state
    }

    /// Running or paused.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != SpinnerState::Stopped
    }

    #[must_use]
    pub fn message(&self) -> String {
        lock_unpoisoned(&self.message).clone()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        *lock_unpoisoned(&self.message) = message.into();
    }

    /// Starts with a fixed message. Restarts if already active.
    pub fn start(&mut self, message: impl Into<String>) {
        self.start_with(message.into(), None);
    }

    /// Starts with `messages[0]` and cycles through the list every `period`.
    pub fn start_rotating(&mut self, messages: Vec<String>, period: Duration) {
        let first = messages.first().cloned().unwrap_or_default();
        let rotation = (messages.len() > 1).then_some(Rotation { messages, period });
        self.start_with(first, rotation);
    }

    fn start_with(&mut self, message: String, rotation: Option<Rotation>) {
        self.halt_thread();
        self.set_message(message);
        self.rotation = rotation;
        self.state = SpinnerState::Running;
        self.spawn_thread();
    }

    /// Stops drawing and clears the line.
    pub fn stop(&mut self) {
        self.halt_thread();
        self.state = SpinnerState::Stopped;
    }

    /// Suspends drawing; returns true if the spinner was running.
    pub fn pause(&mut self) -> bool {
        if self.state != SpinnerState::Running {
            return false;
        }
        self.halt_thread();
        self.state = SpinnerState::Paused;
        true
    }

    /// Resumes a paused spinner; no-op otherwise.
    pub fn resume(&mut self) {
        if self.state != SpinnerState::Paused {
            return;
        }
        self.state = SpinnerState::Running;
        self.spawn_thread();
    }

    fn spawn_thread(&mut self) {
        if !self.draw || self.thread.is_some() {
            return;
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);
        let terminal = Arc::clone(&self.terminal);
        let message = Arc::clone(&self.message);
        let rotation = self.rotation.clone();
        let style = self.style;

        self.thread = Some(thread::spawn(move || {
            let mut frame = 0usize;
            let mut rotated_at = Instant::now();
            let mut rotation_index = 0usize;

            while !stop_flag.load(Ordering::SeqCst) {
                if let Some(rotation) = rotation.as_ref() {
                    if rotated_at.elapsed() >= rotation.period {
                        rotation_index = (rotation_index + 1) % rotation.messages.len();
                        *lock_unpoisoned(&message) = rotation.messages[rotation_index].clone();
                        rotated_at = Instant::now();
                    }
                }

                let glyph =
                    style.paint(Tone::Primary, SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]);
                let text = style.paint(Tone::Muted, &lock_unpoisoned(&message));
                lock_unpoisoned(&terminal).write(&format!("{CLEAR_LINE}{glyph} {text}"));

                frame += 1;
                thread::park_timeout(FRAME_INTERVAL);
            }
        }));
    }

    fn halt_thread(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        self.stop_flag.store(true, Ordering::SeqCst);
        handle.thread().unpark();
        let _ = handle.join();
        lock_unpoisoned(&self.terminal).write(CLEAR_LINE);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.halt_thread();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::{Spinner, SpinnerState};
    use crate::core::style::Style;
    use crate::core::terminal::{SharedTerminal, Terminal};

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<String>>);

    impl Terminal for Recording {
        fn write(&mut self, data: &str) {
            self.0.lock().expect("recording lock").push_str(data);
        }

        fn columns(&self) -> u16 {
            80
        }
    }

    fn spinner(draw: bool) -> (Spinner, Recording) {
        let recording = Recording::default();
        let terminal: SharedTerminal =
            Arc::new(Mutex::new(Box::new(recording.clone()) as Box<dyn Terminal>));
        (Spinner::new(terminal, Style::plain(), draw), recording)
    }

    #[test]
    fn pause_and_resume_follow_state_machine() {
        let (mut spinner, _) = spinner(false);
        assert!(!spinner.pause());

        spinner.start("Thinking...");
        assert_eq!(spinner.state(), SpinnerState::Running);
        assert!(spinner.pause());
        assert!(!spinner.pause());
        assert_eq!(spinner.state(), SpinnerState::Paused);
        assert!(spinner.is_active());

        spinner.resume();
        assert_eq!(spinner.state(), SpinnerState::Running);
        spinner.stop();
        assert!(!spinner.is_active());

        spinner.resume();
        assert_eq!(spinner.state(), SpinnerState::Stopped);
    }

    #[test]
    fn disabled_drawing_writes_nothing() {
        let (mut spinner, recording) = spinner(false);
        spinner.start("quiet");
        std::thread::sleep(Duration::from_millis(100));
        spinner.stop();
        assert!(recording.0.lock().expect("recording lock").is_empty());
    }

    #[test]
    fn drawing_spinner_renders_frames_and_clears_on_stop() {
        let (mut spinner, recording) = spinner(true);
        spinner.start("Working");
        std::thread::sleep(Duration::from_millis(120));
        spinner.stop();

        let output = recording.0.lock().expect("recording lock").clone();
        assert!(output.contains("Working"));
        assert!(output.ends_with("\r\x1b[2K"));
    }

    #[test]
    fn rotation_starts_with_first_message() {
        let (mut spinner, _) = spinner(false);
        spinner.start_rotating(
            vec!["first".to_string(), "second".to_string()],
            Duration::from_secs(5),
        );
        assert_eq!(spinner.message(), "first");
        spinner.set_message("custom");
        assert_eq!(spinner.message(), "custom");
    }
}
