//! Color palette and ANSI styling.

/// Semantic color roles used across the shell output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Primary,
    Accent,
    Success,
    Warning,
    Error,
    Info,
    Muted,
    Subtle,
    Border,
    ToolData,
    Command,
}

impl Tone {
    /// xterm-256 palette index for the tone.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Primary => 75,
            Self::Accent => 172,
            Self::Success => 40,
            Self::Warning => 178,
            Self::Error => 160,
            Self::Info => 117,
            Self::Muted => 251,
            Self::Subtle => 248,
            Self::Border => 243,
            Self::ToolData => 49,
            Self::Command => 220,
        }
    }
}

/// Applies tones when color output is enabled, otherwise passes text through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    enabled: bool,
}

impl Style {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[must_use]
    pub fn plain() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[38;5;{}m{text}\x1b[0m", tone.code())
    }

    #[must_use]
    pub fn bold(&self, tone: Tone, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[1;38;5;{}m{text}\x1b[0m", tone.code())
    }
}
