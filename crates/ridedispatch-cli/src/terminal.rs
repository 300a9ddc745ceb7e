//! Terminal styling and color utilities.
//!
//! ANSI escape codes and color detection for the text output of the CLI.

/// ANSI escape codes for text styling and colors.
pub mod colors {
    /// Reset all styling.
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for emphasis (ride and driver ids).
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for timestamps and secondary text.
    pub const GRAY: &str = "\x1b[90m";
    /// Green for matches and completed trips.
    pub const GREEN: &str = "\x1b[32m";
    /// Cyan for trips in progress.
    pub const CYAN: &str = "\x1b[36m";
    /// Yellow for rides still waiting on a driver.
    pub const YELLOW: &str = "\x1b[33m";
    /// Red for failures.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, either ANSI sequences or empty strings when color
/// is disabled.
#[derive(Debug, Clone, Copy)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub green: &'static str,
    pub cyan: &'static str,
    pub yellow: &'static str,
    pub red: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            green: colors::GREEN,
            cyan: colors::CYAN,
            yellow: colors::YELLOW,
            red: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            white_bold: "",
            gray: "",
            green: "",
            cyan: "",
            yellow: "",
            red: "",
        }
    }

    /// `colored()` when the terminal supports ANSI colors, `plain()`
    /// otherwise.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Check if the terminal supports ANSI color codes.
///
/// Respects the `NO_COLOR` environment variable (https://no-color.org/) and
/// the `TERM=dumb` convention.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

/// Format a millisecond offset as `+1.5s`.
pub fn format_offset(offset_ms: u64) -> String {
    if offset_ms % 1000 == 0 {
        format!("+{}s", offset_ms / 1000)
    } else {
        format!("+{:.1}s", offset_ms as f64 / 1000.0)
    }
}
