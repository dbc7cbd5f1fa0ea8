//! Colored formatter implementation with terminal color support

use super::formatter::{fmt_err, OutputFormatter, Tone};
use crate::error::Result;
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

impl ColorScheme {
    pub fn color(&self, tone: Tone) -> Color {
        match tone {
            Tone::Header => self.header,
            Tone::Success => self.success,
            Tone::Warning => self.warning,
            Tone::Error => self.error,
            Tone::Info => self.info,
            Tone::Muted => self.muted,
        }
    }
}

/// Colored formatter implementation
#[derive(Debug, Clone, Default)]
pub struct ColoredFormatter {
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self { color_scheme }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn paint(&self, text: &str, tone: Tone) -> String {
        let colored = text.color(self.color_scheme.color(tone));
        match tone {
            Tone::Header | Tone::Error => colored.bold().to_string(),
            _ => colored.to_string(),
        }
    }

    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();

        let decorated_title = format!("🎯 {}", title);
        let border = "═".repeat(decorated_title.chars().count() + 4);

        writeln!(output, "{}", border.color(self.color_scheme.border)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", decorated_title.bold().color(self.color_scheme.header)).map_err(fmt_err)?;
        write!(output, "{}", border.color(self.color_scheme.border)).map_err(fmt_err)?;

        Ok(output)
    }
}
