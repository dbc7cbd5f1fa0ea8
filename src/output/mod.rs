//! Output formatting and the persisted text report
//!
//! Console output goes through an [`OutputFormatter`], colored or plain;
//! the optional report file is written through a [`ReportSink`].

mod colored;
mod formatter;
mod report;

pub use colored::{ColorScheme, ColoredFormatter};
pub use formatter::{render_table, Alignment, Column, OutputFormatter, PlainFormatter, RowData, TableFormat, Tone};
pub use report::{render_pass_block, ReportSink};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool) -> Box<dyn OutputFormatter> {
        if enable_color {
            Box::new(ColoredFormatter::new())
        } else {
            Box::new(PlainFormatter::new())
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false)
    }
}
