//! Output formatting and writing utilities
//!
//! Reports are written in the format chosen with `--output`: a readable
//! listing for humans, or JSON/YAML documents that carry the validation
//! results unchanged.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rulekit_schemas::{ValidationError, ValidationResult};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::trace;

/// Validation outcome for one file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    pub file: PathBuf,
    pub valid: bool,
    #[serde(flatten)]
    pub result: ValidationResult,
}

impl DocumentReport {
    pub fn new(file: PathBuf, result: ValidationResult) -> Self {
        Self {
            file,
            valid: result.is_valid(),
            result,
        }
    }
}

/// Totals over a validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub invalid: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn from_reports(reports: &[DocumentReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.total += 1;
            if !report.valid {
                summary.invalid += 1;
            }
            summary.errors += report.result.error_count();
            summary
        })
    }
}

/// Trait for formatting output with specialized support for reports
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format the report of one document
    fn format_report(&self, report: &DocumentReport, use_color: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_report(&self, report: &DocumentReport, use_color: bool) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_report_human(report, use_color)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write + Send>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            use_color,
            show_progress: false,
            quiet,
            writer,
        }
    }

    /// Turn progress indicators off regardless of the terminal
    pub fn disable_progress(&mut self) {
        self.show_progress = false;
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let formatted = self.format.format(value)?;
        trace!(bytes = formatted.len(), "Writing data");

        if self.format == OutputFormat::Yaml {
            // serde_yaml already terminates the document
            self.write(&formatted)
        } else {
            self.writeln(&formatted)
        }
    }

    /// Write the report of one document. In quiet mode valid documents
    /// are not listed.
    pub fn report(&mut self, report: &DocumentReport) -> Result<()> {
        if self.quiet && report.valid {
            return Ok(());
        }
        let formatted = self.format.format_report(report, self.use_color)?;
        self.write(&formatted)
    }

    /// Write the closing line of a human-readable run
    pub fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        let line = format!(
            "{} file(s) checked, {} invalid, {} error(s)",
            summary.total, summary.invalid, summary.errors
        );
        if summary.invalid == 0 {
            self.success(&line)
        } else if self.use_color {
            self.writeln(&line.red().bold().to_string())
        } else {
            self.writeln(&line)
        }
    }

    /// Create a progress bar for long operations
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        if !self.show_progress || length < 2 {
            return None;
        }

        let pb = ProgressBar::new(length);
        pb.set_style(default_progress_style());
        pb.set_message(message.to_string());
        Some(pb)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let header_row = headers
            .iter()
            .zip(&widths)
            .map(|(h, width)| format!("{:width$}", h, width = width))
            .collect::<Vec<_>>()
            .join(" │ ");

        if self.use_color {
            self.writeln(header_row.trim_end().bold().to_string().as_str())?;
        } else {
            self.writeln(header_row.trim_end())?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(width) => format!("{:width$}", cell, width = width),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

/// Helper function to create a progress bar style
pub fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Format a document report for human reading
fn format_report_human(report: &DocumentReport, use_color: bool) -> String {
    let file = report.file.display().to_string();
    let mut output = String::new();

    if report.valid {
        let mark = if use_color { "✓".green().to_string() } else { "✓".to_string() };
        output.push_str(&format!("{} {}\n", mark, file));
    } else {
        let mark = if use_color { "✗".red().bold().to_string() } else { "✗".to_string() };
        output.push_str(&format!(
            "{} {} ({} error(s))\n",
            mark,
            file,
            report.result.error_count()
        ));
        for (i, error) in report.result.errors.iter().enumerate() {
            output.push_str(&format_error_human(i + 1, error, use_color));
        }
    }

    if let Some(suppressed) = report.result.suppressed.as_ref().filter(|s| !s.is_empty()) {
        output.push_str(&format!("  {} suppressed as cascades:\n", suppressed.len()));
        for error in suppressed {
            let by = error
                .details
                .as_ref()
                .and_then(|d| d.get("suppressedBy"))
                .and_then(|v| v.as_str())
                .unwrap_or("cascade");
            let line = format!("    - {} ({})", error, by);
            if use_color {
                output.push_str(&line.dimmed().to_string());
            } else {
                output.push_str(&line);
            }
            output.push('\n');
        }
    }

    output
}

/// Format a single validation error for human reading
fn format_error_human(position: usize, error: &ValidationError, use_color: bool) -> String {
    let location = match (error.path.is_root(), error.line_number) {
        (true, Some(line)) => format!("<root> (line {})", line),
        (true, None) => "<root>".to_string(),
        (false, Some(line)) => format!("{} (line {})", error.path, line),
        (false, None) => error.path.to_string(),
    };
    let kind = format!("[{}]", error.kind.as_str());
    let kind = if use_color { kind.yellow().to_string() } else { kind };

    format!(
        "  {}. {} {}\n     {}\n     code: {}\n",
        position, kind, location, error.message, error.code
    )
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}
