// Tests for report formatting and the output writer
//
// Writers are pointed at a shared in-memory buffer so the produced text
// can be inspected.

use super::*;
use rulekit_schemas::{ErrorKind, JsonPath};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone()));
    (writer, buffer)
}

fn result(errors: Vec<ValidationError>) -> ValidationResult {
    ValidationResult {
        schema_name: "RuleDefinition".to_string(),
        schema_version: "1.2.0".to_string(),
        errors,
        suppressed: None,
    }
}

fn missing_value() -> ValidationError {
    ValidationError::new(
        ErrorKind::RequiredMissing,
        "definition.value".parse::<JsonPath>().unwrap(),
        "Missing required property 'value'",
    )
    .with_line_number(3)
}

#[test]
fn test_valid_report_human() {
    let report = DocumentReport::new(PathBuf::from("rules/ok.json"), result(vec![]));
    let formatted = format_report_human(&report, false);
    assert_eq!(formatted, "✓ rules/ok.json\n");
}

#[test]
fn test_invalid_report_human_lists_errors_with_lines() {
    let report = DocumentReport::new(PathBuf::from("rules/bad.json"), result(vec![missing_value()]));
    let formatted = format_report_human(&report, false);

    assert!(formatted.starts_with("✗ rules/bad.json (1 error(s))\n"));
    assert!(formatted.contains("1. [required-missing] definition.value (line 3)"));
    assert!(formatted.contains("Missing required property 'value'"));
    assert!(formatted.contains("code: validation.required"));
}

#[test]
fn test_suppressed_errors_are_listed_with_their_cause() {
    let mut outcome = result(vec![missing_value()]);
    outcome.suppressed = Some(vec![ValidationError::new(
        ErrorKind::ConstantViolation,
        "definition.type".parse::<JsonPath>().unwrap(),
        "Expected 'field'",
    )
    .with_details(json!({"suppressedBy": "alternative-branch"}))]);

    let report = DocumentReport::new(PathBuf::from("rule.json"), outcome);
    let formatted = format_report_human(&report, false);
    assert!(formatted.contains("1 suppressed as cascades:"));
    assert!(formatted.contains("(alternative-branch)"));
}

#[test]
fn test_json_report_flattens_result() {
    let report = DocumentReport::new(PathBuf::from("rule.json"), result(vec![missing_value()]));
    let formatted = OutputFormat::Json.format_report(&report, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();

    assert_eq!(value["file"], "rule.json");
    assert_eq!(value["valid"], false);
    assert_eq!(value["schemaName"], "RuleDefinition");
    assert_eq!(value["errors"][0]["type"], "required-missing");
    assert_eq!(value["errors"][0]["lineNumber"], 3);
}

#[test]
fn test_yaml_data_output() {
    let (mut out, buffer) = writer(OutputFormat::Yaml, false);
    out.data(&json!({"total": 2})).unwrap();
    assert_eq!(buffer.contents(), "total: 2\n");
}

#[test]
fn test_quiet_mode_hides_valid_reports_and_info() {
    let (mut out, buffer) = writer(OutputFormat::Human, true);
    out.info("starting").unwrap();
    out.report(&DocumentReport::new(PathBuf::from("ok.json"), result(vec![]))).unwrap();
    out.report(&DocumentReport::new(PathBuf::from("bad.json"), result(vec![missing_value()])))
        .unwrap();

    let contents = buffer.contents();
    assert!(!contents.contains("starting"));
    assert!(!contents.contains("ok.json"));
    assert!(contents.contains("bad.json"));
}

#[test]
fn test_machine_formats_skip_decorations() {
    let (mut out, buffer) = writer(OutputFormat::Json, false);
    out.info("hello").unwrap();
    out.section("Schema").unwrap();
    out.summary(&RunSummary { total: 1, invalid: 0, errors: 0 }).unwrap();
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_run_summary_counts() {
    let reports = vec![
        DocumentReport::new(PathBuf::from("a.json"), result(vec![])),
        DocumentReport::new(PathBuf::from("b.json"), result(vec![missing_value(), missing_value()])),
    ];
    let summary = RunSummary::from_reports(&reports);
    assert_eq!(summary, RunSummary { total: 2, invalid: 1, errors: 2 });

    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.summary(&summary).unwrap();
    assert_eq!(buffer.contents(), "2 file(s) checked, 1 invalid, 2 error(s)\n");
}

#[test]
fn test_table_alignment() {
    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.table(
        &["Name", "Returns"],
        vec![
            vec!["abs".to_string(), "number".to_string()],
            vec!["concat".to_string(), "text".to_string()],
        ],
    )
    .unwrap();

    let contents = buffer.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "Name   │ Returns");
    assert_eq!(lines[2], "abs    │ number");
    assert_eq!(lines[3], "concat │ text");
}

#[test]
fn test_no_progress_with_custom_writer() {
    let (out, _) = writer(OutputFormat::Human, false);
    assert!(out.progress_bar(10, "validating").is_none());
}
