//! Validation command handler

use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{DocumentReport, OutputWriter, RunSummary};
use rulekit_schemas::loader::{self, Format, LoaderError};
use rulekit_schemas::{ErrorKind, JsonPath, RuleValidator, ValidationError, ValidationOptions, ValidationResult};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

/// Handle the validate command
#[instrument(skip_all, fields(files = args.files.len()))]
pub async fn handle_validate(args: ValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("validate_command", &format!("{} file(s)", args.files.len()));

    if let Some(missing) = args.files.iter().find(|file| !file.exists()) {
        return Err(Error::FileNotFound {
            path: missing.clone(),
        });
    }
    if args.jobs == Some(0) {
        return Err(Error::invalid_args("--jobs must be at least 1"));
    }

    let validator = Arc::new(super::build_validator(
        args.schema.as_deref(),
        args.functions.as_deref(),
        config,
    )?);
    let options = ValidationOptions {
        compute_line_numbers: args.line_numbers || config.validation.line_numbers,
        include_cascade_suppressed: args.show_suppressed || config.validation.show_suppressed,
    };
    let jobs = args.jobs.unwrap_or(config.validation.concurrency).max(1);
    info!(
        schema = validator.schema().name(),
        version = validator.schema().version(),
        jobs,
        "Validating documents"
    );

    if !config.output.progress {
        output.disable_progress();
    }
    let progress = output.progress_bar(args.files.len() as u64, "validating");

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = Vec::with_capacity(args.files.len());
    for file in args.files {
        let validator = Arc::clone(&validator);
        let semaphore = Arc::clone(&semaphore);
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::other(format!("Validation pool closed: {}", e)))?;
            tokio::task::spawn_blocking(move || validate_file(&validator, file, &options))
                .await
                .map_err(|e| Error::other(format!("Validation task failed: {}", e)))?
        }));
    }

    // Reports come back in argument order, whatever order the tasks finish in
    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        let report = task
            .await
            .map_err(|e| Error::other(format!("Validation task failed: {}", e)))??;
        if output.is_human() {
            match &progress {
                Some(pb) => pb.suspend(|| output.report(&report))?,
                None => output.report(&report)?,
            }
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        reports.push(report);
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = RunSummary::from_reports(&reports);
    if output.is_human() {
        output.summary(&summary)?;
    } else {
        output.data(&reports)?;
    }

    if summary.invalid > 0 {
        warn!(invalid = summary.invalid, total = summary.total, "Validation failed");
        return Err(Error::ValidationFailed {
            invalid: summary.invalid,
            total: summary.total,
        });
    }

    Ok(())
}

/// Validate one file. JSON sources carry line numbers; YAML sources are
/// validated as parsed values only.
fn validate_file(validator: &RuleValidator, file: PathBuf, options: &ValidationOptions) -> Result<DocumentReport> {
    let source = loader::load_source(&file)?;
    debug!(file = %file.display(), format = ?source.format, bytes = source.text.len(), "Read document");

    let result = match source.format {
        Format::Json => validator.validate_text(&source.text, options),
        Format::Yaml => match loader::DocumentParser::new().parse_yaml(&source.text, &file) {
            Ok(document) => validator.validate(&document, None, options),
            Err(LoaderError::YamlParseError { source, .. }) => yaml_parse_failure(validator, &source, options),
            Err(other) => return Err(other.into()),
        },
    };

    debug!(file = %file.display(), errors = result.error_count(), "Validated document");
    Ok(DocumentReport::new(file, result))
}

/// A YAML syntax error reported as the document's only validation error
fn yaml_parse_failure(
    validator: &RuleValidator,
    error: &serde_yaml::Error,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut failure = ValidationError::new(
        ErrorKind::ParseFailure,
        JsonPath::root(),
        format!("Document is not valid YAML: {}", error),
    );
    if let Some(location) = error.location() {
        failure = failure.with_arguments(json!({ "line": location.line(), "column": location.column() }));
        if options.compute_line_numbers {
            failure = failure.with_line_number(location.line());
        }
    }

    ValidationResult {
        schema_name: validator.schema().name().to_string(),
        schema_version: validator.schema().version().to_string(),
        errors: vec![failure],
        suppressed: options.include_cascade_suppressed.then(Vec::new),
    }
}
