//! Locate command handler

use crate::cli::LocateArgs;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use rulekit_schemas::loader::{self, Format};
use rulekit_schemas::{JsonPath, LineIndex};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location<'a> {
    path: String,
    line_number: usize,
    text: &'a str,
}

/// Handle the locate command: print the line a document path starts on
pub fn handle_locate(args: LocateArgs, output: &mut OutputWriter) -> Result<()> {
    if !args.file.exists() {
        return Err(Error::FileNotFound { path: args.file });
    }

    let path: JsonPath = args
        .path
        .parse()
        .map_err(|e| Error::invalid_args(format!("{}", e)))?;

    let source = loader::load_source(&args.file)?;
    if source.format != Format::Json {
        return Err(Error::invalid_args(format!(
            "Line numbers are only available for JSON documents, not '{}'",
            args.file.display()
        )));
    }

    let index = LineIndex::new(&source.text);
    let line_number = index.locate(&path).ok_or_else(|| Error::PathNotFound {
        file: args.file.clone(),
        path: args.path.clone(),
    })?;
    debug!(path = %path, line = line_number, "Located path");

    let text = source.text.lines().nth(line_number - 1).unwrap_or("").trim();
    let location = Location {
        path: path.to_string(),
        line_number,
        text,
    };

    if output.is_human() {
        output.writeln(&format!("{}:{}: {}", args.file.display(), line_number, text))
    } else {
        output.data(&location)
    }
}
