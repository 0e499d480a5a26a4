//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod config;
mod locate;
mod schema;
mod validate;

pub use completions::handle_completions;
pub use config::handle_config;
pub use locate::handle_locate;
pub use schema::handle_schema;
pub use validate::handle_validate;

use crate::config::Config;
use crate::error::Result;
use rulekit_schemas::{loader, FunctionCatalog, RuleSchema, RuleValidator};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Schema for a command: the `--schema` argument, then the configured
/// path, then the bundled schema
fn resolve_schema(arg: Option<&Path>, config: &Config) -> Result<RuleSchema> {
    match arg.or(config.schema.schema_path.as_deref()) {
        Some(path) => Ok(loader::load_schema(path)?),
        None => {
            debug!("Using bundled rule schema");
            Ok(RuleSchema::bundled()?)
        }
    }
}

/// Function catalog for a command, resolved like [`resolve_schema`]
fn resolve_catalog(arg: Option<&Path>, config: &Config) -> Result<FunctionCatalog> {
    match arg.or(config.schema.functions_path.as_deref()) {
        Some(path) => Ok(loader::load_catalog(path)?),
        None => {
            debug!("Using bundled function catalog");
            Ok(FunctionCatalog::bundled()?)
        }
    }
}

fn build_validator(schema: Option<&Path>, functions: Option<&Path>, config: &Config) -> Result<RuleValidator> {
    Ok(RuleValidator::new(
        Arc::new(resolve_schema(schema, config)?),
        Arc::new(resolve_catalog(functions, config)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn test_bundled_validator_by_default() {
        let validator = build_validator(None, None, &Config::default()).unwrap();
        assert_eq!(validator.schema().name(), "RuleDefinition");
        assert!(!validator.catalog().is_empty());
    }

    #[test]
    fn test_argument_overrides_configured_path() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.schema.schema_path = Some(dir.path().join("missing.json"));

        // The configured path is used when no argument is given
        assert!(matches!(
            resolve_schema(None, &config),
            Err(Error::Loader(_))
        ));

        let schema_path = dir.path().join("mini.yaml");
        std::fs::write(&schema_path, "title: MiniRule\nversion: '0.1'\ntype: object\n").unwrap();
        let schema = resolve_schema(Some(&schema_path), &config).unwrap();
        assert_eq!(schema.name(), "MiniRule");
    }
}
