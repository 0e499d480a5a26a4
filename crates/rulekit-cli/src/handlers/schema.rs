//! Schema command handler

use crate::cli::SchemaArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use rulekit_schemas::{Arity, FunctionSignature};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SchemaInfo {
    schema_name: String,
    schema_version: String,
    catalog_version: String,
    condition_rule_types: Vec<String>,
    condition_group_rule_types: Vec<String>,
    function_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<FunctionInfo>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionInfo {
    name: String,
    returns: String,
    arguments: String,
}

impl FunctionInfo {
    fn new(signature: &FunctionSignature) -> Self {
        Self {
            name: signature.name.clone(),
            returns: signature.return_type.to_string(),
            arguments: describe_arity(&signature.arity),
        }
    }
}

/// `value: number, precision?: number` or `number x 1..` style summary
fn describe_arity(arity: &Arity) -> String {
    match arity {
        Arity::Fixed(specs) => specs
            .iter()
            .map(|spec| {
                let marker = if spec.optional { "?" } else { "" };
                format!("{}{}: {}", spec.name, marker, spec.arg_type)
            })
            .collect::<Vec<_>>()
            .join(", "),
        Arity::Dynamic { min, max, element_type } => match max {
            Some(max) => format!("{} x {}..{}", element_type, min, max),
            None => format!("{} x {}..", element_type, min),
        },
    }
}

/// Handle the schema command
pub fn handle_schema(args: SchemaArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let validator = super::build_validator(args.schema.as_deref(), args.functions.as_deref(), config)?;
    let schema = validator.schema();
    let catalog = validator.catalog();

    let info = SchemaInfo {
        schema_name: schema.name().to_string(),
        schema_version: schema.version().to_string(),
        catalog_version: catalog.version().to_string(),
        condition_rule_types: catalog.rule_types().condition.clone(),
        condition_group_rule_types: catalog.rule_types().condition_group.clone(),
        function_count: catalog.len(),
        functions: args
            .functions_list
            .then(|| catalog.functions().map(FunctionInfo::new).collect()),
    };

    if !output.is_human() {
        return output.data(&info);
    }

    output.writeln(&format!("Schema:    {} {}", info.schema_name, info.schema_version))?;
    output.writeln(&format!(
        "Functions: {} (catalog {})",
        info.function_count, info.catalog_version
    ))?;
    output.writeln(&format!(
        "Rule types: condition [{}], conditionGroup [{}]",
        info.condition_rule_types.join(", "),
        info.condition_group_rule_types.join(", ")
    ))?;

    if let Some(functions) = info.functions {
        output.section("Functions")?;
        let rows = functions
            .into_iter()
            .map(|f| vec![f.name, f.returns, f.arguments])
            .collect();
        output.table(&["Name", "Returns", "Arguments"], rows)?;
    }

    Ok(())
}
