//! Validation demonstration example
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use rulekit_schemas::{RuleValidator, ValidationOptions, ValidationResult};

const VALID_RULE: &str = r#"{
  "structure": "condition",
  "definition": {
    "type": "comparison",
    "returnType": "boolean",
    "left": {"type": "field", "returnType": "number", "field": "order.total"},
    "operator": ">",
    "right": {"type": "value", "returnType": "number", "value": 100}
  }
}"#;

const BROKEN_RULE: &str = r#"{
  "structure": "expression",
  "returnType": "number",
  "definition": {
    "type": "function",
    "returnType": "number",
    "function": {
      "name": "avg",
      "args": [{"name": "value", "value": {"type": "value", "returnType": "number"}}]
    }
  }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Rulekit Validation Demo ===\n");

    let validator = RuleValidator::bundled()?;
    let options = ValidationOptions::new().with_line_numbers().with_suppressed();

    println!("--- Valid rule ---");
    print_result(&validator.validate_text(VALID_RULE, &options));

    println!("\n--- Broken rule ---");
    print_result(&validator.validate_text(BROKEN_RULE, &options));

    println!("\n--- Unparseable text ---");
    print_result(&validator.validate_text("{\"structure\": ", &options));

    Ok(())
}

fn print_result(result: &ValidationResult) {
    println!("schema: {} {}", result.schema_name, result.schema_version);
    if result.is_valid() {
        println!("✅ Valid");
        return;
    }

    for error in &result.errors {
        println!("❌ {} [{}]", error, error.code);
    }
    for error in result.suppressed.iter().flatten() {
        println!("   (suppressed) {}", error);
    }
}
