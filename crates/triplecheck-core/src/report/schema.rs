//! JSON Schema validation for report lines.
//!
//! Lines read back from a log are validated against
//! `schema/report.schema.json` before they are turned into a [`Report`].
//!
//! [`Report`]: super::Report

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded report schema (loaded at compile time).
const REPORT_SCHEMA_JSON: &str = include_str!("../../schema/report.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(REPORT_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a report JSON value against the schema.
///
/// Returns every violation, each suffixed with its instance path.
pub fn validate_report_schema(report_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(report_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_report() -> serde_json::Value {
        serde_json::json!({
            "paragraphs": [
                {"text": "Paris is the capital of France.", "reasoning": "It says so.", "decision": true},
                {"text": "Lyon is a city in France.", "reasoning": "Unrelated.", "decision": null}
            ],
            "finalDecision": true,
            "elapsed": 3.25,
            "date": "2024-05-01",
            "time": "12:30:00",
            "subject": "Paris",
            "predicate": "capitalOf",
            "object": "France",
            "model": "meta/llama-2-70b-chat"
        })
    }

    #[test]
    fn test_valid_report_passes_schema() {
        assert!(validate_report_schema(&valid_report()).is_ok());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut value = valid_report();
        value.as_object_mut().unwrap().remove("finalDecision");

        let errors = validate_report_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_negative_elapsed_fails() {
        let mut value = valid_report();
        value["elapsed"] = serde_json::json!(-3.25);
        assert!(validate_report_schema(&value).is_err());
    }

    #[test]
    fn test_bad_decision_type_fails() {
        let mut value = valid_report();
        value["paragraphs"][0]["decision"] = serde_json::json!("yes");

        let errors = validate_report_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/paragraphs/0/decision")));
    }

    #[test]
    fn test_bad_date_format_fails() {
        let mut value = valid_report();
        value["date"] = serde_json::json!("01.05.2024");
        assert!(validate_report_schema(&value).is_err());
    }
}
