//! User-input validation
//!
//! Validates provided run inputs against a workflow's input definitions and
//! produces the finalized input map (defaults applied). Runs entirely
//! locally, before any network effect.

use std::collections::HashMap;

use crate::domain::workflow::{InputType, Workflow};
use crate::error::InputValidationError;

/// Validates `provided` against `workflow.workflow_inputs` and returns the
/// finalized inputs
///
/// Rules:
/// - every provided key must name a defined input,
/// - provided values must match the declared input type,
/// - absent inputs take their default value when one exists,
/// - absent, defaultless inputs fail when marked required.
pub fn validate_user_inputs(
    workflow: &Workflow,
    provided: &HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, serde_json::Value>, InputValidationError> {
    let defined: Vec<&str> = workflow
        .workflow_inputs
        .iter()
        .map(|input| input.input_name.as_str())
        .collect();

    for name in provided.keys() {
        if !defined.contains(&name.as_str()) {
            let mut valid: Vec<&str> = defined.clone();
            valid.sort_unstable();
            return Err(InputValidationError::Unexpected {
                name: name.clone(),
                valid: valid.join(", "),
            });
        }
    }

    let mut finalized = HashMap::new();
    for input in &workflow.workflow_inputs {
        if let Some(value) = provided.get(&input.input_name) {
            if !value_matches(input.input_type, value) {
                return Err(InputValidationError::TypeMismatch {
                    name: input.input_name.clone(),
                    expected: input.input_type.as_str().to_string(),
                    value: value.to_string(),
                });
            }
            finalized.insert(input.input_name.clone(), value.clone());
        } else if let Some(default) = &input.default_value {
            finalized.insert(input.input_name.clone(), default.clone());
        } else if input.required {
            return Err(InputValidationError::MissingRequired {
                name: input.input_name.clone(),
                input_type: input.input_type.as_str().to_string(),
            });
        }
    }

    Ok(finalized)
}

/// Whether a JSON value is acceptable for the declared input type
///
/// Date, file, and directory inputs travel as strings (ISO dates and
/// paths); list inputs are arrays of strings.
fn value_matches(input_type: InputType, value: &serde_json::Value) -> bool {
    match input_type {
        InputType::String | InputType::Date | InputType::File | InputType::Directory => {
            value.is_string()
        }
        InputType::Number => value.is_number(),
        InputType::Boolean => value.is_boolean(),
        InputType::List => value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| item.is_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{FileFilter, WorkflowInput};

    fn workflow_with_inputs(inputs: Vec<WorkflowInput>) -> Workflow {
        let document = serde_json::json!({
            "schema_version": "v1",
            "workflow_computer": {
                "os": "linux",
                "computerName": "box",
                "computerType": "remoteDesktop",
                "screenConfig": {"width": 1440, "height": 900, "display_num": 0}
            },
            "workflow_title": "t",
            "workflow_description": "d",
            "workflow_inputs": [],
            "sequences": [],
            "workflow_execution_instructions": {"instructions": [], "code": []}
        });
        let mut workflow = Workflow::from_untyped(document).unwrap();
        workflow.workflow_inputs = inputs;
        workflow
    }

    fn input(name: &str, input_type: InputType, required: bool) -> WorkflowInput {
        WorkflowInput {
            input_title: name.to_string(),
            input_description: String::new(),
            input_type,
            input_name: name.to_string(),
            default_value: None,
            file_filters: None,
            required,
        }
    }

    #[test]
    fn test_defaults_applied_when_absent() {
        let mut topic = input("topic", InputType::String, true);
        let mut outfile = input("output_path", InputType::File, false);
        outfile.default_value = Some(serde_json::json!("/home/user/report.md"));
        outfile.file_filters = Some(vec![FileFilter {
            name: "Markdown".to_string(),
            extensions: vec!["md".to_string()],
        }]);
        topic.required = true;

        let workflow = workflow_with_inputs(vec![topic, outfile]);
        let provided = HashMap::from([("topic".to_string(), serde_json::json!("rust"))]);
        let finalized = validate_user_inputs(&workflow, &provided).unwrap();
        assert_eq!(finalized["topic"], serde_json::json!("rust"));
        assert_eq!(finalized["output_path"], serde_json::json!("/home/user/report.md"));
    }

    #[test]
    fn test_missing_required_input_fails() {
        let workflow = workflow_with_inputs(vec![input("topic", InputType::String, true)]);
        let err = validate_user_inputs(&workflow, &HashMap::new()).unwrap_err();
        assert!(matches!(err, InputValidationError::MissingRequired { name, .. } if name == "topic"));
    }

    #[test]
    fn test_unexpected_input_fails() {
        let workflow = workflow_with_inputs(vec![input("topic", InputType::String, true)]);
        let provided = HashMap::from([
            ("topic".to_string(), serde_json::json!("rust")),
            ("typo".to_string(), serde_json::json!("x")),
        ]);
        let err = validate_user_inputs(&workflow, &provided).unwrap_err();
        assert!(matches!(err, InputValidationError::Unexpected { name, .. } if name == "typo"));
    }

    #[test]
    fn test_type_mismatch_fails() {
        let workflow = workflow_with_inputs(vec![input("count", InputType::Number, true)]);
        let provided = HashMap::from([("count".to_string(), serde_json::json!("five"))]);
        let err = validate_user_inputs(&workflow, &provided).unwrap_err();
        assert!(matches!(err, InputValidationError::TypeMismatch { name, .. } if name == "count"));
    }

    #[test]
    fn test_number_accepts_integers_and_floats() {
        let workflow = workflow_with_inputs(vec![input("count", InputType::Number, true)]);
        for value in [serde_json::json!(5), serde_json::json!(2.5)] {
            let provided = HashMap::from([("count".to_string(), value)]);
            assert!(validate_user_inputs(&workflow, &provided).is_ok());
        }
    }

    #[test]
    fn test_list_must_contain_strings() {
        let workflow = workflow_with_inputs(vec![input("tags", InputType::List, true)]);
        let ok = HashMap::from([("tags".to_string(), serde_json::json!(["a", "b"]))]);
        assert!(validate_user_inputs(&workflow, &ok).is_ok());

        let bad = HashMap::from([("tags".to_string(), serde_json::json!(["a", 1]))]);
        assert!(validate_user_inputs(&workflow, &bad).is_err());
    }

    #[test]
    fn test_optional_defaultless_input_is_skipped() {
        let workflow = workflow_with_inputs(vec![input("note", InputType::String, false)]);
        let finalized = validate_user_inputs(&workflow, &HashMap::new()).unwrap();
        assert!(finalized.is_empty());
    }
}
