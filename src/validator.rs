//! Annotation validation against the closed UCP vocabulary.
//!
//! Validation collects every error in a document rather than stopping
//! at the first one.

use serde_json::Value;

use crate::error::AnnotationError;
use crate::types::{
    json_type_name, OperationContext, ANNOTATION_PREFIX, REQUEST_ANNOTATION,
    RESPONSE_ANNOTATION, SHARED_REQUEST_ANNOTATION, VALID_REQUEST_VALUES, VALID_RESPONSE_VALUES,
};

/// Validate all `ucp_*` keys in a document.
///
/// Returns an empty list when the document is valid.
pub fn validate_annotations(document: &Value) -> Vec<AnnotationError> {
    let mut errors = Vec::new();
    check_value(document, "", &mut errors);
    errors
}

fn check_value(value: &Value, path: &str, errors: &mut Vec<AnnotationError>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                match key.as_str() {
                    REQUEST_ANNOTATION => check_request(child, &key_path, errors),
                    RESPONSE_ANNOTATION => check_response(child, &key_path, errors),
                    SHARED_REQUEST_ANNOTATION => {
                        if !child.is_boolean() {
                            errors.push(AnnotationError::InvalidSharedRequest {
                                path: key_path,
                                actual: json_type_name(child).to_string(),
                            });
                        }
                    }
                    k if k.starts_with(ANNOTATION_PREFIX) => {
                        errors.push(AnnotationError::UnknownAnnotation {
                            path: key_path,
                            key: key.clone(),
                        });
                    }
                    _ => check_value(child, &key_path, errors),
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                check_value(item, &format!("{}[{}]", path, i), errors);
            }
        }
        _ => {}
    }
}

fn check_request(value: &Value, path: &str, errors: &mut Vec<AnnotationError>) {
    match value {
        // Shorthand: "ucp_request": "omit"
        Value::String(s) => {
            if !VALID_REQUEST_VALUES.contains(&s.as_str()) {
                errors.push(AnnotationError::InvalidValue {
                    path: path.to_string(),
                    value: s.clone(),
                });
            }
        }
        // Object form: "ucp_request": { "create": "omit", "update": "required" }
        Value::Object(map) => {
            for (op, op_value) in map {
                let op_path = format!("{}.{}", path, op);
                if OperationContext::parse_write(op).is_none() {
                    errors.push(AnnotationError::UnknownOperation {
                        path: op_path,
                        operation: op.clone(),
                    });
                } else if !op_value
                    .as_str()
                    .map(|s| VALID_REQUEST_VALUES.contains(&s))
                    .unwrap_or(false)
                {
                    errors.push(AnnotationError::InvalidValue {
                        path: op_path,
                        value: display_value(op_value),
                    });
                }
            }
        }
        other => errors.push(AnnotationError::InvalidRequestType {
            path: path.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn check_response(value: &Value, path: &str, errors: &mut Vec<AnnotationError>) {
    let valid = value
        .as_str()
        .map(|s| VALID_RESPONSE_VALUES.contains(&s))
        .unwrap_or(false);
    if !valid {
        errors.push(AnnotationError::InvalidValue {
            path: path.to_string(),
            value: display_value(value),
        });
    }
}

/// Strings print bare, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
