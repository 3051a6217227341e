//! Schema transformation - specializes an annotated schema for one operation.
//!
//! For a single (document, operation) pair this:
//! - filters fields by their `ucp_request` / `ucp_response` visibility
//! - recomputes each `required` array
//! - rewrites `$ref`s into registered files to the matching variant
//! - strips `ucp_*` annotations
//! - appends a suffix to every `title` so variants don't collide by name

use std::path::Path;

use serde_json::{Map, Value};

use crate::registry::AnnotationRegistry;
use crate::rewriter::rewrite_ref;
use crate::types::{
    is_annotation, OperationContext, Visibility, REQUEST_ANNOTATION, RESPONSE_ANNOTATION,
};

/// Transforms documents read from one source file.
#[derive(Debug, Clone)]
pub struct Transformer<'a> {
    registry: &'a AnnotationRegistry,
    current_file: &'a Path,
    context: OperationContext,
    title_suffix: String,
}

impl<'a> Transformer<'a> {
    /// Create a transformer for `current_file` with no title suffix.
    ///
    /// `current_file` is the absolute path relative `$ref`s resolve against.
    pub fn new(
        registry: &'a AnnotationRegistry,
        current_file: &'a Path,
        context: OperationContext,
    ) -> Self {
        Self {
            registry,
            current_file,
            context,
            title_suffix: String::new(),
        }
    }

    /// Set the suffix appended to titles (e.g. " Create Request").
    pub fn title_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.title_suffix = suffix.into();
        self
    }

    /// Transform a whole document.
    pub fn transform(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) if map.contains_key("$ref") => self.transform_ref_node(map),
            Value::Object(map) => match map.get("properties") {
                Some(Value::Object(props)) => self.transform_properties_node(map, props),
                _ => self.transform_plain_node(map),
            },
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.transform(v)).collect()),
            // Primitives pass through unchanged
            other => other.clone(),
        }
    }

    /// `$ref` nodes: rewrite the target, transform siblings. No title suffix.
    fn transform_ref_node(&self, map: &Map<String, Value>) -> Value {
        let mut result = Map::new();
        for (key, value) in map {
            if is_annotation(key) {
                continue;
            }
            let transformed = match (key.as_str(), value) {
                ("$ref", Value::String(reference)) => Value::String(rewrite_ref(
                    reference,
                    self.current_file,
                    self.registry,
                    self.context,
                )),
                _ => self.transform(value),
            };
            result.insert(key.clone(), transformed);
        }
        Value::Object(result)
    }

    fn transform_plain_node(&self, map: &Map<String, Value>) -> Value {
        let mut result = Map::new();
        for (key, value) in map {
            if !is_annotation(key) {
                result.insert(key.clone(), self.transform(value));
            }
        }
        self.suffix_title(&mut result);
        Value::Object(result)
    }

    fn transform_properties_node(
        &self,
        map: &Map<String, Value>,
        props: &Map<String, Value>,
    ) -> Value {
        let base_required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut new_props = Map::new();
        let mut new_required: Vec<Value> = Vec::new();

        for (name, field) in props {
            let visibility = visibility(field, self.context);
            if visibility == Visibility::Omit {
                continue;
            }

            new_props.insert(name.clone(), self.transform(field));

            let required = match visibility {
                Visibility::Required => true,
                Visibility::Optional => false,
                _ => base_required.contains(&name.as_str()),
            };
            if required {
                new_required.push(Value::String(name.clone()));
            }
        }

        let mut result = Map::new();
        let mut new_props = Some(new_props);
        let mut new_required = Some(new_required);
        for (key, value) in map {
            if is_annotation(key) {
                continue;
            }
            match key.as_str() {
                "properties" => {
                    if let Some(props) = new_props.take() {
                        result.insert(key.clone(), Value::Object(props));
                    }
                }
                "required" => {
                    if let Some(required) = new_required.take().filter(|r| !r.is_empty()) {
                        result.insert(key.clone(), Value::Array(required));
                    }
                }
                _ => {
                    result.insert(key.clone(), self.transform(value));
                }
            }
        }

        // Fields marked required in a schema without a base required array
        if let Some(required) = new_required.filter(|r| !r.is_empty()) {
            result.insert("required".to_string(), Value::Array(required));
        }

        self.suffix_title(&mut result);
        Value::Object(result)
    }

    fn suffix_title(&self, result: &mut Map<String, Value>) {
        if self.title_suffix.is_empty() {
            return;
        }
        if let Some(Value::String(title)) = result.get_mut("title") {
            title.push_str(&self.title_suffix);
        }
    }
}

/// Visibility of one field under one operation context.
///
/// Requests read `ucp_request` (shorthand or per-operation map, missing
/// operations default to include). Responses only honour
/// `ucp_response: "omit"`. Values that fail validation never reach here,
/// so anything unrecognized resolves to include.
pub fn visibility(field: &Value, context: OperationContext) -> Visibility {
    if !context.is_request() {
        return match field.get(RESPONSE_ANNOTATION).and_then(Value::as_str) {
            Some("omit") => Visibility::Omit,
            _ => Visibility::Include,
        };
    }

    let annotation = match field.get(REQUEST_ANNOTATION) {
        Some(Value::Object(per_op)) => per_op.get(context.as_str()),
        other => other,
    };
    annotation
        .and_then(Value::as_str)
        .and_then(Visibility::parse)
        .unwrap_or_default()
}
