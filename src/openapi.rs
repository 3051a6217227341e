//! REST catalog linking - splits OpenAPI schema components into variants.
//!
//! Every `components.schemas` entry whose `$ref` points at a registered
//! schema is replaced by `_response` plus either `_request` (shared) or
//! `_create_request` / `_update_request` / `_complete_request` components.
//! Operations are then rewired: request bodies by the operation's kind,
//! responses always to the response component.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::classify::OperationClassifier;
use crate::loader::split_ref;
use crate::registry::AnnotationRegistry;
use crate::rewriter::variant_path;
use crate::types::{OperationContext, VariantKind};

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Path item keys that aren't operations.
const NON_OPERATION_KEYS: &[&str] = &["parameters", "summary", "description", "servers", "$ref"];

/// Replacement component refs for one original component.
#[derive(Debug, Clone, Default)]
struct Replacement {
    response: String,
    create: String,
    update: String,
    complete: String,
}

impl Replacement {
    fn for_context(&self, context: OperationContext) -> &str {
        match context {
            OperationContext::Create => &self.create,
            OperationContext::Update => &self.update,
            OperationContext::Complete => &self.complete,
            OperationContext::Response => &self.response,
        }
    }
}

/// Link an OpenAPI document in place.
///
/// Returns the number of components that were split. Documents without
/// `components.schemas` are left untouched.
pub fn link_operation_catalog(
    spec: &mut Value,
    registry: &AnnotationRegistry,
    classifier: &OperationClassifier,
) -> usize {
    let Some(Value::Object(schemas)) = spec.pointer_mut("/components/schemas") else {
        return 0;
    };

    let (split, rewrites) = split_components(schemas, registry);
    *schemas = split;
    debug!("split {} schema component(s)", rewrites.len());

    for root_key in ["paths", "webhooks"] {
        let Some(Value::Object(items)) = spec.get_mut(root_key) else {
            continue;
        };
        for (path, item) in items.iter_mut() {
            let Value::Object(operations) = item else {
                continue;
            };
            for (method, operation) in operations.iter_mut() {
                if NON_OPERATION_KEYS.contains(&method.as_str()) {
                    continue;
                }
                let operation_id = operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let kind = classifier.classify(method, path, operation_id.as_deref());

                if let (Some(context), Some(body)) =
                    (kind.request_context(), operation.get_mut("requestBody"))
                {
                    rewrite_component_refs(body, &rewrites, context);
                }
                if let Some(responses) = operation.get_mut("responses") {
                    rewrite_component_refs(responses, &rewrites, OperationContext::Response);
                }
            }
        }
    }

    rewrites.len()
}

/// Build the new component map, with split components in place of the
/// originals, and the old-ref to replacement map.
fn split_components(
    schemas: &Map<String, Value>,
    registry: &AnnotationRegistry,
) -> (Map<String, Value>, HashMap<String, Replacement>) {
    let mut result = Map::new();
    let mut rewrites = HashMap::new();

    for (name, schema) in schemas {
        let reference = schema.get("$ref").and_then(Value::as_str).unwrap_or("");
        let (file_part, fragment) = split_ref(reference);
        let matched = if file_part.is_empty() {
            None
        } else {
            registry.match_suffix(file_part)
        };
        let Some((_, shared)) = matched else {
            result.insert(name.clone(), schema.clone());
            continue;
        };

        let target = |kind: VariantKind| {
            let mut component = Map::new();
            component.insert(
                "$ref".to_string(),
                Value::String(format!("{}{}", variant_path(file_part, kind), fragment)),
            );
            Value::Object(component)
        };

        let mut replacement = Replacement::default();
        if shared {
            let request = format!("{}_request", name);
            result.insert(request.clone(), target(VariantKind::SharedRequest));
            let pointer = format!("{}{}", COMPONENT_PREFIX, request);
            replacement.create = pointer.clone();
            replacement.update = pointer.clone();
            replacement.complete = pointer;
        } else {
            for op in OperationContext::WRITE {
                let component = format!("{}_{}_request", name, op.as_str());
                result.insert(component.clone(), target(VariantKind::Request(op)));
                let pointer = format!("{}{}", COMPONENT_PREFIX, component);
                match op {
                    OperationContext::Create => replacement.create = pointer,
                    OperationContext::Update => replacement.update = pointer,
                    _ => replacement.complete = pointer,
                }
            }
        }
        let response = format!("{}_response", name);
        result.insert(response.clone(), target(VariantKind::Response));
        replacement.response = format!("{}{}", COMPONENT_PREFIX, response);

        rewrites.insert(format!("{}{}", COMPONENT_PREFIX, name), replacement);
    }

    (result, rewrites)
}

fn rewrite_component_refs(
    node: &mut Value,
    rewrites: &HashMap<String, Replacement>,
    context: OperationContext,
) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if let Some(replacement) = rewrites.get(reference.as_str()) {
                    *reference = replacement.for_context(context).to_string();
                }
            }
            for child in map.values_mut() {
                rewrite_component_refs(child, rewrites, context);
            }
        }
        Value::Array(arr) => {
            for child in arr {
                rewrite_component_refs(child, rewrites, context);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn registry() -> AnnotationRegistry {
        AnnotationRegistry::from_entries(
            "/src",
            [
                (PathBuf::from("/src/schemas/shopping/checkout.json"), false),
                (PathBuf::from("/src/schemas/shopping/order.json"), true),
            ],
        )
    }

    fn spec() -> Value {
        json!({
            "openapi": "3.1.0",
            "paths": {
                "/checkout-sessions": {
                    "post": {
                        "operationId": "create_checkout",
                        "requestBody": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } },
                        "responses": { "201": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } } }
                    }
                },
                "/checkout-sessions/{id}": {
                    "parameters": [{ "name": "id", "in": "path" }],
                    "put": {
                        "requestBody": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } },
                        "responses": { "200": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } } }
                    },
                    "get": {
                        "responses": { "200": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } } }
                    }
                },
                "/checkout-sessions/{id}/complete": {
                    "post": {
                        "requestBody": { "content": { "application/json": {
                            "schema": { "allOf": [{ "$ref": "#/components/schemas/checkout" }] } } } },
                        "responses": { "200": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/order" } } } } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "checkout": { "$ref": "https://ucp.dev/schemas/shopping/checkout.json" },
                    "error": { "$ref": "https://ucp.dev/schemas/shopping/error.json" },
                    "order": { "$ref": "../../schemas/shopping/order.json" }
                }
            }
        })
    }

    #[test]
    fn splits_components_in_place() {
        let mut spec = spec();
        let split = link_operation_catalog(&mut spec, &registry(), &OperationClassifier::default());
        assert_eq!(split, 2);

        let schemas = spec["components"]["schemas"].as_object().unwrap();
        let names: Vec<_> = schemas.keys().cloned().collect();
        assert_eq!(
            names,
            vec![
                "checkout_create_request",
                "checkout_update_request",
                "checkout_complete_request",
                "checkout_response",
                "error",
                "order_request",
                "order_response",
            ]
        );
        assert_eq!(
            schemas["checkout_update_request"]["$ref"],
            "https://ucp.dev/schemas/shopping/checkout.update_req.json"
        );
        assert_eq!(
            schemas["order_request"]["$ref"],
            "../../schemas/shopping/order_req.json"
        );
        assert_eq!(
            schemas["order_response"]["$ref"],
            "../../schemas/shopping/order_resp.json"
        );
    }

    #[test]
    fn rewires_operations_by_kind() {
        let mut spec = spec();
        link_operation_catalog(&mut spec, &registry(), &OperationClassifier::default());
        let body = |path: &str, method: &str| {
            spec["paths"][path][method]["requestBody"]["content"]["application/json"]["schema"]
                .clone()
        };
        let ok = |path: &str, method: &str, code: &str| {
            spec["paths"][path][method]["responses"][code]["content"]["application/json"]
                ["schema"]["$ref"]
                .clone()
        };

        assert_eq!(
            body("/checkout-sessions", "post")["$ref"],
            "#/components/schemas/checkout_create_request"
        );
        assert_eq!(
            ok("/checkout-sessions", "post", "201"),
            "#/components/schemas/checkout_response"
        );
        assert_eq!(
            body("/checkout-sessions/{id}", "put")["$ref"],
            "#/components/schemas/checkout_update_request"
        );
        assert_eq!(
            ok("/checkout-sessions/{id}", "get", "200"),
            "#/components/schemas/checkout_response"
        );
        assert_eq!(
            body("/checkout-sessions/{id}/complete", "post")["allOf"][0]["$ref"],
            "#/components/schemas/checkout_complete_request"
        );
        assert_eq!(
            ok("/checkout-sessions/{id}/complete", "post", "200"),
            "#/components/schemas/order_response"
        );
    }

    #[test]
    fn read_operations_keep_request_bodies() {
        let mut spec = json!({
            "paths": {
                "/checkout-sessions/{id}": {
                    "delete": {
                        "requestBody": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } },
                        "responses": { "200": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/checkout" } } } } }
                    }
                }
            },
            "webhooks": {
                "order_updated": {
                    "post": {
                        "requestBody": { "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/order" } } } },
                        "responses": { "200": { "description": "ack" } }
                    }
                }
            },
            "components": { "schemas": {
                "checkout": { "$ref": "https://ucp.dev/schemas/shopping/checkout.json" },
                "order": { "$ref": "../../schemas/shopping/order.json" }
            } }
        });
        link_operation_catalog(&mut spec, &registry(), &OperationClassifier::default());

        let delete = &spec["paths"]["/checkout-sessions/{id}"]["delete"];
        assert_eq!(
            delete["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/checkout"
        );
        assert_eq!(
            delete["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/checkout_response"
        );

        let webhook = &spec["webhooks"]["order_updated"]["post"];
        assert_eq!(
            webhook["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/order_request"
        );
        assert_eq!(webhook["responses"]["200"], json!({ "description": "ack" }));
    }

    #[test]
    fn unmatched_components_are_kept() {
        let mut spec = spec();
        link_operation_catalog(&mut spec, &AnnotationRegistry::default(), &OperationClassifier::default());
        assert_eq!(spec, self::spec());
    }

    #[test]
    fn document_without_components_is_untouched() {
        let mut spec = json!({ "openapi": "3.1.0", "paths": {} });
        let split = link_operation_catalog(&mut spec, &registry(), &OperationClassifier::default());
        assert_eq!(split, 0);
        assert_eq!(spec, json!({ "openapi": "3.1.0", "paths": {} }));
    }
}
