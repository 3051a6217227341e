//! RPC catalog linking - points OpenRPC method schemas at variants.

use serde_json::Value;
use tracing::debug;

use crate::classify::MethodClassifier;
use crate::loader::split_ref;
use crate::registry::AnnotationRegistry;
use crate::rewriter::variant_path;
use crate::types::{OperationContext, VariantKind};

/// Link an OpenRPC document in place. Returns the number of methods visited.
///
/// Param schemas are rewritten with the method's inferred write operation
/// (read methods use the response variant); result schemas always use the
/// response variant. References are matched to registered schemas by path
/// suffix since the catalog may use URLs or another base directory.
pub fn link_method_catalog(
    spec: &mut Value,
    registry: &AnnotationRegistry,
    classifier: &MethodClassifier,
) -> usize {
    let Some(Value::Array(methods)) = spec.get_mut("methods") else {
        return 0;
    };

    for method in methods.iter_mut() {
        let name = method
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let param_context = classifier
            .classify(&name)
            .request_context()
            .unwrap_or(OperationContext::Response);
        debug!("method {} params use {}", name, param_context.as_str());

        if let Some(Value::Array(params)) = method.get_mut("params") {
            for param in params.iter_mut() {
                if let Some(schema) = param.get_mut("schema") {
                    rewrite_schema_refs(schema, registry, param_context);
                }
            }
        }
        if let Some(schema) = method.pointer_mut("/result/schema") {
            rewrite_schema_refs(schema, registry, OperationContext::Response);
        }
    }

    methods.len()
}

fn rewrite_schema_refs(node: &mut Value, registry: &AnnotationRegistry, context: OperationContext) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if let Some(rewritten) = rewrite_by_suffix(reference, registry, context) {
                    *reference = rewritten;
                }
            }
            for (key, child) in map.iter_mut() {
                if key != "$ref" {
                    rewrite_schema_refs(child, registry, context);
                }
            }
        }
        Value::Array(arr) => {
            for child in arr {
                rewrite_schema_refs(child, registry, context);
            }
        }
        _ => {}
    }
}

fn rewrite_by_suffix(
    reference: &str,
    registry: &AnnotationRegistry,
    context: OperationContext,
) -> Option<String> {
    let (file_part, fragment) = split_ref(reference);
    if file_part.is_empty() {
        return None;
    }
    let (_, shared) = registry.match_suffix(file_part)?;
    let kind = VariantKind::for_context(context, shared);
    Some(format!("{}{}", variant_path(file_part, kind), fragment))
}
