//! Cross-file `$ref` rewriting to operation-specific variants.

use std::path::Path;

use crate::loader::{is_url, normalize_path, split_ref};
use crate::registry::AnnotationRegistry;
use crate::types::{OperationContext, VariantKind};

/// Rewrite a `$ref` found in `current_file` to the variant for `context`.
///
/// The file part is resolved against the directory of `current_file`. If
/// the target isn't registered (or the reference is internal or a URL),
/// the reference is returned unchanged. The fragment is preserved.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use ucp_schema_gen::{rewrite_ref, AnnotationRegistry, OperationContext};
///
/// let registry = AnnotationRegistry::from_entries(
///     "/src",
///     [(PathBuf::from("/src/types/line_item.json"), false)],
/// );
/// let current = Path::new("/src/checkout.json");
///
/// assert_eq!(
///     rewrite_ref("types/line_item.json", current, &registry, OperationContext::Create),
///     "types/line_item.create_req.json"
/// );
/// assert_eq!(
///     rewrite_ref("types/line_item.json", current, &registry, OperationContext::Response),
///     "types/line_item_resp.json"
/// );
/// ```
pub fn rewrite_ref(
    reference: &str,
    current_file: &Path,
    registry: &AnnotationRegistry,
    context: OperationContext,
) -> String {
    if reference.starts_with('#') || is_url(reference) {
        return reference.to_string();
    }

    let (file_part, fragment) = split_ref(reference);
    if file_part.is_empty() {
        return reference.to_string();
    }

    let base_dir = current_file.parent().unwrap_or(Path::new(""));
    let target = normalize_path(&base_dir.join(file_part));
    let Some(shared) = registry.shared_request(&target) else {
        return reference.to_string();
    };

    let kind = VariantKind::for_context(context, shared);
    format!("{}{}", variant_path(file_part, kind), fragment)
}

/// Apply the variant naming convention to the last segment of a path or URL.
///
/// `types/line_item.json` with a response kind gives `types/line_item_resp.json`.
pub fn variant_path(file_part: &str, kind: VariantKind) -> String {
    match file_part.rfind('/') {
        Some(idx) => format!(
            "{}{}",
            &file_part[..=idx],
            kind.file_name(&file_part[idx + 1..])
        ),
        None => kind.file_name(file_part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry() -> AnnotationRegistry {
        AnnotationRegistry::from_entries(
            "/src",
            [
                (PathBuf::from("/src/schemas/types/line_item.json"), false),
                (PathBuf::from("/src/schemas/checkout.json"), true),
            ],
        )
    }

    const CURRENT: &str = "/src/schemas/order.json";

    #[test]
    fn rewrites_per_operation() {
        let registry = registry();
        let current = Path::new(CURRENT);
        for (op, expected) in [
            (OperationContext::Create, "types/line_item.create_req.json"),
            (OperationContext::Update, "types/line_item.update_req.json"),
            (OperationContext::Complete, "types/line_item.complete_req.json"),
            (OperationContext::Response, "types/line_item_resp.json"),
        ] {
            assert_eq!(
                rewrite_ref("types/line_item.json", current, &registry, op),
                expected
            );
        }
    }

    #[test]
    fn shared_request_uses_single_request_file() {
        let registry = registry();
        let current = Path::new("/src/schemas/types/line_item.json");
        assert_eq!(
            rewrite_ref("../checkout.json", current, &registry, OperationContext::Update),
            "../checkout_req.json"
        );
        assert_eq!(
            rewrite_ref("../checkout.json", current, &registry, OperationContext::Response),
            "../checkout_resp.json"
        );
    }

    #[test]
    fn preserves_fragment() {
        let registry = registry();
        assert_eq!(
            rewrite_ref(
                "types/line_item.json#/$defs/total",
                Path::new(CURRENT),
                &registry,
                OperationContext::Create
            ),
            "types/line_item.create_req.json#/$defs/total"
        );
    }

    #[test]
    fn leaves_unregistered_and_internal_refs() {
        let registry = registry();
        let current = Path::new(CURRENT);
        for reference in [
            "#/$defs/total",
            "types/money.json",
            "https://ucp.dev/schemas/types/line_item.json",
            "line_item.json",
        ] {
            assert_eq!(
                rewrite_ref(reference, current, &registry, OperationContext::Create),
                reference
            );
        }
    }

    #[test]
    fn variant_path_keeps_url_prefix() {
        assert_eq!(
            variant_path("https://ucp.dev/schemas/checkout.json", VariantKind::Response),
            "https://ucp.dev/schemas/checkout_resp.json"
        );
        assert_eq!(
            variant_path("checkout.json", VariantKind::SharedRequest),
            "checkout_req.json"
        );
    }
}
