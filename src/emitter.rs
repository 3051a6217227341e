//! Variant emission - turns one source schema into its output artifacts.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GenerateError;
use crate::loader::{load_document, split_ref, write_document};
use crate::registry::AnnotationRegistry;
use crate::rewriter::variant_path;
use crate::transform::Transformer;
use crate::types::{OperationContext, VariantKind};
use crate::validator::validate_annotations;

/// One generated document, not yet written.
#[derive(Debug, Clone)]
pub struct Variant {
    /// Output path relative to the output root.
    pub path: PathBuf,
    pub kind: VariantKind,
    pub document: Value,
}

/// Plan every variant of a validated source document.
///
/// Registered files yield either one shared request or one request per
/// write operation, plus one response. Unregistered files yield a single
/// pass-through copy whose `$ref`s into registered files are rewritten.
///
/// `source_path` is the absolute path of the document; `rel_path` is its
/// path relative to the source root (and therefore to the output root).
pub fn plan_variants(
    document: &Value,
    source_path: &Path,
    rel_path: &Path,
    registry: &AnnotationRegistry,
) -> Vec<Variant> {
    let kinds: Vec<VariantKind> = match registry.shared_request(source_path) {
        Some(true) => vec![VariantKind::SharedRequest, VariantKind::Response],
        Some(false) => OperationContext::WRITE
            .iter()
            .map(|op| VariantKind::Request(*op))
            .chain(std::iter::once(VariantKind::Response))
            .collect(),
        None => vec![VariantKind::PassThrough],
    };

    let file_name = rel_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    kinds
        .into_iter()
        .map(|kind| {
            let transformer = Transformer::new(registry, source_path, kind.context())
                .title_suffix(kind.title_suffix());
            let mut document = transformer.transform(document);
            if kind != VariantKind::PassThrough {
                rewrite_id(&mut document, kind);
            }
            Variant {
                path: rel_path.with_file_name(kind.file_name(&file_name)),
                kind,
                document,
            }
        })
        .collect()
}

/// Point a top-level `$id` at the variant's file name.
fn rewrite_id(document: &mut Value, kind: VariantKind) {
    if let Some(Value::String(id)) = document.get_mut("$id") {
        let (file_part, fragment) = split_ref(id);
        if file_part.ends_with(".json") {
            let rewritten = format!("{}{}", variant_path(file_part, kind), fragment);
            *id = rewritten;
        }
    }
}

/// Load, validate, transform and write one schema file.
///
/// Returns the output paths (relative to `output_root`) that were written
/// together with any errors. A file failing to load or validate writes
/// nothing. A write error stops the file; variants written before it stay
/// on disk and are listed.
pub fn emit_file(
    source_path: &Path,
    rel_path: &Path,
    output_root: &Path,
    registry: &AnnotationRegistry,
) -> (Vec<PathBuf>, Vec<GenerateError>) {
    let document = match load_document(source_path) {
        Ok(document) => document,
        Err(e) => return (Vec::new(), vec![e]),
    };

    let errors = validate_annotations(&document);
    if !errors.is_empty() {
        warn!(
            "{}: {} annotation error(s), skipping",
            rel_path.display(),
            errors.len()
        );
        let errors = errors
            .into_iter()
            .map(|error| GenerateError::Annotation {
                file: rel_path.to_path_buf(),
                error,
            })
            .collect();
        return (Vec::new(), errors);
    }

    let mut generated = Vec::new();
    for variant in plan_variants(&document, source_path, rel_path, registry) {
        if let Err(e) = write_document(&variant.document, &output_root.join(&variant.path)) {
            warn!("{}: stopped after {} variant(s)", rel_path.display(), generated.len());
            return (generated, vec![e]);
        }
        debug!("wrote {}", variant.path.display());
        generated.push(variant.path);
    }
    (generated, Vec::new())
}
