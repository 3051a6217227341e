//! Annotation registry - which source files carry UCP annotations.
//!
//! Built in one pass over the whole source tree before any file is
//! transformed, then shared read-only with every later pass. That ordering
//! lets a schema reference files that haven't been visited yet.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::GenerateError;
use crate::loader::{collect_schema_files, load_document, normalize_path, to_posix};
use crate::types::{is_annotation, SHARED_REQUEST_ANNOTATION};

/// Registered schema paths mapped to their shared-request flag.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRegistry {
    root: PathBuf,
    schemas: BTreeMap<PathBuf, bool>,
}

impl AnnotationRegistry {
    /// Scan `root` and register every document containing an annotation.
    ///
    /// Unreadable or unparseable files are skipped here; the emission pass
    /// reports them.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::SourceNotFound` if `root` isn't a directory.
    pub fn build(root: &Path) -> Result<Self, GenerateError> {
        let root = std::fs::canonicalize(root)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| GenerateError::SourceNotFound {
                path: root.to_path_buf(),
            })?;

        let mut schemas = BTreeMap::new();
        for file in collect_schema_files(&root) {
            let document = match load_document(&file) {
                Ok(document) => document,
                Err(e) => {
                    debug!("registry skipping {}: {}", file.display(), e);
                    continue;
                }
            };
            if has_annotations(&document) {
                schemas.insert(normalize_path(&file), is_shared_request(&document));
            }
        }

        info!("found {} annotated schema(s)", schemas.len());
        Ok(Self { root, schemas })
    }

    /// Build a registry from known entries. Paths are absolute.
    pub fn from_entries(
        root: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = (PathBuf, bool)>,
    ) -> Self {
        Self {
            root: root.into(),
            schemas: entries
                .into_iter()
                .map(|(path, shared)| (normalize_path(&path), shared))
                .collect(),
        }
    }

    /// Canonical source root the registry was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.schemas.contains_key(path)
    }

    /// Shared-request flag of a registered schema, `None` if unregistered.
    pub fn shared_request(&self, path: &Path) -> Option<bool> {
        self.schemas.get(path).copied()
    }

    /// Registered paths with their flag, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, bool)> {
        self.schemas.iter().map(|(p, s)| (p.as_path(), *s))
    }

    /// Find the registered schema a reference points at by path suffix.
    ///
    /// Aggregate documents may reference schemas through URLs or from a
    /// different base directory, so the reference's file part is matched
    /// against each schema's path relative to the root. The match must end
    /// on a path boundary; the longest match wins.
    pub fn match_suffix(&self, file_part: &str) -> Option<(&Path, bool)> {
        self.iter()
            .filter_map(|(path, shared)| {
                let suffix = to_posix(path.strip_prefix(&self.root).ok()?);
                let matched = file_part == suffix
                    || file_part
                        .strip_suffix(suffix.as_str())
                        .map(|head| head.ends_with('/'))
                        .unwrap_or(false);
                matched.then_some((path, shared, suffix.len()))
            })
            .max_by_key(|(_, _, len)| *len)
            .map(|(path, shared, _)| (path, shared))
    }

    /// Registered schemas under `namespace` (relative to the root), as
    /// forward-slash paths relative to the namespace directory.
    pub fn namespace(&self, namespace: &Path) -> BTreeSet<String> {
        let base = normalize_path(&self.root.join(namespace));
        self.schemas
            .keys()
            .filter_map(|path| path.strip_prefix(&base).ok())
            .map(to_posix)
            .collect()
    }
}

/// Check if a document contains any UCP annotation, at any depth.
pub fn has_annotations(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.keys().any(|k| is_annotation(k)) || map.values().any(has_annotations)
        }
        Value::Array(arr) => arr.iter().any(has_annotations),
        _ => false,
    }
}

/// Top-level shared-request flag; anything but `true` counts as false.
pub fn is_shared_request(document: &Value) -> bool {
    document
        .get(SHARED_REQUEST_ANNOTATION)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn detects_nested_annotations() {
        let doc = json!({
            "$defs": {
                "item": {
                    "allOf": [
                        { "properties": { "id": { "ucp_response": "omit" } } }
                    ]
                }
            }
        });
        assert!(has_annotations(&doc));
        assert!(!has_annotations(&json!({ "properties": { "id": {} } })));
    }

    #[test]
    fn shared_request_flag_defaults_false() {
        assert!(is_shared_request(&json!({ "ucp_shared_request": true })));
        assert!(!is_shared_request(&json!({ "ucp_shared_request": "yes" })));
        assert!(!is_shared_request(&json!({ "type": "object" })));
    }

    #[test]
    fn build_registers_only_annotated_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("types")).unwrap();
        std::fs::write(
            dir.path().join("checkout.json"),
            r#"{"ucp_shared_request": true, "properties": {"id": {"$ref": "types/item.json"}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("types/item.json"),
            r#"{"properties": {"id": {"ucp_request": "omit"}}}"#,
        )
        .unwrap();
        // References an annotated file but has none itself
        std::fs::write(
            dir.path().join("order.json"),
            r#"{"properties": {"item": {"$ref": "types/item.json"}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

        let registry = AnnotationRegistry::build(dir.path()).unwrap();
        let root = registry.root().to_path_buf();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.shared_request(&root.join("checkout.json")), Some(true));
        assert_eq!(
            registry.shared_request(&root.join("types/item.json")),
            Some(false)
        );
        assert!(!registry.contains(&root.join("order.json")));
    }

    #[test]
    fn build_fails_on_missing_root() {
        let dir = tempdir().unwrap();
        let err = AnnotationRegistry::build(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GenerateError::SourceNotFound { .. }));
    }

    #[test]
    fn suffix_match_respects_boundaries() {
        let registry = AnnotationRegistry::from_entries(
            "/src",
            [
                (PathBuf::from("/src/schemas/shopping/checkout.json"), true),
                (PathBuf::from("/src/checkout.json"), false),
            ],
        );

        let (path, shared) = registry
            .match_suffix("https://ucp.dev/schemas/shopping/checkout.json")
            .unwrap();
        assert_eq!(path, Path::new("/src/schemas/shopping/checkout.json"));
        assert!(shared);

        let (path, _) = registry.match_suffix("../../checkout.json").unwrap();
        assert_eq!(path, Path::new("/src/checkout.json"));

        assert!(registry.match_suffix("my_checkout.json").is_none());
    }

    #[test]
    fn namespace_lists_relative_paths() {
        let registry = AnnotationRegistry::from_entries(
            "/src",
            [
                (PathBuf::from("/src/schemas/shopping/checkout.json"), true),
                (PathBuf::from("/src/schemas/shopping/types/item.json"), false),
                (PathBuf::from("/src/schemas/common/money.json"), false),
            ],
        );
        let names: Vec<_> = registry
            .namespace(Path::new("schemas/shopping"))
            .into_iter()
            .collect();
        assert_eq!(names, vec!["checkout.json", "types/item.json"]);
    }
}
