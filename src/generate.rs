//! Generation run - drives every pass over a source tree.
//!
//! 1. Build the annotation registry from the whole tree.
//! 2. Reset the output tree.
//! 3. Emit variants for each schema, linking service catalogs as they
//!    are encountered.
//! 4. Aggregate embedded methods into one catalog.
//!
//! Errors from individual files are collected, never fatal: output that
//! succeeded stays on disk even when the run fails.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::{MethodClassifier, OperationClassifier};
use crate::embedded::{aggregate_methods, EmbeddedOptions};
use crate::emitter::emit_file;
use crate::error::GenerateError;
use crate::loader::{collect_schema_files, load_document, write_document};
use crate::openapi::link_operation_catalog;
use crate::openrpc::link_method_catalog;
use crate::registry::AnnotationRegistry;
use crate::validator::validate_annotations;

/// Service catalogs live under this directory of the source root.
const SERVICES_DIR: &str = "services";

/// REST catalog source name and its linked output name.
const OPENAPI_SOURCE: &str = "openapi.json";
const OPENAPI_OUTPUT: &str = "rest.openapi.json";

/// RPC catalog source name and its linked output name.
const OPENRPC_SOURCE: &str = "openrpc.json";
const OPENRPC_OUTPUT: &str = "mcp.openrpc.json";

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Embedded method aggregation; `None` skips it.
    pub embedded: Option<EmbeddedOptions>,
    pub operation_classifier: OperationClassifier,
    pub method_classifier: MethodClassifier,
}

impl GenerateOptions {
    /// Options with default catalog rules and embedded aggregation enabled.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            embedded: Some(EmbeddedOptions::default()),
            operation_classifier: OperationClassifier::default(),
            method_classifier: MethodClassifier::default(),
        }
    }

    pub fn embedded(mut self, embedded: Option<EmbeddedOptions>) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn operation_classifier(mut self, classifier: OperationClassifier) -> Self {
        self.operation_classifier = classifier;
        self
    }

    pub fn method_classifier(mut self, classifier: MethodClassifier) -> Self {
        self.method_classifier = classifier;
        self
    }
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Written files, relative to the output root, in emission order.
    pub generated: Vec<PathBuf>,
    pub errors: Vec<GenerateError>,
}

impl GenerateReport {
    /// Returns true if no errors were collected.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// 0 on success, otherwise the highest exit code among the errors.
    pub fn exit_code(&self) -> u8 {
        self.errors
            .iter()
            .map(GenerateError::exit_code)
            .max()
            .unwrap_or(0)
    }
}

/// How one source file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRole {
    OperationCatalog,
    MethodCatalog,
    EmbeddedPrimary,
    Schema,
}

fn file_role(rel_path: &Path, options: &GenerateOptions) -> FileRole {
    let in_services = rel_path.starts_with(SERVICES_DIR);
    let file_name = rel_path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if options
        .embedded
        .as_ref()
        .map(|e| e.primary == rel_path)
        .unwrap_or(false)
    {
        FileRole::EmbeddedPrimary
    } else if in_services && file_name == OPENAPI_SOURCE {
        FileRole::OperationCatalog
    } else if in_services && file_name == OPENRPC_SOURCE {
        FileRole::MethodCatalog
    } else {
        FileRole::Schema
    }
}

/// Run generation from `options.source` into `options.output`.
///
/// # Errors
///
/// Fails fast only when the source root is missing or the output root
/// can't be reset; everything else lands in the report.
pub fn generate(options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let registry = AnnotationRegistry::build(&options.source)?;
    let source_root = registry.root().to_path_buf();
    reset_output(&options.output, &source_root)?;

    let mut report = GenerateReport::default();
    for source_path in collect_schema_files(&source_root) {
        let Ok(rel_path) = source_path.strip_prefix(&source_root) else {
            continue;
        };
        let rel_path = rel_path.to_path_buf();

        match file_role(&rel_path, options) {
            FileRole::EmbeddedPrimary => {
                debug!("{} is aggregated later", rel_path.display());
            }
            FileRole::OperationCatalog => {
                let dest = rel_path.with_file_name(OPENAPI_OUTPUT);
                let result = link_catalog(&source_path, &options.output.join(&dest), |spec| {
                    let split =
                        link_operation_catalog(spec, &registry, &options.operation_classifier);
                    info!("{}: split {} component(s)", rel_path.display(), split);
                });
                record(&mut report, result.map(|()| vec![dest]));
            }
            FileRole::MethodCatalog => {
                let dest = rel_path.with_file_name(OPENRPC_OUTPUT);
                let result = link_catalog(&source_path, &options.output.join(&dest), |spec| {
                    let methods = link_method_catalog(spec, &registry, &options.method_classifier);
                    info!("{}: linked {} method(s)", rel_path.display(), methods);
                });
                record(&mut report, result.map(|()| vec![dest]));
            }
            FileRole::Schema => {
                let (generated, errors) =
                    emit_file(&source_path, &rel_path, &options.output, &registry);
                report.generated.extend(generated);
                report.errors.extend(errors);
            }
        }
    }

    if let Some(embedded) = &options.embedded {
        let (catalog, errors) = aggregate_methods(&source_root, embedded, &registry);
        report.errors.extend(errors);
        let dest = options.output.join(&embedded.output);
        let written = serde_json::to_value(&catalog)
            .map_err(|source| GenerateError::SerializeError {
                path: embedded.output.clone(),
                source,
            })
            .and_then(|value| write_document(&value, &dest));
        record(&mut report, written.map(|()| vec![embedded.output.clone()]));
        info!("embedded catalog: {} method(s)", catalog.methods.len());
    }

    if report.is_ok() {
        info!("generated {} file(s)", report.generated.len());
    } else {
        warn!(
            "generated {} file(s) with {} error(s)",
            report.generated.len(),
            report.errors.len()
        );
    }
    Ok(report)
}

/// Validate every schema under `source` without writing anything.
///
/// Unreadable documents are reported the same way a generation run would.
pub fn check(source: &Path) -> Result<GenerateReport, GenerateError> {
    let registry = AnnotationRegistry::build(source)?;
    let source_root = registry.root();

    let mut report = GenerateReport::default();
    for source_path in collect_schema_files(source_root) {
        let rel_path = source_path
            .strip_prefix(source_root)
            .unwrap_or(&source_path)
            .to_path_buf();
        match load_document(&source_path) {
            Ok(document) => report.errors.extend(validate_annotations(&document).into_iter().map(
                |error| GenerateError::Annotation {
                    file: rel_path.clone(),
                    error,
                },
            )),
            Err(e) => report.errors.push(e),
        }
    }
    debug!("checked {} annotated schema(s)", registry.len());
    Ok(report)
}

fn link_catalog(
    source_path: &Path,
    dest: &Path,
    link: impl FnOnce(&mut Value),
) -> Result<(), GenerateError> {
    let mut spec = load_document(source_path)?;
    link(&mut spec);
    write_document(&spec, dest)
}

fn record(report: &mut GenerateReport, result: Result<Vec<PathBuf>, GenerateError>) {
    match result {
        Ok(paths) => report.generated.extend(paths),
        Err(e) => report.errors.push(e),
    }
}

/// Remove a previous output tree so the run starts from scratch.
fn reset_output(output: &Path, source_root: &Path) -> Result<(), GenerateError> {
    let absolute_output = match std::fs::canonicalize(output) {
        Ok(path) => path,
        // Not created yet: check the nearest existing ancestor instead
        Err(_) => nearest_existing(output),
    };
    if absolute_output.starts_with(source_root) || source_root.starts_with(&absolute_output) {
        return Err(GenerateError::OverlappingOutput {
            output: output.to_path_buf(),
            source_dir: source_root.to_path_buf(),
        });
    }

    if output.exists() {
        debug!("removing {}", output.display());
        std::fs::remove_dir_all(output).map_err(|source| GenerateError::WriteError {
            path: output.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Canonical form of `path`, resolving its deepest existing ancestor.
fn nearest_existing(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        if let Ok(existing) = std::fs::canonicalize(&current) {
            let mut resolved = existing;
            resolved.extend(missing.iter().rev());
            return resolved;
        }
        match (current.file_name().map(|n| n.to_os_string()), current.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                current = if parent.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    parent.to_path_buf()
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roles_follow_service_layout() {
        let options = GenerateOptions::new("source", "spec");
        assert_eq!(
            file_role(Path::new("services/shopping/openapi.json"), &options),
            FileRole::OperationCatalog
        );
        assert_eq!(
            file_role(Path::new("services/shopping/openrpc.json"), &options),
            FileRole::MethodCatalog
        );
        assert_eq!(
            file_role(Path::new("services/shopping/embedded.json"), &options),
            FileRole::EmbeddedPrimary
        );
        assert_eq!(
            file_role(Path::new("schemas/openapi.json"), &options),
            FileRole::Schema
        );

        let options = options.embedded(None);
        assert_eq!(
            file_role(Path::new("services/shopping/embedded.json"), &options),
            FileRole::Schema
        );
    }

    #[test]
    fn report_exit_codes() {
        let mut report = GenerateReport::default();
        assert_eq!(report.exit_code(), 0);
        report.errors.push(GenerateError::InvalidDescriptor {
            path: PathBuf::from("x.json"),
            message: "bad".into(),
        });
        assert_eq!(report.exit_code(), 2);
        report.errors.push(GenerateError::SourceNotFound {
            path: PathBuf::from("source"),
        });
        assert_eq!(report.exit_code(), 3);
    }

    #[test]
    fn refuses_output_inside_source() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        let options = GenerateOptions::new(dir.path(), dir.path().join("spec"));
        let err = generate(&options).unwrap_err();
        assert!(matches!(err, GenerateError::OverlappingOutput { .. }));
        assert!(dir.path().join("a.json").exists());
    }

    #[test]
    fn missing_source_fails_fast() {
        let dir = tempdir().unwrap();
        let options = GenerateOptions::new(dir.path().join("source"), dir.path().join("spec"));
        let err = generate(&options).unwrap_err();
        assert!(matches!(err, GenerateError::SourceNotFound { .. }));
        assert!(!dir.path().join("spec").exists());
    }
}
