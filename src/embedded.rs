//! Embedded protocol aggregation - merges method descriptors into one
//! OpenRPC catalog.
//!
//! Methods come from a primary descriptor and from `embedded` blocks in
//! the extension schemas of one namespace. Embedded methods only ever
//! reference response variants.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::GenerateError;
use crate::loader::{list_schema_files, load_document, relative_posix, to_posix};
use crate::registry::AnnotationRegistry;
use crate::types::VariantKind;

/// OpenRPC version written to the combined catalog.
pub const OPENRPC_VERSION: &str = "1.3.2";

/// Where embedded methods are read from and the catalog is written to.
///
/// All paths are relative to the source (and output) root.
#[derive(Debug, Clone)]
pub struct EmbeddedOptions {
    /// Primary descriptor; optional on disk.
    pub primary: PathBuf,
    /// Directory whose schemas may carry `embedded` blocks.
    pub namespace: PathBuf,
    /// Catalog output path.
    pub output: PathBuf,
    /// `info.version` of the catalog.
    pub version: String,
    /// File names in the namespace never read as extensions.
    pub excluded: Vec<String>,
    pub default_title: String,
    pub default_description: String,
}

impl Default for EmbeddedOptions {
    fn default() -> Self {
        Self {
            primary: PathBuf::from("services/shopping/embedded.json"),
            namespace: PathBuf::from("schemas/shopping"),
            output: PathBuf::from("services/shopping/embedded.openrpc.json"),
            version: "2026-01-11".to_string(),
            excluded: vec![
                "checkout.json".to_string(),
                "payment.json".to_string(),
                "order.json".to_string(),
            ],
            default_title: "Embedded Protocol".to_string(),
            default_description: "Embedded Protocol methods for UCP capabilities.".to_string(),
        }
    }
}

impl EmbeddedOptions {
    /// Set the catalog version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Combined catalog document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCatalog {
    pub openrpc: String,
    pub info: CatalogInfo,
    #[serde(rename = "x-delegations")]
    pub delegations: Vec<String>,
    pub methods: Vec<CatalogMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMethod {
    pub name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<CatalogParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CatalogResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogParam {
    pub name: String,
    pub required: bool,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogResult {
    pub name: String,
    pub schema: Value,
}

// --- Source descriptor shapes ---

#[derive(Debug, Deserialize)]
struct PrimaryDescriptor {
    title: Option<String>,
    description: Option<String>,
    #[serde(flatten)]
    block: EmbeddedBlock,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddedBlock {
    #[serde(default)]
    methods: Vec<SourceMethod>,
    #[serde(default)]
    delegations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SourceMethod {
    name: String,
    #[serde(default)]
    summary: String,
    description: Option<String>,
    params: Option<Vec<SourceParam>>,
    result: Option<SourceResult>,
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SourceParam {
    name: String,
    #[serde(default)]
    required: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct SourceResult {
    #[serde(default = "default_result_name")]
    name: String,
    schema: Value,
}

fn default_result_name() -> String {
    "result".to_string()
}

/// Rewrites embedded `$ref`s into the namespace, relative to the catalog.
struct NamespaceRefs<'a> {
    /// `schemas/shopping/`
    marker: String,
    /// Namespace directory as seen from the catalog, e.g. `../../schemas/shopping/`.
    prefix: String,
    /// Registered schemas, relative to the namespace directory.
    annotated: &'a BTreeSet<String>,
}

impl NamespaceRefs<'_> {
    fn rewrite(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut result = Map::new();
                for (key, child) in map {
                    let rewritten = match (key.as_str(), child) {
                        ("$ref", Value::String(reference)) if !reference.starts_with('#') => {
                            Value::String(self.rewrite_ref(reference))
                        }
                        _ => self.rewrite(child),
                    };
                    result.insert(key.clone(), rewritten);
                }
                Value::Object(result)
            }
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.rewrite(v)).collect()),
            other => other.clone(),
        }
    }

    fn rewrite_ref(&self, reference: &str) -> String {
        let parts: Vec<&str> = reference.split(self.marker.as_str()).collect();
        let [_, schema_ref] = parts.as_slice() else {
            return reference.to_string();
        };

        let (schema_path, anchor) = match schema_ref.find('#') {
            Some(idx) => (&schema_ref[..idx], &schema_ref[idx..]),
            None => (*schema_ref, ""),
        };
        let schema_path = if self.annotated.contains(schema_path) && schema_path.ends_with(".json")
        {
            match schema_path.rsplit_once('/') {
                Some((dir, file)) => format!("{}/{}", dir, VariantKind::Response.file_name(file)),
                None => VariantKind::Response.file_name(schema_path),
            }
        } else {
            schema_path.to_string()
        };
        format!("{}{}{}", self.prefix, schema_path, anchor)
    }

    fn method(&self, method: SourceMethod) -> CatalogMethod {
        CatalogMethod {
            name: method.name,
            summary: method.summary,
            description: method.description.filter(|d| !d.is_empty()),
            params: method.params.map(|params| {
                params
                    .into_iter()
                    .map(|param| CatalogParam {
                        description: param
                            .schema
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        name: param.name,
                        required: param.required,
                        schema: self.rewrite(&param.schema),
                    })
                    .collect()
            }),
            result: method.result.map(|result| CatalogResult {
                name: result.name,
                schema: self.rewrite(&result.schema),
            }),
            errors: method.errors,
        }
    }
}

/// Aggregate every embedded method under `source_root` into one catalog.
///
/// A malformed primary descriptor or `embedded` block is reported and
/// skipped; the catalog is still built from the rest. Namespace files
/// without an `embedded` key are ignored.
pub fn aggregate_methods(
    source_root: &Path,
    options: &EmbeddedOptions,
    registry: &AnnotationRegistry,
) -> (MethodCatalog, Vec<GenerateError>) {
    let annotated = registry.namespace(&options.namespace);
    let namespace = to_posix(&options.namespace);
    let catalog_dir = options.output.parent().unwrap_or(Path::new(""));
    let mut prefix = relative_posix(catalog_dir, &options.namespace);
    if !prefix.is_empty() {
        prefix.push('/');
    }
    let refs = NamespaceRefs {
        marker: format!("{}/", namespace),
        prefix,
        annotated: &annotated,
    };

    let mut errors = Vec::new();
    let mut methods = Vec::new();
    let mut delegations = Vec::new();
    let mut title = options.default_title.clone();
    let mut description = options.default_description.clone();

    let primary_path = source_root.join(&options.primary);
    if primary_path.is_file() {
        match read_descriptor::<PrimaryDescriptor>(&primary_path) {
            Ok(primary) => {
                title = primary.title.unwrap_or(title);
                description = primary.description.unwrap_or(description);
                methods.extend(primary.block.methods.into_iter().map(|m| refs.method(m)));
                delegations.extend(primary.block.delegations);
                info!("{}: {} method(s)", options.primary.display(), methods.len());
            }
            Err(e) => errors.push(e),
        }
    }

    let excluded: HashSet<&str> = options.excluded.iter().map(String::as_str).collect();
    let mut extension_count = 0;
    for file in list_schema_files(&source_root.join(&options.namespace)) {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if excluded.contains(file_name.as_str()) {
            continue;
        }
        // Unreadable files are reported by the emission pass
        let Ok(document) = load_document(&file) else {
            debug!("{}: not readable, skipping", file_name);
            continue;
        };
        let Some(embedded) = document.get("embedded").filter(|v| !v.is_null()) else {
            continue;
        };
        let block = match parse_descriptor::<EmbeddedBlock>(&file, embedded.clone()) {
            Ok(block) => block,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        debug!("{}: {} embedded method(s)", file_name, block.methods.len());
        extension_count += block.methods.len();
        methods.extend(block.methods.into_iter().map(|m| refs.method(m)));
        delegations.extend(block.delegations);
    }
    if extension_count > 0 {
        info!("extensions: {} method(s)", extension_count);
    }

    let delegations: BTreeSet<String> = delegations.into_iter().collect();
    let catalog = MethodCatalog {
        openrpc: OPENRPC_VERSION.to_string(),
        info: CatalogInfo {
            title,
            description,
            version: options.version.clone(),
        },
        delegations: delegations.into_iter().collect(),
        methods,
    };
    (catalog, errors)
}

fn read_descriptor<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, GenerateError> {
    parse_descriptor(path, load_document(path)?)
}

fn parse_descriptor<T: for<'de> Deserialize<'de>>(
    path: &Path,
    value: Value,
) -> Result<T, GenerateError> {
    serde_json::from_value(value).map_err(|e| GenerateError::InvalidDescriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
