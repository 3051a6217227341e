//! UCP Schema Generator
//!
//! Specializes annotated UCP source schemas into per-operation artifacts and
//! links service catalogs to them.
//!
//! A source schema marks its fields with `ucp_request` and `ucp_response`.
//! Every annotated file produces:
//! - `{stem}.create_req.json`, `{stem}.update_req.json`, `{stem}.complete_req.json`
//!   (or a single `{stem}_req.json` when the document sets `ucp_shared_request`)
//! - `{stem}_resp.json`
//!
//! Unannotated files are copied with their `$ref`s into annotated files
//! pointed at the response variant.
//!
//! # Example
//!
//! ```
//! use std::path::{Path, PathBuf};
//! use ucp_schema_gen::{AnnotationRegistry, OperationContext, Transformer};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["id", "name"],
//!     "properties": {
//!         "id": { "type": "string", "ucp_request": "omit" },
//!         "name": {
//!             "type": "string",
//!             "ucp_request": { "create": "required", "update": "optional" }
//!         }
//!     }
//! });
//!
//! let file = Path::new("/src/types/line_item.json");
//! let registry = AnnotationRegistry::from_entries("/src", [(PathBuf::from(file), false)]);
//!
//! let update = Transformer::new(&registry, file, OperationContext::Update).transform(&schema);
//! assert!(update["properties"].get("id").is_none());
//! assert!(update.get("required").is_none());
//! ```
//!
//! # Visibility Rules
//!
//! | Visibility | Effect on `properties` | Effect on `required` |
//! |------------|------------------------|----------------------|
//! | `"omit"` | Remove field | Remove from required |
//! | `"required"` | Keep field | Add to required |
//! | `"optional"` | Keep field | Remove from required |
//! | (none) | Keep field | Preserve original |
//!
//! `ucp_response` only accepts `"omit"`.

mod classify;
mod embedded;
mod emitter;
mod error;
mod generate;
mod loader;
mod openapi;
mod openrpc;
mod registry;
mod rewriter;
mod transform;
mod types;
mod validator;

pub use classify::{MethodClassifier, OperationClassifier};
pub use embedded::{
    aggregate_methods, CatalogInfo, CatalogMethod, CatalogParam, CatalogResult, EmbeddedOptions,
    MethodCatalog, OPENRPC_VERSION,
};
pub use emitter::{emit_file, plan_variants, Variant};
pub use error::{AnnotationError, GenerateError};
pub use generate::{check, generate, GenerateOptions, GenerateReport};
pub use loader::{collect_schema_files, load_document, write_document};
pub use openapi::link_operation_catalog;
pub use openrpc::link_method_catalog;
pub use registry::{has_annotations, AnnotationRegistry};
pub use rewriter::{rewrite_ref, variant_path};
pub use transform::{visibility, Transformer};
pub use types::{OperationContext, OperationKind, VariantKind, Visibility};
pub use validator::validate_annotations;
