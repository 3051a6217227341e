//! Core types for UCP schema generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix shared by every UCP annotation key.
pub const ANNOTATION_PREFIX: &str = "ucp_";

/// Per-field write visibility annotation.
pub const REQUEST_ANNOTATION: &str = "ucp_request";

/// Per-field response omission annotation.
pub const RESPONSE_ANNOTATION: &str = "ucp_response";

/// Document-level flag: one request shape reused for every write operation.
pub const SHARED_REQUEST_ANNOTATION: &str = "ucp_shared_request";

/// Recognized UCP annotation keys.
pub const UCP_ANNOTATIONS: &[&str] = &[
    REQUEST_ANNOTATION,
    RESPONSE_ANNOTATION,
    SHARED_REQUEST_ANNOTATION,
];

/// Valid values for `ucp_request` (shorthand or per-operation).
pub const VALID_REQUEST_VALUES: &[&str] = &["omit", "optional", "required"];

/// Valid values for `ucp_response`.
pub const VALID_RESPONSE_VALUES: &[&str] = &["omit"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true if `key` is one of the recognized UCP annotations.
pub fn is_annotation(key: &str) -> bool {
    UCP_ANNOTATIONS.contains(&key)
}

/// Operation a variant is specialized for.
///
/// The three write operations select `ucp_request` rules; `Response`
/// selects `ucp_response` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationContext {
    Create,
    Update,
    Complete,
    Response,
}

impl OperationContext {
    /// Write operations, in emission order.
    pub const WRITE: [OperationContext; 3] = [
        OperationContext::Create,
        OperationContext::Update,
        OperationContext::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationContext::Create => "create",
            OperationContext::Update => "update",
            OperationContext::Complete => "complete",
            OperationContext::Response => "response",
        }
    }

    /// Parse a write operation name as used in `ucp_request` maps.
    ///
    /// Returns `None` for anything but `create`, `update` and `complete`.
    pub fn parse_write(s: &str) -> Option<Self> {
        match s {
            "create" => Some(OperationContext::Create),
            "update" => Some(OperationContext::Update),
            "complete" => Some(OperationContext::Complete),
            _ => None,
        }
    }

    pub fn is_request(&self) -> bool {
        !matches!(self, OperationContext::Response)
    }

    /// Capitalized operation name used in title suffixes ("Create").
    fn display_name(&self) -> &'static str {
        match self {
            OperationContext::Create => "Create",
            OperationContext::Update => "Update",
            OperationContext::Complete => "Complete",
            OperationContext::Response => "Response",
        }
    }
}

/// Operation kind inferred for an entry of an aggregate catalog.
///
/// `Read` has no request variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Complete,
    Read,
}

impl OperationKind {
    /// The request context this kind rewrites request schemas with.
    pub fn request_context(&self) -> Option<OperationContext> {
        match self {
            OperationKind::Create => Some(OperationContext::Create),
            OperationKind::Update => Some(OperationContext::Update),
            OperationKind::Complete => Some(OperationContext::Complete),
            OperationKind::Read => None,
        }
    }
}

/// Which generated artifact a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// `{stem}.{op}_req.json`, one per write operation.
    Request(OperationContext),
    /// `{stem}_req.json`, reused for every write operation.
    SharedRequest,
    /// `{stem}_resp.json`.
    Response,
    /// Unannotated file copied under its own name.
    PassThrough,
}

impl VariantKind {
    /// Variant a reference to a registered schema must target.
    pub fn for_context(context: OperationContext, shared_request: bool) -> Self {
        match context {
            OperationContext::Response => VariantKind::Response,
            _ if shared_request => VariantKind::SharedRequest,
            op => VariantKind::Request(op),
        }
    }

    /// Operation context the transformer runs with for this variant.
    ///
    /// Shared requests use `create` as the representative write operation.
    pub fn context(&self) -> OperationContext {
        match self {
            VariantKind::Request(op) => *op,
            VariantKind::SharedRequest => OperationContext::Create,
            VariantKind::Response | VariantKind::PassThrough => OperationContext::Response,
        }
    }

    /// Suffix appended to every `title` in the variant.
    pub fn title_suffix(&self) -> String {
        match self {
            VariantKind::Request(op) => format!(" {} Request", op.display_name()),
            VariantKind::SharedRequest => " Request".to_string(),
            VariantKind::Response => " Response".to_string(),
            VariantKind::PassThrough => String::new(),
        }
    }

    /// Apply the naming convention to a bare file name.
    ///
    /// `line_item.json` becomes `line_item.create_req.json`,
    /// `line_item_req.json` or `line_item_resp.json`.
    pub fn file_name(&self, file_name: &str) -> String {
        let (stem, ext) = split_extension(file_name);
        match self {
            VariantKind::Request(op) => format!("{}.{}_req{}", stem, op.as_str(), ext),
            VariantKind::SharedRequest => format!("{}_req{}", stem, ext),
            VariantKind::Response => format!("{}_resp{}", stem, ext),
            VariantKind::PassThrough => file_name.to_string(),
        }
    }
}

/// Split `name.ext` into (`name`, `.ext`). A leading dot is part of the stem.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    }
}

/// Visibility of a field after resolution.
///
/// Determines how a field is transformed in the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// No transformation - keep field as-is with original required status.
    #[default]
    Include,
    /// Remove field from properties and required array.
    Omit,
    /// Keep field and ensure it's in the required array.
    Required,
    /// Keep field but never list it as required.
    Optional,
}

impl Visibility {
    /// Parse a visibility value from a string.
    ///
    /// Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "omit" => Some(Visibility::Omit),
            "required" => Some(Visibility::Required),
            "optional" => Some(Visibility::Optional),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_parse_valid() {
        assert_eq!(Visibility::parse("omit"), Some(Visibility::Omit));
        assert_eq!(Visibility::parse("required"), Some(Visibility::Required));
        assert_eq!(Visibility::parse("optional"), Some(Visibility::Optional));
    }

    #[test]
    fn visibility_parse_invalid() {
        assert_eq!(Visibility::parse("include"), None);
        assert_eq!(Visibility::parse("readonly"), None);
        assert_eq!(Visibility::parse(""), None);
    }

    #[test]
    fn parse_write_rejects_read_and_response() {
        assert_eq!(
            OperationContext::parse_write("complete"),
            Some(OperationContext::Complete)
        );
        assert_eq!(OperationContext::parse_write("read"), None);
        assert_eq!(OperationContext::parse_write("response"), None);
    }

    #[test]
    fn variant_file_names() {
        let op = VariantKind::Request(OperationContext::Update);
        assert_eq!(op.file_name("line_item.json"), "line_item.update_req.json");
        assert_eq!(
            VariantKind::SharedRequest.file_name("checkout.json"),
            "checkout_req.json"
        );
        assert_eq!(
            VariantKind::Response.file_name("checkout.json"),
            "checkout_resp.json"
        );
        assert_eq!(VariantKind::Response.file_name("noext"), "noext_resp");
        assert_eq!(
            VariantKind::PassThrough.file_name("checkout.json"),
            "checkout.json"
        );
    }

    #[test]
    fn variant_for_context() {
        assert_eq!(
            VariantKind::for_context(OperationContext::Response, true),
            VariantKind::Response
        );
        assert_eq!(
            VariantKind::for_context(OperationContext::Complete, true),
            VariantKind::SharedRequest
        );
        assert_eq!(
            VariantKind::for_context(OperationContext::Complete, false),
            VariantKind::Request(OperationContext::Complete)
        );
    }

    #[test]
    fn title_suffixes() {
        assert_eq!(
            VariantKind::Request(OperationContext::Create).title_suffix(),
            " Create Request"
        );
        assert_eq!(VariantKind::SharedRequest.title_suffix(), " Request");
        assert_eq!(VariantKind::Response.title_suffix(), " Response");
        assert_eq!(VariantKind::PassThrough.title_suffix(), "");
    }
}
