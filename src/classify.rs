//! Operation kind classification for aggregate catalogs.
//!
//! Catalogs don't say which write operation an endpoint performs, so the
//! kind is inferred from HTTP method and path, or from RPC method names.
//! The rules are plain data so they can be swapped and tested on their own.

use crate::types::OperationKind;

/// Classifies HTTP operations by path, operation id and method.
#[derive(Debug, Clone)]
pub struct OperationClassifier {
    /// Paths ending with this are completions.
    pub complete_path_suffix: String,
    /// Operation ids starting with this are completions.
    pub complete_id_prefix: String,
    /// Methods that create (lowercase).
    pub create_methods: Vec<String>,
    /// Methods that update (lowercase).
    pub update_methods: Vec<String>,
}

impl Default for OperationClassifier {
    fn default() -> Self {
        Self {
            complete_path_suffix: "/complete".to_string(),
            complete_id_prefix: "complete_".to_string(),
            create_methods: vec!["post".to_string()],
            update_methods: vec!["put".to_string(), "patch".to_string()],
        }
    }
}

impl OperationClassifier {
    /// Classify one operation.
    ///
    /// Completion markers win over the method; other methods read.
    pub fn classify(&self, method: &str, path: &str, operation_id: Option<&str>) -> OperationKind {
        let method = method.to_lowercase();
        let is_complete = path.ends_with(&self.complete_path_suffix)
            || operation_id
                .map(|id| id.starts_with(&self.complete_id_prefix))
                .unwrap_or(false);

        if is_complete {
            OperationKind::Complete
        } else if self.create_methods.contains(&method) {
            OperationKind::Create
        } else if self.update_methods.contains(&method) {
            OperationKind::Update
        } else {
            OperationKind::Read
        }
    }
}

/// Classifies RPC methods by substrings of their name.
#[derive(Debug, Clone)]
pub struct MethodClassifier {
    /// Checked in order; the first marker contained in the name wins.
    pub markers: Vec<(String, OperationKind)>,
}

impl Default for MethodClassifier {
    fn default() -> Self {
        Self {
            markers: vec![
                ("complete".to_string(), OperationKind::Complete),
                ("create".to_string(), OperationKind::Create),
                ("update".to_string(), OperationKind::Update),
            ],
        }
    }
}

impl MethodClassifier {
    pub fn classify(&self, method_name: &str) -> OperationKind {
        self.markers
            .iter()
            .find(|(marker, _)| method_name.contains(marker.as_str()))
            .map(|(_, kind)| *kind)
            .unwrap_or(OperationKind::Read)
    }
}
