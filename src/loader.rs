//! Document loading, writing and path helpers.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::GenerateError;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `GenerateError::ReadError` if the file can't be read,
/// or `GenerateError::InvalidJson` if it isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, GenerateError> {
    let content = std::fs::read_to_string(path).map_err(|source| GenerateError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| GenerateError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a document the way generated artifacts are stored:
/// two-space indentation, source key order, trailing newline.
pub fn render_document(document: &Value, path: &Path) -> Result<String, GenerateError> {
    let mut rendered =
        serde_json::to_string_pretty(document).map_err(|source| GenerateError::SerializeError {
            path: path.to_path_buf(),
            source,
        })?;
    rendered.push('\n');
    Ok(rendered)
}

/// Write a document to `path`, creating parent directories as needed.
pub fn write_document(document: &Value, path: &Path) -> Result<(), GenerateError> {
    let rendered = render_document(document, path)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GenerateError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, rendered).map_err(|source| GenerateError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Collect every `.json` file under `root`, skipping hidden entries.
///
/// Symlinked files are included; symlinked directories are not descended.
/// Sorted so that runs over an unchanged tree produce the same order.
pub fn collect_schema_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_json_extension(path))
        .collect();
    files.sort();
    files
}

/// `.json` files directly inside `dir` (not recursive), sorted.
pub fn list_schema_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file() && !is_hidden(entry.file_name()))
        .map(|entry| entry.into_path())
        .filter(|path| has_json_extension(path))
        .collect();
    files.sort();
    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Split a `$ref` into its file part and fragment (fragment keeps its `#`).
///
/// `"types/item.json#/$defs/x"` gives `("types/item.json", "#/$defs/x")`.
pub fn split_ref(reference: &str) -> (&str, &str) {
    match reference.find('#') {
        Some(idx) => (&reference[..idx], &reference[idx..]),
        None => (reference, ""),
    }
}

/// Lexically normalize a path: drop `.` components and fold `..`.
///
/// Never touches the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Render a relative path with forward slashes.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative path (forward slashes) from directory `from` to `to`.
///
/// Both paths must be relative to the same root.
pub fn relative_posix(from: &Path, to: &Path) -> String {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat("..".to_string()).take(from_parts.len() - common));
    parts.extend(
        to_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
