//! Drive `q` filter expressions.
//!
//! Every page-derived value goes through [`escape_query_value`] before it is
//! embedded between single quotes; an unescaped quote silently corrupts the
//! filter instead of failing it.

use crate::client::FOLDER_MIME_TYPE;

pub fn escape_query_value(value: &str) -> String {
    value.replace('\'', "\\'")
}

pub fn folder_lookup_query(parent_id: &str, name: &str) -> String {
    format!(
        "mimeType='{FOLDER_MIME_TYPE}' and trashed=false and name='{}' and '{}' in parents",
        escape_query_value(name),
        escape_query_value(parent_id)
    )
}

pub fn file_lookup_query(parent_id: &str, name: &str) -> String {
    format!(
        "trashed=false and name='{}' and '{}' in parents",
        escape_query_value(name),
        escape_query_value(parent_id)
    )
}

/// Folder picker search; an empty or blank needle lists every folder.
pub fn folder_search_query(needle: Option<&str>) -> String {
    let mut filters = vec![
        format!("mimeType='{FOLDER_MIME_TYPE}'"),
        "trashed=false".to_string(),
    ];
    if let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) {
        filters.push(format!("name contains '{}'", escape_query_value(needle)));
    }
    filters.join(" and ")
}
