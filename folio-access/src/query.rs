//! Access-check query construction
//!
//! Builds the filter expression that locates the index document of one file
//! belonging to a record. The field names and expression shape are part of
//! the contract with the search index.

use crate::error::{AccessError, Result};

/// Top-level record identifier of every document
pub const FIELD_PI_TOPSTRUCT: &str = "PI_TOPSTRUCT";
/// Record identifier of the record document itself
pub const FIELD_PI: &str = "PI";
/// Image / media file name of a page document
pub const FIELD_FILENAME: &str = "FILENAME";
/// Relative path of a plain-text full-text file
pub const FIELD_FILENAME_FULLTEXT: &str = "FILENAME_FULLTEXT";
/// Bare name of a plain-text file in the flat storage layout
pub const FIELD_FILENAME_PLAIN: &str = "FILENAME_PLAIN";
/// Relative path of an ALTO file
pub const FIELD_FILENAME_ALTO: &str = "FILENAME_ALTO";
/// Bare name of an XML file in the flat storage layout
pub const FIELD_FILENAME_XML: &str = "FILENAME_XML";

/// Extensions of audio/video containers whose derivatives may carry a
/// different extension than the source
const AUDIO_VIDEO_EXTENSIONS: &[&str] = &[
    "webm", "mp4", "m4v", "m4a", "mp3", "ogg", "ogv", "oga", "opus", "wav", "flac", "mpeg",
    "mpg", "mov", "avi", "mkv",
];

/// How a file is looked up in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// `.txt` transcript
    PlainText,
    /// `.xml` transcript (ALTO and related dialects)
    XmlText,
    /// Audio/video container or a file without extension
    ExtensionAgnostic,
    /// Images and everything else
    Exact,
}

impl FileCategory {
    pub fn of(file_name: &str) -> Self {
        match extension(file_name).map(str::to_ascii_lowercase).as_deref() {
            Some("txt") => FileCategory::PlainText,
            Some("xml") => FileCategory::XmlText,
            None => FileCategory::ExtensionAgnostic,
            Some(ext) if AUDIO_VIDEO_EXTENSIONS.contains(&ext) => FileCategory::ExtensionAgnostic,
            Some(_) => FileCategory::Exact,
        }
    }
}

/// Build the filter expression locating `file_reference` within record `pi`.
///
/// `file_reference` may be a bare name, a relative path or a URL; scheme,
/// host, query and fragment are dropped.
///
/// ```
/// use folio_access::generate_access_check_query;
///
/// assert_eq!(
///     generate_access_check_query("PPN123456789", "00000001.tif").unwrap(),
///     r#"+PI_TOPSTRUCT:PPN123456789 +FILENAME:"00000001.tif""#
/// );
/// ```
pub fn generate_access_check_query(pi: &str, file_reference: &str) -> Result<String> {
    let pi = pi.trim();
    if pi.is_empty() {
        return Err(AccessError::invalid_argument("record identifier is empty"));
    }
    let path = relative_path(file_reference);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if file_name.is_empty() {
        return Err(AccessError::invalid_argument(format!(
            "file reference '{file_reference}' has no file name"
        )));
    }

    let mut query = format!("+{FIELD_PI_TOPSTRUCT}:{pi}");
    match FileCategory::of(file_name) {
        FileCategory::PlainText => push_path_or_name(
            &mut query,
            (FIELD_FILENAME_FULLTEXT, path),
            (FIELD_FILENAME_PLAIN, file_name),
        ),
        FileCategory::XmlText => push_path_or_name(
            &mut query,
            (FIELD_FILENAME_ALTO, path),
            (FIELD_FILENAME_XML, file_name),
        ),
        FileCategory::ExtensionAgnostic => {
            query.push_str(&format!(
                " +{FIELD_FILENAME}:{}.*",
                escape_value(base_name(file_name))
            ));
        }
        FileCategory::Exact => {
            query.push_str(&format!(" +{FIELD_FILENAME}:\"{}\"", escape_value(file_name)));
        }
    }
    Ok(query)
}

/// Existence query for the record document of `pi`
pub fn generate_record_query(pi: &str) -> Result<String> {
    let pi = pi.trim();
    if pi.is_empty() {
        return Err(AccessError::invalid_argument("record identifier is empty"));
    }
    Ok(format!("+{FIELD_PI}:{pi}"))
}

/// Backslash-escape spaces and parentheses
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ' ' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Append `+(PATH_FIELD:"path" NAME_FIELD:"name")`
fn push_path_or_name(query: &mut String, by_path: (&str, &str), by_name: (&str, &str)) {
    let (path_field, path) = by_path;
    let (name_field, name) = by_name;
    query.push_str(&format!(
        " +({path_field}:\"{}\" {name_field}:\"{}\")",
        escape_value(path),
        escape_value(name)
    ));
}

/// Strip scheme, host, query and fragment; drop leading slashes
fn relative_path(reference: &str) -> &str {
    let mut path = reference.trim();
    if let Some((_, rest)) = path.split_once("://") {
        path = match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "",
        };
    }
    if let Some(idx) = path.find(&['?', '#'][..]) {
        path = &path[..idx];
    }
    path.trim_start_matches('/')
}

fn extension(file_name: &str) -> Option<&str> {
    match file_name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&file_name[idx + 1..]).filter(|ext| !ext.is_empty()),
    }
}

/// File name without its extension; a bare trailing dot is dropped too
fn base_name(file_name: &str) -> &str {
    match extension(file_name) {
        Some(ext) => &file_name[..file_name.len() - ext.len() - 1],
        None => file_name.strip_suffix('.').unwrap_or(file_name),
    }
}
