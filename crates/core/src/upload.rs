//! Upload policy: which extensions are accepted and where accepted blobs live.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::stage::StageKind;
use crate::types::DbId;

/// Extensions accepted when `ALLOWED_UPLOAD_EXTENSIONS` is not configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif"];

/// Longest sanitized file name kept in a blob key.
pub const MAX_STORED_NAME_LEN: usize = 200;

/// Characters outside this class are replaced when building blob keys.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// Case-insensitive set of accepted file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedExtensions {
    extensions: BTreeSet<String>,
}

impl AllowedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Parse a comma-separated list such as `"pdf, png,.jpg"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Return the normalized extension of `filename` when it is accepted.
    pub fn accept(&self, filename: &str) -> Option<String> {
        file_extension(filename).filter(|ext| self.extensions.contains(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for AllowedExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS)
    }
}

/// Lower-cased extension after the last dot of the base name.
///
/// Names without a dot, or ending in one, have no extension. A leading dot
/// alone (`.env`) is not an extension either.
pub fn file_extension(filename: &str) -> Option<String> {
    let base = base_name(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Strip any client-supplied directory components.
pub fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Reduce a client file name to a safe single path segment.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(base_name(filename).trim(), "_");
    let trimmed = replaced.trim_start_matches('.');
    let mut name: String = trimmed.chars().take(MAX_STORED_NAME_LEN).collect();
    if name.is_empty() {
        name.push_str("file");
    }
    name
}

/// Storage key for an accepted upload.
///
/// The random prefix keeps two uploads with the same name from overwriting
/// each other.
pub fn blob_key(project_id: DbId, kind: StageKind, unique: Uuid, filename: &str) -> String {
    format!(
        "{project_id}/{}/{}_{}",
        kind.slug(),
        unique.simple(),
        sanitize_filename(filename)
    )
}
