//! Key derivation shared by the pipeline worker and the upload client.
//!
//! The article key must be a pure function of the image key: the client
//! derives the key it polls for independently of the worker, with no side
//! channel between them. Both sides call into this module.

/// File extensions accepted by the upload endpoint.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Prefix under which uploaded images are stored.
pub const UPLOADS_PREFIX: &str = "uploads/";

/// Prefix under which generated articles are stored.
pub const ARTICLES_PREFIX: &str = "articles/";

/// Suffix appended to the image basename to form the article key.
pub const ARTICLE_SUFFIX: &str = "_article.txt";

/// Check a filename against the image extension allow-list (case-insensitive).
pub fn allowed_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Sanitize an uploaded filename into a safe single path segment.
///
/// Strips any directory components, replaces characters outside
/// `[A-Za-z0-9._-]` with `_`, and collapses leading dots so the result can
/// never escape its prefix. Returns None when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

/// Derive the store key for an uploaded image from its sanitized filename.
pub fn image_key(sanitized_filename: &str) -> String {
    format!("{}{}", UPLOADS_PREFIX, sanitized_filename)
}

/// Derive the article key from an image key.
///
/// Deterministic: same input key yields the same output key on every call,
/// in every process. `uploads/cat.jpg` -> `articles/cat_article.txt`.
pub fn article_key(image_key: &str) -> String {
    let basename = image_key
        .rsplit('/')
        .next()
        .unwrap_or(image_key);
    let stem = match basename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => basename,
    };
    format!("{}{}{}", ARTICLES_PREFIX, stem, ARTICLE_SUFFIX)
}
