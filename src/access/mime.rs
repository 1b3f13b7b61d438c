// src/access/mime.rs
//!
//! Mime classification by file name
//!
//! Classification never reads file contents: uploads are filtered and
//! thumbnails are attempted purely on what the name says.

use std::path::Path;

/// Mime of entries that are (or link to) directories
pub const MIME_DIRECTORY: &str = "directory";

/// Mime of symlinks whose target is missing or outside the root
pub const MIME_SYMLINK_BROKEN: &str = "symlink-broken";

/// Fallback for names nothing recognises
pub const MIME_UNKNOWN: &str = "unknown";

/// Extensions mime_guess either misses or classifies differently than the
/// file-manager client expects.
const EXTRA_TYPES: &[(&str, &str)] = &[
    ("conf", "text/plain"),
    ("ini", "text/plain"),
    ("php", "text/x-php"),
    ("rtfd", "text/rtfd"),
    ("py", "text/x-python"),
    ("java", "text/x-java-source"),
    ("rb", "text/x-ruby"),
    ("sh", "text/x-shellscript"),
    ("pl", "text/x-perl"),
    ("sql", "text/x-sql"),
    ("doc", "application/msword"),
    ("ogg", "application/ogg"),
    ("7z", "application/x-7z-compressed"),
    ("ogm", "application/ogm"),
    ("mkv", "video/x-matroska"),
];

/// Names without extension that are always plain text
const PLAIN_TEXT_NAMES: &[&str] = &["README", "ChangeLog"];

fn extra_type(ext: &str) -> Option<&'static str> {
    EXTRA_TYPES
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

/// Mime type of a file, judged by its name only
pub fn mime_type(path: &Path) -> String {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    // Perl scripts come back as application/x-perl, the client wants text
    if ext.eq_ignore_ascii_case("pl") {
        return "text/x-perl".to_string();
    }

    if let Some(guess) = mime_guess::from_path(path).first() {
        return guess.essence_str().to_string();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if PLAIN_TEXT_NAMES.contains(&stem) {
        return "text/plain".to_string();
    }

    extra_type(ext).unwrap_or(MIME_UNKNOWN).to_string()
}

/// True for mime types the thumbnail backend can work with
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image")
}
