// src/ops/unique_name.rs
//!
//! Names for duplicated entries
//!
//! `report.pdf` becomes `report copy.pdf`, then `report copy 2.pdf`,
//! `report copy 3.pdf` and so on. Copies of copies continue the sequence
//! instead of stacking markers.

use crate::error::ConnectorError;
use std::path::{Path, PathBuf};

pub const COPY_MARKER: &str = " copy";

/// Give up after this many numbered candidates
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Compressed tarball suffixes kept whole, e.g. `.tar.gz`
const COMPOUND_SUFFIXES: &[&str] = &[".gz", ".bz2", ".bz"];

/// Split a file name into stem and extension, keeping `.xxx.gz`,
/// `.xxx.bz` and `.xxx.bz2` together.
fn split_name(name: &str, is_dir: bool) -> (&str, &str) {
    if is_dir {
        return (name, "");
    }

    for suffix in COMPOUND_SUFFIXES {
        if let Some(head) = name.strip_suffix(suffix) {
            // head must end in ".xxx" with something before it
            let chars: Vec<(usize, char)> = head.char_indices().collect();
            if chars.len() >= 5 {
                let (dot_at, dot) = chars[chars.len() - 4];
                if dot == '.' {
                    return (&name[..dot_at], &name[dot_at..]);
                }
            }
        }
    }

    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Parse "<base> copy N" into ("<base> copy", N)
fn numbered_copy(stem: &str) -> Option<(&str, u32)> {
    let (head, digits) = stem.rsplit_once(|c: char| c.is_whitespace())?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !head.ends_with(COPY_MARKER) {
        return None;
    }
    digits.parse().ok().map(|n| (head, n))
}

/// First free sibling path for a copy of `path`
pub fn unique_name(path: &Path) -> Result<PathBuf, ConnectorError> {
    let parent = path.parent().ok_or(ConnectorError::InvalidParameters)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or(ConnectorError::InvalidParameters)?;
    let (stem, ext) = split_name(&name, path.is_dir());

    let (base, mut counter) = if stem.ends_with(COPY_MARKER) {
        (stem.to_string(), 1)
    } else if let Some((base, n)) = numbered_copy(stem) {
        (base.to_string(), n)
    } else {
        let base = format!("{}{}", stem, COPY_MARKER);
        let candidate = parent.join(format!("{}{}", base, ext));
        if candidate.symlink_metadata().is_err() {
            return Ok(candidate);
        }
        (base, 1)
    };

    for _ in 0..MAX_ATTEMPTS {
        counter = counter.saturating_add(1);
        let candidate = parent.join(format!("{} {}{}", base, counter, ext));
        if candidate.symlink_metadata().is_err() {
            return Ok(candidate);
        }
    }

    tracing::warn!("No free copy name for {} after {} attempts", path.display(), MAX_ATTEMPTS);
    Err(ConnectorError::failed("Unable to create file copy"))
}
