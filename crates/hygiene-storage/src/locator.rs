//! Path parsing shared by the storage backends.

use crate::traits::{StorageError, StorageObject, StorageResult};

const PROTOCOL_FLAG: &str = "://";
const SLASH: char = '/';

/// Bucket, key and directory prefix of a storage URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
    /// The key without its final segment. Always ends with `/`, even when empty.
    pub prefix: String,
}

impl ObjectLocator {
    /// Split `uri` into bucket, key and prefix.
    ///
    /// The scheme (everything up to and including `://`) is dropped when present.
    /// The first remaining segment is the bucket; at least one more segment must
    /// follow it. Empty segments are dropped from the key, so `a//b` and `a/b/`
    /// both give the key `a/b`.
    pub fn parse(uri: &str) -> StorageResult<Self> {
        let path = match uri.split_once(PROTOCOL_FLAG) {
            Some((_, rest)) => rest,
            None => uri,
        };

        let segments: Vec<&str> = path.split(SLASH).collect();
        if segments.len() < 2 {
            return Err(StorageError::IllegalPath(uri.to_string()));
        }

        let key = join_segments(&segments[1..]);
        let mut prefix = join_segments(&segments[1..segments.len() - 1]);
        prefix.push(SLASH);

        Ok(ObjectLocator {
            bucket: segments[0].to_string(),
            key,
            prefix,
        })
    }

    /// The key as a directory prefix: `a/b` becomes `a/b/`, the empty key stays empty.
    pub fn key_as_dir(&self) -> String {
        append_path_suffix(&self.key)
    }
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty() && **s != ".")
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Append a trailing `/` to a non-empty directory path that lacks one.
pub fn append_path_suffix(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with(SLASH) {
        dir.to_string()
    } else {
        format!("{}{}", dir, SLASH)
    }
}

/// The last segment of a path, ignoring a trailing `/`.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SLASH);
    match trimmed.rfind(SLASH) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Names of listed objects, in listing order.
pub fn objects_to_strings(objects: &[StorageObject]) -> Vec<String> {
    objects.iter().map(|o| o.name.clone()).collect()
}

/// Expand a leading `~` to the current user's home directory.
///
/// Returns the path unchanged when there is no `~` or no home directory is known.
pub fn expand_user_dir(path: &str) -> String {
    let home = match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => home,
        _ => return path.to_string(),
    };
    if path == "~" {
        home
    } else if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", home.trim_end_matches(SLASH), rest)
    } else {
        path.to_string()
    }
}
