//! Translation between S3 keys and local filesystem paths.
//!
//! Keys are always `/` separated, whereas local paths follow the platform
//! conventions; everything crossing between the two goes through here.
use walkdir::WalkDir;

use std::path::{Component, Path, PathBuf};

use crate::types::UtilResult;

/// Maps an S3 key listed under a prefix to a path relative to the target.
///
/// A prefix is treated as a "directory"; the only key which may match it
/// exactly is a single object, which is then written using its file name.
/// Keys which only share leading characters with the prefix (`database/x`
/// under `data`) are not part of it and result in `None`, as do keys which
/// contain nothing but separators after the prefix.
pub fn key_to_relative(prefix: Option<&str>, key: &str) -> UtilResult<Option<PathBuf>> {
    let remainder = match prefix {
        None | Some("") => key,
        Some(prefix) if key == prefix => key.rsplit('/').next().unwrap_or(key),
        Some(prefix) => match key.strip_prefix(prefix) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => return Ok(None),
        },
    };

    let mut relative = PathBuf::new();

    for segment in remainder.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(format!("Refusing to write outside of target: {}", key).into());
        }
        relative.push(segment);
    }

    if relative.as_os_str().is_empty() {
        return Ok(None);
    }

    Ok(Some(relative))
}

/// Joins a relative key onto an optional prefix.
pub fn join_key(prefix: Option<&str>, relative: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, relative),
        _ => relative.to_string(),
    }
}

/// Computes the key of a single file, placed directly beneath the prefix.
pub fn file_key(prefix: Option<&str>, path: &Path) -> UtilResult<String> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Unable to determine file name of {}", path.display()))?;

    Ok(join_key(prefix, name))
}

/// Converts a path below a root directory into a `/` separated key.
pub fn relative_key(root: &Path, path: &Path) -> UtilResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| format!("{} is not inside {}", path.display(), root.display()))?;

    let mut segments = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(segment) => match segment.to_str() {
                Some(segment) => segments.push(segment),
                None => return Err(format!("Non UTF-8 path: {}", path.display()).into()),
            },
            Component::CurDir => (),
            _ => return Err(format!("Unexpected path component in {}", path.display()).into()),
        }
    }

    if segments.is_empty() {
        return Err(format!("{} has no path below {}", path.display(), root.display()).into());
    }

    Ok(segments.join("/"))
}

/// An entry found while walking a local directory tree.
#[derive(Debug, PartialEq)]
pub enum LocalEntry {
    /// A regular file, paired with its key relative to the root.
    File(PathBuf, String),

    /// Anything else which isn't a directory (such as an unfollowed link).
    Other(PathBuf),
}

/// Iterates all non-directory entries beneath a root directory.
///
/// Failures to read an entry are passed through so the caller can report
/// them and carry on with the rest of the tree.
pub fn local_files<'a>(
    root: &'a Path,
    follow_links: bool,
) -> impl Iterator<Item = UtilResult<LocalEntry>> + 'a {
    WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by(|left, right| left.file_name().cmp(right.file_name()))
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err.into())),
            };

            // directories are implied by keys
            let file_type = entry.file_type();
            if file_type.is_dir() {
                return None;
            }

            // links are only followed (and then reported as files) when requested
            if !file_type.is_file() {
                return Some(Ok(LocalEntry::Other(entry.into_path())));
            }

            Some(relative_key(root, entry.path()).map(|key| LocalEntry::File(entry.into_path(), key)))
        })
}
