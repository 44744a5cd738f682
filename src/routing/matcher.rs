//! Path normalization and prefix matching.
//!
//! # Design Decisions
//! - Trailing slash is insignificant except for the root path
//! - Prefixes match whole segments: `/a` matches `/a/b`, never `/ab`
//! - Matching is case-sensitive

/// Strip a trailing slash unless the path is the root.
///
/// Returns an empty string for an empty input, which callers treat as
/// invalid.
pub fn normalize_path(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Match `path` against a normalized route `prefix`.
///
/// Returns the remainder below the prefix (empty, or starting with `/`)
/// when the prefix covers the path.
pub fn match_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix == "/" {
        return if path == "/" || path.is_empty() {
            Some("")
        } else if path.starts_with('/') {
            Some(path)
        } else {
            None
        };
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Candidate prefixes of `path`, longest first, each on a segment boundary.
///
/// `/a/b/c` yields `/a/b/c`, `/a/b`, `/a`, `/`.
pub fn candidate_prefixes(path: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(path);
    std::iter::from_fn(move || {
        let current = next?;
        next = match current.rfind('/') {
            Some(0) if current != "/" => Some("/"),
            Some(0) | None => None,
            Some(idx) => Some(&current[..idx]),
        };
        Some(current)
    })
    .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_single_trailing_slash() {
        assert_eq!(normalize_path("/echo/"), "/echo");
        assert_eq!(normalize_path("/echo"), "/echo");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        assert_eq!(match_prefix("/api", "/api"), Some(""));
        assert_eq!(match_prefix("/api", "/api/v1/x"), Some("/v1/x"));
        assert_eq!(match_prefix("/api", "/apiv1"), None);
        assert_eq!(match_prefix("/api", "/other"), None);
    }

    #[test]
    fn root_prefix_matches_everything() {
        assert_eq!(match_prefix("/", "/"), Some(""));
        assert_eq!(match_prefix("/", "/a/b"), Some("/a/b"));
    }

    #[test]
    fn candidates_are_longest_first() {
        let candidates: Vec<_> = candidate_prefixes("/a/b/c").collect();
        assert_eq!(candidates, vec!["/a/b/c", "/a/b", "/a", "/"]);

        let root: Vec<_> = candidate_prefixes("/").collect();
        assert_eq!(root, vec!["/"]);
    }
}
