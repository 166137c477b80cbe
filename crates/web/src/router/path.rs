use crate::config::Config;

/// Joins a group prefix and a sub path.
///
/// An empty sub path yields the prefix itself, otherwise the sub path gets a leading `/`
/// and trailing slashes of the prefix are dropped, so `("/api/", "v1")` gives `/api/v1`.
pub fn get_group_path(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        return prefix.to_string();
    }

    let prefix = prefix.trim_end_matches('/');
    let mut joined = String::with_capacity(prefix.len() + path.len() + 1);
    joined.push_str(prefix);
    if !path.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(path);
    joined
}

/// Writes the matching form of `path` into `dst`, reusing its buffer.
///
/// Lowercases unless routing is case sensitive, and drops one trailing slash from paths
/// longer than `/` unless routing is strict. ASCII lowercasing keeps byte offsets stable.
pub(crate) fn normalize_path_into(dst: &mut String, path: &str, config: &Config) {
    dst.clear();
    if path.is_empty() {
        dst.push('/');
        return;
    }

    if config.case_sensitive {
        dst.push_str(path);
    } else {
        dst.extend(path.chars().map(|c| c.to_ascii_lowercase()));
    }

    if !config.strict_routing && dst.len() > 1 && dst.ends_with('/') {
        dst.pop();
    }
}

pub(crate) fn normalize_path(path: &str, config: &Config) -> String {
    let mut normalized = String::with_capacity(path.len());
    normalize_path_into(&mut normalized, path, config);
    normalized
}
