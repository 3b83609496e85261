//! Common utility functions

/// Split a path into (directory, basename)
/// Examples:
///   "foo/bar" -> ("foo", "bar")
///   "foo/bar/baz" -> ("foo/bar", "baz")
///   "file" -> ("", "file")
///   "foo/bar/" -> ("foo", "bar")
pub fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_end_matches('/');
    if let Some(pos) = path.rfind('/') {
        (&path[..pos], &path[pos + 1..])
    } else {
        ("", path)
    }
}

/// Join a directory and a basename back into a path, mirroring `split_path`.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Lexically clean a `/`-separated path the way the tree operations expect:
/// drop `.` components and empty segments left over from leading/trailing/
/// doubled slashes, without touching `..` (none of our inputs legitimately
/// contain it, and tar entries that do are left alone rather than guessed at).
pub fn clean_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty() && *p != ".").collect()
}
