//! Remote path helpers. SFTP paths always use `/` regardless of the local platform.

/// Lists the ancestors of `path` from the top down, excluding `path` itself.
///
/// Absolute paths yield absolute ancestors starting below `/`; relative paths
/// stay relative to the server's working directory.
///
/// ```ignore
/// assert_eq!(parent_dirs("/a/b/file.txt"), vec!["/a", "/a/b"]);
/// assert_eq!(parent_dirs("a/b/file.txt"), vec!["a", "a/b"]);
/// ```
pub fn parent_dirs(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
    let Some((_, parents)) = components.split_last() else {
        return Vec::new();
    };

    let mut current = if absolute { String::from("/") } else { String::new() };
    parents
        .iter()
        .map(|component| {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(component);
            current.clone()
        })
        .collect()
}

/// Returns the final component of a remote path.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
}

/// Joins a remote directory and an entry name with exactly one separator.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_dirs_of_absolute_path() {
        assert_eq!(parent_dirs("/srv/data/in/report.csv"), vec!["/srv", "/srv/data", "/srv/data/in"]);
    }

    #[test]
    fn parent_dirs_of_relative_path() {
        assert_eq!(parent_dirs("upload/2024/file.bin"), vec!["upload", "upload/2024"]);
    }

    #[test]
    fn parent_dirs_collapses_duplicate_separators() {
        assert_eq!(parent_dirs("//srv///data//f"), vec!["/srv", "/srv/data"]);
        assert_eq!(parent_dirs("./a/./b"), vec!["a"]);
    }

    #[test]
    fn parent_dirs_of_top_level_entries_is_empty() {
        assert!(parent_dirs("/file").is_empty());
        assert!(parent_dirs("file").is_empty());
        assert!(parent_dirs("/").is_empty());
        assert!(parent_dirs("").is_empty());
    }

    #[test]
    fn file_name_takes_last_component() {
        assert_eq!(file_name("/srv/data/report.csv"), "report.csv");
        assert_eq!(file_name("/srv/data/"), "data");
        assert_eq!(file_name("plain"), "plain");
        assert_eq!(file_name("/"), "/");
    }

    #[test]
    fn join_uses_single_separator() {
        assert_eq!(join("/srv/", "/file"), "/srv/file");
        assert_eq!(join("/srv", "file"), "/srv/file");
        assert_eq!(join("", "file"), "file");
        assert_eq!(join("/", "file"), "/file");
    }
}
