//! Filesystem path containment for the directory browser.
//!
//! Any handler touching the host filesystem on behalf of a request resolves
//! the user-supplied path through [`sanitize`] and checks it against the
//! configured allow-list roots with [`PathGuard::is_allowed`] before any I/O.

use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Normalize a user-supplied path to an absolute, separator-normalized form.
///
/// NUL bytes are stripped, both `/` and `\` are treated as separators, `.`
/// and `..` segments are resolved lexically (never through the filesystem),
/// and relative inputs are anchored at the process working directory.
/// Idempotent: sanitizing an already-sanitized path returns it unchanged.
pub fn sanitize(raw: &str) -> PathBuf {
    let cleaned: String = raw.chars().filter(|c| *c != '\0').collect();
    let is_absolute = cleaned.starts_with('/') || cleaned.starts_with('\\');

    let mut stack: Vec<String> = if is_absolute {
        Vec::new()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from(MAIN_SEPARATOR_STR))
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    };

    for segment in cleaned.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            part => stack.push(part.to_string()),
        }
    }

    let mut resolved = PathBuf::from(MAIN_SEPARATOR_STR);
    for part in stack {
        resolved.push(part);
    }
    resolved
}

/// Display heuristic: does the path look like it has a browsable parent?
///
/// True when the path is absolute with at least one component beyond the
/// root anchor. This is a path-shape test for the UI, not a filesystem truth
/// and not a security check; containment is [`PathGuard::is_allowed`].
pub fn has_parent(path: &Path) -> bool {
    path.is_absolute()
        && path
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
}

/// Immediate children of a directory, classified by stat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryContents {
    /// Names of child directories, sorted.
    pub directories: Vec<String>,
    /// Names of child files, sorted.
    pub files: Vec<String>,
}

/// Containment guard over a configured set of allow-list roots.
#[derive(Clone, Debug)]
pub struct PathGuard {
    roots: Vec<PathBuf>,
}

impl PathGuard {
    /// Create a guard from the configured allow-list.
    ///
    /// Roots are themselves sanitized, so containment checks always compare
    /// two normalized absolute paths.
    pub fn new(allow_list: &[PathBuf]) -> Self {
        let roots = allow_list
            .iter()
            .map(|root| sanitize(&root.to_string_lossy()))
            .collect();
        Self { roots }
    }

    /// Check whether a resolved path is equal to or a descendant of at least
    /// one allow-list root.
    ///
    /// Comparison is component-wise on the normalized absolute form, so
    /// `/data/downloads-evil` is not contained in root `/data/downloads`,
    /// and traversal or mixed-separator spellings were already flattened by
    /// [`sanitize`].
    pub fn is_allowed(&self, resolved: &Path) -> bool {
        self.roots.iter().any(|root| resolved.starts_with(root))
    }

    /// Enumerate the immediate children of an allowed resolved path.
    ///
    /// Runs the stat/readdir work on the blocking pool so a slow filesystem
    /// cannot stall unrelated request processing.
    pub async fn list(&self, resolved: PathBuf) -> std::io::Result<DirectoryContents> {
        tokio::task::spawn_blocking(move || list_sync(&resolved))
            .await
            .map_err(|e| std::io::Error::other(format!("listing task failed: {e}")))?
    }
}

fn list_sync(path: &Path) -> std::io::Result<DirectoryContents> {
    let mut contents = DirectoryContents::default();

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        // Stat through symlinks; unreadable children are skipped rather than
        // failing the whole listing.
        let Ok(metadata) = std::fs::metadata(entry.path()) else {
            continue;
        };

        if metadata.is_dir() {
            contents.directories.push(name);
        } else {
            contents.files.push(name);
        }
    }

    contents.directories.sort();
    contents.files.sort();
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_resolves_traversal() {
        assert_eq!(sanitize("/data/downloads/../../etc"), PathBuf::from("/etc"));
        assert_eq!(sanitize("/../../.."), PathBuf::from("/"));
    }

    #[test]
    fn sanitize_normalizes_separators_and_dots() {
        assert_eq!(
            sanitize("/data//downloads/./movies/"),
            PathBuf::from("/data/downloads/movies")
        );
        assert_eq!(
            sanitize("\\data\\downloads\\movies"),
            PathBuf::from("/data/downloads/movies")
        );
        assert_eq!(
            sanitize("/data\\downloads/movies"),
            PathBuf::from("/data/downloads/movies")
        );
    }

    #[test]
    fn sanitize_strips_nul_bytes() {
        assert_eq!(sanitize("/da\0ta/file"), PathBuf::from("/data/file"));
    }

    #[test]
    fn sanitize_anchors_relative_paths() {
        let resolved = sanitize("downloads/movies");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("downloads/movies"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in [
            "/data/downloads/../../etc",
            "relative/path",
            "\\mixed/separators\\here",
            "/trailing/slash/",
            "",
        ] {
            let once = sanitize(input);
            let twice = sanitize(&once.to_string_lossy());
            assert_eq!(once, twice, "input: {input:?}");
        }
    }

    #[test]
    fn is_allowed_requires_containment() {
        let guard = PathGuard::new(&[PathBuf::from("/data/downloads")]);

        assert!(guard.is_allowed(Path::new("/data/downloads")));
        assert!(guard.is_allowed(Path::new("/data/downloads/movies/file.mkv")));
        assert!(!guard.is_allowed(Path::new("/data")));
        assert!(!guard.is_allowed(Path::new("/etc")));
        // Sibling with a shared string prefix is not a descendant.
        assert!(!guard.is_allowed(Path::new("/data/downloads-evil")));
    }

    #[test]
    fn is_allowed_any_root_suffices() {
        let guard = PathGuard::new(&[
            PathBuf::from("/data/downloads"),
            PathBuf::from("/mnt/media"),
        ]);

        assert!(guard.is_allowed(Path::new("/mnt/media/tv")));
        assert!(!guard.is_allowed(Path::new("/mnt/other")));
    }

    #[test]
    fn traversal_resolves_to_disallowed_path() {
        let guard = PathGuard::new(&[PathBuf::from("/data/downloads")]);
        let resolved = sanitize("/data/downloads/../../etc");
        assert!(!guard.is_allowed(&resolved));
    }

    #[test]
    fn unsanitized_roots_are_normalized() {
        let guard = PathGuard::new(&[PathBuf::from("/data//downloads/")]);
        assert!(guard.is_allowed(Path::new("/data/downloads/movies")));
    }

    #[test]
    fn has_parent_is_a_shape_test() {
        assert!(!has_parent(Path::new("/")));
        assert!(has_parent(Path::new("/data")));
        assert!(has_parent(Path::new("/data/downloads")));
    }

    #[tokio::test]
    async fn list_classifies_children() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("b.txt"), b"b").unwrap();
        std::fs::write(temp.path().join("a.txt"), b"a").unwrap();

        let guard = PathGuard::new(&[temp.path().to_path_buf()]);
        let contents = guard.list(temp.path().to_path_buf()).await.unwrap();

        assert_eq!(contents.directories, vec!["sub".to_string()]);
        assert_eq!(contents.files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn list_missing_directory_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(&[temp.path().to_path_buf()]);

        let err = guard
            .list(temp.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
