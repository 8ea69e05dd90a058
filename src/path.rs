//! Path normalization and filesystem equivalence.
//!
//! The same source file reaches us under several spellings: the editor's
//! path, the raw bytes TeX wrote into the mapping file, symlinked project
//! directories, lowercase drive letters. Two spellings are equivalent when they
//! resolve to the same real path.

use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf, Prefix, PrefixComponent};

/// Lexically normalize a path.
///
/// Drops `.` components, folds `..` into the preceding normal component and
/// uppercases Windows drive letters. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Prefix(prefix) => out.push(prefix_component(prefix)),
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn prefix_component(prefix: PrefixComponent<'_>) -> OsString {
    match prefix.kind() {
        Prefix::Disk(letter) => format!("{}:", char::from(letter.to_ascii_uppercase())).into(),
        Prefix::VerbatimDisk(letter) => {
            format!(r"\\?\{}:", char::from(letter.to_ascii_uppercase())).into()
        }
        _ => prefix.as_os_str().to_os_string(),
    }
}

/// Resolve a path through the filesystem (symlinks included) and normalize it.
pub fn real_path(path: &Path) -> std::io::Result<PathBuf> {
    std::fs::canonicalize(normalize(path)).map(|p| normalize(&p))
}

/// Whether two paths denote the same filesystem entity.
///
/// A path that cannot be resolved (usually because it does not exist) makes
/// the pair non-equivalent; the failure is never propagated. Callers probing
/// many spellings report the overall miss themselves.
pub fn is_same_real_path(a: &Path, b: &Path) -> bool {
    let resolve = |path: &Path| {
        real_path(path)
            .inspect_err(|e| tracing::debug!("Cannot resolve real path of {}: {}", path.display(), e))
            .ok()
    };
    let Some(a) = resolve(a) else {
        return false;
    };
    let Some(b) = resolve(b) else {
        return false;
    };
    a == b
}

/// Interpret raw bytes as a native path.
///
/// On Unix any byte sequence is a valid path. Elsewhere only UTF-8 is.
#[cfg(unix)]
pub fn path_from_bytes(raw: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(std::ffi::OsStr::from_bytes(raw)))
}

#[cfg(not(unix))]
pub fn path_from_bytes(raw: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(raw).ok().map(PathBuf::from)
}

/// Expand tilde (`~`) in paths to the user's home directory.
///
/// Examples:
/// - `~/papers/thesis.pdf` becomes `/home/user/papers/thesis.pdf`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b/", "/a/b")]
    #[case("/..", "/")]
    #[case("a/../../b", "../b")]
    #[case("./", ".")]
    #[case("doc.tex", "doc.tex")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        check!(normalize(Path::new(input)) == Path::new(expected));
    }

    #[cfg(windows)]
    #[test]
    fn test_normalize_drive_letter() {
        check!(normalize(Path::new(r"c:\Users\doc.tex")) == Path::new(r"C:\Users\doc.tex"));
        check!(normalize(Path::new("c:/Users/doc.tex")) == Path::new(r"C:\Users\doc.tex"));
    }

    #[test]
    fn test_same_real_path_is_reflexive() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.tex");
        std::fs::write(&file, "").unwrap();
        check!(is_same_real_path(&file, &file));
    }

    #[test]
    fn test_same_real_path_across_spellings() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let file = dir.path().join("doc.tex");
        std::fs::write(&file, "").unwrap();
        let other = dir.path().join("sub/.././doc.tex");

        check!(is_same_real_path(&file, &other));
        check!(is_same_real_path(&other, &file));
    }

    #[cfg(unix)]
    #[test]
    fn test_same_real_path_through_symlink() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        let file = dir.path().join("real/doc.tex");
        std::fs::write(&file, "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        let aliased = dir.path().join("link/doc.tex");

        check!(is_same_real_path(&file, &aliased));
        check!(is_same_real_path(&aliased, &file));
    }

    #[test]
    fn test_distinct_files_are_not_same() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.tex");
        let b = dir.path().join("b.tex");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();
        check!(!is_same_real_path(&a, &b));
    }

    #[test]
    fn test_missing_file_is_not_same() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.tex");
        check!(!is_same_real_path(&missing, &missing));
    }

    #[test]
    fn test_path_from_utf8_bytes() {
        check!(path_from_bytes(b"/tmp/doc.tex") == Some(PathBuf::from("/tmp/doc.tex")));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        check!(expand_tilde("/tmp/doc.pdf") == "/tmp/doc.pdf");
        check!(expand_tilde("doc~.pdf") == "doc~.pdf");
    }
}
