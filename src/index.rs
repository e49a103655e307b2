//! Directory validation and per-root size indexing
//!
//! A [`Session`] owns everything that is memoized during one run: the size of
//! each file already stat'd, and the finished index for each resolved root.
//! Supplying the same directory twice, or two directories that overlap,
//! never stats a file more than once.

use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{DirDiffError, Result};

/// Relative file key -> size in bytes, in traversal order.
///
/// Keys stay as paths so names that are not valid UTF-8 never collide; they
/// are only made lossy when rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryIndex {
    sizes: IndexMap<PathBuf, u64>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<PathBuf>, size: u64) {
        self.sizes.insert(key.into(), size);
    }

    pub fn get(&self, key: impl AsRef<Path>) -> Option<u64> {
        self.sizes.get(key.as_ref()).copied()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, u64)> {
        self.sizes.iter().map(|(k, v)| (k.as_path(), *v))
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl<K: Into<PathBuf>> FromIterator<(K, u64)> for DirectoryIndex {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut index = DirectoryIndex::new();
        for (key, size) in iter {
            index.insert(key, size);
        }
        index
    }
}

/// An index together with the label its root is shown under in the report
#[derive(Debug, Clone)]
pub struct LabelledIndex {
    pub label: String,
    pub index: Rc<DirectoryIndex>,
}

/// Label a root by its final path component, e.g. `build/out/` -> `out`
pub fn root_label(dir: &str) -> String {
    Path::new(dir)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string())
}

/// Memoized state for one invocation
#[derive(Debug)]
pub struct Session {
    cwd: PathBuf,
    file_sizes: HashMap<PathBuf, u64>,
    indexes: HashMap<PathBuf, Rc<DirectoryIndex>>,
}

impl Session {
    /// Relative paths are resolved against `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            file_sizes: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    pub fn resolve(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Check that every supplied path exists and is a directory.
    ///
    /// Stops at the first bad path, reported as the operator typed it.
    pub fn validate<S: AsRef<str>>(&self, dirs: &[S]) -> Result<()> {
        for dir in dirs {
            let dir = dir.as_ref();
            match fs::metadata(self.resolve(dir)) {
                Ok(md) if md.is_dir() => {}
                Ok(_) => return Err(DirDiffError::NotADirectory { path: dir.into() }),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(DirDiffError::NotFound { path: dir.into() })
                }
                Err(e) => return Err(DirDiffError::io(format!("failed to stat {dir}"), e)),
            }
        }
        Ok(())
    }

    /// Index each directory in input order, reusing earlier results
    pub fn index_all<S: AsRef<str>>(&mut self, dirs: &[S]) -> Result<Vec<LabelledIndex>> {
        dirs.iter()
            .map(|dir| {
                let dir = dir.as_ref();
                let root = self.resolve(dir);
                let index = self.index(&root)?;
                Ok(LabelledIndex {
                    label: root_label(dir),
                    index,
                })
            })
            .collect()
    }

    /// Index one absolute root, or return the index already built for it
    pub fn index(&mut self, root: &Path) -> Result<Rc<DirectoryIndex>> {
        if let Some(index) = self.indexes.get(root) {
            debug!("reusing index for {}", root.display());
            return Ok(Rc::clone(index));
        }

        debug!("indexing {}", root.display());
        let mut index = DirectoryIndex::new();
        self.walk(root, Path::new(""), &mut index)?;
        debug!("indexed {} files under {}", index.len(), root.display());

        let index = Rc::new(index);
        self.indexes.insert(root.to_path_buf(), Rc::clone(&index));
        Ok(index)
    }

    /// Number of distinct files whose size has been looked up
    pub fn files_seen(&self) -> usize {
        self.file_sizes.len()
    }

    fn walk(&mut self, dir: &Path, prefix: &Path, index: &mut DirectoryIndex) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| {
            DirDiffError::io(format!("failed to read directory {}", dir.display()), e)
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                DirDiffError::io(format!("failed to read entry in {}", dir.display()), e)
            })?;
            let path = entry.path();
            let key = prefix.join(entry.file_name());

            let mut file_type = entry
                .file_type()
                .map_err(|e| DirDiffError::io(format!("failed to stat {}", path.display()), e))?;
            // follow links to find out what they point at
            if file_type.is_symlink() {
                file_type = stat(&path)?.file_type();
            }

            if file_type.is_dir() {
                self.walk(&path, &key, index)?;
            } else {
                let size = self.file_size(&path)?;
                index.insert(key, size);
            }
        }

        Ok(())
    }

    /// Size of a file, stat'ing it only the first time it is seen
    fn file_size(&mut self, path: &Path) -> Result<u64> {
        if let Some(&size) = self.file_sizes.get(path) {
            trace!("size cache hit for {}", path.display());
            return Ok(size);
        }
        let size = stat(path)?.len();
        self.file_sizes.insert(path.to_path_buf(), size);
        Ok(size)
    }
}

fn stat(path: &Path) -> Result<fs::Metadata> {
    fs::metadata(path).map_err(|e| DirDiffError::io(format!("failed to stat {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, len: usize) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    fn sorted(index: &DirectoryIndex) -> BTreeMap<String, u64> {
        index
            .iter()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v))
            .collect()
    }

    #[test]
    fn test_flat_directory_keys_are_file_names() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.txt", 10);
        write_file(tmp.path(), "b.bin", 2048);
        write_file(tmp.path(), "empty", 0);

        let mut session = Session::new(tmp.path());
        let index = session.index(tmp.path()).unwrap();

        let expected: BTreeMap<String, u64> = [
            ("a.txt".to_string(), 10),
            ("b.bin".to_string(), 2048),
            ("empty".to_string(), 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(sorted(&index), expected);
    }

    #[test]
    fn test_nested_files_keyed_relative_to_root() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "top.txt", 1);
        write_file(tmp.path(), "sub/mid.txt", 2);
        write_file(tmp.path(), "sub/deep/leaf.txt", 3);
        fs::create_dir_all(tmp.path().join("hollow/inner")).unwrap();

        let mut session = Session::new(tmp.path());
        let index = session.index(tmp.path()).unwrap();

        let mid = Path::new("sub").join("mid.txt");
        let leaf = Path::new("sub").join("deep").join("leaf.txt");

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("top.txt"), Some(1));
        assert_eq!(index.get(&mid), Some(2));
        assert_eq!(index.get(&leaf), Some(3));
    }

    #[test]
    fn test_empty_directory_has_no_keys() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::new(tmp.path());
        assert!(session.index(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_same_root_twice_reuses_index() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "data/f1", 100);
        write_file(tmp.path(), "data/nested/f2", 5);

        let mut session = Session::new(tmp.path());
        let roots = session.index_all(&["data", "data"]).unwrap();

        assert_eq!(roots.len(), 2);
        assert!(Rc::ptr_eq(&roots[0].index, &roots[1].index));
        assert_eq!(*roots[0].index, *roots[1].index);
        assert_eq!(session.files_seen(), 2);
    }

    #[test]
    fn test_overlapping_roots_stat_each_file_once() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "outer/x", 4);
        write_file(tmp.path(), "outer/inner/y", 8);

        let mut session = Session::new(tmp.path());
        let outer = session.index(&tmp.path().join("outer")).unwrap();
        assert_eq!(outer.len(), 2);

        // a fresh stat would now see 0 bytes
        fs::write(tmp.path().join("outer/inner/y"), b"").unwrap();

        let inner = session.index(&tmp.path().join("outer/inner")).unwrap();
        assert_eq!(inner.get("y"), Some(8));
        assert_eq!(session.files_seen(), 2);
    }

    #[test]
    fn test_new_session_sees_current_sizes() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "d/f", 8);
        Session::new(tmp.path()).index_all(&["d"]).unwrap();

        fs::write(tmp.path().join("d/f"), b"").unwrap();
        let roots = Session::new(tmp.path()).index_all(&["d"]).unwrap();
        assert_eq!(roots[0].index.get("f"), Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_followed() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "target/inside", 6);
        write_file(tmp.path(), "root/real", 2);
        std::os::unix::fs::symlink(tmp.path().join("target"), tmp.path().join("root/linked"))
            .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("root/real"), tmp.path().join("root/alias"))
            .unwrap();

        let mut session = Session::new(tmp.path());
        let index = session.index(&tmp.path().join("root")).unwrap();
        assert_eq!(index.get(Path::new("linked").join("inside")), Some(6));
        assert_eq!(index.get("alias"), Some(2));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_stay_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(OsStr::from_bytes(b"a\xff")), b"1").unwrap();
        fs::write(tmp.path().join(OsStr::from_bytes(b"a\xfe")), b"22").unwrap();

        let mut session = Session::new(tmp.path());
        let index = session.index(tmp.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(OsStr::from_bytes(b"a\xff")), Some(1));
        assert_eq!(index.get(OsStr::from_bytes(b"a\xfe")), Some(2));
    }

    /// Make `dir` unreadable; `None` when permissions are not enforced (root)
    #[cfg(unix)]
    fn lock(dir: &Path) -> Option<Locked> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
        let locked = Locked(dir.to_path_buf());
        if fs::read_dir(dir).is_ok() {
            return None;
        }
        Some(locked)
    }

    #[cfg(unix)]
    struct Locked(PathBuf);

    #[cfg(unix)]
    impl Drop for Locked {
        fn drop(&mut self) {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.0, fs::Permissions::from_mode(0o755));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "root/ok", 1);
        write_file(tmp.path(), "root/locked/hidden", 1);
        let Some(_guard) = lock(&tmp.path().join("root/locked")) else {
            return;
        };

        let mut session = Session::new(tmp.path());
        let err = session.index_all(&["root"]).unwrap_err();
        assert!(matches!(err, DirDiffError::Io { .. }));
        assert_eq!(err.exit_code(), 74);
        assert!(err.to_string().contains("locked"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_reports_permission_errors_as_io() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("locked/child")).unwrap();
        let Some(_guard) = lock(&tmp.path().join("locked")) else {
            return;
        };

        let err = Session::new(tmp.path())
            .validate(&["locked/child"])
            .unwrap_err();
        assert!(matches!(err, DirDiffError::Io { .. }));
        assert!(err.to_string().contains("locked/child"));
    }

    #[test]
    fn test_labels_use_final_component() {
        assert_eq!(root_label("build/out"), "out");
        assert_eq!(root_label("build/out/"), "out");
        assert_eq!(root_label("/abs/path/dist"), "dist");
        assert_eq!(root_label("."), ".");
    }

    #[test]
    fn test_validate_rejects_missing_and_file_paths() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "plain.txt", 1);
        fs::create_dir(tmp.path().join("real")).unwrap();
        let session = Session::new(tmp.path());

        assert!(session.validate(&["real"]).is_ok());

        let err = session.validate(&["real", "plain.txt"]).unwrap_err();
        assert!(matches!(err, DirDiffError::NotADirectory { .. }));
        assert_eq!(err.to_string(), "plain.txt is not a directory");

        let err = session.validate(&["missing", "real"]).unwrap_err();
        assert!(matches!(err, DirDiffError::NotFound { .. }));
        assert_eq!(err.to_string(), "missing does not exist");
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let session = Session::new("/work");
        assert_eq!(session.resolve("/tmp/a"), PathBuf::from("/tmp/a"));
        assert_eq!(session.resolve("rel/b"), PathBuf::from("/work/rel/b"));
    }
}
