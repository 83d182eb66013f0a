//! Class catalog
//!
//! Maps fully-qualified class names to the class files found under a compiled
//! classes directory. Names are derived from the path segment that follows the
//! class-root marker, e.g. with marker `classes/java/test`:
//!
//! ```text
//! /w/build/classes/java/test/com/foo/BarTest.class  ->  com.foo.BarTest
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

pub const CLASS_EXTENSION: &str = ".class";

/// Immutable name -> class file mapping, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
    classes: BTreeMap<String, PathBuf>,
}

impl ClassCatalog {
    /// Recursively scan `root` for class files.
    ///
    /// Files whose name contains `exclusion` are skipped. Files whose path lacks
    /// `marker` are dropped with a warning rather than failing the scan.
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    pub fn scan(root: &Path, marker: &str, exclusion: &str) -> io::Result<Self> {
        let mut files = Vec::new();
        collect_class_files(root, &mut files)?;

        let mut classes = BTreeMap::new();
        for file in files {
            let excluded = file
                .file_name()
                .is_some_and(|name| !exclusion.is_empty() && name.to_string_lossy().contains(exclusion));
            if excluded {
                continue;
            }
            match derive_class_name(&file, marker, CLASS_EXTENSION) {
                Some(name) => {
                    classes.insert(name, file);
                }
                None => tracing::warn!(file = %file.display(), marker, "class file outside the class root; skipped"),
            }
        }
        tracing::debug!(classes = classes.len(), "catalog built");
        Ok(Self { classes })
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (S, PathBuf)>,
        S: Into<String>,
    {
        Self {
            classes: names.into_iter().map(|(n, p)| (n.into(), p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.classes.get(name).map(PathBuf::as_path)
    }

    /// Qualified names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// First class matching `shape` whose name ends with `suffix`.
    pub fn find_driver(&self, shape: &Regex, suffix: &str) -> Option<&str> {
        self.names().find(|name| shape.is_match(name) && name.ends_with(suffix))
    }

    /// Every class except drivers: names ending with `driver_class_name`, as in [`Self::find_driver`].
    pub fn test_classes(&self, driver_class_name: &str) -> Vec<String> {
        self.names()
            .filter(|name| !name.ends_with(driver_class_name))
            .map(str::to_string)
            .collect()
    }
}

fn collect_class_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_class_files(&path, out)?;
        } else if path.to_string_lossy().ends_with(CLASS_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

/// Derive a dotted class name from `path`.
///
/// `marker` is matched as a whole sequence of path components (`/`-separated);
/// everything up to and including its first occurrence is stripped, then the
/// `extension`. Returns `None` when the marker is absent, nothing follows it,
/// or the file does not end with `extension`.
pub fn derive_class_name(path: &Path, marker: &str, extension: &str) -> Option<String> {
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let marker: Vec<&str> = marker.split('/').filter(|s| !s.is_empty()).collect();
    if marker.is_empty() {
        return None;
    }

    let start = components
        .windows(marker.len())
        .position(|window| window.iter().zip(&marker).all(|(a, b)| a == b))?
        + marker.len();

    let rest = components.get(start..).filter(|rest| !rest.is_empty())?;
    let (last, packages) = rest.split_last()?;
    let simple = last.strip_suffix(extension).filter(|s| !s.is_empty())?;

    let mut name = packages.join(".");
    if !name.is_empty() {
        name.push('.');
    }
    name.push_str(simple);
    Some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MARKER: &str = "classes/java/test";

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"\xCA\xFE\xBA\xBE").unwrap();
    }

    #[test]
    fn test_derive_qualified_name() {
        let name = derive_class_name(
            Path::new("/w/build/classes/java/test/com/foo/BarTest.class"),
            MARKER,
            CLASS_EXTENSION,
        );
        assert_eq!(name.as_deref(), Some("com.foo.BarTest"));
    }

    #[test]
    fn test_derive_default_package() {
        let name = derive_class_name(Path::new("build/classes/java/test/Top.class"), MARKER, CLASS_EXTENSION);
        assert_eq!(name.as_deref(), Some("Top"));
    }

    #[test]
    fn test_derive_without_marker() {
        assert!(derive_class_name(Path::new("/w/out/com/foo/BarTest.class"), MARKER, CLASS_EXTENSION).is_none());
        // A partial component match is not the marker.
        assert!(
            derive_class_name(Path::new("/w/classes/java/tests/com/A.class"), MARKER, CLASS_EXTENSION).is_none()
        );
    }

    #[test]
    fn test_derive_rejects_other_extensions() {
        assert!(derive_class_name(Path::new("/w/classes/java/test/a/B.java"), MARKER, CLASS_EXTENSION).is_none());
        assert!(derive_class_name(Path::new("/w/classes/java/test/.class"), MARKER, CLASS_EXTENSION).is_none());
    }

    #[test]
    fn test_scan_skips_synthetic_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("build/classes/java/test");
        touch(&root, "com/foo/BTest.class");
        touch(&root, "com/foo/ATest.class");
        touch(&root, "com/foo/ATest$1.class");
        touch(&root, "com/foo/ATest$Inner.class");
        touch(&root, "com/foo/notes.txt");

        let catalog = ClassCatalog::scan(&root, MARKER, "$").unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["com.foo.ATest", "com.foo.BTest"]);
        assert_eq!(catalog.get("com.foo.ATest"), Some(root.join("com/foo/ATest.class").as_path()));
    }

    #[test]
    fn test_scan_drops_files_outside_marker() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        touch(&root, "com/foo/ATest.class");
        let catalog = ClassCatalog::scan(&root, MARKER, "$").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_scan_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClassCatalog::scan(&dir.path().join("missing"), MARKER, "$").is_err());
    }

    #[test]
    fn test_find_driver_and_test_classes() {
        let shape = crate::config::ToolchainConfig::default().driver_name_regex().unwrap();
        let catalog = ClassCatalog::from_names([
            ("com.foo.ATest", PathBuf::from("a")),
            ("com.foo.driver.TestDriver", PathBuf::from("d")),
            ("com.foo.BTest", PathBuf::from("b")),
        ]);
        assert_eq!(catalog.find_driver(&shape, "TestDriver"), Some("com.foo.driver.TestDriver"));
        assert_eq!(catalog.test_classes("TestDriver"), vec!["com.foo.ATest", "com.foo.BTest"]);

        let suffixed = ClassCatalog::from_names([
            ("com.foo.ATest", PathBuf::from("a")),
            ("com.foo.MyTestDriver", PathBuf::from("m")),
        ]);
        assert_eq!(suffixed.find_driver(&shape, "TestDriver"), Some("com.foo.MyTestDriver"));
        assert_eq!(suffixed.test_classes("TestDriver"), vec!["com.foo.ATest"]);

        let without = ClassCatalog::from_names([("com.foo.ATest", PathBuf::from("a"))]);
        assert_eq!(without.find_driver(&shape, "TestDriver"), None);
    }
}
