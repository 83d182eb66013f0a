//! Ordered, de-duplicated classpath
//!
//! Every external tool receives the whole set. The only difference between
//! tools is how the set is rendered: a plain path list or a list of `file:`
//! URLs. Both use the platform path separator.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

/// Platform path-list separator (`:` on unix, `;` on windows).
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Ordered set of classpath entries.
///
/// Insertion keeps the first occurrence of a path; later duplicates are
/// ignored without reordering anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathSet {
    entries: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl ClasspathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` if it was already present.
    pub fn insert(&mut self, entry: impl Into<PathBuf>) -> bool {
        let entry = entry.into();
        if self.seen.contains(&entry) {
            return false;
        }
        self.seen.insert(entry.clone());
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn contains(&self, entry: &Path) -> bool {
        self.seen.contains(entry)
    }

    /// Whether any entry's textual path contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.to_string_lossy().contains(needle))
    }

    /// Whether any entry's file name equals `file_name`.
    pub fn has_file_named(&self, file_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.file_name().is_some_and(|n| n == file_name))
    }

    /// Plain path list, e.g. `a.jar:b.jar:classes`.
    pub fn join_paths(&self) -> String {
        let sep = PATH_SEPARATOR.to_string();
        self.entries
            .iter()
            .map(|e| e.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(&sep)
    }

    /// `file:` URL list, e.g. `file:/x/a.jar:file:/x/classes/`.
    ///
    /// Relative entries are resolved against the current directory first.
    /// Directories get a trailing slash, files do not.
    pub fn join_urls(&self) -> io::Result<String> {
        let cwd = std::env::current_dir()?;
        let mut urls = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            urls.push(file_url(&cwd.join(entry))?.to_string());
        }
        Ok(urls.join(&PATH_SEPARATOR.to_string()))
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ClasspathSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = ClasspathSet::new();
        set.extend(iter);
        set
    }
}

impl<P: Into<PathBuf>> Extend<P> for ClasspathSet {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

fn file_url(path: &Path) -> io::Result<Url> {
    let url = if path.is_dir() {
        Url::from_directory_path(path)
    } else {
        Url::from_file_path(path)
    };
    url.map_err(|()| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot express {} as a file URL", path.display()),
        )
    })
}

/// List the `*.jar` files directly inside `dir`, sorted by path.
pub fn jars_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jar") {
            jars.push(path);
        }
    }
    jars.sort();
    Ok(jars)
}
