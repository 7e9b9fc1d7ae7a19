//! Recursive file enumeration with the module-tree ignore rules.

use std::path::{Path, PathBuf};

use crate::error::{ManifestError, Result};

/// Which conventional directories to skip while walking a module.
///
/// Dotted directories are always skipped; the rest are individually
/// toggleable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub skip_vendor: bool,
    pub skip_assets: bool,
    pub skip_lang: bool,
    pub skip_tests: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            skip_vendor: true,
            skip_assets: true,
            skip_lang: true,
            skip_tests: true,
        }
    }
}

impl WalkOptions {
    pub fn including_tests(mut self) -> Self {
        self.skip_tests = false;
        self
    }

    fn skips_dir(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }
        let name = name.to_lowercase();
        (self.skip_vendor && name == "vendor")
            || (self.skip_assets && name == "assets")
            || (self.skip_lang && name == "lang")
            || (self.skip_tests && (name == "tests" || name == "test"))
    }
}

/// Enumerates files with a given extension under a root, applying the
/// ignore rules, and invokes a callback per matched file.
///
/// Traversal is sorted by file name, so callers observe files in a
/// deterministic order regardless of directory enumeration order.
#[derive(Debug, Clone)]
pub struct FileWalker {
    root: PathBuf,
    extension: String,
    options: WalkOptions,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, options: WalkOptions) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            options,
        }
    }

    pub fn walk(&self, mut callback: impl FnMut(&Path) -> Result<()>) -> Result<()> {
        let options = self.options;
        let walker = walkdir::WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if !entry.file_type().is_dir() || entry.depth() == 0 {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !options.skips_dir(name))
                    .unwrap_or(false)
            });

        for entry in walker {
            let entry = entry.map_err(|source| ManifestError::Walk {
                path: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension));
            if matches {
                callback(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn walk_names(root: &Path, options: WalkOptions) -> Vec<String> {
        let mut names = Vec::new();
        FileWalker::new(root, "php", options)
            .walk(|path| {
                names.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                );
                Ok(())
            })
            .unwrap();
        names
    }

    #[test]
    fn skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("code/Page.php"));
        touch(&root.join("vendor/dep/Dep.php"));
        touch(&root.join("assets/Upload.php"));
        touch(&root.join("lang/en.php"));
        touch(&root.join("tests/PageTest.php"));
        touch(&root.join(".git/hook.php"));
        touch(&root.join("code/readme.md"));

        assert_eq!(walk_names(root, WalkOptions::default()), vec!["code/Page.php"]);
    }

    #[test]
    fn test_directories_are_toggleable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("code/Page.php"));
        touch(&root.join("tests/PageTest.php"));

        let names = walk_names(root, WalkOptions::default().including_tests());
        assert_eq!(names, vec!["code/Page.php", "tests/PageTest.php"]);
    }

    #[test]
    fn order_is_sorted_and_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.php"));
        touch(&root.join("a.php"));
        touch(&root.join("sub/c.php"));

        assert_eq!(
            walk_names(root, WalkOptions::default()),
            vec!["a.php", "b.php", "sub/c.php"]
        );
    }
}
