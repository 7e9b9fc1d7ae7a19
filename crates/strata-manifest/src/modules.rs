//! Module discovery.
//!
//! A module is a directory directly under the scan root carrying either a
//! `_config.php` entry file or a `_config/` directory. Fragment files live
//! under `_config/` with a `.yml` extension.

use std::path::{Path, PathBuf};

use crate::error::{ManifestError, Result};

pub const CONFIG_FILE: &str = "_config.php";
pub const CONFIG_DIR: &str = "_config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub root: PathBuf,
}

impl Module {
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }
}

/// Find every module under `root`, sorted by name.
pub fn discover_modules(root: &Path) -> Result<Vec<Module>> {
    let mut modules = Vec::new();

    let entries = std::fs::read_dir(root).map_err(|source| ManifestError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ManifestError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if is_module(&path) {
            modules.push(Module {
                name: name.to_string(),
                root: path,
            });
        }
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(modules)
}

fn is_module(path: &Path) -> bool {
    path.join(CONFIG_FILE).is_file() || path.join(CONFIG_DIR).is_dir()
}

/// The module's `_config/*.yml` fragment files, sorted by file stem.
pub fn fragment_files(module: &Module) -> Result<Vec<PathBuf>> {
    let config_dir = module.config_dir();
    if !config_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(&config_dir).map_err(|source| ManifestError::Io {
        path: config_dir.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ManifestError::Io {
            path: config_dir.clone(),
            source,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_marked_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        std::fs::create_dir_all(root.join("framework/_config")).unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("app/_config.php"), "<?php\n").unwrap();
        std::fs::create_dir_all(root.join("not-a-module/src")).unwrap();
        std::fs::create_dir_all(root.join(".hidden/_config")).unwrap();

        let modules = discover_modules(root).unwrap();
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["app", "framework"]);
    }

    #[test]
    fn fragment_files_are_yaml_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = root.join("app/_config");
        std::fs::create_dir_all(&config).unwrap();
        std::fs::write(config.join("routes.yml"), "").unwrap();
        std::fs::write(config.join("admin.yaml"), "").unwrap();
        std::fs::write(config.join("notes.txt"), "").unwrap();

        let modules = discover_modules(root).unwrap();
        let files = fragment_files(&modules[0]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["admin.yaml", "routes.yml"]);
    }
}
