use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::RwLock;

use globset::{Glob, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::paths::PathPolicy;

pub trait FileSystem: Send + Sync {
    fn enumerate_files(&self, root: &str, pattern: &str) -> Result<Vec<String>>;

    fn exists(&self, path: &str) -> bool;

    fn full_path(&self, path: &str) -> Result<String>;

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send + '_>>;

    fn file_name(&self, path: &str) -> String {
        Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string())
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[derive(Debug, Clone, Default)]
pub struct OsFileSystem {
    pub follow_links: bool,
}

impl FileSystem for OsFileSystem {
    fn enumerate_files(&self, root: &str, pattern: &str) -> Result<Vec<String>> {
        let matcher = compile_pattern(pattern)?;
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        for item in walker {
            let entry = item.map_err(|source| Error::Walk {
                root: root.to_string(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !matcher.is_match(entry.file_name()) {
                continue;
            }
            files.push(entry.path().to_string_lossy().to_string());
        }

        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn full_path(&self, path: &str) -> Result<String> {
        std::path::absolute(path)
            .map(|absolute| absolute.to_string_lossy().to_string())
            .map_err(|err| Error::io(path, err))
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let file = File::open(path).map_err(|err| Error::io(path, err))?;
        Ok(Box::new(file))
    }
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    policy: PathPolicy,
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    dirs: RwLock<BTreeSet<String>>,
}

impl MemoryFileSystem {
    pub fn new(policy: PathPolicy) -> Self {
        Self {
            policy,
            files: RwLock::default(),
            dirs: RwLock::default(),
        }
    }

    pub fn add_file(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), content.into());
        }
    }

    pub fn add_dir(&self, path: impl Into<String>) {
        if let Ok(mut dirs) = self.dirs.write() {
            dirs.insert(path.into());
        }
    }

    pub fn remove_file(&self, path: &str) -> bool {
        self.files
            .write()
            .map(|mut files| files.remove(path).is_some())
            .unwrap_or(false)
    }

    fn has_dir(&self, root: &str) -> bool {
        self.dirs
            .read()
            .map(|dirs| dirs.iter().any(|dir| self.policy.same_path(dir, root)))
            .unwrap_or(false)
    }
}

impl FileSystem for MemoryFileSystem {
    fn enumerate_files(&self, root: &str, pattern: &str) -> Result<Vec<String>> {
        let matcher = compile_pattern(pattern)?;
        let files = self.files.read().map_err(|_| Error::NotFound {
            path: root.to_string(),
        })?;

        let under_root = files
            .keys()
            .filter(|path| self.policy.is_under(path, root) && *path != root)
            .collect::<Vec<_>>();
        if under_root.is_empty() && !self.has_dir(root) {
            return Err(Error::NotFound {
                path: root.to_string(),
            });
        }

        Ok(under_root
            .into_iter()
            .filter(|path| matcher.is_match(self.file_name(path)))
            .cloned()
            .collect())
    }

    fn exists(&self, path: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn full_path(&self, path: &str) -> Result<String> {
        Ok(path.to_string())
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let files = self.files.read().map_err(|_| Error::NotFound {
            path: path.to_string(),
        })?;
        let content = files.get(path).cloned().ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn file_name(&self, path: &str) -> String {
        path.rsplit(self.policy.separator)
            .next()
            .unwrap_or(path)
            .to_string()
    }
}
