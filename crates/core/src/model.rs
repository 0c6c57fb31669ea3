use serde::{Deserialize, Serialize};

use crate::digest::Digest;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IndexedLocation {
    pub path: String,
}

impl IndexedLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedFile {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub digest: Option<Digest>,
    #[serde(default)]
    pub length: Option<u64>,
}

impl IndexedFile {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        digest: Digest,
        length: Option<u64>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            digest: Some(digest),
            length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub digest: Option<Digest>,
    pub files: Vec<IndexedFile>,
}

impl DuplicateGroup {
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|file| file.path.as_str()).collect()
    }

    pub fn wasted_bytes(&self) -> Option<u64> {
        let length = self.files.first()?.length?;
        Some(length.saturating_mul((self.files.len() as u64).saturating_sub(1)))
    }
}

pub fn flatten_paths(groups: &[DuplicateGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.files.iter().map(|file| file.path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{flatten_paths, DuplicateGroup, IndexedFile, IndexedLocation};
    use crate::digest::Digest;

    fn file(path: &str, byte: u8) -> IndexedFile {
        IndexedFile::new(path, path, Digest::from_bytes(vec![byte; 4]), Some(10))
    }

    #[test]
    fn file_equality_needs_every_field() {
        let base = file("/a", 1);
        assert_eq!(base, file("/a", 1));

        let mut other = base.clone();
        other.name = "b".to_string();
        assert_ne!(base, other);

        let mut other = base.clone();
        other.length = Some(11);
        assert_ne!(base, other);

        let mut other = base.clone();
        other.digest = Some(Digest::from_bytes(vec![2; 4]));
        assert_ne!(base, other);

        let mut other = base.clone();
        other.digest = None;
        assert_ne!(base, other);
    }

    #[test]
    fn location_equality_is_path_only() {
        assert_eq!(IndexedLocation::new("/x"), IndexedLocation::new("/x"));
        assert_ne!(IndexedLocation::new("/x"), IndexedLocation::new("/y"));
    }

    #[test]
    fn groups_flatten_in_order_and_count_waste() {
        let groups = vec![
            DuplicateGroup {
                digest: Some(Digest::from_bytes(vec![1; 4])),
                files: vec![file("/a", 1), file("/b", 1)],
            },
            DuplicateGroup {
                digest: Some(Digest::from_bytes(vec![2; 4])),
                files: vec![file("/c", 2), file("/d", 2), file("/e", 2)],
            },
        ];

        assert_eq!(flatten_paths(&groups), vec!["/a", "/b", "/c", "/d", "/e"]);
        assert_eq!(groups[0].wasted_bytes(), Some(10));
        assert_eq!(groups[1].wasted_bytes(), Some(20));
        assert_eq!(groups[1].paths(), vec!["/c", "/d", "/e"]);
    }
}
