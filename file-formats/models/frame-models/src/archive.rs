//! Resource archive access for model files and skins
//!
//! Models, skins and voxels are looked up by their full path name inside a
//! resource archive. The archive itself is an external collaborator; this module
//! defines the trait the decoders talk to plus two implementations: an
//! in-memory archive and one backed by a directory tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ModelError, Result};

/// Handle of a single resource inside an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceId(pub u32);

/// Trait for looking up and reading resources by full path name
pub trait ResourceArchive {
    /// Find a resource by its full path name. Matching is case-insensitive.
    fn find(&self, full_name: &str) -> Option<ResourceId>;

    /// Read the complete contents of a resource
    fn read(&self, id: ResourceId) -> Result<Vec<u8>>;

    /// Full path name of a resource
    fn full_name(&self, id: ResourceId) -> Option<&str>;
}

impl<A: ResourceArchive + ?Sized> ResourceArchive for &A {
    fn find(&self, full_name: &str) -> Option<ResourceId> {
        (**self).find(full_name)
    }

    fn read(&self, id: ResourceId) -> Result<Vec<u8>> {
        (**self).read(id)
    }

    fn full_name(&self, id: ResourceId) -> Option<&str> {
        (**self).full_name(id)
    }
}

/// Normalize a directory path: forward slashes and a trailing `/`
pub fn normalize_dir(path: &str) -> String {
    let mut dir = path.replace('\\', "/");
    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }
    dir
}

/// Join a directory and a file name the way model references are resolved
pub fn join_path(dir: &str, file: &str) -> String {
    format!("{}{}", normalize_dir(dir), file.replace('\\', "/"))
}

#[derive(Debug)]
struct MemoryEntry {
    name: String,
    data: Vec<u8>,
}

/// Archive holding its resources in memory.
///
/// Later insertions shadow earlier ones with the same name, matching how
/// resource archives layered on top of each other behave. Every successful
/// [`ResourceArchive::read`] is counted.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    entries: Vec<MemoryEntry>,
    reads: AtomicUsize,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource and return its handle
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> ResourceId {
        self.entries.push(MemoryEntry {
            name: name.into().replace('\\', "/"),
            data,
        });
        ResourceId((self.entries.len() - 1) as u32)
    }

    /// Number of resource reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceArchive for MemoryArchive {
    fn find(&self, full_name: &str) -> Option<ResourceId> {
        let wanted = full_name.replace('\\', "/");
        self.entries
            .iter()
            .rposition(|entry| entry.name.eq_ignore_ascii_case(&wanted))
            .map(|index| ResourceId(index as u32))
    }

    fn read(&self, id: ResourceId) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .get(id.0 as usize)
            .ok_or_else(|| ModelError::NotFound(format!("resource #{}", id.0)))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(entry.data.clone())
    }

    fn full_name(&self, id: ResourceId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.name.as_str())
    }
}

/// Archive backed by a directory tree on disk.
///
/// The tree is indexed once at construction; names are relative to the root
/// and use `/` separators.
#[derive(Debug)]
pub struct DirectoryArchive {
    root: PathBuf,
    names: Vec<String>,
}

impl DirectoryArchive {
    /// Index every file below `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut names = Vec::new();
        collect_files(&root, "", &mut names)?;
        names.sort();
        log::debug!(
            "Indexed {} resources below {}",
            names.len(),
            root.display()
        );
        Ok(Self { root, names })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All indexed resource names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn collect_files(dir: &Path, prefix: &str, names: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let relative = format!("{prefix}{file_name}");
        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), &format!("{relative}/"), names)?;
        } else {
            names.push(relative);
        }
    }
    Ok(())
}

impl ResourceArchive for DirectoryArchive {
    fn find(&self, full_name: &str) -> Option<ResourceId> {
        let wanted = full_name.replace('\\', "/");
        let wanted = wanted.trim_start_matches('/');
        self.names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(wanted))
            .map(|index| ResourceId(index as u32))
    }

    fn read(&self, id: ResourceId) -> Result<Vec<u8>> {
        let name = self
            .names
            .get(id.0 as usize)
            .ok_or_else(|| ModelError::NotFound(format!("resource #{}", id.0)))?;
        Ok(fs::read(self.root.join(name))?)
    }

    fn full_name(&self, id: ResourceId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path_normalizes_separators() {
        assert_eq!(join_path("models\\imp", "imp.md2"), "models/imp/imp.md2");
        assert_eq!(join_path("models/imp/", "imp.md2"), "models/imp/imp.md2");
        assert_eq!(join_path("", "imp.md2"), "imp.md2");
    }

    #[test]
    fn test_memory_archive_later_entries_shadow_earlier() {
        let mut archive = MemoryArchive::new();
        archive.insert("models/a.md2", vec![1]);
        let second = archive.insert("MODELS/A.md2", vec![2]);

        assert_eq!(archive.find("models/a.MD2"), Some(second));
        assert_eq!(archive.read(second).unwrap(), vec![2]);
        assert_eq!(archive.read_count(), 1);
        assert_eq!(archive.find("models/b.md2"), None);
    }

    #[test]
    fn test_directory_archive_indexes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("models/imp")).unwrap();
        fs::write(dir.path().join("models/imp/skin.png"), b"png").unwrap();

        let archive = DirectoryArchive::open(dir.path()).unwrap();
        let id = archive.find("Models/Imp/SKIN.png").unwrap();

        assert_eq!(archive.full_name(id), Some("models/imp/skin.png"));
        assert_eq!(archive.read(id).unwrap(), b"png");
    }
}
