//! Registry of every mesh loaded during a resource generation

use crate::archive::{ResourceArchive, join_path, normalize_dir};
use crate::error::{ModelError, Result};
use crate::mesh::CanonicalMesh;
use crate::vertex_buffer::GeometryUploader;

/// Index of a mesh inside a [`ModelRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Owns loaded meshes; a model file is decoded at most once per generation
#[derive(Debug, Default)]
pub struct ModelRegistry {
    meshes: Vec<CanonicalMesh>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get(&self, id: MeshId) -> Option<&CanonicalMesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut CanonicalMesh> {
        self.meshes.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &CanonicalMesh)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| (MeshId(i as u32), mesh))
    }

    /// Look up an already loaded mesh by its full name, ignoring case
    pub fn find_loaded(&self, full_name: &str) -> Option<MeshId> {
        let wanted = full_name.replace('\\', "/");
        self.meshes
            .iter()
            .position(|mesh| mesh.file_name().eq_ignore_ascii_case(&wanted))
            .map(|i| MeshId(i as u32))
    }

    /// Load `file` from directory `path`, reusing a mesh loaded earlier from
    /// the same resource.
    ///
    /// A missing or undecodable file is logged and returned as an error; the
    /// registry is left unchanged in that case.
    pub fn load_model<A: ResourceArchive + ?Sized>(
        &mut self,
        archive: &A,
        path: &str,
        file: &str,
    ) -> Result<MeshId> {
        let full_name = join_path(path, file);
        let Some(source) = archive.find(&full_name) else {
            log::warn!("Unable to find model '{full_name}'");
            return Err(ModelError::NotFound(full_name));
        };

        let loaded_name = archive.full_name(source).unwrap_or(&full_name);
        let existing = self
            .meshes
            .iter()
            .position(|mesh| mesh.source() == source)
            .map(|i| MeshId(i as u32))
            .or_else(|| self.find_loaded(loaded_name));
        if let Some(existing) = existing {
            log::trace!("Model '{full_name}' already loaded");
            return Ok(existing);
        }

        match CanonicalMesh::load(archive, &normalize_dir(path), source) {
            Ok(mesh) => Ok(self.insert(mesh)),
            Err(err) => {
                log::warn!("Unable to load model '{full_name}': {err}");
                Err(err)
            }
        }
    }

    /// Register an already decoded mesh
    pub fn insert(&mut self, mesh: CanonicalMesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId((self.meshes.len() - 1) as u32)
    }

    /// Realize geometry for every mesh that is not built yet.
    ///
    /// Returns the number of meshes whose geometry is available afterwards.
    pub fn build_all<A, U>(&mut self, archive: &A, uploader: &mut U) -> usize
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
    {
        self.meshes
            .iter_mut()
            .filter_map(|mesh| mesh.build_geometry(archive, uploader).ok())
            .count()
    }

    /// Hand every uploaded buffer back to the uploader
    pub fn release_all<U: GeometryUploader + ?Sized>(&mut self, uploader: &mut U) {
        for mesh in &mut self.meshes {
            mesh.release_geometry(uploader);
        }
    }

    /// Release all geometry and forget every mesh
    pub fn clear<U: GeometryUploader + ?Sized>(&mut self, uploader: &mut U) {
        self.release_all(uploader);
        self.meshes.clear();
    }
}
