//! Canonical in-memory mesh shared by every model format

use crate::archive::{ResourceArchive, ResourceId};
use crate::error::{ModelError, Result};
use crate::formats::{self, MeshInfo, MeshLayout, ModelFormat, VoxelPalette};
use crate::skin::{SkinTexture, load_skin};
use crate::vertex_buffer::{GeometryHandle, GeometryUploader, build_vertex_buffer};

/// Name and buffer position of one animation frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub name: String,
    /// Start of this frame in the vertex buffer, `None` until geometry is built
    pub vertex_offset: Option<u32>,
}

/// Lifecycle of a mesh's GPU geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryState {
    #[default]
    Unbuilt,
    Built(GeometryHandle),
    /// Realization failed; the mesh is unusable until the next load generation
    Failed,
}

/// A decoded model: skins, frame table and the header needed to realize
/// geometry later
#[derive(custom_debug::Debug)]
pub struct CanonicalMesh {
    format: ModelFormat,
    file_name: String,
    source: ResourceId,
    skins: Vec<Option<SkinTexture>>,
    #[debug(with = crate::debug::trimmed_collection_fmt)]
    frames: Vec<FrameDescriptor>,
    #[debug(skip)]
    layout: MeshLayout,
    state: GeometryState,
    vertices_per_frame: u32,
}

impl CanonicalMesh {
    /// Read and decode a model resource, resolving its skins next to it
    pub fn load<A: ResourceArchive + ?Sized>(
        archive: &A,
        path: &str,
        source: ResourceId,
    ) -> Result<Self> {
        let file_name = archive
            .full_name(source)
            .map_or_else(|| format!("resource #{}", source.0), str::to_string);
        let data = archive.read(source)?;
        let decoded = formats::decode(&data, &file_name)?;

        let skins = match decoded.format {
            ModelFormat::Kvx => vec![Some(SkinTexture::VoxelPalette)],
            _ => decoded
                .skin_names
                .iter()
                .map(|skin| load_skin(archive, path, skin))
                .collect(),
        };

        let frames = decoded
            .frame_names
            .into_iter()
            .map(|name| FrameDescriptor {
                name,
                vertex_offset: None,
            })
            .collect();

        Ok(Self {
            format: decoded.format,
            file_name,
            source,
            skins,
            frames,
            layout: decoded.layout,
            state: GeometryState::Unbuilt,
            vertices_per_frame: 0,
        })
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    /// Full archive name the mesh was loaded from
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> ResourceId {
        self.source
    }

    pub fn skins(&self) -> &[Option<SkinTexture>] {
        &self.skins
    }

    /// First skin the model declares, if it could be resolved
    pub fn default_skin(&self) -> Option<&SkinTexture> {
        self.skins.first().and_then(Option::as_ref)
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the first frame whose name matches, ignoring ASCII case.
    /// Voxel meshes have a single frame that answers to every name.
    pub fn find_frame(&self, name: &str) -> Option<usize> {
        if self.format == ModelFormat::Kvx {
            return Some(0);
        }
        self.frames
            .iter()
            .position(|frame| frame.name.eq_ignore_ascii_case(name))
    }

    /// Header of a frame-animated mesh
    pub fn info(&self) -> Option<&MeshInfo> {
        match &self.layout {
            MeshLayout::Frames(info) => Some(info),
            MeshLayout::Voxel(_) => None,
        }
    }

    /// Palette embedded in a voxel mesh
    pub fn palette(&self) -> Option<&VoxelPalette> {
        match &self.layout {
            MeshLayout::Voxel(info) => Some(&info.palette),
            MeshLayout::Frames(_) => None,
        }
    }

    pub fn geometry_state(&self) -> GeometryState {
        self.state
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, GeometryState::Built(_))
    }

    /// Number of buffer vertices drawn for one frame, zero before building
    pub fn vertices_per_frame(&self) -> u32 {
        self.vertices_per_frame
    }

    /// Buffer offset of a frame once geometry is built
    pub fn frame_offset(&self, frame: usize) -> Option<u32> {
        self.frames.get(frame).and_then(|f| f.vertex_offset)
    }

    /// Realize the vertex buffer and hand it to `uploader`.
    ///
    /// Calling this on a built mesh does nothing. The packed vertex data is
    /// re-read from the archive, unpacked, interleaved and uploaded; the
    /// intermediate tables are dropped before returning. A failure marks the
    /// mesh unusable and later calls fail without touching the archive.
    pub fn build_geometry<A, U>(&mut self, archive: &A, uploader: &mut U) -> Result<()>
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
    {
        match self.state {
            GeometryState::Built(_) => return Ok(()),
            GeometryState::Failed => {
                return Err(ModelError::geometry(
                    &self.file_name,
                    "geometry previously failed to build",
                ));
            }
            GeometryState::Unbuilt => {}
        }

        match self.realize(archive, uploader) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("Unable to build geometry for '{}': {err}", self.file_name);
                self.state = GeometryState::Failed;
                Err(err)
            }
        }
    }

    fn realize<A, U>(&mut self, archive: &A, uploader: &mut U) -> Result<()>
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
    {
        let data = archive.read(self.source)?;
        let geometry = formats::load_geometry(self.format, &self.layout, &data, &self.file_name)?;
        if geometry.frames.len() != self.frames.len() {
            return Err(ModelError::geometry(
                &self.file_name,
                format!(
                    "{} frames decoded, {} expected",
                    geometry.frames.len(),
                    self.frames.len()
                ),
            ));
        }

        let buffer = build_vertex_buffer(&geometry, &self.file_name)?;
        drop(geometry);

        let handle = uploader.upload(&buffer.vertices)?;
        for (frame, offset) in self.frames.iter_mut().zip(&buffer.frame_offsets) {
            frame.vertex_offset = Some(*offset);
        }
        self.vertices_per_frame = buffer
            .frame_offsets
            .get(1)
            .copied()
            .unwrap_or(buffer.vertices.len() as u32);
        self.state = GeometryState::Built(handle);

        log::debug!(
            "Built {} vertices for '{}' ({} frames)",
            buffer.vertices.len(),
            self.file_name,
            self.frames.len()
        );
        Ok(())
    }

    /// Return uploaded storage and go back to the unbuilt state
    pub fn release_geometry<U: GeometryUploader + ?Sized>(&mut self, uploader: &mut U) {
        if let GeometryState::Built(handle) = self.state {
            uploader.release(handle);
        }
        for frame in &mut self.frames {
            frame.vertex_offset = None;
        }
        self.vertices_per_frame = 0;
        self.state = GeometryState::Unbuilt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::fixtures::{FrameSpec, Md2Builder, RecordingUploader};

    fn archive_with_model() -> (MemoryArchive, ResourceId) {
        let mut archive = MemoryArchive::new();
        archive.insert("models/imp/skin.png", vec![]);
        let id = archive.insert(
            "models/imp/imp.md2",
            Md2Builder::new(3, 2)
                .skin("skin.pcx")
                .skin("missing.pcx")
                .frame(FrameSpec::new("Run1"))
                .frame(FrameSpec::new("run1"))
                .frame(FrameSpec::new("run2"))
                .build(),
        );
        (archive, id)
    }

    #[test]
    fn test_find_frame_is_case_insensitive_first_match() {
        let (archive, id) = archive_with_model();
        let mesh = CanonicalMesh::load(&archive, "models/imp/", id).unwrap();

        assert_eq!(mesh.find_frame("RUN1"), Some(0));
        assert_eq!(mesh.find_frame("run2"), Some(2));
        assert_eq!(mesh.find_frame("death"), None);
    }

    #[test]
    fn test_skins_resolve_or_stay_empty() {
        let (archive, id) = archive_with_model();
        let mesh = CanonicalMesh::load(&archive, "models/imp/", id).unwrap();

        assert_eq!(mesh.skins().len(), 2);
        assert!(mesh.skins()[0].is_some());
        assert!(mesh.skins()[1].is_none());
        assert!(mesh.default_skin().is_some());
    }

    #[test]
    fn test_build_is_idempotent() {
        let (archive, id) = archive_with_model();
        let mut mesh = CanonicalMesh::load(&archive, "models/imp/", id).unwrap();
        let mut uploader = RecordingUploader::default();
        assert_eq!(mesh.frame_offset(0), None);

        mesh.build_geometry(&archive, &mut uploader).unwrap();
        let reads = archive.read_count();
        mesh.build_geometry(&archive, &mut uploader).unwrap();

        assert_eq!(archive.read_count(), reads);
        assert_eq!(uploader.uploads.len(), 1);
        assert_eq!(mesh.frame_offset(2), Some(12));
        assert_eq!(mesh.vertices_per_frame(), 6);
    }

    #[test]
    fn test_release_returns_handle() {
        let (archive, id) = archive_with_model();
        let mut mesh = CanonicalMesh::load(&archive, "models/imp/", id).unwrap();
        let mut uploader = RecordingUploader::default();

        mesh.build_geometry(&archive, &mut uploader).unwrap();
        mesh.release_geometry(&mut uploader);

        assert_eq!(uploader.released.len(), 1);
        assert_eq!(mesh.geometry_state(), GeometryState::Unbuilt);
        assert_eq!(mesh.frame_offset(0), None);
    }
}
