//! Transient geometry tables produced while realizing a mesh
//!
//! These live only for the duration of a vertex-buffer build. Once the
//! interleaved buffer has been uploaded they are dropped; only frame names and
//! buffer offsets stay on the mesh.

use custom_debug::Debug;
use glam::Vec3;

use crate::debug;

/// One triangle of the active level of detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triangle {
    pub vertex_indices: [u16; 3],
    pub tex_coord_indices: [u16; 3],
}

/// Texture coordinate in skin texels, normalized when the buffer is built
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexCoord {
    pub s: f32,
    pub t: f32,
}

/// Unpacked vertices of a single animation frame
#[derive(Debug, Clone, Default)]
pub struct FrameVertexData {
    #[debug(with = debug::trimmed_collection_fmt)]
    pub positions: Vec<Vec3>,
    #[debug(with = debug::trimmed_collection_fmt)]
    pub normals: Vec<Vec3>,
}

/// Everything needed to build the interleaved vertex buffer of a mesh
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    #[debug(with = debug::trimmed_collection_fmt)]
    pub frames: Vec<FrameVertexData>,
    #[debug(with = debug::trimmed_collection_fmt)]
    pub triangles: Vec<Triangle>,
    #[debug(with = debug::trimmed_collection_fmt)]
    pub tex_coords: Vec<TexCoord>,
    /// Skin dimensions used to normalize texture coordinates
    pub skin_size: (u32, u32),
}

impl MeshGeometry {
    /// Total number of interleaved vertices this geometry expands to
    pub fn vertex_count(&self) -> usize {
        self.frames.len() * self.triangles.len() * 3
    }
}
