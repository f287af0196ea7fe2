//! Model file decoders
//!
//! Each supported format decodes into the same header shape ([`MeshLayout`]),
//! keeping the vertex-heavy work for [`load_geometry`] so that a mesh that is
//! never drawn never pays for it.

pub mod dmd;
pub mod kvx;
pub mod md2;

use crate::bytes::ByteView;
use crate::error::{ModelError, Result};
use glam::Vec3;

use crate::geometry::{FrameVertexData, MeshGeometry, TexCoord, Triangle};

/// Size of the name field at the start of every frame
pub const FRAME_NAME_LEN: usize = 16;
/// Size of an embedded skin file name
pub const SKIN_NAME_LEN: usize = 64;
/// Size of the scale/translate/name prefix of every packed frame
pub const FRAME_HEADER_SIZE: usize = 24 + FRAME_NAME_LEN;

/// Format identity of a decoded model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelFormat {
    /// Chunked format, magic `DMDM`
    Dmd,
    /// Fixed-header legacy format, magic `IDP2`
    Md2,
    /// Voxel model, recognized by probing its header
    Kvx,
}

impl ModelFormat {
    /// Identify a buffer by its magic, falling back to the voxel probe
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data.get(..4) {
            Some(m) if m == dmd::MAGIC => Some(Self::Dmd),
            Some(m) if m == md2::MAGIC => Some(Self::Md2),
            _ if kvx::probe(data) => Some(Self::Kvx),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dmd => "DMD",
            Self::Md2 => "MD2",
            Self::Kvx => "KVX",
        }
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Level-of-detail table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LodInfo {
    pub num_triangles: usize,
    pub num_gl_commands: usize,
    pub offset_triangles: usize,
    pub offset_gl_commands: usize,
}

/// Header of a frame-animated mesh, shared by the DMD and MD2 decoders
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshInfo {
    pub skin_width: u32,
    pub skin_height: u32,
    pub frame_size: usize,
    pub num_skins: usize,
    pub num_vertices: usize,
    pub num_tex_coords: usize,
    pub num_frames: usize,
    pub offset_skins: usize,
    pub offset_tex_coords: usize,
    pub offset_frames: usize,
    pub offset_end: usize,
    /// Only the first entry is used for rendering
    pub lods: Vec<LodInfo>,
}

impl MeshInfo {
    /// First level of detail
    pub fn active_lod(&self) -> Option<&LodInfo> {
        self.lods.first()
    }

    /// Offset one past the last byte of frame data
    pub fn frames_end(&self) -> Option<usize> {
        self.frame_size
            .checked_mul(self.num_frames)
            .and_then(|size| size.checked_add(self.offset_frames))
    }
}

/// 256-entry RGB palette carried by voxel models
pub type VoxelPalette = [[u8; 3]; 256];

/// Header of a voxel model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelInfo {
    pub size: [u32; 3],
    /// Pivot in 8.8 fixed point
    pub pivot: [i32; 3],
    pub palette: Box<VoxelPalette>,
}

/// Decoded header, format specific
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshLayout {
    Frames(MeshInfo),
    Voxel(VoxelInfo),
}

/// Result of the initial decode of a model file
#[derive(Debug, Clone)]
pub struct DecodedModel {
    pub format: ModelFormat,
    pub layout: MeshLayout,
    pub skin_names: Vec<String>,
    pub frame_names: Vec<String>,
}

/// Decode the header of a model buffer.
///
/// Structural checks run here; vertex data is left packed until
/// [`load_geometry`] is called.
pub fn decode(data: &[u8], name: &str) -> Result<DecodedModel> {
    let view = ByteView::new(data, name);
    let format = ModelFormat::detect(data)
        .ok_or_else(|| ModelError::UnknownFormat(name.to_string()))?;
    log::debug!("Decoding '{name}' as {format} ({} bytes)", data.len());

    match format {
        ModelFormat::Dmd => dmd::decode(&view),
        ModelFormat::Md2 => md2::decode(&view),
        ModelFormat::Kvx => kvx::decode(&view),
    }
}

/// Unpack the vertex data described by `layout`
pub fn load_geometry(
    format: ModelFormat,
    layout: &MeshLayout,
    data: &[u8],
    name: &str,
) -> Result<MeshGeometry> {
    let view = ByteView::new(data, name);
    match (format, layout) {
        (ModelFormat::Dmd, MeshLayout::Frames(info)) => dmd::load_geometry(&view, info),
        (ModelFormat::Md2, MeshLayout::Frames(info)) => md2::load_geometry(&view, info),
        (ModelFormat::Kvx, MeshLayout::Voxel(info)) => kvx::load_geometry(&view, info),
        _ => Err(ModelError::geometry(
            name,
            format!("{format} data does not match its decoded header"),
        )),
    }
}

/// Read skin names stored as fixed 64-byte fields
pub(crate) fn read_skin_names(view: &ByteView, info: &MeshInfo) -> Result<Vec<String>> {
    (0..info.num_skins)
        .map(|i| view.read_name(info.offset_skins + i * SKIN_NAME_LEN, SKIN_NAME_LEN))
        .collect()
}

/// Read the name of every packed frame
pub(crate) fn read_frame_names(view: &ByteView, info: &MeshInfo) -> Result<Vec<String>> {
    (0..info.num_frames)
        .map(|i| view.read_name(info.offset_frames + i * info.frame_size + 24, FRAME_NAME_LEN))
        .collect()
}

/// Checks shared by the frame-animated formats
pub(crate) fn validate_frames(view: &ByteView, info: &MeshInfo, vertex_stride: usize) -> Result<()> {
    let name = view.name();
    match info.frames_end() {
        Some(end) if end <= view.len() => {}
        _ => return Err(ModelError::FileTooShort(name.to_string())),
    }

    if info.num_frames == 0 {
        return Err(ModelError::corrupt(name, "model has no frames"));
    }

    let needed = FRAME_HEADER_SIZE + vertex_stride * info.num_vertices;
    if info.frame_size < needed {
        return Err(ModelError::corrupt(
            name,
            format!(
                "frame size {} cannot hold {} vertices",
                info.frame_size, info.num_vertices
            ),
        ));
    }
    Ok(())
}

/// Read the triangle table of a level of detail
pub(crate) fn read_triangles(view: &ByteView, lod: &LodInfo) -> Result<Vec<Triangle>> {
    (0..lod.num_triangles)
        .map(|i| {
            let at = lod.offset_triangles + i * 12;
            Ok(Triangle {
                vertex_indices: [
                    view.read_u16(at)?,
                    view.read_u16(at + 2)?,
                    view.read_u16(at + 4)?,
                ],
                tex_coord_indices: [
                    view.read_u16(at + 6)?,
                    view.read_u16(at + 8)?,
                    view.read_u16(at + 10)?,
                ],
            })
        })
        .collect()
}

/// Read `(s, t)` pairs stored as signed 16-bit texel coordinates
pub(crate) fn read_tex_coords(view: &ByteView, info: &MeshInfo) -> Result<Vec<TexCoord>> {
    (0..info.num_tex_coords)
        .map(|i| {
            let at = info.offset_tex_coords + i * 4;
            Ok(TexCoord {
                s: f32::from(view.read_i16(at)?),
                t: f32::from(view.read_i16(at + 2)?),
            })
        })
        .collect()
}

/// Unpack every frame's quantized vertices into floating point.
///
/// Each vertex starts with three position bytes which are scaled and
/// translated by the frame header; `read_normal` decodes the remainder of the
/// `stride`-byte record at the given offset.
pub(crate) fn unpack_frames<F>(
    view: &ByteView,
    info: &MeshInfo,
    stride: usize,
    read_normal: F,
) -> Result<Vec<FrameVertexData>>
where
    F: Fn(&ByteView, usize) -> Result<Vec3>,
{
    let mut frames = Vec::with_capacity(info.num_frames);
    for i in 0..info.num_frames {
        let base = info.offset_frames + i * info.frame_size;
        let scale = Vec3::from_array(view.read_vec3(base)?);
        let translate = Vec3::from_array(view.read_vec3(base + 12)?);

        let mut positions = Vec::with_capacity(info.num_vertices);
        let mut normals = Vec::with_capacity(info.num_vertices);
        for k in 0..info.num_vertices {
            let at = base + FRAME_HEADER_SIZE + k * stride;
            let packed = view.bytes(at, 3)?;
            let quantized = Vec3::new(
                f32::from(packed[0]),
                f32::from(packed[1]),
                f32::from(packed[2]),
            );
            positions.push(quantized * scale + translate);
            normals.push(read_normal(view, at + 3)?);
        }
        frames.push(FrameVertexData { positions, normals });
    }
    Ok(frames)
}

/// Assemble the geometry of a frame-animated mesh from its first LOD
pub(crate) fn frame_geometry<F>(
    view: &ByteView,
    info: &MeshInfo,
    stride: usize,
    read_normal: F,
) -> Result<MeshGeometry>
where
    F: Fn(&ByteView, usize) -> Result<Vec3>,
{
    let lod = info
        .active_lod()
        .ok_or_else(|| ModelError::geometry(view.name(), "no level of detail"))?;

    Ok(MeshGeometry {
        frames: unpack_frames(view, info, stride, read_normal)?,
        triangles: read_triangles(view, lod)?,
        tex_coords: read_tex_coords(view, info)?,
        skin_size: (info.skin_width, info.skin_height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_magic() {
        assert_eq!(ModelFormat::detect(b"DMDM\0\0\0\0"), Some(ModelFormat::Dmd));
        assert_eq!(ModelFormat::detect(b"IDP2\0\0\0\0"), Some(ModelFormat::Md2));
        assert_eq!(ModelFormat::detect(b"IDP3\0\0\0\0"), None);
        assert_eq!(ModelFormat::detect(b""), None);
    }

    #[test]
    fn test_unknown_format_error() {
        let err = decode(b"junkjunkjunk", "junk.mdl").unwrap_err();
        assert!(matches!(err, ModelError::UnknownFormat(ref n) if n == "junk.mdl"));
    }

    #[test]
    fn test_frames_end_overflow_is_none() {
        let info = MeshInfo {
            frame_size: usize::MAX,
            num_frames: 2,
            ..MeshInfo::default()
        };
        assert_eq!(info.frames_end(), None);
    }
}
