//! Chunked DMD ("DMDM") model decoder
//!
//! After a 12-byte file header (magic, version, flags) the file is a sequence
//! of `{type: i32, length: i32}` chunks. The info chunk carries the mesh header;
//! unknown chunks are skipped by length and the end chunk stops the walk.

use glam::Vec3;

use super::{
    DecodedModel, LodInfo, MeshInfo, MeshLayout, ModelFormat, frame_geometry, read_frame_names,
    read_skin_names, validate_frames,
};
use crate::bytes::{ByteView, to_count};
use crate::error::{ModelError, Result};
use crate::geometry::MeshGeometry;
use crate::normals::unpack_yaw_pitch;

/// File magic
pub const MAGIC: [u8; 4] = *b"DMDM";

/// Offset of the first chunk header
pub const FIRST_CHUNK_OFFSET: usize = 12;
/// Size of a chunk header
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of the info chunk payload (13 little-endian `i32` fields)
pub const INFO_SIZE: usize = 13 * 4;
/// Size of a LOD table entry
pub const LOD_SIZE: usize = 16;
/// Size of a packed vertex: three position bytes and a packed normal
pub const VERTEX_SIZE: usize = 5;

/// Chunk types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    End,
    Info,
    Unknown(i32),
}

impl From<i32> for ChunkType {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::End,
            1 => Self::Info,
            other => Self::Unknown(other),
        }
    }
}

/// Fields of the info chunk before conversion into [`MeshInfo`]
#[derive(Debug, Clone, Copy, Default)]
struct RawInfo {
    skin_width: i32,
    skin_height: i32,
    frame_size: i32,
    num_skins: i32,
    num_vertices: i32,
    num_tex_coords: i32,
    num_frames: i32,
    num_lods: i32,
    offset_skins: i32,
    offset_tex_coords: i32,
    offset_frames: i32,
    offset_lods: i32,
    offset_end: i32,
}

impl RawInfo {
    fn read(view: &ByteView, at: usize) -> Result<Self> {
        let field = |i: usize| view.read_i32(at + i * 4);
        Ok(Self {
            skin_width: field(0)?,
            skin_height: field(1)?,
            frame_size: field(2)?,
            num_skins: field(3)?,
            num_vertices: field(4)?,
            num_tex_coords: field(5)?,
            num_frames: field(6)?,
            num_lods: field(7)?,
            offset_skins: field(8)?,
            offset_tex_coords: field(9)?,
            offset_frames: field(10)?,
            offset_lods: field(11)?,
            offset_end: field(12)?,
        })
    }
}

/// Walk the chunk list and return the payload offset of the info chunk
fn find_info_chunk(view: &ByteView) -> Result<usize> {
    let mut offset = FIRST_CHUNK_OFFSET;
    let mut info = None;

    while offset + CHUNK_HEADER_SIZE <= view.len() {
        let kind = ChunkType::from(view.read_i32(offset)?);
        let length = to_count(view.name(), "chunk length", view.read_i32(offset + 4)?)?;
        let payload = offset + CHUNK_HEADER_SIZE;

        match kind {
            ChunkType::End => break,
            ChunkType::Info if length < INFO_SIZE => {
                return Err(ModelError::corrupt(view.name(), "info chunk too short"));
            }
            ChunkType::Info => info = Some(payload),
            ChunkType::Unknown(kind) => {
                log::trace!("{}: skipping chunk {kind} ({length} bytes)", view.name());
            }
        }
        offset = payload
            .checked_add(length)
            .ok_or_else(|| ModelError::corrupt(view.name(), "chunk length overflow"))?;
    }

    info.ok_or_else(|| ModelError::corrupt(view.name(), "missing info chunk"))
}

fn read_lods(view: &ByteView, count: usize, offset: usize) -> Result<Vec<LodInfo>> {
    let name = view.name();
    (0..count)
        .map(|i| {
            let at = offset + i * LOD_SIZE;
            Ok(LodInfo {
                num_triangles: to_count(name, "triangle count", view.read_i32(at)?)?,
                num_gl_commands: to_count(name, "GL command count", view.read_i32(at + 4)?)?,
                offset_triangles: to_count(name, "triangle offset", view.read_i32(at + 8)?)?,
                offset_gl_commands: to_count(name, "GL command offset", view.read_i32(at + 12)?)?,
            })
        })
        .collect()
}

/// Decode the header, skin names, frame names and LOD table
pub fn decode(view: &ByteView) -> Result<DecodedModel> {
    let name = view.name();
    let at = find_info_chunk(view)?;
    let raw = RawInfo::read(view, at)?;

    let num_lods = to_count(name, "LOD count", raw.num_lods)?;
    let offset_lods = to_count(name, "LOD offset", raw.offset_lods)?;

    let info = MeshInfo {
        skin_width: to_count(name, "skin width", raw.skin_width)? as u32,
        skin_height: to_count(name, "skin height", raw.skin_height)? as u32,
        frame_size: to_count(name, "frame size", raw.frame_size)?,
        num_skins: to_count(name, "skin count", raw.num_skins)?,
        num_vertices: to_count(name, "vertex count", raw.num_vertices)?,
        num_tex_coords: to_count(name, "texture coordinate count", raw.num_tex_coords)?,
        num_frames: to_count(name, "frame count", raw.num_frames)?,
        offset_skins: to_count(name, "skin offset", raw.offset_skins)?,
        offset_tex_coords: to_count(name, "texture coordinate offset", raw.offset_tex_coords)?,
        offset_frames: to_count(name, "frame offset", raw.offset_frames)?,
        offset_end: to_count(name, "end offset", raw.offset_end)?,
        lods: Vec::new(),
    };
    validate_frames(view, &info, VERTEX_SIZE)?;

    let lods = read_lods(view, num_lods, offset_lods)?;
    match lods.first() {
        Some(lod) if lod.num_triangles > 0 => {}
        first => {
            return Err(ModelError::InvalidCommandCount {
                name: name.to_string(),
                what: "triangle",
                count: first.map_or(0, |lod| lod.num_triangles as i32),
            });
        }
    }
    let info = MeshInfo { lods, ..info };

    let skin_names = read_skin_names(view, &info)?;
    let frame_names = read_frame_names(view, &info)?;
    log::debug!(
        "{name}: {} frames, {} vertices, {} LODs, {} skins",
        info.num_frames,
        info.num_vertices,
        info.lods.len(),
        info.num_skins
    );

    Ok(DecodedModel {
        format: ModelFormat::Dmd,
        layout: MeshLayout::Frames(info),
        skin_names,
        frame_names,
    })
}

fn read_normal(view: &ByteView, at: usize) -> Result<Vec3> {
    Ok(unpack_yaw_pitch(view.read_u16(at)?))
}

/// Unpack frame vertices, triangles and texture coordinates
pub fn load_geometry(view: &ByteView, info: &MeshInfo) -> Result<MeshGeometry> {
    frame_geometry(view, info, VERTEX_SIZE, read_normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DmdBuilder, FrameSpec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_reads_names_and_lods() {
        let data = DmdBuilder::new(3, 2)
            .skin("skin.png")
            .frame(FrameSpec::new("idle01"))
            .frame(FrameSpec::new("idle02"))
            .build();
        let decoded = decode(&ByteView::new(&data, "cube.dmd")).unwrap();

        assert_eq!(decoded.format, ModelFormat::Dmd);
        assert_eq!(decoded.frame_names, vec!["idle01", "idle02"]);
        assert_eq!(decoded.skin_names, vec!["skin.png"]);
        let MeshLayout::Frames(info) = decoded.layout else {
            panic!("expected frame layout");
        };
        assert_eq!(info.lods.len(), 1);
        assert_eq!(info.lods[0].num_triangles, 2);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let data = DmdBuilder::new(3, 1)
            .extra_chunk(77, vec![0xAB; 10])
            .frame(FrameSpec::new("a"))
            .build();
        assert!(decode(&ByteView::new(&data, "x.dmd")).is_ok());
    }

    #[test]
    fn test_short_info_chunk_is_corrupt() {
        let mut data = DmdBuilder::new(3, 1).frame(FrameSpec::new("a")).build();
        // declared length of the info chunk, the first chunk in the file
        let at = FIRST_CHUNK_OFFSET + 4;
        data[at..at + 4].copy_from_slice(&(INFO_SIZE as i32 - 4).to_le_bytes());

        let err = decode(&ByteView::new(&data, "short_info.dmd")).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Corrupt { ref reason, .. } if reason == "info chunk too short"
        ));
    }

    #[test]
    fn test_truncated_frames_fail() {
        let mut data = DmdBuilder::new(3, 1).frame(FrameSpec::new("a")).build();
        data.truncate(data.len() - 1);

        let err = decode(&ByteView::new(&data, "short.dmd")).unwrap_err();
        assert!(matches!(err, ModelError::FileTooShort(_)));
    }

    #[test]
    fn test_zero_triangles_fail() {
        let data = DmdBuilder::new(3, 0).frame(FrameSpec::new("a")).build();

        let err = decode(&ByteView::new(&data, "empty.dmd")).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidCommandCount { what: "triangle", .. }
        ));
    }

    #[test]
    fn test_geometry_applies_scale_and_translate() {
        let data = DmdBuilder::new(3, 1)
            .frame(
                FrameSpec::new("a")
                    .scale([2.0, 1.0, 0.5])
                    .translate([1.0, 0.0, -1.0])
                    .vertex([1, 2, 4]),
            )
            .build();
        let view = ByteView::new(&data, "t.dmd");
        let MeshLayout::Frames(info) = decode(&view).unwrap().layout else {
            panic!("expected frame layout");
        };

        let geometry = load_geometry(&view, &info).unwrap();
        assert_eq!(geometry.frames[0].positions[0], Vec3::new(3.0, 2.0, 1.0));
        assert_eq!(geometry.triangles.len(), 1);
    }
}
