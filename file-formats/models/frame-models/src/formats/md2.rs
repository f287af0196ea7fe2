//! Legacy MD2 ("IDP2") model decoder
//!
//! The fixed 68-byte header is normalized into [`MeshInfo`] with a single
//! implicit level of detail so geometry building does not care which format a
//! mesh came from.

use glam::Vec3;

use super::{
    DecodedModel, LodInfo, MeshInfo, MeshLayout, ModelFormat, frame_geometry, read_frame_names,
    read_skin_names, validate_frames,
};
use crate::bytes::{ByteView, to_count};
use crate::error::{ModelError, Result};
use crate::geometry::MeshGeometry;
use crate::normals::normal_from_index;

/// File magic
pub const MAGIC: [u8; 4] = *b"IDP2";
/// Size of the file header
pub const HEADER_SIZE: usize = 17 * 4;
/// Size of a packed vertex: three position bytes and a normal table index
pub const VERTEX_SIZE: usize = 4;

/// MD2 file header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Md2Header {
    pub magic: [u8; 4],
    pub version: i32,
    pub skin_width: i32,
    pub skin_height: i32,
    pub frame_size: i32,
    pub num_skins: i32,
    pub num_vertices: i32,
    pub num_tex_coords: i32,
    pub num_triangles: i32,
    pub num_gl_commands: i32,
    pub num_frames: i32,
    pub offset_skins: i32,
    pub offset_tex_coords: i32,
    pub offset_triangles: i32,
    pub offset_frames: i32,
    pub offset_gl_commands: i32,
    pub offset_end: i32,
}

impl Md2Header {
    /// Read the header from the start of a buffer
    pub fn parse(view: &ByteView) -> Result<Self> {
        let field = |i: usize| view.read_i32(i * 4);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(view.bytes(0, 4)?);
        if magic != MAGIC {
            return Err(ModelError::UnknownFormat(view.name().to_string()));
        }

        Ok(Self {
            magic,
            version: field(1)?,
            skin_width: field(2)?,
            skin_height: field(3)?,
            frame_size: field(4)?,
            num_skins: field(5)?,
            num_vertices: field(6)?,
            num_tex_coords: field(7)?,
            num_triangles: field(8)?,
            num_gl_commands: field(9)?,
            num_frames: field(10)?,
            offset_skins: field(11)?,
            offset_tex_coords: field(12)?,
            offset_triangles: field(13)?,
            offset_frames: field(14)?,
            offset_gl_commands: field(15)?,
            offset_end: field(16)?,
        })
    }

    /// Normalize into the shared header shape with one level of detail
    fn to_mesh_info(self, name: &str) -> Result<MeshInfo> {
        Ok(MeshInfo {
            skin_width: to_count(name, "skin width", self.skin_width)? as u32,
            skin_height: to_count(name, "skin height", self.skin_height)? as u32,
            frame_size: to_count(name, "frame size", self.frame_size)?,
            num_skins: to_count(name, "skin count", self.num_skins)?,
            num_vertices: to_count(name, "vertex count", self.num_vertices)?,
            num_tex_coords: to_count(name, "texture coordinate count", self.num_tex_coords)?,
            num_frames: to_count(name, "frame count", self.num_frames)?,
            offset_skins: to_count(name, "skin offset", self.offset_skins)?,
            offset_tex_coords: to_count(name, "texture coordinate offset", self.offset_tex_coords)?,
            offset_frames: to_count(name, "frame offset", self.offset_frames)?,
            offset_end: to_count(name, "end offset", self.offset_end)?,
            lods: vec![LodInfo {
                num_triangles: self.num_triangles.max(0) as usize,
                num_gl_commands: self.num_gl_commands.max(0) as usize,
                offset_triangles: to_count(name, "triangle offset", self.offset_triangles)?,
                offset_gl_commands: to_count(name, "GL command offset", self.offset_gl_commands)?,
            }],
        })
    }
}

/// Decode the header, skin names and frame names
pub fn decode(view: &ByteView) -> Result<DecodedModel> {
    let name = view.name();
    let header = Md2Header::parse(view)?;
    let info = header.to_mesh_info(name)?;

    validate_frames(view, &info, VERTEX_SIZE)?;
    if header.num_gl_commands <= 0 {
        return Err(ModelError::InvalidCommandCount {
            name: name.to_string(),
            what: "GL command",
            count: header.num_gl_commands,
        });
    }
    if header.num_triangles <= 0 {
        return Err(ModelError::InvalidCommandCount {
            name: name.to_string(),
            what: "triangle",
            count: header.num_triangles,
        });
    }

    let skin_names = read_skin_names(view, &info)?;
    let frame_names = read_frame_names(view, &info)?;
    log::debug!(
        "{name}: version {}, {} frames, {} vertices, {} triangles",
        header.version,
        info.num_frames,
        info.num_vertices,
        header.num_triangles
    );

    Ok(DecodedModel {
        format: ModelFormat::Md2,
        layout: MeshLayout::Frames(info),
        skin_names,
        frame_names,
    })
}

fn read_normal(view: &ByteView, at: usize) -> Result<Vec3> {
    let index = view.read_u8(at)?;
    normal_from_index(index).ok_or_else(|| {
        ModelError::geometry(view.name(), format!("normal index {index} outside table"))
    })
}

/// Unpack frame vertices, triangles and texture coordinates
pub fn load_geometry(view: &ByteView, info: &MeshInfo) -> Result<MeshGeometry> {
    frame_geometry(view, info, VERTEX_SIZE, read_normal)
}
