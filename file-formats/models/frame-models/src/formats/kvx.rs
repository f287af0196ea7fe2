//! KVX voxel model decoder
//!
//! KVX files have no magic; a buffer is recognized by checking that its first
//! mip level header is self-consistent. Layout of the first mip:
//!
//! ```text
//! i32 numbytes                      size of this mip, excluding this field
//! i32 xsiz, ysiz, zsiz
//! i32 xpivot, ypivot, zpivot        8.8 fixed point
//! i32 xoffset[xsiz + 1]             relative to the xoffset table
//! u16 xyoffset[xsiz][ysiz + 1]      relative to the column start
//! slab data
//! ```
//!
//! The last 768 bytes of the file are a 6-bit RGB palette. A voxel mesh is
//! realized as a single frame of quads, two triangles per visible face.

use glam::Vec3;

use super::{DecodedModel, MeshLayout, ModelFormat, VoxelInfo, VoxelPalette};
use crate::bytes::{ByteView, to_count};
use crate::error::{ModelError, Result};
use crate::geometry::{FrameVertexData, MeshGeometry, TexCoord, Triangle};

/// Offset of the `xoffset` table
pub const XOFFSET_BASE: usize = 28;
/// Size of the trailing palette
pub const PALETTE_SIZE: usize = 768;
/// Largest accepted dimension
pub const MAX_VOXEL_SIZE: u32 = 256;
/// Width and height of the palette texture the texture coordinates address
pub const PALETTE_TEXTURE_SIZE: u32 = 16;
/// Name given to the single frame of a voxel mesh
pub const FRAME_NAME: &str = "voxel";

/// Slab visibility bits
pub mod face {
    pub const NEG_X: u8 = 1;
    pub const POS_X: u8 = 2;
    pub const NEG_Y: u8 = 4;
    pub const POS_Y: u8 = 8;
    /// Top of the slab, drawn on its first voxel
    pub const TOP: u8 = 16;
    /// Bottom of the slab, drawn on its last voxel
    pub const BOTTOM: u8 = 32;
}

fn dims(view: &ByteView) -> Result<[u32; 3]> {
    let mut size = [0u32; 3];
    for (axis, value) in size.iter_mut().enumerate() {
        let raw = view.read_i32(4 + axis * 4)?;
        match u32::try_from(raw) {
            Ok(v) if (1..=MAX_VOXEL_SIZE).contains(&v) => *value = v,
            _ => {
                return Err(ModelError::corrupt(
                    view.name(),
                    format!("voxel dimension {raw} out of range"),
                ));
            }
        }
    }
    Ok(size)
}

fn check_header(view: &ByteView) -> Result<[u32; 3]> {
    let name = view.name();
    if view.len() < XOFFSET_BASE + PALETTE_SIZE {
        return Err(ModelError::FileTooShort(name.to_string()));
    }

    let num_bytes = to_count(name, "mip size", view.read_i32(0)?)?;
    if num_bytes + 4 > view.len() - PALETTE_SIZE {
        return Err(ModelError::FileTooShort(name.to_string()));
    }

    let size = dims(view)?;
    let [xsiz, ysiz, _] = size.map(|v| v as usize);
    let tables = (xsiz + 1) * 4 + xsiz * (ysiz + 1) * 2;
    if tables + 24 > num_bytes {
        return Err(ModelError::FileTooShort(name.to_string()));
    }
    if view.read_i32(XOFFSET_BASE)? != tables as i32 {
        return Err(ModelError::corrupt(name, "inconsistent column offset table"));
    }
    Ok(size)
}

/// Check whether a buffer looks like a KVX voxel model
pub fn probe(data: &[u8]) -> bool {
    check_header(&ByteView::new(data, "")).is_ok()
}

fn read_palette(view: &ByteView) -> Result<Box<VoxelPalette>> {
    let raw = view.bytes(view.len() - PALETTE_SIZE, PALETTE_SIZE)?;
    let mut palette = Box::new([[0u8; 3]; 256]);
    for (entry, rgb) in palette.iter_mut().zip(raw.chunks_exact(3)) {
        for (out, &c) in entry.iter_mut().zip(rgb) {
            let c = c & 63;
            *out = (c << 2) | (c >> 4);
        }
    }
    Ok(palette)
}

/// Validate the header and read the palette
pub fn decode(view: &ByteView) -> Result<DecodedModel> {
    let size = check_header(view)?;
    let pivot = [
        view.read_i32(16)?,
        view.read_i32(20)?,
        view.read_i32(24)?,
    ];
    log::debug!("{}: voxel {}x{}x{}", view.name(), size[0], size[1], size[2]);

    Ok(DecodedModel {
        format: ModelFormat::Kvx,
        layout: MeshLayout::Voxel(VoxelInfo {
            size,
            pivot,
            palette: read_palette(view)?,
        }),
        skin_names: Vec::new(),
        frame_names: vec![FRAME_NAME.to_string()],
    })
}

#[derive(Default)]
struct QuadBuilder {
    frame: FrameVertexData,
    triangles: Vec<Triangle>,
}

impl QuadBuilder {
    fn add_face(&mut self, corners: [Vec3; 4], normal: Vec3, color: u8) -> Result<()> {
        let base = u16::try_from(self.frame.positions.len())
            .ok()
            .filter(|base| *base <= u16::MAX - 4)
            .ok_or_else(|| ModelError::geometry("voxel", "too many faces"))?;
        self.frame.positions.extend_from_slice(&corners);
        self.frame.normals.extend_from_slice(&[normal; 4]);

        let tex = u16::from(color);
        self.triangles.push(Triangle {
            vertex_indices: [base, base + 1, base + 2],
            tex_coord_indices: [tex; 3],
        });
        self.triangles.push(Triangle {
            vertex_indices: [base + 2, base + 1, base + 3],
            tex_coord_indices: [tex; 3],
        });
        Ok(())
    }
}

/// Build the single-frame quad mesh of the first mip level
pub fn load_geometry(view: &ByteView, info: &VoxelInfo) -> Result<MeshGeometry> {
    let name = view.name();
    let [xsiz, ysiz, _] = info.size.map(|v| v as usize);
    let pivot = Vec3::from_array(info.pivot.map(|p| p as f32 / 256.0));
    let table_end = XOFFSET_BASE + (xsiz + 1) * 4;

    let mut quads = QuadBuilder::default();
    for x in 0..xsiz {
        let column = XOFFSET_BASE + to_count(name, "column offset", view.read_i32(XOFFSET_BASE + x * 4)?)?;
        for y in 0..ysiz {
            let row = table_end + (x * (ysiz + 1) + y) * 2;
            let start = column + usize::from(view.read_u16(row)?);
            let end = column + usize::from(view.read_u16(row + 2)?);

            let mut at = start;
            while at + 3 <= end {
                let ztop = usize::from(view.read_u8(at)?);
                let zleng = usize::from(view.read_u8(at + 1)?);
                let vis = view.read_u8(at + 2)?;
                let colors = view.bytes(at + 3, zleng)?;

                for (i, &color) in colors.iter().enumerate() {
                    let z = ztop + i;
                    let first = i == 0;
                    let last = i + 1 == zleng;
                    emit_voxel(&mut quads, [x, y, z], pivot, vis, first, last, color)?;
                }
                at += 3 + zleng;
            }
        }
    }

    let tex_coords = (0..=255u8)
        .map(|c| TexCoord {
            s: f32::from(c % 16) + 0.5,
            t: f32::from(c / 16) + 0.5,
        })
        .collect();

    log::debug!(
        "{name}: voxel mesh with {} triangles",
        quads.triangles.len()
    );
    Ok(MeshGeometry {
        frames: vec![quads.frame],
        triangles: quads.triangles,
        tex_coords,
        skin_size: (PALETTE_TEXTURE_SIZE, PALETTE_TEXTURE_SIZE),
    })
}

fn emit_voxel(
    quads: &mut QuadBuilder,
    [x, y, z]: [usize; 3],
    pivot: Vec3,
    vis: u8,
    first: bool,
    last: bool,
    color: u8,
) -> Result<()> {
    // Voxel z grows downwards; model space z grows upwards.
    let corner = |dx: usize, dy: usize, dz: usize| {
        Vec3::new(
            (x + dx) as f32 - pivot.x,
            (y + dy) as f32 - pivot.y,
            pivot.z - (z + dz) as f32,
        )
    };

    if vis & face::NEG_X != 0 {
        let c = [corner(0, 0, 0), corner(0, 1, 0), corner(0, 0, 1), corner(0, 1, 1)];
        quads.add_face(c, Vec3::NEG_X, color)?;
    }
    if vis & face::POS_X != 0 {
        let c = [corner(1, 1, 0), corner(1, 0, 0), corner(1, 1, 1), corner(1, 0, 1)];
        quads.add_face(c, Vec3::X, color)?;
    }
    if vis & face::NEG_Y != 0 {
        let c = [corner(1, 0, 0), corner(0, 0, 0), corner(1, 0, 1), corner(0, 0, 1)];
        quads.add_face(c, Vec3::NEG_Y, color)?;
    }
    if vis & face::POS_Y != 0 {
        let c = [corner(0, 1, 0), corner(1, 1, 0), corner(0, 1, 1), corner(1, 1, 1)];
        quads.add_face(c, Vec3::Y, color)?;
    }
    if first && vis & face::TOP != 0 {
        let c = [corner(0, 0, 0), corner(1, 0, 0), corner(0, 1, 0), corner(1, 1, 0)];
        quads.add_face(c, Vec3::Z, color)?;
    }
    if last && vis & face::BOTTOM != 0 {
        let c = [corner(0, 1, 1), corner(1, 1, 1), corner(0, 0, 1), corner(1, 0, 1)];
        quads.add_face(c, Vec3::NEG_Z, color)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::KvxBuilder;

    #[test]
    fn test_probe_accepts_valid_voxel() {
        let data = KvxBuilder::new([2, 2, 4]).slab(0, 0, 1, face::TOP, &[7]).build();
        assert!(probe(&data));
        assert_eq!(ModelFormat::detect(&data), Some(ModelFormat::Kvx));
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(!probe(&[0u8; 100]));
        assert!(!probe(&vec![0xFFu8; 2000]));
    }

    #[test]
    fn test_palette_is_expanded_to_eight_bits() {
        let data = KvxBuilder::new([1, 1, 1])
            .palette_entry(3, [63, 0, 32])
            .build();
        let decoded = decode(&ByteView::new(&data, "p.kvx")).unwrap();
        let MeshLayout::Voxel(info) = decoded.layout else {
            panic!("expected voxel layout");
        };
        assert_eq!(info.palette[3], [255, 0, 130]);
        assert_eq!(decoded.frame_names, vec![FRAME_NAME.to_string()]);
    }

    #[test]
    fn test_visible_faces_become_quads() {
        let data = KvxBuilder::new([1, 1, 4])
            .slab(0, 0, 1, face::TOP | face::BOTTOM | face::NEG_X, &[9, 9])
            .build();
        let view = ByteView::new(&data, "v.kvx");
        let MeshLayout::Voxel(info) = decode(&view).unwrap().layout else {
            panic!("expected voxel layout");
        };

        let geometry = load_geometry(&view, &info).unwrap();
        // Two side faces, one top and one bottom
        assert_eq!(geometry.triangles.len(), 8);
        assert_eq!(geometry.frames[0].positions.len(), 16);
        assert_eq!(geometry.triangles[0].tex_coord_indices, [9; 3]);
        assert_eq!(geometry.tex_coords[9], TexCoord { s: 9.5, t: 0.5 });
    }
}
