//! Synthetic model files and test doubles.
//!
//! The builders here encode small but structurally complete DMD, MD2 and KVX
//! files so that decoders, the registry and downstream crates can be exercised
//! against real bytes.

use crate::error::{ModelError, Result};
use crate::formats::{FRAME_HEADER_SIZE, SKIN_NAME_LEN, dmd, kvx, md2};
use crate::vertex_buffer::{GeometryHandle, GeometryUploader, InterleavedVertex};

fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_i16(buf: &mut Vec<u8>, value: i16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_name(buf: &mut Vec<u8>, name: &str, len: usize) {
    let mut field = vec![0u8; len];
    let bytes = name.as_bytes();
    let n = bytes.len().min(len - 1);
    field[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&field);
}

/// One animation frame of a synthetic model
#[derive(Debug, Clone)]
pub struct FrameSpec {
    name: String,
    scale: [f32; 3],
    translate: [f32; 3],
    vertices: Vec<[u8; 3]>,
}

impl FrameSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scale: [1.0; 3],
            translate: [0.0; 3],
            vertices: Vec::new(),
        }
    }

    #[must_use]
    pub fn scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn translate(mut self, translate: [f32; 3]) -> Self {
        self.translate = translate;
        self
    }

    /// Set the next vertex position; unset vertices are at the origin
    #[must_use]
    pub fn vertex(mut self, position: [u8; 3]) -> Self {
        self.vertices.push(position);
        self
    }

    fn encode(&self, buf: &mut Vec<u8>, num_vertices: usize, normal: &[u8]) {
        for v in self.scale.iter().chain(&self.translate) {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        put_name(buf, &self.name, 16);
        for k in 0..num_vertices {
            buf.extend_from_slice(&self.vertices.get(k).copied().unwrap_or_default());
            buf.extend_from_slice(normal);
        }
    }
}

/// Counts and tables shared by the DMD and MD2 builders
#[derive(Debug, Clone)]
struct MeshSpec {
    num_vertices: usize,
    num_triangles: usize,
    num_tex_coords: usize,
    skin_size: (i32, i32),
    skins: Vec<String>,
    frames: Vec<FrameSpec>,
}

impl MeshSpec {
    fn new(num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            num_vertices,
            num_triangles,
            num_tex_coords: 4,
            skin_size: (64, 64),
            skins: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn skins_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for skin in &self.skins {
            put_name(&mut buf, skin, SKIN_NAME_LEN);
        }
        buf
    }

    fn tex_coord_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for i in 0..self.num_tex_coords {
            put_i16(&mut buf, (i * 8) as i16);
            put_i16(&mut buf, (i * 4) as i16);
        }
        buf
    }

    /// Triangle `i` uses vertices `i, i+1, i+2` wrapped to the vertex count
    fn triangle_bytes(&self) -> Vec<u8> {
        let nv = self.num_vertices.max(1);
        let nt = self.num_tex_coords.max(1);
        let mut buf = Vec::new();
        for i in 0..self.num_triangles {
            for k in 0..3 {
                put_u16(&mut buf, ((i + k) % nv) as u16);
            }
            for k in 0..3 {
                put_u16(&mut buf, ((i + k) % nt) as u16);
            }
        }
        buf
    }

    fn frame_size(&self, stride: usize) -> usize {
        FRAME_HEADER_SIZE + stride * self.num_vertices
    }

    fn frame_bytes(&self, normal: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        for frame in &self.frames {
            frame.encode(&mut buf, self.num_vertices, normal);
        }
        buf
    }
}

macro_rules! mesh_builder_methods {
    () => {
        #[must_use]
        pub fn skin(mut self, name: &str) -> Self {
            self.mesh.skins.push(name.to_string());
            self
        }

        #[must_use]
        pub fn frame(mut self, frame: FrameSpec) -> Self {
            self.mesh.frames.push(frame);
            self
        }

        #[must_use]
        pub fn tex_coords(mut self, count: usize) -> Self {
            self.mesh.num_tex_coords = count;
            self
        }

        #[must_use]
        pub fn skin_size(mut self, width: i32, height: i32) -> Self {
            self.mesh.skin_size = (width, height);
            self
        }
    };
}

/// Encoder for legacy MD2 files
#[derive(Debug, Clone)]
pub struct Md2Builder {
    mesh: MeshSpec,
    gl_commands: i32,
}

impl Md2Builder {
    pub fn new(num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            mesh: MeshSpec::new(num_vertices, num_triangles),
            gl_commands: 1,
        }
    }

    mesh_builder_methods!();

    #[must_use]
    pub fn gl_commands(mut self, count: i32) -> Self {
        self.gl_commands = count;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mesh = &self.mesh;
        let skins = mesh.skins_bytes();
        let tex_coords = mesh.tex_coord_bytes();
        let triangles = mesh.triangle_bytes();
        let gl = vec![0u8; 4 * self.gl_commands.max(0) as usize];
        // Index 5 of the normal table points straight up
        let frames = mesh.frame_bytes(&[5]);

        let offset_skins = md2::HEADER_SIZE;
        let offset_tex_coords = offset_skins + skins.len();
        let offset_triangles = offset_tex_coords + tex_coords.len();
        let offset_gl = offset_triangles + triangles.len();
        let offset_frames = offset_gl + gl.len();
        let offset_end = offset_frames + frames.len();

        let mut buf = Vec::with_capacity(offset_end);
        buf.extend_from_slice(&md2::MAGIC);
        for value in [
            8,
            mesh.skin_size.0,
            mesh.skin_size.1,
            mesh.frame_size(md2::VERTEX_SIZE) as i32,
            mesh.skins.len() as i32,
            mesh.num_vertices as i32,
            mesh.num_tex_coords as i32,
            mesh.num_triangles as i32,
            self.gl_commands,
            mesh.frames.len() as i32,
            offset_skins as i32,
            offset_tex_coords as i32,
            offset_triangles as i32,
            offset_frames as i32,
            offset_gl as i32,
            offset_end as i32,
        ] {
            put_i32(&mut buf, value);
        }
        for section in [skins, tex_coords, triangles, gl, frames] {
            buf.extend_from_slice(&section);
        }
        buf
    }
}

/// Encoder for chunked DMD files with a single level of detail
#[derive(Debug, Clone)]
pub struct DmdBuilder {
    mesh: MeshSpec,
    extra_chunks: Vec<(i32, Vec<u8>)>,
}

impl DmdBuilder {
    pub fn new(num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            mesh: MeshSpec::new(num_vertices, num_triangles),
            extra_chunks: Vec::new(),
        }
    }

    mesh_builder_methods!();

    /// Add a chunk of an unknown type ahead of the info chunk
    #[must_use]
    pub fn extra_chunk(mut self, kind: i32, payload: Vec<u8>) -> Self {
        self.extra_chunks.push((kind, payload));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mesh = &self.mesh;
        let skins = mesh.skins_bytes();
        let tex_coords = mesh.tex_coord_bytes();
        let triangles = mesh.triangle_bytes();
        // Packed pitch 127 points straight up
        let frames = mesh.frame_bytes(&(127u16 << 9).to_le_bytes());

        let chunks_size: usize = self
            .extra_chunks
            .iter()
            .map(|(_, payload)| dmd::CHUNK_HEADER_SIZE + payload.len())
            .sum();
        let offset_skins = dmd::FIRST_CHUNK_OFFSET
            + chunks_size
            + dmd::CHUNK_HEADER_SIZE
            + dmd::INFO_SIZE
            + dmd::CHUNK_HEADER_SIZE;
        let offset_tex_coords = offset_skins + skins.len();
        let offset_lods = offset_tex_coords + tex_coords.len();
        let offset_triangles = offset_lods + dmd::LOD_SIZE;
        let offset_frames = offset_triangles + triangles.len();
        let offset_end = offset_frames + frames.len();

        let mut buf = Vec::with_capacity(offset_end);
        buf.extend_from_slice(&dmd::MAGIC);
        put_i32(&mut buf, 1);
        put_i32(&mut buf, 0);

        for (kind, payload) in &self.extra_chunks {
            put_i32(&mut buf, *kind);
            put_i32(&mut buf, payload.len() as i32);
            buf.extend_from_slice(payload);
        }

        put_i32(&mut buf, 1);
        put_i32(&mut buf, dmd::INFO_SIZE as i32);
        for value in [
            mesh.skin_size.0,
            mesh.skin_size.1,
            mesh.frame_size(dmd::VERTEX_SIZE) as i32,
            mesh.skins.len() as i32,
            mesh.num_vertices as i32,
            mesh.num_tex_coords as i32,
            mesh.frames.len() as i32,
            1,
            offset_skins as i32,
            offset_tex_coords as i32,
            offset_frames as i32,
            offset_lods as i32,
            offset_end as i32,
        ] {
            put_i32(&mut buf, value);
        }
        put_i32(&mut buf, 0);
        put_i32(&mut buf, 0);

        buf.extend_from_slice(&skins);
        buf.extend_from_slice(&tex_coords);
        for value in [mesh.num_triangles as i32, 0, offset_triangles as i32, 0] {
            put_i32(&mut buf, value);
        }
        buf.extend_from_slice(&triangles);
        buf.extend_from_slice(&frames);
        buf
    }
}

/// Encoder for single-mip KVX voxel files
#[derive(Debug, Clone)]
pub struct KvxBuilder {
    size: [u32; 3],
    pivot: [i32; 3],
    columns: Vec<Vec<u8>>,
    palette: Vec<u8>,
}

impl KvxBuilder {
    pub fn new(size: [u32; 3]) -> Self {
        Self {
            size,
            pivot: [0; 3],
            columns: vec![Vec::new(); (size[0] * size[1]) as usize],
            palette: vec![0; kvx::PALETTE_SIZE],
        }
    }

    /// Pivot in 8.8 fixed point
    #[must_use]
    pub fn pivot(mut self, pivot: [i32; 3]) -> Self {
        self.pivot = pivot;
        self
    }

    /// Append a slab of voxels to column `(x, y)` starting at `ztop`
    #[must_use]
    pub fn slab(mut self, x: u32, y: u32, ztop: u8, visibility: u8, colors: &[u8]) -> Self {
        let column = &mut self.columns[(x * self.size[1] + y) as usize];
        column.extend_from_slice(&[ztop, colors.len() as u8, visibility]);
        column.extend_from_slice(colors);
        self
    }

    /// Set a 6-bit palette entry
    #[must_use]
    pub fn palette_entry(mut self, index: u8, rgb: [u8; 3]) -> Self {
        let at = usize::from(index) * 3;
        self.palette[at..at + 3].copy_from_slice(&rgb);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let [xsiz, ysiz, zsiz] = self.size;
        let (xs, ys) = (xsiz as usize, ysiz as usize);
        let tables = (xs + 1) * 4 + xs * (ys + 1) * 2;
        let data_len: usize = self.columns.iter().map(Vec::len).sum();

        let mut buf = Vec::new();
        put_i32(&mut buf, (24 + tables + data_len) as i32);
        for value in [xsiz as i32, ysiz as i32, zsiz as i32] {
            put_i32(&mut buf, value);
        }
        for value in self.pivot {
            put_i32(&mut buf, value);
        }

        let mut offset = tables;
        for x in 0..=xs {
            put_i32(&mut buf, offset as i32);
            if x < xs {
                offset += self.columns[x * ys..(x + 1) * ys]
                    .iter()
                    .map(Vec::len)
                    .sum::<usize>();
            }
        }
        for x in 0..xs {
            let mut within = 0usize;
            put_u16(&mut buf, 0);
            for y in 0..ys {
                within += self.columns[x * ys + y].len();
                put_u16(&mut buf, within as u16);
            }
        }
        for column in &self.columns {
            buf.extend_from_slice(column);
        }
        buf.extend_from_slice(&self.palette);
        buf
    }
}

/// Geometry uploader that keeps every uploaded buffer in memory
#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub uploads: Vec<Vec<InterleavedVertex>>,
    pub released: Vec<GeometryHandle>,
    /// Reject every upload when set
    pub fail: bool,
}

impl RecordingUploader {
    /// Vertices uploaded under `handle`
    pub fn vertices(&self, handle: GeometryHandle) -> Option<&[InterleavedVertex]> {
        self.uploads.get(handle.0 as usize).map(Vec::as_slice)
    }
}

impl GeometryUploader for RecordingUploader {
    fn upload(&mut self, vertices: &[InterleavedVertex]) -> Result<GeometryHandle> {
        if self.fail {
            return Err(ModelError::geometry("upload", "rejected by uploader"));
        }
        self.uploads.push(vertices.to_vec());
        Ok(GeometryHandle((self.uploads.len() - 1) as u64))
    }

    fn release(&mut self, handle: GeometryHandle) {
        self.released.push(handle);
    }
}
