//! Interleaved vertex buffer building and the GPU upload seam

use bytemuck::{Pod, Zeroable};

use crate::error::{ModelError, Result};
use crate::geometry::MeshGeometry;

/// One vertex of the GPU buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct InterleavedVertex {
    pub position: [f32; 3],
    /// Texture coordinate normalized by the skin size
    pub tex_coord: [f32; 2],
    pub normal: [f32; 3],
}

/// Opaque handle to uploaded vertex storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// Destination for realized vertex buffers
pub trait GeometryUploader {
    /// Take ownership of a frame-major vertex array
    fn upload(&mut self, vertices: &[InterleavedVertex]) -> Result<GeometryHandle>;

    /// Destroy storage created by [`GeometryUploader::upload`]
    fn release(&mut self, handle: GeometryHandle);
}

/// A built vertex buffer with the starting offset of each frame
#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    pub vertices: Vec<InterleavedVertex>,
    pub frame_offsets: Vec<u32>,
}

impl VertexBuffer {
    /// Raw bytes of the vertex array, ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Expand geometry into one interleaved vertex per triangle corner per frame.
///
/// Frames are laid out back to back; frame `i` starts at
/// `i * triangles * 3`. Any index outside the vertex or texture coordinate
/// tables fails the whole build.
pub fn build_vertex_buffer(geometry: &MeshGeometry, name: &str) -> Result<VertexBuffer> {
    let per_frame = geometry.triangles.len() * 3;
    let total = geometry.vertex_count();
    if u32::try_from(total).is_err() {
        return Err(ModelError::geometry(name, format!("{total} vertices exceed buffer limits")));
    }

    let (width, height) = geometry.skin_size;
    let (width, height) = (width.max(1) as f32, height.max(1) as f32);

    let mut vertices = Vec::with_capacity(total);
    let mut frame_offsets = Vec::with_capacity(geometry.frames.len());

    for (frame_index, frame) in geometry.frames.iter().enumerate() {
        frame_offsets.push((frame_index * per_frame) as u32);

        for triangle in &geometry.triangles {
            for corner in 0..3 {
                let v = usize::from(triangle.vertex_indices[corner]);
                let t = usize::from(triangle.tex_coord_indices[corner]);

                let (Some(position), Some(normal)) = (frame.positions.get(v), frame.normals.get(v))
                else {
                    return Err(ModelError::geometry(
                        name,
                        format!("vertex index {v} out of range in frame {frame_index}"),
                    ));
                };
                let tex = geometry.tex_coords.get(t).ok_or_else(|| {
                    ModelError::geometry(name, format!("texture coordinate index {t} out of range"))
                })?;

                vertices.push(InterleavedVertex {
                    position: position.to_array(),
                    tex_coord: [tex.s / width, tex.t / height],
                    normal: normal.to_array(),
                });
            }
        }
    }

    Ok(VertexBuffer {
        vertices,
        frame_offsets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FrameVertexData, TexCoord, Triangle};
    use glam::Vec3;

    fn geometry(frames: usize) -> MeshGeometry {
        MeshGeometry {
            frames: (0..frames)
                .map(|f| FrameVertexData {
                    positions: vec![Vec3::splat(f as f32); 3],
                    normals: vec![Vec3::Z; 3],
                })
                .collect(),
            triangles: vec![
                Triangle {
                    vertex_indices: [0, 1, 2],
                    tex_coord_indices: [0, 1, 0],
                };
                2
            ],
            tex_coords: vec![TexCoord { s: 0.0, t: 0.0 }, TexCoord { s: 32.0, t: 16.0 }],
            skin_size: (64, 32),
        }
    }

    #[test]
    fn test_frames_are_laid_out_back_to_back() {
        let buffer = build_vertex_buffer(&geometry(3), "m").unwrap();

        assert_eq!(buffer.vertices.len(), 18);
        assert_eq!(buffer.frame_offsets, vec![0, 6, 12]);
        assert_eq!(buffer.vertices[12].position, [2.0; 3]);
        assert_eq!(buffer.as_bytes().len(), 18 * 32);
    }

    #[test]
    fn test_tex_coords_are_normalized() {
        let buffer = build_vertex_buffer(&geometry(1), "m").unwrap();
        assert_eq!(buffer.vertices[1].tex_coord, [0.5, 0.5]);
    }

    #[test]
    fn test_bad_index_fails_build() {
        let mut g = geometry(1);
        g.triangles[1].vertex_indices[2] = 3;
        assert!(matches!(
            build_vertex_buffer(&g, "m"),
            Err(ModelError::Geometry { .. })
        ));

        let mut g = geometry(1);
        g.triangles[0].tex_coord_indices[0] = 9;
        assert!(build_vertex_buffer(&g, "m").is_err());
    }
}
