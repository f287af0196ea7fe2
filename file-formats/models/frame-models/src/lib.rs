//! Decoders for frame-animated 3D models and lazy vertex buffer building.
//!
//! Three formats are supported:
//!
//! - **DMD**: chunked format with an info chunk and a level-of-detail table
//! - **MD2**: legacy fixed-header format, normalized to the DMD header shape
//! - **KVX**: voxel models, realized as a single frame of quads
//!
//! Decoding only reads headers, skin names and frame names. The packed vertex
//! data is unpacked, interleaved and handed to a [`GeometryUploader`] the first
//! time a mesh is about to be drawn.
//!
//! # Example
//!
//! ```
//! use frame_models::fixtures::{FrameSpec, Md2Builder, RecordingUploader};
//! use frame_models::{MemoryArchive, ModelRegistry};
//!
//! let mut archive = MemoryArchive::new();
//! archive.insert(
//!     "models/imp/tris.md2",
//!     Md2Builder::new(3, 1).frame(FrameSpec::new("stand1")).build(),
//! );
//!
//! let mut registry = ModelRegistry::new();
//! let id = registry.load_model(&archive, "models/imp", "tris.md2")?;
//! let mut uploader = RecordingUploader::default();
//!
//! let mesh = registry.get_mut(id).unwrap();
//! assert_eq!(mesh.find_frame("STAND1"), Some(0));
//! mesh.build_geometry(&archive, &mut uploader)?;
//! assert_eq!(mesh.frame_offset(0), Some(0));
//! # Ok::<(), frame_models::ModelError>(())
//! ```

pub mod archive;
pub mod bytes;
pub mod debug;
pub mod error;
pub mod fixtures;
pub mod formats;
pub mod geometry;
pub mod mesh;
pub mod normals;
pub mod registry;
pub mod skin;
pub mod vertex_buffer;

pub use archive::{DirectoryArchive, MemoryArchive, ResourceArchive, ResourceId};
pub use error::{ModelError, Result};
pub use formats::{MeshInfo, ModelFormat, VoxelPalette};
pub use mesh::{CanonicalMesh, FrameDescriptor, GeometryState};
pub use registry::{MeshId, ModelRegistry};
pub use skin::SkinTexture;
pub use vertex_buffer::{GeometryHandle, GeometryUploader, InterleavedVertex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
