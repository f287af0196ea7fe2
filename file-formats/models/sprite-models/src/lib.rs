//! Sprite frame to 3D model associations.
//!
//! Actors are animated by a state machine of 2D sprite frames. This crate maps
//! an actor's `(class, sprite, frame)` to the models that replace it, finds the
//! frame to blend towards between simulation tics, and emits draws for a
//! render sink.
//!
//! - [`definition`] expands model definitions into association records
//! - [`voxel`] synthesizes records for voxel replacements
//! - [`index`] hashes records by key and falls back to voxels
//! - [`interpolation`] computes the blend factor for the current state
//! - [`generation`] owns everything built in one resource load
//!
//! # Example
//!
//! ```
//! use frame_models::MemoryArchive;
//! use frame_models::fixtures::{FrameSpec, Md2Builder};
//! use sprite_models::{
//!     ClassId, ClassTable, FrameAssignment, GenerationSource, ModelDefinition, ModelGeneration,
//!     RenderSettings, SlotFile, SpriteDef, SpriteId,
//! };
//!
//! let mut archive = MemoryArchive::new();
//! archive.insert(
//!     "models/imp/tris.md2",
//!     Md2Builder::new(3, 1).frame(FrameSpec::new("walk1")).build(),
//! );
//!
//! let classes: ClassTable = ["DoomImp"].into_iter().collect();
//! let source = GenerationSource {
//!     sprites: [SpriteDef::new("TROO", 4)].into_iter().collect(),
//!     definitions: vec![ModelDefinition {
//!         models: vec![SlotFile::new(0, "tris.md2")],
//!         frames: vec![FrameAssignment::by_name("TROO", "AB", 0, "walk1")],
//!         ..ModelDefinition::new("DoomImp", "models/imp")
//!     }],
//!     ..GenerationSource::default()
//! };
//!
//! let generation = ModelGeneration::load(&archive, &classes, &source, RenderSettings::default());
//! assert!(generation.has_model(ClassId(0)));
//! assert!(generation.find(ClassId(0), SpriteId(0), 1, false).is_some());
//! ```

pub mod catalog;
pub mod config;
pub mod definition;
pub mod error;
pub mod frame;
pub mod generation;
pub mod index;
pub mod interpolation;
pub mod orientation;
pub mod render;
pub mod voxel;

pub use catalog::{ClassResolver, ClassTable, SpriteCatalog, SpriteDef, SpriteFrameDef};
pub use config::RenderSettings;
pub use definition::{
    DefinitionExpander, FrameAssignment, FrameTarget, ModelDefinition, SlotFile,
};
pub use error::{AssociationError, Result};
pub use frame::{
    ClassId, FrameKey, MAX_MODELS_PER_FRAME, ModelFlags, ModelSlot, ModelTransform, SpriteId,
    SpriteModelFrame,
};
pub use generation::{ActorFrame, GenerationSource, HudWeapon, LoadSummary, ModelGeneration};
pub use index::{AssociationIndex, RecordId, VoxelFrame};
pub use interpolation::{
    AnimationInput, AnimationState, AnimationStates, FrameBlend, StateId, StateList, TicClock,
    resolve_interpolation,
};
pub use orientation::{ActorPose, ModelOrientation};
pub use render::{ModelDraw, ModelRenderSink, render_frame_models};
pub use voxel::VoxelDefinition;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
