//! A resource load generation: meshes, association records and their index
//!
//! Everything here is built in one pass and replaced wholesale on reload.
//! After [`ModelGeneration::load`] returns, the index is read-only and meshes
//! only change when their geometry is realized for drawing.

use std::collections::{HashMap, HashSet};

use frame_models::{GeometryUploader, MeshId, ModelRegistry, ResourceArchive};

use crate::catalog::{ClassResolver, SpriteCatalog};
use crate::config::RenderSettings;
use crate::definition::{DefinitionExpander, ModelDefinition};
use crate::frame::{ClassId, ModelTransform, SpriteId, SpriteModelFrame};
use crate::index::{AssociationIndex, RecordId, VoxelFrame};
use crate::interpolation::{AnimationInput, AnimationStates, StateId, resolve_interpolation};
use crate::orientation::{ActorPose, ModelOrientation, orient};
use crate::render::{ModelRenderSink, render_frame_models};
use crate::voxel::{VoxelDefinition, synthesize_voxel_frames};

/// Configuration a generation is built from
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GenerationSource {
    pub sprites: SpriteCatalog,
    pub voxels: Vec<VoxelDefinition>,
    pub definitions: Vec<ModelDefinition>,
}

/// Counts gathered while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub meshes: usize,
    pub voxel_records: usize,
    pub definition_records: usize,
    pub skipped_definitions: usize,
}

/// One actor to draw
pub struct ActorFrame<'a, S: ?Sized> {
    pub states: &'a S,
    pub animation: AnimationInput,
    pub dropped: bool,
    pub pose: ActorPose,
}

/// The weapon layer of the player's view
pub struct HudWeapon<'a, S: ?Sized> {
    pub states: &'a S,
    /// Class of the ready weapon, `None` when the player holds nothing
    pub weapon: Option<ClassId>,
    /// State of the weapon sprite layer, `None` when the layer is empty
    pub state: Option<StateId>,
    pub remaining_tics: i32,
    pub tic_fraction: f64,
}

/// Meshes and associations of one resource load generation
#[derive(Debug, Default)]
pub struct ModelGeneration {
    generation: u64,
    registry: ModelRegistry,
    index: AssociationIndex,
    settings: RenderSettings,
    summary: LoadSummary,
}

impl ModelGeneration {
    /// Load every voxel and model definition of `source`.
    ///
    /// Voxel records come first, in voxel definition order, followed by the
    /// records of each model definition. Definitions that cannot be expanded
    /// are logged and skipped.
    pub fn load<A, C>(
        archive: &A,
        classes: &C,
        source: &GenerationSource,
        settings: RenderSettings,
    ) -> Self
    where
        A: ResourceArchive + ?Sized,
        C: ClassResolver + ?Sized,
    {
        let mut registry = ModelRegistry::new();
        let mut records = Vec::new();
        let mut summary = LoadSummary::default();

        // Start of each voxel definition's records
        let mut voxel_records: Vec<Option<(RecordId, bool)>> = Vec::with_capacity(source.voxels.len());
        for voxel in &source.voxels {
            match registry.load_model(archive, "", &voxel.file) {
                Ok(mesh) => {
                    let start = RecordId(records.len());
                    records.extend(synthesize_voxel_frames(voxel, mesh));
                    voxel_records.push(Some((start, voxel.has_distinct_dropped())));
                }
                Err(_) => voxel_records.push(None),
            }
        }
        summary.voxel_records = records.len();

        let mut classes_with_models = HashSet::new();
        for def in &source.definitions {
            if let Some(class) = classes.resolve(&def.class) {
                classes_with_models.insert(class);
            }
            let expanded =
                DefinitionExpander::new(archive, &mut registry, classes, &source.sprites).expand(def);
            match expanded {
                Ok(expanded) => records.extend(expanded),
                Err(err) => {
                    log::error!("Skipping model definition for '{}': {err}", def.class);
                    summary.skipped_definitions += 1;
                }
            }
        }
        summary.definition_records = records.len() - summary.voxel_records;

        let voxel_frames = voxel_frame_map(&source.sprites, &voxel_records);
        summary.meshes = registry.len();
        log::info!(
            "Loaded {} meshes, {} voxel records, {} model records",
            summary.meshes,
            summary.voxel_records,
            summary.definition_records
        );

        Self {
            generation: 1,
            registry,
            index: AssociationIndex::build(records, classes_with_models, voxel_frames),
            settings,
            summary,
        }
    }

    /// Tear down the current generation and build a new one from `source`
    pub fn reload<A, C, U>(
        &mut self,
        archive: &A,
        classes: &C,
        source: &GenerationSource,
        uploader: &mut U,
    ) where
        A: ResourceArchive + ?Sized,
        C: ClassResolver + ?Sized,
        U: GeometryUploader + ?Sized,
    {
        let generation = self.generation + 1;
        self.teardown(uploader);
        *self = Self::load(archive, classes, source, self.settings);
        self.generation = generation;
        log::debug!("Model generation {generation} loaded");
    }

    /// Release all geometry and drop every mesh and record
    pub fn teardown<U: GeometryUploader + ?Sized>(&mut self, uploader: &mut U) {
        self.registry.clear(uploader);
        self.index = AssociationIndex::default();
        self.summary = LoadSummary::default();
    }

    /// Realize geometry for every mesh up front
    pub fn prewarm<A, U>(&mut self, archive: &A, uploader: &mut U) -> usize
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
    {
        self.registry.build_all(archive, uploader)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn index(&self) -> &AssociationIndex {
        &self.index
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    pub fn summary(&self) -> LoadSummary {
        self.summary
    }

    /// Whether `class` has a 3D representation of its own
    pub fn has_model(&self, class: ClassId) -> bool {
        self.index.has_model(class)
    }

    pub fn find_id(&self, class: ClassId, sprite: SpriteId, frame: u8, dropped: bool) -> Option<RecordId> {
        self.index.find_id(class, sprite, frame, dropped, &self.settings)
    }

    pub fn find(&self, class: ClassId, sprite: SpriteId, frame: u8, dropped: bool) -> Option<&SpriteModelFrame> {
        self.index.find(class, sprite, frame, dropped, &self.settings)
    }

    /// Record replacing the weapon sprite in `state`; HUD lookups never use
    /// the dropped variant
    fn hud_record<'a, S: AnimationStates + ?Sized>(
        index: &'a AssociationIndex,
        settings: &RenderSettings,
        weapon: Option<ClassId>,
        states: &S,
        state: Option<StateId>,
    ) -> Option<&'a SpriteModelFrame> {
        let state = states.state(state?)?;
        index.find(weapon?, state.sprite, state.frame, false, settings)
    }

    /// Whether the ready weapon has a model for its current sprite frame
    pub fn has_hud_model<S: AnimationStates + ?Sized>(
        &self,
        weapon: Option<ClassId>,
        states: &S,
        state: Option<StateId>,
    ) -> bool {
        Self::hud_record(&self.index, &self.settings, weapon, states, state).is_some()
    }

    /// Draw the player's weapon model.
    ///
    /// Returns the record's placement options for the caller's view-space
    /// transform and the number of draws issued, or `None` when the weapon
    /// sprite has no model.
    pub fn render_hud<A, U, S, K>(
        &mut self,
        archive: &A,
        uploader: &mut U,
        hud: &HudWeapon<'_, S>,
        sink: &mut K,
    ) -> Option<(ModelTransform, usize)>
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
        S: AnimationStates + ?Sized,
        K: ModelRenderSink + ?Sized,
    {
        let settings = self.settings;
        let record = Self::hud_record(&self.index, &settings, hud.weapon, hud.states, hud.state)?;
        let animation = AnimationInput {
            class: hud.weapon?,
            state: hud.state?,
            remaining_tics: hud.remaining_tics,
            tic_fraction: hud.tic_fraction,
        };

        let blend = resolve_interpolation(record, &animation, hud.states, &self.index, &settings);
        let draws = render_frame_models(
            record,
            &blend,
            &mut self.registry,
            archive,
            uploader,
            0,
            sink,
        );
        Some((record.transform, draws))
    }

    /// Draw an actor's current animation state.
    ///
    /// Returns the placement to draw with and the number of draws issued, or
    /// `None` when the actor has no model for its state and should be drawn
    /// as a sprite.
    pub fn render<A, U, S, K>(
        &mut self,
        archive: &A,
        uploader: &mut U,
        actor: &ActorFrame<'_, S>,
        time_tics: f64,
        sink: &mut K,
    ) -> Option<(ModelOrientation, usize)>
    where
        A: ResourceArchive + ?Sized,
        U: GeometryUploader + ?Sized,
        S: AnimationStates + ?Sized,
        K: ModelRenderSink + ?Sized,
    {
        let state = actor.states.state(actor.animation.state)?;
        let settings = self.settings;
        let record = self.index.find(
            actor.animation.class,
            state.sprite,
            state.frame,
            actor.dropped,
            &settings,
        )?;

        let blend = resolve_interpolation(record, &actor.animation, actor.states, &self.index, &settings);
        let orientation = orient(record, &actor.pose, time_tics);
        let draws = render_frame_models(
            record,
            &blend,
            &mut self.registry,
            archive,
            uploader,
            orientation.translation,
            sink,
        );
        Some((orientation, draws))
    }
}

/// Map each sprite frame with a loaded voxel to the voxel's first record
fn voxel_frame_map(
    sprites: &SpriteCatalog,
    voxel_records: &[Option<(RecordId, bool)>],
) -> HashMap<(SpriteId, u8), VoxelFrame> {
    let mut map = HashMap::new();
    for (sprite, def) in sprites.iter() {
        for (frame, frame_def) in def.frames.iter().enumerate() {
            let Some(voxel) = frame_def.voxel else { continue };
            let Ok(frame) = u8::try_from(frame) else { break };
            match voxel_records.get(voxel) {
                Some(Some((record, distinct_dropped))) => {
                    map.insert(
                        (sprite, frame),
                        VoxelFrame {
                            record: *record,
                            distinct_dropped: *distinct_dropped,
                        },
                    );
                }
                Some(None) => {}
                None => log::warn!("Sprite '{}' refers to unknown voxel #{voxel}", def.name),
            }
        }
    }
    map
}

/// Meshes used by a record, for diagnostics
pub fn record_meshes(record: &SpriteModelFrame) -> impl Iterator<Item = MeshId> + '_ {
    record.used_slots().filter_map(|(_, slot)| slot.mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassTable, SpriteDef};
    use crate::definition::{FrameAssignment, SlotFile};
    use frame_models::fixtures::{FrameSpec, KvxBuilder, Md2Builder, RecordingUploader};
    use frame_models::MemoryArchive;

    fn archive() -> MemoryArchive {
        let mut archive = MemoryArchive::new();
        archive.insert(
            "models/imp/tris.md2",
            Md2Builder::new(3, 1)
                .frame(FrameSpec::new("idle"))
                .frame(FrameSpec::new("walk"))
                .build(),
        );
        archive.insert(
            "voxels/barrel.kvx",
            KvxBuilder::new([1, 1, 1]).slab(0, 0, 0, 0x3f, &[4]).build(),
        );
        archive
    }

    fn source() -> GenerationSource {
        GenerationSource {
            sprites: [SpriteDef::new("TROO", 4), SpriteDef::new("BAR1", 2).with_voxel(0, 0)]
                .into_iter()
                .collect(),
            voxels: vec![VoxelDefinition {
                placed_spin: 10,
                ..VoxelDefinition::new("voxels/barrel.kvx")
            }],
            definitions: vec![ModelDefinition {
                models: vec![SlotFile::new(0, "tris.md2")],
                frames: vec![FrameAssignment::by_name("TROO", "AB", 0, "walk")],
                ..ModelDefinition::new("DoomImp", "models/imp")
            }],
        }
    }

    #[test]
    fn test_load_builds_voxel_and_definition_records() {
        let classes: ClassTable = ["DoomImp", "ExplosiveBarrel"].into_iter().collect();
        let generation = ModelGeneration::load(&archive(), &classes, &source(), RenderSettings::default());

        let summary = generation.summary();
        assert_eq!(summary.meshes, 2);
        // placed and dropped spins differ
        assert_eq!(summary.voxel_records, 2);
        assert_eq!(summary.definition_records, 2);
        assert!(generation.has_model(ClassId(0)));
        assert!(!generation.has_model(ClassId(1)));

        assert_eq!(generation.find_id(ClassId(0), SpriteId(0), 1, false), Some(RecordId(3)));
        assert_eq!(generation.find_id(ClassId(1), SpriteId(1), 0, false), Some(RecordId(0)));
        assert_eq!(generation.find_id(ClassId(1), SpriteId(1), 0, true), Some(RecordId(1)));
        assert_eq!(generation.find_id(ClassId(1), SpriteId(1), 1, false), None);
    }

    #[test]
    fn test_skipped_definition_still_marks_class() {
        let classes: ClassTable = ["DoomImp"].into_iter().collect();
        let mut source = source();
        source.definitions[0].frames.push(FrameAssignment::by_index("NOPE", "A", 0, 0));

        let generation = ModelGeneration::load(&archive(), &classes, &source, RenderSettings::default());
        assert_eq!(generation.summary().skipped_definitions, 1);
        assert_eq!(generation.summary().definition_records, 0);
        assert!(generation.has_model(ClassId(0)));
    }

    #[test]
    fn test_reload_releases_geometry_and_bumps_generation() {
        let archive = archive();
        let classes: ClassTable = ["DoomImp"].into_iter().collect();
        let mut uploader = RecordingUploader::default();
        let mut generation = ModelGeneration::load(&archive, &classes, &source(), RenderSettings::default());

        assert_eq!(generation.prewarm(&archive, &mut uploader), 2);
        generation.reload(&archive, &classes, &source(), &mut uploader);

        assert_eq!(generation.generation(), 2);
        assert_eq!(uploader.released.len(), 2);
        assert!(generation.registry().iter().all(|(_, mesh)| !mesh.is_built()));
    }

    #[test]
    fn test_record_meshes() {
        let classes: ClassTable = ["DoomImp"].into_iter().collect();
        let generation = ModelGeneration::load(&archive(), &classes, &source(), RenderSettings::default());
        let record = generation.index().get(RecordId(0)).unwrap();
        assert_eq!(record_meshes(record).collect::<Vec<_>>(), vec![MeshId(0)]);
    }
}
