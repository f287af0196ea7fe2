//! Structured model definitions and their expansion into association records
//!
//! A definition describes one actor class: the model and skin in each slot,
//! placement options and an ordered list of frame assignments. Expanding it
//! walks the assignments in order over a running record and pushes one
//! snapshot per distinct frame character, so later assignments inherit the
//! slot frames set by earlier ones.

use frame_models::skin::load_skin;
use frame_models::{ModelRegistry, ResourceArchive};
use glam::Vec3;

use crate::catalog::{ClassResolver, SpriteCatalog};
use crate::error::{AssociationError, Result};
use crate::frame::{
    FrameKey, MAX_MODELS_PER_FRAME, MAX_SPRITE_FRAMES, ModelFlags, SpriteModelFrame,
};

/// A file bound to a model slot
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotFile {
    pub slot: usize,
    pub file: String,
}

impl SlotFile {
    pub fn new(slot: usize, file: &str) -> Self {
        Self {
            slot,
            file: file.to_string(),
        }
    }
}

/// How a frame assignment picks the mesh frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FrameTarget {
    Index(usize),
    /// Looked up in the slot's mesh
    Name(String),
}

/// Bind sprite frames to a mesh frame of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameAssignment {
    pub sprite: String,
    /// Frame letters, e.g. `"ABCD"`
    pub frames: String,
    pub slot: usize,
    pub target: FrameTarget,
}

impl FrameAssignment {
    pub fn by_index(sprite: &str, frames: &str, slot: usize, index: usize) -> Self {
        Self {
            sprite: sprite.to_string(),
            frames: frames.to_string(),
            slot,
            target: FrameTarget::Index(index),
        }
    }

    pub fn by_name(sprite: &str, frames: &str, slot: usize, name: &str) -> Self {
        Self {
            sprite: sprite.to_string(),
            frames: frames.to_string(),
            slot,
            target: FrameTarget::Name(name.to_string()),
        }
    }
}

/// Models, skins and options for one actor class
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelDefinition {
    pub class: String,
    /// Directory model and skin files are relative to
    pub path: String,
    pub models: Vec<SlotFile>,
    /// An empty file name clears the slot's skin override
    pub skins: Vec<SlotFile>,
    pub scale: Option<[f32; 3]>,
    pub offset: Option<[f32; 3]>,
    /// Overrides the z component of `offset`
    pub z_offset: Option<f32>,
    pub angle_offset: f32,
    pub pitch_offset: f32,
    pub roll_offset: f32,
    pub rotation_vector: Option<[f32; 3]>,
    pub rotation_center: Option<[f32; 3]>,
    pub rotation_speed: Option<f32>,
    pub flags: ModelFlags,
    pub frames: Vec<FrameAssignment>,
}

impl ModelDefinition {
    pub fn new(class: &str, path: &str) -> Self {
        Self {
            class: class.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }
}

/// Expands definitions against a resource archive, loading models into a
/// registry as they are referenced
pub struct DefinitionExpander<'a, A: ?Sized, C: ?Sized> {
    archive: &'a A,
    registry: &'a mut ModelRegistry,
    classes: &'a C,
    sprites: &'a SpriteCatalog,
}

impl<'a, A, C> DefinitionExpander<'a, A, C>
where
    A: ResourceArchive + ?Sized,
    C: ClassResolver + ?Sized,
{
    pub fn new(
        archive: &'a A,
        registry: &'a mut ModelRegistry,
        classes: &'a C,
        sprites: &'a SpriteCatalog,
    ) -> Self {
        Self {
            archive,
            registry,
            classes,
            sprites,
        }
    }

    /// Produce the association records of `def`.
    ///
    /// Missing model or skin files and unknown frame names are logged and
    /// leave the affected slot empty. An unknown class or sprite, an invalid
    /// frame character or a slot outside `0..4` rejects the whole definition.
    pub fn expand(&mut self, def: &ModelDefinition) -> Result<Vec<SpriteModelFrame>> {
        let class = self
            .classes
            .resolve(&def.class)
            .ok_or_else(|| AssociationError::UnknownClass(def.class.clone()))?;

        let mut running = SpriteModelFrame::default();
        self.apply_models(def, &mut running)?;
        apply_options(def, &mut running);

        let mut records = Vec::new();
        for assignment in &def.frames {
            let slot = check_slot(assignment.slot, &def.class)?;
            let sprite = self.sprites.find(&assignment.sprite).ok_or_else(|| {
                AssociationError::UnknownSprite {
                    sprite: assignment.sprite.clone(),
                    class: def.class.clone(),
                }
            })?;

            running.slots[slot].frame = match &assignment.target {
                FrameTarget::Index(index) => Some(*index),
                FrameTarget::Name(name) => self.named_frame(&running, slot, name, &def.class),
            };

            let mut seen = [false; MAX_SPRITE_FRAMES as usize];
            for ch in assignment.frames.chars() {
                let frame = crate::frame::frame_from_char(ch).ok_or_else(|| {
                    AssociationError::InvalidFrameCharacter {
                        ch,
                        class: def.class.clone(),
                    }
                })?;
                if std::mem::replace(&mut seen[usize::from(frame)], true) {
                    continue;
                }
                running.key = Some(FrameKey::new(class, sprite, frame));
                records.push(running.clone());
            }
        }

        log::debug!(
            "Model definition for '{}' produced {} records",
            def.class,
            records.len()
        );
        Ok(records)
    }

    fn apply_models(&mut self, def: &ModelDefinition, record: &mut SpriteModelFrame) -> Result<()> {
        for model in &def.models {
            let slot = check_slot(model.slot, &def.class)?;
            record.slots[slot].mesh = self
                .registry
                .load_model(self.archive, &def.path, &model.file)
                .ok();
        }

        for skin in &def.skins {
            let slot = check_slot(skin.slot, &def.class)?;
            record.slots[slot].skin = load_skin(self.archive, &def.path, &skin.file);
        }
        Ok(())
    }

    /// Look a frame up by name in the slot's mesh; an empty slot has no frames
    fn named_frame(
        &self,
        record: &SpriteModelFrame,
        slot: usize,
        name: &str,
        class: &str,
    ) -> Option<usize> {
        let mesh = record.slots[slot].mesh.and_then(|id| self.registry.get(id))?;
        let frame = mesh.find_frame(name);
        if frame.is_none() {
            log::warn!(
                "Unknown frame '{name}' in '{}' for '{class}'",
                mesh.file_name()
            );
        }
        frame
    }
}

fn check_slot(slot: usize, class: &str) -> Result<usize> {
    if slot < MAX_MODELS_PER_FRAME {
        Ok(slot)
    } else {
        Err(AssociationError::SlotOutOfRange {
            slot,
            class: class.to_string(),
        })
    }
}

fn apply_options(def: &ModelDefinition, record: &mut SpriteModelFrame) {
    let transform = &mut record.transform;
    if let Some(scale) = def.scale {
        transform.scale = Vec3::from(scale);
    }
    if let Some(offset) = def.offset {
        transform.offset = Vec3::from(offset);
    }
    if let Some(z) = def.z_offset {
        transform.offset.z = z;
    }
    transform.angle_offset = def.angle_offset;
    transform.pitch_offset = def.pitch_offset;
    transform.roll_offset = def.roll_offset;

    record.flags = def.flags;
    if def.flags.contains(ModelFlags::ROTATING) {
        transform.rotation_vector = Vec3::Y;
        transform.rotation_center = Vec3::ZERO;
        transform.rotation_speed = 1.0;
    }
    if let Some(vector) = def.rotation_vector {
        transform.rotation_vector = Vec3::from(vector);
    }
    if let Some(center) = def.rotation_center {
        transform.rotation_center = Vec3::from(center);
    }
    if let Some(speed) = def.rotation_speed {
        transform.rotation_speed = speed;
    }
}
