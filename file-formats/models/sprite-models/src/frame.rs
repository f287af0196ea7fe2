//! Association records linking a sprite frame to up to four model slots

use bitflags::bitflags;
use frame_models::{MeshId, SkinTexture};
use glam::Vec3;

/// Number of model slots on a single association record
pub const MAX_MODELS_PER_FRAME: usize = 4;

/// Number of distinct sprite frame letters, `A` through `]`
pub const MAX_SPRITE_FRAMES: u8 = 29;

/// Identity of an actor class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassId(pub u32);

/// Index of a sprite in the sprite catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpriteId(pub u32);

/// Lookup key of an association record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub class: ClassId,
    pub sprite: SpriteId,
    /// Frame number, `0` for `A`
    pub frame: u8,
}

impl FrameKey {
    pub fn new(class: ClassId, sprite: SpriteId, frame: u8) -> Self {
        Self {
            class,
            sprite,
            frame,
        }
    }
}

/// Convert a frame letter into a frame number
pub fn frame_from_char(ch: char) -> Option<u8> {
    let upper = ch.to_ascii_uppercase();
    if !upper.is_ascii() {
        return None;
    }
    (upper as u8)
        .checked_sub(b'A')
        .filter(|frame| *frame < MAX_SPRITE_FRAMES)
}

bitflags! {
    /// Rendering behavior flags of an association record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ModelFlags: u16 {
        /// Draw without the actor's color translation
        const IGNORE_TRANSLATION = 0x0001;
        /// Derive pitch from the actor's velocity
        const PITCH_FROM_MOMENTUM = 0x0002;
        /// Spin around the rotation vector over time
        const ROTATING = 0x0004;
        /// Smooth out states that repeat the same frame
        const INTERPOLATE_DOUBLED_FRAMES = 0x0008;
        /// Never blend towards the next frame
        const NO_INTERPOLATION = 0x0010;
        /// Add the actor's own pitch
        const INHERIT_ACTOR_PITCH = 0x0020;
        /// Add the actor's own roll
        const INHERIT_ACTOR_ROLL = 0x0040;
    }
}

/// One model slot of an association record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSlot {
    pub mesh: Option<MeshId>,
    /// Overrides the mesh's own skin when set
    pub skin: Option<SkinTexture>,
    /// Frame of the mesh to draw; `None` when a named frame does not exist
    pub frame: Option<usize>,
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self {
            mesh: None,
            skin: None,
            frame: Some(0),
        }
    }
}

/// Placement options applied when drawing a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    /// x, y and z scale; y is depth and z is height
    pub scale: Vec3,
    pub offset: Vec3,
    /// Degrees
    pub angle_offset: f32,
    pub pitch_offset: f32,
    pub roll_offset: f32,
    pub rotation_vector: Vec3,
    pub rotation_center: Vec3,
    pub rotation_speed: f32,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            offset: Vec3::ZERO,
            angle_offset: 0.0,
            pitch_offset: 0.0,
            roll_offset: 0.0,
            rotation_vector: Vec3::ZERO,
            rotation_center: Vec3::ZERO,
            rotation_speed: 0.0,
        }
    }
}

/// Association of a sprite frame with up to [`MAX_MODELS_PER_FRAME`] models.
///
/// Records synthesized for voxels carry no key; they are reached through the
/// sprite catalog's voxel replacements instead of the hash table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpriteModelFrame {
    pub key: Option<FrameKey>,
    pub slots: [ModelSlot; MAX_MODELS_PER_FRAME],
    pub transform: ModelTransform,
    pub flags: ModelFlags,
    pub(crate) hash_next: Option<usize>,
}

impl SpriteModelFrame {
    /// Slots that reference a mesh, with their slot number
    pub fn used_slots(&self) -> impl Iterator<Item = (usize, &ModelSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.mesh.is_some())
    }
}
