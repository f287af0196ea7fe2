//! Sprite and actor class lookups the association builder depends on

use crate::frame::{ClassId, SpriteId};

/// Resolves actor class names to identities
pub trait ClassResolver {
    fn resolve(&self, name: &str) -> Option<ClassId>;
}

/// Simple ordered class table; the class id is the position in the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ClassTable {
    names: Vec<String>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, returning the existing id for a name already present
    pub fn insert(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.resolve(name) {
            return id;
        }
        self.names.push(name.to_string());
        ClassId((self.names.len() - 1) as u32)
    }

    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ClassTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for name in iter {
            table.insert(name.as_ref());
        }
        table
    }
}

impl ClassResolver for ClassTable {
    fn resolve(&self, name: &str) -> Option<ClassId> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| ClassId(i as u32))
    }
}

/// Per-frame data of a sprite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpriteFrameDef {
    /// Voxel definition replacing this frame, by position in the voxel list
    #[cfg_attr(feature = "serde", serde(default))]
    pub voxel: Option<usize>,
}

/// A sprite and its frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpriteDef {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub frames: Vec<SpriteFrameDef>,
}

impl SpriteDef {
    pub fn new(name: &str, frame_count: usize) -> Self {
        Self {
            name: name.to_string(),
            frames: vec![SpriteFrameDef::default(); frame_count],
        }
    }

    /// Replace `frame` with a voxel
    #[must_use]
    pub fn with_voxel(mut self, frame: usize, voxel: usize) -> Self {
        if let Some(def) = self.frames.get_mut(frame) {
            def.voxel = Some(voxel);
        }
        self
    }
}

/// All sprites known to the engine; the sprite id is the position in the list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SpriteCatalog {
    sprites: Vec<SpriteDef>,
}

/// Sprite names compare on their first four characters only
fn sprite_prefix(name: &str) -> impl Iterator<Item = u8> + '_ {
    name.bytes().take(4).map(|b| b.to_ascii_uppercase())
}

impl SpriteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sprite: SpriteDef) -> SpriteId {
        self.sprites.push(sprite);
        SpriteId((self.sprites.len() - 1) as u32)
    }

    pub fn get(&self, id: SpriteId) -> Option<&SpriteDef> {
        self.sprites.get(id.0 as usize)
    }

    /// Find the first sprite whose name matches on its first four
    /// characters, ignoring case
    pub fn find(&self, name: &str) -> Option<SpriteId> {
        self.sprites
            .iter()
            .position(|sprite| sprite_prefix(&sprite.name).eq(sprite_prefix(name)))
            .map(|i| SpriteId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpriteId, &SpriteDef)> {
        self.sprites
            .iter()
            .enumerate()
            .map(|(i, sprite)| (SpriteId(i as u32), sprite))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl FromIterator<SpriteDef> for SpriteCatalog {
    fn from_iter<I: IntoIterator<Item = SpriteDef>>(iter: I) -> Self {
        Self {
            sprites: iter.into_iter().collect(),
        }
    }
}
