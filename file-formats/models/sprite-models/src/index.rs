//! Hash index from (class, sprite, frame) to association records

use std::collections::{HashMap, HashSet};

use crc32fast::Hasher;

use crate::config::RenderSettings;
use crate::frame::{ClassId, FrameKey, SpriteId, SpriteModelFrame};

/// Position of a record inside an [`AssociationIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub usize);

/// Voxel replacement for one sprite frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelFrame {
    /// Record used for placed instances
    pub record: RecordId,
    /// The record after `record` is the dropped-state variant
    pub distinct_dropped: bool,
}

/// Hash the three key fields
fn key_hash(key: &FrameKey) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&key.class.0.to_le_bytes());
    hasher.update(&key.sprite.0.to_le_bytes());
    hasher.update(&[key.frame]);
    hasher.finalize()
}

/// Fixed-size chained hash table over association records.
///
/// The table has one bucket per record. Records are pushed onto the head of
/// their bucket in order, so a later record with the same key shadows an
/// earlier one.
#[derive(Debug, Clone, Default)]
pub struct AssociationIndex {
    records: Vec<SpriteModelFrame>,
    heads: Vec<Option<usize>>,
    classes_with_models: HashSet<ClassId>,
    voxel_frames: HashMap<(SpriteId, u8), VoxelFrame>,
}

impl AssociationIndex {
    /// Build the table over `records`.
    ///
    /// `classes_with_models` lists every class named by a model definition;
    /// `voxel_frames` maps sprite frames to their voxel replacement records.
    pub fn build(
        mut records: Vec<SpriteModelFrame>,
        classes_with_models: HashSet<ClassId>,
        voxel_frames: HashMap<(SpriteId, u8), VoxelFrame>,
    ) -> Self {
        let mut heads = vec![None; records.len()];
        let buckets = records.len();

        for (i, record) in records.iter_mut().enumerate() {
            record.hash_next = None;
            let Some(key) = record.key else { continue };
            let bucket = key_hash(&key) as usize % buckets;
            record.hash_next = heads[bucket];
            heads[bucket] = Some(i);
        }

        log::debug!(
            "Association index: {} records, {} classes with models, {} voxel frames",
            records.len(),
            classes_with_models.len(),
            voxel_frames.len()
        );
        Self {
            records,
            heads,
            classes_with_models,
            voxel_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&SpriteModelFrame> {
        self.records.get(id.0)
    }

    pub fn records(&self) -> &[SpriteModelFrame] {
        &self.records
    }

    /// Whether any model definition names `class`
    pub fn has_model(&self, class: ClassId) -> bool {
        self.classes_with_models.contains(&class)
    }

    /// Walk the chain for an exact key match
    fn find_direct(&self, key: &FrameKey) -> Option<RecordId> {
        if self.heads.is_empty() {
            return None;
        }
        let mut next = self.heads[key_hash(key) as usize % self.heads.len()];
        while let Some(i) = next {
            let record = &self.records[i];
            if record.key.as_ref() == Some(key) {
                return Some(RecordId(i));
            }
            next = record.hash_next;
        }
        None
    }

    /// Resolve the record to draw for an actor.
    ///
    /// Direct associations are only probed for classes that have a model.
    /// Failing that, and with voxel drawing enabled, the sprite frame's voxel
    /// replacement is used; `dropped` selects its dropped-state variant when it
    /// has one.
    pub fn find_id(
        &self,
        class: ClassId,
        sprite: SpriteId,
        frame: u8,
        dropped: bool,
        settings: &RenderSettings,
    ) -> Option<RecordId> {
        if self.has_model(class)
            && let Some(id) = self.find_direct(&FrameKey::new(class, sprite, frame))
        {
            return Some(id);
        }

        if settings.draw_voxels
            && let Some(voxel) = self.voxel_frames.get(&(sprite, frame))
        {
            let offset = usize::from(dropped && voxel.distinct_dropped);
            return Some(RecordId(voxel.record.0 + offset));
        }
        None
    }

    /// Like [`AssociationIndex::find_id`], returning the record itself
    pub fn find(
        &self,
        class: ClassId,
        sprite: SpriteId,
        frame: u8,
        dropped: bool,
        settings: &RenderSettings,
    ) -> Option<&SpriteModelFrame> {
        self.find_id(class, sprite, frame, dropped, settings)
            .and_then(|id| self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ModelFlags;
    use pretty_assertions::assert_eq;

    fn record(class: u32, sprite: u32, frame: u8, flags: ModelFlags) -> SpriteModelFrame {
        SpriteModelFrame {
            key: Some(FrameKey::new(ClassId(class), SpriteId(sprite), frame)),
            flags,
            ..SpriteModelFrame::default()
        }
    }

    fn index(records: Vec<SpriteModelFrame>) -> AssociationIndex {
        let classes = records.iter().filter_map(|r| r.key.map(|k| k.class)).collect();
        AssociationIndex::build(records, classes, HashMap::new())
    }

    #[test]
    fn test_exact_key_match() {
        let index = index(vec![
            record(1, 2, 0, ModelFlags::empty()),
            record(1, 2, 1, ModelFlags::ROTATING),
            record(2, 2, 1, ModelFlags::NO_INTERPOLATION),
        ]);
        let settings = RenderSettings::default();

        let found = index.find(ClassId(1), SpriteId(2), 1, false, &settings).unwrap();
        assert_eq!(found.flags, ModelFlags::ROTATING);
        assert_eq!(index.find(ClassId(1), SpriteId(3), 1, false, &settings), None);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let index = index(vec![
            record(1, 2, 3, ModelFlags::empty()),
            record(9, 9, 9, ModelFlags::empty()),
            record(1, 2, 3, ModelFlags::IGNORE_TRANSLATION),
        ]);

        let id = index.find_id(ClassId(1), SpriteId(2), 3, false, &RenderSettings::default());
        assert_eq!(id, Some(RecordId(2)));
    }

    #[test]
    fn test_every_record_reachable_despite_collisions() {
        let records: Vec<_> = (0..200)
            .map(|i| record(i % 7, i / 7, (i % 29) as u8, ModelFlags::empty()))
            .collect();
        let keys: Vec<_> = records.iter().filter_map(|r| r.key).collect();
        let index = index(records);

        for (i, key) in keys.iter().enumerate() {
            let id = index.find_id(key.class, key.sprite, key.frame, false, &RenderSettings::default());
            assert_eq!(id, Some(RecordId(i)));
        }
    }

    #[test]
    fn test_voxel_fallback_respects_toggle_and_dropped() {
        let records = vec![SpriteModelFrame::default(), SpriteModelFrame::default()];
        let mut voxels = HashMap::new();
        voxels.insert(
            (SpriteId(4), 0),
            VoxelFrame {
                record: RecordId(0),
                distinct_dropped: true,
            },
        );
        let index = AssociationIndex::build(records, HashSet::new(), voxels);

        let on = RenderSettings::default();
        let off = RenderSettings {
            draw_voxels: false,
            ..RenderSettings::default()
        };

        assert_eq!(index.find_id(ClassId(0), SpriteId(4), 0, false, &on), Some(RecordId(0)));
        assert_eq!(index.find_id(ClassId(0), SpriteId(4), 0, true, &on), Some(RecordId(1)));
        assert_eq!(index.find_id(ClassId(0), SpriteId(4), 0, false, &off), None);
        assert_eq!(index.find_id(ClassId(0), SpriteId(4), 1, false, &on), None);
    }

    #[test]
    fn test_class_without_model_skips_table() {
        let records = vec![record(3, 0, 0, ModelFlags::empty())];
        let index = AssociationIndex::build(records, HashSet::new(), HashMap::new());

        assert!(!index.has_model(ClassId(3)));
        assert_eq!(index.find(ClassId(3), SpriteId(0), 0, false, &RenderSettings::default()), None);
    }

    #[test]
    fn test_empty_index() {
        let classes: HashSet<_> = [ClassId(0)].into_iter().collect();
        let index = AssociationIndex::build(Vec::new(), classes, HashMap::new());
        assert_eq!(index.find(ClassId(0), SpriteId(0), 0, false, &RenderSettings::default()), None);
    }
}
