//! Association records synthesized for voxel replacements

use frame_models::{MeshId, SkinTexture};
use glam::Vec3;

use crate::frame::{ModelFlags, ModelSlot, SpriteModelFrame};

/// Divisor turning a voxel spin into a rotation speed
pub const SPIN_TO_ROTATION_SPEED: f32 = 55.55;

/// A voxel model replacing one or more sprite frames
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VoxelDefinition {
    /// Voxel file name in the archive
    pub file: String,
    pub scale: f32,
    /// Degrees
    pub angle_offset: f32,
    /// Spin while placed in the world, zero for none
    pub placed_spin: i32,
    /// Spin after being dropped by an actor
    pub dropped_spin: i32,
}

impl Default for VoxelDefinition {
    fn default() -> Self {
        Self {
            file: String::new(),
            scale: 1.0,
            angle_offset: 0.0,
            placed_spin: 0,
            dropped_spin: 0,
        }
    }
}

impl VoxelDefinition {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }

    /// Whether a separate record is needed for dropped instances
    pub fn has_distinct_dropped(&self) -> bool {
        self.placed_spin != self.dropped_spin
    }
}

fn set_spin(record: &mut SpriteModelFrame, spin: i32) {
    if spin == 0 {
        record.transform.rotation_vector = Vec3::ZERO;
        record.transform.rotation_speed = 0.0;
        record.flags.remove(ModelFlags::ROTATING);
    } else {
        record.transform.rotation_vector = Vec3::Y;
        record.transform.rotation_speed = spin as f32 / SPIN_TO_ROTATION_SPEED;
        record.flags.insert(ModelFlags::ROTATING);
    }
}

/// Build the placed-state record, followed by the dropped-state record when
/// the two spins differ
pub fn synthesize_voxel_frames(def: &VoxelDefinition, mesh: MeshId) -> Vec<SpriteModelFrame> {
    let mut record = SpriteModelFrame::default();
    record.slots[0] = ModelSlot {
        mesh: Some(mesh),
        skin: Some(SkinTexture::VoxelPalette),
        frame: Some(0),
    };
    record.transform.scale = Vec3::splat(def.scale);
    record.transform.angle_offset = def.angle_offset;
    set_spin(&mut record, def.placed_spin);

    let mut records = vec![record.clone()];
    if def.has_distinct_dropped() {
        set_spin(&mut record, def.dropped_spin);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_voxel_has_one_record() {
        let records = synthesize_voxel_frames(&VoxelDefinition::new("barrel.kvx"), MeshId(0));

        assert_eq!(records.len(), 1);
        assert!(records[0].key.is_none());
        assert!(!records[0].flags.contains(ModelFlags::ROTATING));
        assert_eq!(records[0].slots[0].skin, Some(SkinTexture::VoxelPalette));
    }

    #[test]
    fn test_spinning_voxel_rotates_about_vertical() {
        let def = VoxelDefinition {
            placed_spin: 111,
            dropped_spin: 111,
            scale: 0.5,
            ..VoxelDefinition::new("medikit.kvx")
        };
        let records = synthesize_voxel_frames(&def, MeshId(3));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.flags.contains(ModelFlags::ROTATING));
        assert_eq!(record.transform.rotation_vector, Vec3::Y);
        assert!((record.transform.rotation_speed - 111.0 / 55.55).abs() < 1e-6);
        assert_eq!(record.transform.scale, Vec3::splat(0.5));
    }

    #[test]
    fn test_dropped_without_spin_stops_rotating() {
        let def = VoxelDefinition {
            placed_spin: 50,
            dropped_spin: 0,
            ..VoxelDefinition::new("shotgun.kvx")
        };
        let records = synthesize_voxel_frames(&def, MeshId(1));

        assert_eq!(records.len(), 2);
        assert!(records[0].flags.contains(ModelFlags::ROTATING));
        assert!(!records[1].flags.contains(ModelFlags::ROTATING));
        assert_eq!(records[1].transform.rotation_speed, 0.0);
    }

    #[test]
    fn test_dropped_spin_only() {
        let def = VoxelDefinition {
            placed_spin: 0,
            dropped_spin: -20,
            ..VoxelDefinition::new("clip.kvx")
        };
        let records = synthesize_voxel_frames(&def, MeshId(1));

        assert!(!records[0].flags.contains(ModelFlags::ROTATING));
        assert!(records[1].transform.rotation_speed < 0.0);
    }
}
