//! Per-draw placement derived from an association record and the actor

use glam::{Vec2, Vec3};

use crate::frame::{ModelFlags, SpriteModelFrame};

/// The parts of an actor that affect how its model is placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorPose {
    /// Facing, degrees
    pub angle: f32,
    /// Degrees
    pub pitch: f32,
    /// Degrees
    pub roll: f32,
    pub velocity: Vec3,
    /// Sprite scale; `y` is height
    pub scale: Vec2,
    /// Color translation of the actor, `0` for none
    pub translation: u32,
}

impl Default for ActorPose {
    fn default() -> Self {
        Self {
            angle: 0.0,
            pitch: 0.0,
            roll: 0.0,
            velocity: Vec3::ZERO,
            scale: Vec2::ONE,
            translation: 0,
        }
    }
}

/// Rotation, scale and translation to draw a record with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOrientation {
    pub angle: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Degrees around the record's rotation vector
    pub rotate_offset: f32,
    /// x, y and z scale; z is height
    pub scale: Vec3,
    /// Record offset, independent of the record scale
    pub offset: Vec3,
    pub translation: u32,
}

/// Pitch in degrees of a velocity vector, seen from an actor facing `angle`.
///
/// Moving backwards flips the sign; pure vertical motion always pitches up.
pub fn pitch_from_velocity(velocity: Vec3, angle: f32) -> f32 {
    let glam::DVec3 { x, y, z } = velocity.as_dvec3();
    let horizontal = x.hypot(y);

    if horizontal == 0.0 {
        return if z == 0.0 { 0.0 } else { 90.0 };
    }

    let pitch = (z / horizontal).atan().to_degrees();
    let facing = f64::from(angle).to_radians();
    let forward = (x * facing.cos() + y * facing.sin()) / horizontal;
    if forward < 0.0 {
        -pitch as f32
    } else {
        pitch as f32
    }
}

/// Spin of a rotating model after `time_tics`, in `[0, 360)` degrees
pub fn rotation_offset(speed: f32, time_tics: f64) -> f32 {
    let turns = f64::from(speed) * time_tics / 200.0;
    ((turns - turns.floor()) * 360.0) as f32
}

/// Combine record options with the actor pose
pub fn orient(record: &SpriteModelFrame, pose: &ActorPose, time_tics: f64) -> ModelOrientation {
    let flags = record.flags;
    let transform = &record.transform;

    let mut pitch = 0.0;
    if flags.contains(ModelFlags::PITCH_FROM_MOMENTUM) {
        pitch = pitch_from_velocity(pose.velocity, pose.angle);
    }
    if flags.contains(ModelFlags::INHERIT_ACTOR_PITCH) {
        pitch += pose.pitch;
    }

    let roll = if flags.contains(ModelFlags::INHERIT_ACTOR_ROLL) {
        pose.roll
    } else {
        0.0
    };

    let rotate_offset = if flags.contains(ModelFlags::ROTATING) {
        rotation_offset(transform.rotation_speed, time_tics)
    } else {
        0.0
    };

    let translation = if flags.contains(ModelFlags::IGNORE_TRANSLATION) {
        0
    } else {
        pose.translation
    };

    ModelOrientation {
        angle: pose.angle,
        pitch,
        roll,
        rotate_offset,
        scale: Vec3::new(
            pose.scale.x * transform.scale.x,
            pose.scale.x * transform.scale.y,
            pose.scale.y * transform.scale.z,
        ),
        offset: transform.offset / transform.scale,
        translation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_pitch_from_velocity() {
        assert!(approx(pitch_from_velocity(Vec3::new(1.0, 0.0, 1.0), 0.0), 45.0));
        // moving backwards relative to facing
        assert!(approx(pitch_from_velocity(Vec3::new(1.0, 0.0, 1.0), 180.0), -45.0));
        assert!(approx(pitch_from_velocity(Vec3::new(0.0, 0.0, -3.0), 0.0), 90.0));
        assert_eq!(pitch_from_velocity(Vec3::ZERO, 0.0), 0.0);
    }

    #[test]
    fn test_rotation_offset_wraps() {
        assert!(approx(rotation_offset(1.0, 50.0), 90.0));
        assert!(approx(rotation_offset(1.0, 250.0), 90.0));
        assert!(approx(rotation_offset(-1.0, 50.0), 270.0));
    }

    #[test]
    fn test_orient_applies_flags() {
        let mut record = SpriteModelFrame::default();
        record.flags = ModelFlags::INHERIT_ACTOR_PITCH
            | ModelFlags::INHERIT_ACTOR_ROLL
            | ModelFlags::IGNORE_TRANSLATION;
        record.transform.scale = Vec3::new(2.0, 2.0, 4.0);
        record.transform.offset = Vec3::new(2.0, 0.0, 8.0);

        let pose = ActorPose {
            pitch: 10.0,
            roll: 5.0,
            scale: Vec2::new(0.5, 2.0),
            translation: 7,
            ..ActorPose::default()
        };
        let orientation = orient(&record, &pose, 0.0);

        assert_eq!(orientation.pitch, 10.0);
        assert_eq!(orientation.roll, 5.0);
        assert_eq!(orientation.translation, 0);
        assert_eq!(orientation.scale, Vec3::new(1.0, 1.0, 8.0));
        assert_eq!(orientation.offset, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(orientation.rotate_offset, 0.0);
    }

    #[test]
    fn test_orient_keeps_translation_by_default() {
        let pose = ActorPose {
            translation: 3,
            pitch: 30.0,
            ..ActorPose::default()
        };
        let orientation = orient(&SpriteModelFrame::default(), &pose, 12.0);
        assert_eq!(orientation.translation, 3);
        assert_eq!(orientation.pitch, 0.0);
    }
}
