//! Rendering toggles consulted by association lookup and interpolation

/// Settings that used to be global console variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderSettings {
    /// Blend between the current and next model frame
    pub interpolate_model_frames: bool,
    /// Replace sprite frames with their voxel models
    pub draw_voxels: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            interpolate_model_frames: true,
            draw_voxels: true,
        }
    }
}
