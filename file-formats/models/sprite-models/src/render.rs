//! Turning a resolved association into draw calls for the render sink

use frame_models::{
    GeometryHandle, GeometryState, GeometryUploader, MeshId, ModelRegistry, ResourceArchive,
    SkinTexture,
};

use crate::frame::SpriteModelFrame;
use crate::interpolation::FrameBlend;

/// Everything the sink needs to draw one model slot
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDraw {
    pub slot: usize,
    pub mesh: MeshId,
    pub geometry: GeometryHandle,
    /// Vertex offset of the frame blended from
    pub frame_a: u32,
    /// Vertex offset of the frame blended towards
    pub frame_b: u32,
    /// Vertices per frame
    pub vertex_count: u32,
    pub factor: f32,
    /// `None` lets the caller bind a substitute texture
    pub skin: Option<SkinTexture>,
    pub translation: u32,
}

/// Receives draws; stands in for the GPU command layer
pub trait ModelRenderSink {
    fn draw(&mut self, draw: &ModelDraw);
}

impl ModelRenderSink for Vec<ModelDraw> {
    fn draw(&mut self, draw: &ModelDraw) {
        self.push(draw.clone());
    }
}

/// Draw every model slot of `record`, realizing geometry on first use.
///
/// A slot blends towards the successor record only when that record uses a
/// different frame for the slot; otherwise frame A is drawn on its own. Slots
/// whose mesh failed to build or whose frames have no buffer position draw
/// nothing. Returns the number of draws issued.
pub fn render_frame_models<A, U, K>(
    record: &SpriteModelFrame,
    blend: &FrameBlend<'_>,
    registry: &mut ModelRegistry,
    archive: &A,
    uploader: &mut U,
    translation: u32,
    sink: &mut K,
) -> usize
where
    A: ResourceArchive + ?Sized,
    U: GeometryUploader + ?Sized,
    K: ModelRenderSink + ?Sized,
{
    let mut draws = 0;
    for (slot, model) in record.used_slots() {
        let Some(id) = model.mesh else { continue };
        let Some(mesh) = registry.get_mut(id) else {
            log::warn!("Association refers to unknown mesh #{}", id.0);
            continue;
        };
        if mesh.build_geometry(archive, uploader).is_err() {
            continue;
        }
        let GeometryState::Built(geometry) = mesh.geometry_state() else {
            continue;
        };

        let next_frame = blend
            .next
            .map(|next| next.slots[slot].frame)
            .filter(|frame| *frame != model.frame);
        let (frame_b, factor) = match next_frame {
            Some(frame) => (frame, blend.factor as f32),
            None => (model.frame, 0.0),
        };

        let offsets = model
            .frame
            .and_then(|a| mesh.frame_offset(a))
            .zip(frame_b.and_then(|b| mesh.frame_offset(b)));
        let Some((frame_a, frame_b)) = offsets else {
            log::trace!(
                "Skipping slot {slot} of '{}': frame {:?} -> {:?} not in mesh",
                mesh.file_name(),
                model.frame,
                frame_b
            );
            continue;
        };

        sink.draw(&ModelDraw {
            slot,
            mesh: id,
            geometry,
            frame_a,
            frame_b,
            vertex_count: mesh.vertices_per_frame(),
            factor,
            skin: model.skin.clone().or_else(|| mesh.default_skin().cloned()),
            translation,
        });
        draws += 1;
    }
    draws
}
