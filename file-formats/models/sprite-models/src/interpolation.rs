//! Blend factor between the current model frame and the next one
//!
//! The simulation advances in whole tics. To animate models smoothly at any
//! display rate, the position inside the current animation state is turned
//! into a factor in `[0, 1)` and the association of the successor state
//! supplies the frame to blend towards.

use crate::config::RenderSettings;
use crate::frame::{ClassId, ModelFlags, SpriteId, SpriteModelFrame};
use crate::index::AssociationIndex;

/// Simulation tics per second
pub const TICRATE: u32 = 35;

/// Largest factor handed out; the successor frame is never reached exactly
const MAX_FACTOR: f64 = 1.0 - f64::EPSILON;

/// Index of an animation state in its state table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

/// One discrete animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub sprite: SpriteId,
    pub frame: u8,
    /// Nominal duration in tics
    pub tics: i32,
    pub next: Option<StateId>,
}

impl AnimationState {
    pub fn new(sprite: SpriteId, frame: u8, tics: i32, next: Option<StateId>) -> Self {
        Self {
            sprite,
            frame,
            tics,
            next,
        }
    }

    /// Same sprite and frame, i.e. the same picture
    fn same_picture(&self, other: &Self) -> bool {
        self.sprite == other.sprite && self.frame == other.frame
    }
}

/// Access to the state machine an actor is animated by
pub trait AnimationStates {
    fn state(&self, id: StateId) -> Option<&AnimationState>;

    /// State declared directly before `id`
    fn previous_state(&self, id: StateId) -> Option<StateId>;

    fn next_state(&self, id: StateId) -> Option<StateId> {
        self.state(id).and_then(|state| state.next)
    }
}

/// States in declaration order; the previous state is the one stored before
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateList {
    states: Vec<AnimationState>,
}

impl StateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: AnimationState) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    /// Append a state that continues into the state pushed after it
    pub fn push_chained(&mut self, sprite: SpriteId, frame: u8, tics: i32) -> StateId {
        let next = StateId(self.states.len() + 1);
        self.push(AnimationState::new(sprite, frame, tics, Some(next)))
    }

    /// Point the successor of `id` somewhere else
    pub fn set_next(&mut self, id: StateId, next: Option<StateId>) {
        if let Some(state) = self.states.get_mut(id.0) {
            state.next = next;
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl AnimationStates for StateList {
    fn state(&self, id: StateId) -> Option<&AnimationState> {
        self.states.get(id.0)
    }

    fn previous_state(&self, id: StateId) -> Option<StateId> {
        id.0.checked_sub(1).map(StateId)
    }

    fn next_state(&self, id: StateId) -> Option<StateId> {
        self.state(id)?.next.filter(|next| next.0 < self.states.len())
    }
}

/// Engine time as seen by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TicClock {
    /// Milliseconds since start
    pub time_ms: u64,
    /// Set while the simulation is paused; sub-tic progress is then zero
    pub frozen: bool,
}

impl TicClock {
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms,
            frozen: false,
        }
    }

    /// Elapsed time in tics, including the fraction of the current tic
    pub fn time_tics(&self) -> f64 {
        self.time_ms as f64 * f64::from(TICRATE) / 1000.0
    }

    /// Progress through the current tic in `[0, 1)`
    pub fn tic_fraction(&self) -> f64 {
        if self.frozen {
            return 0.0;
        }
        self.time_tics().fract()
    }
}

/// Where an actor is in its animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationInput {
    pub class: ClassId,
    pub state: StateId,
    /// Tics left before the actor moves on to the next state
    pub remaining_tics: i32,
    pub tic_fraction: f64,
}

/// The record to blend towards and how far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBlend<'a> {
    pub next: Option<&'a SpriteModelFrame>,
    pub factor: f64,
}

impl FrameBlend<'_> {
    const NONE: FrameBlend<'static> = FrameBlend {
        next: None,
        factor: 0.0,
    };
}

/// Resolve the successor record and blend factor for `record`.
///
/// Nothing is blended when interpolation is off, the record opts out, the
/// state has no distinct successor or lasts no tics at all. When the record
/// asks for doubled frames to be smoothed, a state repeating the picture of
/// the previous one covers the second half of the blend, and a state repeated
/// by its successor covers the first half and blends towards the state after
/// the repeat.
pub fn resolve_interpolation<'a, S>(
    record: &SpriteModelFrame,
    input: &AnimationInput,
    states: &S,
    index: &'a AssociationIndex,
    settings: &RenderSettings,
) -> FrameBlend<'a>
where
    S: AnimationStates + ?Sized,
{
    if !settings.interpolate_model_frames || record.flags.contains(ModelFlags::NO_INTERPOLATION) {
        return FrameBlend::NONE;
    }

    let Some(current) = states.state(input.state) else {
        return FrameBlend::NONE;
    };
    let Some(mut next_id) = states.next_state(input.state).filter(|id| *id != input.state) else {
        return FrameBlend::NONE;
    };
    if current.tics <= 0 {
        return FrameBlend::NONE;
    }

    let tics = f64::from(current.tics);
    let mut factor = (tics - f64::from(input.remaining_tics) - input.tic_fraction) / tics;
    if factor <= 0.0 {
        return FrameBlend::NONE;
    }

    if record.flags.contains(ModelFlags::INTERPOLATE_DOUBLED_FRAMES) {
        let previous = states.previous_state(input.state).and_then(|id| states.state(id));
        if previous.is_some_and(|previous| current.same_picture(previous)) {
            factor = factor / 2.0 + 0.5;
        }

        let next = states.state(next_id);
        if next.is_some_and(|next| current.same_picture(next)) {
            factor /= 2.0;
            match states.next_state(next_id) {
                Some(after) => next_id = after,
                None => return FrameBlend::NONE,
            }
        }
    }

    let Some(next) = states.state(next_id) else {
        return FrameBlend::NONE;
    };
    match index.find(input.class, next.sprite, next.frame, false, settings) {
        Some(record) => FrameBlend {
            next: Some(record),
            factor: factor.min(MAX_FACTOR),
        },
        None => FrameBlend::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameKey;
    use std::collections::{HashMap, HashSet};

    const CLASS: ClassId = ClassId(0);
    const SPRITE: SpriteId = SpriteId(0);

    fn record(frame: u8, flags: ModelFlags) -> SpriteModelFrame {
        SpriteModelFrame {
            key: Some(FrameKey::new(CLASS, SPRITE, frame)),
            flags,
            ..SpriteModelFrame::default()
        }
    }

    fn index(frames: &[u8], flags: ModelFlags) -> AssociationIndex {
        let records = frames.iter().map(|f| record(*f, flags)).collect();
        let classes: HashSet<_> = [CLASS].into_iter().collect();
        AssociationIndex::build(records, classes, HashMap::new())
    }

    /// A looping walk cycle of four tic-long states: A, B, C, D
    fn walk_cycle(frames: &[u8], tics: i32) -> StateList {
        let mut states = StateList::new();
        for frame in frames {
            states.push_chained(SPRITE, *frame, tics);
        }
        states.set_next(StateId(frames.len() - 1), Some(StateId(0)));
        states
    }

    fn input(state: usize, remaining_tics: i32, tic_fraction: f64) -> AnimationInput {
        AnimationInput {
            class: CLASS,
            state: StateId(state),
            remaining_tics,
            tic_fraction,
        }
    }

    #[test]
    fn test_factor_from_position_in_state() {
        let index = index(&[0, 1], ModelFlags::empty());
        let states = walk_cycle(&[0, 1], 4);
        let settings = RenderSettings::default();
        let current = index.get(crate::index::RecordId(0)).unwrap();

        let blend = resolve_interpolation(current, &input(0, 2, 0.5), &states, &index, &settings);
        assert!((blend.factor - 0.375).abs() < 1e-9);
        assert_eq!(blend.next.unwrap().key.unwrap().frame, 1);
    }

    #[test]
    fn test_no_interpolation_flag_and_toggle() {
        let index = index(&[0, 1], ModelFlags::NO_INTERPOLATION);
        let states = walk_cycle(&[0, 1], 4);
        let current = index.get(crate::index::RecordId(0)).unwrap();

        let blend = resolve_interpolation(
            current,
            &input(0, 1, 0.0),
            &states,
            &index,
            &RenderSettings::default(),
        );
        assert_eq!(blend.factor, 0.0);
        assert!(blend.next.is_none());

        let plain = self::index(&[0, 1], ModelFlags::empty());
        let off = RenderSettings {
            interpolate_model_frames: false,
            ..RenderSettings::default()
        };
        let current = plain.get(crate::index::RecordId(0)).unwrap();
        let blend = resolve_interpolation(current, &input(0, 1, 0.0), &states, &plain, &off);
        assert_eq!(blend.factor, 0.0);
    }

    #[test]
    fn test_overlong_countdown_clamps_to_zero() {
        let index = index(&[0, 1], ModelFlags::empty());
        let states = walk_cycle(&[0, 1], 4);
        let current = index.get(crate::index::RecordId(0)).unwrap();

        let blend = resolve_interpolation(
            current,
            &input(0, 9, 0.3),
            &states,
            &index,
            &RenderSettings::default(),
        );
        assert_eq!(blend.factor, 0.0);
    }

    #[test]
    fn test_self_loop_and_terminal_states_do_not_blend() {
        let index = index(&[0], ModelFlags::empty());
        let current = index.get(crate::index::RecordId(0)).unwrap();
        let mut states = StateList::new();
        let id = states.push(AnimationState::new(SPRITE, 0, 4, None));

        let blend = resolve_interpolation(current, &input(0, 1, 0.0), &states, &index, &RenderSettings::default());
        assert_eq!(blend.factor, 0.0);

        states.set_next(id, Some(id));
        let blend = resolve_interpolation(current, &input(0, 1, 0.0), &states, &index, &RenderSettings::default());
        assert_eq!(blend.factor, 0.0);
    }

    #[test]
    fn test_missing_successor_association_degrades() {
        let index = index(&[0], ModelFlags::empty());
        let states = walk_cycle(&[0, 5], 4);
        let current = index.get(crate::index::RecordId(0)).unwrap();

        let blend = resolve_interpolation(current, &input(0, 1, 0.0), &states, &index, &RenderSettings::default());
        assert_eq!(blend.factor, 0.0);
        assert!(blend.next.is_none());
    }

    #[test]
    fn test_doubled_frames_split_the_blend() {
        // A A B B, as in most monster walk states
        let flags = ModelFlags::INTERPOLATE_DOUBLED_FRAMES;
        let index = index(&[0, 1], flags);
        let states = walk_cycle(&[0, 0, 1, 1], 4);
        let current = index.get(crate::index::RecordId(0)).unwrap();
        let settings = RenderSettings::default();

        // First of the pair: halved, blending past the repeat towards B
        let first = resolve_interpolation(current, &input(0, 2, 0.0), &states, &index, &settings);
        assert!((first.factor - 0.25).abs() < 1e-9);
        assert_eq!(first.next.unwrap().key.unwrap().frame, 1);

        // Second of the pair: upper half of the same blend
        let second = resolve_interpolation(current, &input(1, 2, 0.0), &states, &index, &settings);
        assert!((second.factor - 0.75).abs() < 1e-9);
        assert_eq!(second.next.unwrap().key.unwrap().frame, 1);
    }

    #[test]
    fn test_tic_clock() {
        let clock = TicClock::new(1000);
        assert!((clock.time_tics() - 35.0).abs() < 1e-9);
        assert!(clock.tic_fraction().abs() < 1e-9);

        let clock = TicClock::new(1010);
        assert!((clock.tic_fraction() - 0.35).abs() < 1e-9);

        let frozen = TicClock {
            frozen: true,
            ..clock
        };
        assert_eq!(frozen.tic_fraction(), 0.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn factor_stays_in_unit_range(
                tics in -2i32..40,
                remaining in -50i32..50,
                fraction in 0.0f64..1.0,
                doubled in any::<bool>(),
                state in 0usize..4,
            ) {
                let flags = if doubled {
                    ModelFlags::INTERPOLATE_DOUBLED_FRAMES
                } else {
                    ModelFlags::empty()
                };
                let index = index(&[0, 1], flags);
                let states = walk_cycle(&[0, 0, 1, 1], tics);
                let current = index.get(crate::index::RecordId(0)).unwrap();

                let blend = resolve_interpolation(
                    current,
                    &input(state, remaining, fraction),
                    &states,
                    &index,
                    &RenderSettings::default(),
                );
                prop_assert!(blend.factor >= 0.0);
                prop_assert!(blend.factor < 1.0);
            }

            #[test]
            fn no_interpolation_is_always_zero(
                remaining in -50i32..50,
                fraction in 0.0f64..1.0,
            ) {
                let index = index(&[0, 1], ModelFlags::NO_INTERPOLATION);
                let states = walk_cycle(&[0, 1], 6);
                let current = index.get(crate::index::RecordId(0)).unwrap();

                let blend = resolve_interpolation(
                    current,
                    &input(0, remaining, fraction),
                    &states,
                    &index,
                    &RenderSettings::default(),
                );
                prop_assert_eq!(blend.factor, 0.0);
            }
        }
    }
}
