//! Direct manipulation of the envelope and cutoff handles.
//!
//! Handle positions are derived from the parameters every frame. Pointer-down
//! picks at most one handle (cutoff bar first), pointer-move maps the pointer
//! back onto the parameter that handle controls, pointer-up drops it.

use macroquad::prelude::*;

use crate::envelope::{CutoffRange, EnvelopeParams, MAX_ATTACK_SEC, MAX_DECAY_SEC, MAX_RELEASE_SEC};
use crate::layout::PanelLayout;
use crate::mapping::{hz_to_norm, norm_to_hz};

pub const HANDLE_RADIUS: f32 = 10.0;
const HIT_SLOP: f32 = 4.0;
const CUTOFF_HIT_BAND: f32 = 18.0;
/// Width of the drawn sustain segment, in seconds. Layout only.
pub const PREVIEW_SUSTAIN_SEC: f64 = 0.8;
const MIN_VISIBLE_SEC: f64 = 0.2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragTarget {
    #[default]
    None,
    Attack,
    Sustain,
    Release,
    CutoffMin,
    CutoffMax,
}

impl DragTarget {
    pub fn is_cutoff(self) -> bool {
        matches!(self, DragTarget::CutoffMin | DragTarget::CutoffMax)
    }

    pub fn is_envelope(self) -> bool {
        matches!(
            self,
            DragTarget::Attack | DragTarget::Sustain | DragTarget::Release
        )
    }
}

/// Pixels per second on the envelope panel.
pub fn time_scale(panel_width: f32, params: &EnvelopeParams) -> f64 {
    let total = (params.attack + params.decay + params.release + PREVIEW_SUSTAIN_SEC)
        .max(MIN_VISIBLE_SEC);
    panel_width as f64 / total
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandleGeometry {
    pub attack: Vec2,
    pub sustain: Vec2,
    pub release: Vec2,
    pub cutoff_min: Vec2,
    pub cutoff_max: Vec2,
}

impl HandleGeometry {
    pub fn compute(layout: &PanelLayout, params: &EnvelopeParams, range: &CutoffRange) -> Self {
        let env = layout.envelope;
        let scale = time_scale(env.w, params);
        let x_at = |seconds: f64| env.x + (seconds * scale) as f32;
        let sustain_y = env.y + env.h - env.h * params.sustain as f32;

        let bar = layout.cutoff_bar;
        let bar_x = |hz: f64| bar.x + hz_to_norm(hz) as f32 * bar.w;

        Self {
            attack: vec2(x_at(params.attack), env.y),
            sustain: vec2(x_at(params.attack + params.decay), sustain_y),
            release: vec2(
                x_at(params.attack + params.decay + PREVIEW_SUSTAIN_SEC + params.release),
                env.y + env.h,
            ),
            cutoff_min: vec2(bar_x(range.min_hz()), bar.y),
            cutoff_max: vec2(bar_x(range.max_hz()), bar.y),
        }
    }

    pub fn position(&self, target: DragTarget) -> Option<Vec2> {
        match target {
            DragTarget::None => None,
            DragTarget::Attack => Some(self.attack),
            DragTarget::Sustain => Some(self.sustain),
            DragTarget::Release => Some(self.release),
            DragTarget::CutoffMin => Some(self.cutoff_min),
            DragTarget::CutoffMax => Some(self.cutoff_max),
        }
    }
}

fn contains_inclusive(rect: Rect, point: Vec2) -> bool {
    point.x >= rect.x
        && point.x <= rect.x + rect.w
        && point.y >= rect.y
        && point.y <= rect.y + rect.h
}

fn nearest(point: Vec2, candidates: &[(DragTarget, Vec2)]) -> DragTarget {
    let reach = (HANDLE_RADIUS + HIT_SLOP) * (HANDLE_RADIUS + HIT_SLOP);
    let mut best = DragTarget::None;
    let mut best_distance = f32::INFINITY;
    for (target, handle) in candidates {
        let distance = point.distance_squared(*handle);
        if distance <= reach && distance < best_distance {
            best = *target;
            best_distance = distance;
        }
    }
    best
}

pub fn pick_envelope_handle(layout: &PanelLayout, geometry: &HandleGeometry, point: Vec2) -> DragTarget {
    if !contains_inclusive(layout.envelope, point) {
        return DragTarget::None;
    }
    nearest(
        point,
        &[
            (DragTarget::Attack, geometry.attack),
            (DragTarget::Sustain, geometry.sustain),
            (DragTarget::Release, geometry.release),
        ],
    )
}

pub fn pick_cutoff_handle(layout: &PanelLayout, geometry: &HandleGeometry, point: Vec2) -> DragTarget {
    let bar = layout.cutoff_bar;
    let band = Rect::new(
        bar.x,
        bar.y - CUTOFF_HIT_BAND,
        bar.w,
        CUTOFF_HIT_BAND * 2.0,
    );
    if !contains_inclusive(band, point) {
        return DragTarget::None;
    }
    nearest(
        point,
        &[
            (DragTarget::CutoffMin, geometry.cutoff_min),
            (DragTarget::CutoffMax, geometry.cutoff_max),
        ],
    )
}

/// Cutoff handles are tested first so the bar wins where regions overlap.
pub fn pick_handle(layout: &PanelLayout, geometry: &HandleGeometry, point: Vec2) -> DragTarget {
    match pick_cutoff_handle(layout, geometry, point) {
        DragTarget::None => pick_envelope_handle(layout, geometry, point),
        hit => hit,
    }
}

pub fn drag_envelope(target: DragTarget, panel: Rect, point: Vec2, params: &mut EnvelopeParams) {
    let scale = time_scale(panel.w, params);
    let seconds = (point.x - panel.x) as f64 / scale;
    match target {
        DragTarget::Attack => {
            params.attack = seconds.clamp(0.0, MAX_ATTACK_SEC);
        }
        DragTarget::Sustain => {
            let t = seconds.clamp(params.attack, params.attack + MAX_DECAY_SEC);
            params.decay = (t - params.attack).clamp(0.0, MAX_DECAY_SEC);
            let level = 1.0 - (point.y - panel.y) as f64 / panel.h.max(1.0) as f64;
            params.sustain = level.clamp(0.0, 1.0);
        }
        DragTarget::Release => {
            let sustain_end = params.attack + params.decay + PREVIEW_SUSTAIN_SEC;
            params.release = (seconds - sustain_end).clamp(0.0, MAX_RELEASE_SEC);
        }
        _ => {}
    }
}

pub fn drag_cutoff(target: DragTarget, bar: Rect, point: Vec2, range: &mut CutoffRange) {
    let n = ((point.x - bar.x) / bar.w.max(1.0)).clamp(0.0, 1.0) as f64;
    let hz = norm_to_hz(n);
    match target {
        DragTarget::CutoffMin => range.set_min_hz(hz),
        DragTarget::CutoffMax => range.set_max_hz(hz),
        _ => {}
    }
}

/// Which handle, if any, follows the pointer.
#[derive(Default)]
pub struct DragState {
    current: DragTarget,
}

impl DragState {
    pub fn current(&self) -> DragTarget {
        self.current
    }

    pub fn is_active(&self) -> bool {
        self.current != DragTarget::None
    }

    pub fn begin(&mut self, layout: &PanelLayout, geometry: &HandleGeometry, point: Vec2) -> bool {
        self.current = pick_handle(layout, geometry, point);
        self.is_active()
    }

    /// Applies a pointer move to the parameters. Returns the handle that moved.
    pub fn update(
        &self,
        layout: &PanelLayout,
        point: Vec2,
        params: &mut EnvelopeParams,
        range: &mut CutoffRange,
    ) -> DragTarget {
        if self.current.is_cutoff() {
            drag_cutoff(self.current, layout.cutoff_bar, point, range);
        } else if self.current.is_envelope() {
            drag_envelope(self.current, layout.envelope, point, params);
        }
        self.current
    }

    pub fn end(&mut self) -> bool {
        std::mem::take(&mut self.current) != DragTarget::None
    }
}
