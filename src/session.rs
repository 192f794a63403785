use macroquad::prelude::Vec2;

use crate::controls::{SliderBank, SliderId};
use crate::envelope::{CutoffRange, EnvelopeParams};
use crate::gate::{GateController, GateEvent, GateSource, GateState};
use crate::input::{PointerEvent, PointerPhase};
use crate::interaction::{DragState, DragTarget, HandleGeometry, pick_handle};
use crate::layout::PanelLayout;
use crate::mapping::norm_to_hz;
use crate::tone::ToneEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RangeEdge {
    Min,
    Max,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameSnapshot {
    pub params: EnvelopeParams,
    pub range: CutoffRange,
    pub level: f64,
    pub cutoff_hz: f64,
    pub geometry: HandleGeometry,
    pub hovered: DragTarget,
    pub dragging: DragTarget,
    pub gate: GateState,
}

/// What a pointer-down landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PointerGrab {
    Handle,
    Slider(SliderId),
    GateButton,
}

/// Session-scoped state: parameters, gate, drag, sliders and the tone engine.
/// Input handlers and the frame tick are the only mutators.
pub struct Session<E: ToneEngine> {
    params: EnvelopeParams,
    range: CutoffRange,
    gate: GateController,
    drag: DragState,
    sliders: SliderBank,
    layout: PanelLayout,
    geometry: HandleGeometry,
    hovered: DragTarget,
    grab: Option<PointerGrab>,
    last_range_edge: RangeEdge,
    engine: E,
}

impl<E: ToneEngine> Session<E> {
    pub fn new(engine: E, layout: PanelLayout) -> Self {
        let params = EnvelopeParams::default();
        let range = CutoffRange::default();
        let sliders = SliderBank::new(&params, &range);
        let mut session = Self {
            params,
            range,
            gate: GateController::default(),
            drag: DragState::default(),
            sliders,
            layout,
            geometry: HandleGeometry::default(),
            hovered: DragTarget::None,
            grab: None,
            last_range_edge: RangeEdge::Max,
            engine,
        };
        session.pull_from_sliders();
        session.refresh_geometry();
        session
    }

    pub fn sliders(&self) -> &SliderBank {
        &self.sliders
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: PanelLayout) {
        if layout != self.layout {
            self.layout = layout;
            self.refresh_geometry();
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, now: f64) {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event.position, now),
            PointerPhase::Move => self.pointer_move(event.position),
            PointerPhase::Up => self.pointer_up(event.position, now),
        }
    }

    pub fn handle_gate(&mut self, event: GateEvent, now: f64) {
        self.apply_slider_changes();
        if self.gate.handle(event, now, &self.params, &mut self.engine) {
            log::info!(
                "gate {}",
                if self.gate.is_open() { "on" } else { "off" }
            );
        }
    }

    fn pointer_down(&mut self, position: Vec2, now: f64) {
        if self.grab.is_some() {
            return;
        }
        if self.drag.begin(&self.layout, &self.geometry, position) {
            log::debug!("drag start {:?}", self.drag.current());
            self.grab = Some(PointerGrab::Handle);
        } else if let Some(id) = self.layout.slider_at(position) {
            self.grab = Some(PointerGrab::Slider(id));
            self.sliders
                .set_from_pointer(id, position, self.layout.slider_track(id));
            self.apply_slider_changes();
        } else if self.layout.gate_button_contains(position) {
            self.grab = Some(PointerGrab::GateButton);
            self.handle_gate(GateEvent::press(GateSource::Button), now);
        }
        if self.grab.is_some() {
            self.hovered = DragTarget::None;
        }
    }

    fn pointer_move(&mut self, position: Vec2) {
        match self.grab {
            Some(PointerGrab::Handle) => {
                let moved = self
                    .drag
                    .update(&self.layout, position, &mut self.params, &mut self.range);
                self.push_drag_to_sliders(moved);
                self.refresh_geometry();
            }
            Some(PointerGrab::Slider(id)) => {
                self.sliders
                    .set_from_pointer(id, position, self.layout.slider_track(id));
                self.apply_slider_changes();
            }
            Some(PointerGrab::GateButton) => {}
            None => {
                self.hovered = pick_handle(&self.layout, &self.geometry, position);
            }
        }
    }

    fn pointer_up(&mut self, position: Vec2, now: f64) {
        match self.grab.take() {
            Some(PointerGrab::Handle) => {
                self.drag.end();
            }
            Some(PointerGrab::GateButton) => {
                self.handle_gate(GateEvent::release(GateSource::Button), now);
            }
            Some(PointerGrab::Slider(_)) | None => {}
        }
        self.refresh_geometry();
        self.hovered = pick_handle(&self.layout, &self.geometry, position);
    }

    /// Writes drag results into the sliders. The resulting change-log entries
    /// are consumed here so they are not replayed as manual edits.
    fn push_drag_to_sliders(&mut self, moved: DragTarget) {
        match moved {
            DragTarget::Attack | DragTarget::Sustain | DragTarget::Release => {
                self.sliders.push_envelope(&self.params);
            }
            DragTarget::CutoffMin => {
                self.last_range_edge = RangeEdge::Min;
                self.sliders.push_cutoff(&self.range);
            }
            DragTarget::CutoffMax => {
                self.last_range_edge = RangeEdge::Max;
                self.sliders.push_cutoff(&self.range);
            }
            DragTarget::None => return,
        }
        self.sliders.take_changes();
    }

    /// On-change path: applies whatever the sliders reported since the last call.
    fn apply_slider_changes(&mut self) {
        let changes = self.sliders.take_changes();
        if changes.is_empty() {
            return;
        }
        if changes.contains(&SliderId::CutoffMin) {
            self.last_range_edge = RangeEdge::Min;
        } else if changes.contains(&SliderId::CutoffMax) {
            self.last_range_edge = RangeEdge::Max;
        }
        self.pull_from_sliders();
    }

    /// Per-frame pull. Sliders are the source of truth between drags.
    fn pull_from_sliders(&mut self) {
        self.params = self.sliders.envelope_params().clamped();

        let (min_n, max_n) = self.sliders.cutoff_norms();
        if min_n > max_n {
            match self.last_range_edge {
                RangeEdge::Min => self
                    .sliders
                    .set_value(SliderId::CutoffMin, max_n * 1_000.0),
                RangeEdge::Max => self
                    .sliders
                    .set_value(SliderId::CutoffMax, min_n * 1_000.0),
            }
            self.sliders.take_changes();
        }
        let (min_n, max_n) = self.sliders.cutoff_norms();
        let mut range = self.range;
        range.set_span(norm_to_hz(min_n), norm_to_hz(max_n));
        range.set_resonance_q(self.sliders.resonance_q());
        self.range = range;
    }

    fn refresh_geometry(&mut self) {
        self.geometry = HandleGeometry::compute(&self.layout, &self.params, &self.range);
    }

    /// Once per frame: pull sliders, evaluate the level, drive the filter.
    pub fn tick(&mut self, now: f64) -> FrameSnapshot {
        self.apply_slider_changes();
        self.pull_from_sliders();

        let level = self.gate.state().level(now, &self.params);
        let cutoff_hz = self.range.cutoff_for_level(level);
        if self.engine.is_ready() {
            self.engine.set_filter_cutoff(cutoff_hz);
            self.engine.set_filter_resonance(self.range.resonance_q());
        }

        self.refresh_geometry();
        FrameSnapshot {
            params: self.params,
            range: self.range,
            level,
            cutoff_hz,
            geometry: self.geometry,
            hovered: self.hovered,
            dragging: self.drag.current(),
            gate: *self.gate.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputState, PointerTracker};
    use crate::mapping::hz_to_norm;
    use crate::tone::testing::{RecordingEngine, ToneCall};
    use approx::assert_abs_diff_eq;
    use macroquad::prelude::vec2;

    impl<E: ToneEngine> Session<E> {
        fn params(&self) -> &EnvelopeParams {
            &self.params
        }

        fn range(&self) -> &CutoffRange {
            &self.range
        }

        fn gate(&self) -> &GateState {
            self.gate.state()
        }

        fn dragging(&self) -> DragTarget {
            self.drag.current()
        }

        fn engine(&self) -> &E {
            &self.engine
        }
    }

    fn session() -> Session<RecordingEngine> {
        Session::new(RecordingEngine::default(), PanelLayout::default())
    }

    fn down(position: Vec2) -> PointerEvent {
        PointerEvent {
            position,
            phase: PointerPhase::Down,
        }
    }

    fn moved(position: Vec2) -> PointerEvent {
        PointerEvent {
            position,
            phase: PointerPhase::Move,
        }
    }

    fn up(position: Vec2) -> PointerEvent {
        PointerEvent {
            position,
            phase: PointerPhase::Up,
        }
    }

    fn cutoff_x(session: &Session<RecordingEngine>, hz: f64) -> f32 {
        let bar = session.layout().cutoff_bar;
        bar.x + hz_to_norm(hz) as f32 * bar.w
    }

    #[test]
    fn starts_from_slider_defaults() {
        let session = session();
        assert_eq!(*session.params(), EnvelopeParams::default());
        assert_abs_diff_eq!(session.range().min_hz(), 200.0, epsilon = 1.0);
        assert_abs_diff_eq!(session.range().max_hz(), 4_000.0, epsilon = 10.0);
        assert_eq!(session.range().resonance_q(), 6.0);
        assert!(!session.engine().ready);
    }

    #[test]
    fn idle_tick_does_not_touch_engine() {
        let mut session = session();
        let frame = session.tick(1.0);
        assert_eq!(frame.level, 0.0);
        assert_eq!(frame.cutoff_hz, session.range().min_hz());
        assert!(session.engine().calls.is_empty());
    }

    #[test]
    fn press_release_scenario_drives_cutoff() {
        let mut session = session();
        session.handle_gate(GateEvent::press(GateSource::Space), 0.0);
        let min = session.range().min_hz();
        let max = session.range().max_hz();

        let peak = session.tick(0.05);
        assert_abs_diff_eq!(peak.level, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(peak.cutoff_hz, max, epsilon = 1e-6);
        assert_eq!(session.engine().last_cutoff(), Some(peak.cutoff_hz));

        let settled = session.tick(0.2);
        assert_abs_diff_eq!(settled.level, 0.6, epsilon = 1e-9);
        session.handle_gate(GateEvent::release(GateSource::Space), 0.2);
        assert_abs_diff_eq!(session.gate().level_at_release, 0.6, epsilon = 1e-9);

        let falling = session.tick(0.35);
        assert_abs_diff_eq!(falling.level, 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(falling.cutoff_hz, min + (max - min) * 0.3, epsilon = 1e-6);

        let done = session.tick(0.5);
        assert_abs_diff_eq!(done.level, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(done.cutoff_hz, min, epsilon = 1e-6);
        assert!(session
            .engine()
            .calls
            .iter()
            .any(|call| *call == ToneCall::Resonance(6.0)));
    }

    #[test]
    fn drag_updates_sliders_and_survives_ticks() {
        let mut session = session();
        let env = session.layout().envelope;
        let attack = session.tick(0.0).geometry.attack;
        session.handle_pointer(down(attack + vec2(0.0, 3.0)), 0.0);
        assert_eq!(session.dragging(), DragTarget::Attack);
        session.handle_pointer(moved(vec2(env.x + 200.0, env.y)), 0.0);
        let dragged = *session.params();
        assert!(dragged.attack > 0.05);
        assert_eq!(
            session.sliders().value(SliderId::Attack),
            (dragged.attack * 1_000.0).round() as i32
        );

        let first = session.tick(0.1);
        let second = session.tick(0.2);
        let third = session.tick(0.3);
        assert_eq!(first.params, second.params);
        assert_eq!(second.params, third.params);
        assert_abs_diff_eq!(first.params.attack, dragged.attack, epsilon = 5e-4);
        assert_eq!(
            session.sliders().value(SliderId::Attack),
            (first.params.attack * 1_000.0).round() as i32
        );

        session.handle_pointer(up(vec2(0.0, 0.0)), 0.3);
        assert_eq!(session.dragging(), DragTarget::None);
    }

    #[test]
    fn manual_slider_edit_applies_without_drag() {
        let mut session = session();
        let track = session.layout().slider_track(SliderId::Release);
        session.handle_pointer(down(vec2(track.x + track.w * 0.5, track.y)), 0.0);
        assert_abs_diff_eq!(session.params().release, 2.0, epsilon = 1e-3);
        session.handle_pointer(moved(vec2(track.x, track.y)), 0.0);
        assert_eq!(session.params().release, 0.0);
        session.handle_pointer(up(vec2(track.x, track.y)), 0.0);
        let frame = session.tick(0.1);
        assert_eq!(frame.params.release, 0.0);
    }

    #[test]
    fn min_drag_past_max_is_pinned() {
        let mut session = session();
        let frame = session.tick(0.0);
        let max_before = session.range().max_hz();
        let handle = frame.geometry.cutoff_min;
        session.handle_pointer(down(handle), 0.0);
        assert_eq!(session.dragging(), DragTarget::CutoffMin);
        let target = vec2(cutoff_x(&session, 5_000.0), handle.y);
        session.handle_pointer(moved(target), 0.0);
        assert_eq!(session.range().min_hz(), max_before);
        assert_eq!(
            session.sliders().value(SliderId::CutoffMin),
            session.sliders().value(SliderId::CutoffMax)
        );
        let after = session.tick(0.1);
        assert!(after.range.min_hz() <= after.range.max_hz());
        assert_abs_diff_eq!(after.range.min_hz(), after.range.max_hz(), epsilon = 1e-9);
    }

    #[test]
    fn adversarial_handle_drags_keep_order() {
        let mut session = session();
        let bar = session.layout().cutoff_bar;
        let sweeps = [0.9, 0.05, 1.2, -0.3, 0.5, 0.51, 0.49];
        for (step, t) in sweeps.iter().enumerate() {
            let frame = session.tick(step as f64 * 0.01);
            let handle = if step % 2 == 0 {
                frame.geometry.cutoff_min
            } else {
                frame.geometry.cutoff_max
            };
            session.handle_pointer(down(handle), 0.0);
            session.handle_pointer(moved(vec2(bar.x + *t as f32 * bar.w, bar.y)), 0.0);
            assert!(session.range().min_hz() <= session.range().max_hz());
            session.handle_pointer(up(handle), 0.0);
            let after = session.tick(step as f64 * 0.01 + 0.005);
            assert!(after.range.min_hz() <= after.range.max_hz());
        }
    }

    #[test]
    fn manual_min_slider_past_max_is_clamped() {
        let mut session = session();
        let track = session.layout().slider_track(SliderId::CutoffMin);
        session.handle_pointer(down(vec2(track.x + track.w, track.y)), 0.0);
        session.handle_pointer(up(vec2(track.x + track.w, track.y)), 0.0);
        let frame = session.tick(0.0);
        assert_eq!(
            session.sliders().value(SliderId::CutoffMin),
            session.sliders().value(SliderId::CutoffMax)
        );
        assert_abs_diff_eq!(frame.range.max_hz(), 4_000.0, epsilon = 10.0);
        assert!(frame.range.min_hz() <= frame.range.max_hz());
    }

    #[test]
    fn manual_max_slider_below_min_is_clamped() {
        let mut session = session();
        let track = session.layout().slider_track(SliderId::CutoffMax);
        session.handle_pointer(down(vec2(track.x, track.y)), 0.0);
        session.handle_pointer(up(vec2(track.x, track.y)), 0.0);
        let frame = session.tick(0.0);
        assert_eq!(
            session.sliders().value(SliderId::CutoffMax),
            session.sliders().value(SliderId::CutoffMin)
        );
        assert_abs_diff_eq!(frame.range.min_hz(), 200.0, epsilon = 1.0);
    }

    #[test]
    fn pointer_outside_panel_starts_no_drag() {
        let mut session = session();
        let track = session.layout().slider_track(SliderId::Sustain);
        session.handle_pointer(down(vec2(track.x + track.w, track.y)), 0.0);
        session.handle_pointer(up(vec2(0.0, 0.0)), 0.0);
        let frame = session.tick(0.0);
        assert_eq!(frame.params.sustain, 1.0);

        let env = session.layout().envelope;
        let probe = vec2(frame.geometry.sustain.x, env.y - 5.0);
        assert!(probe.distance(frame.geometry.sustain) < 14.0);
        session.handle_pointer(down(probe), 0.0);
        assert_eq!(session.dragging(), DragTarget::None);
        session.handle_pointer(moved(probe + vec2(40.0, 40.0)), 0.0);
        assert_eq!(*session.params(), frame.params);
    }

    #[test]
    fn gate_button_is_momentary() {
        let mut session = session();
        let button = session.layout().gate_button;
        let center = vec2(button.x + button.w * 0.5, button.y + button.h * 0.5);
        session.handle_pointer(down(center), 1.0);
        assert!(session.gate().is_open);
        session.handle_pointer(moved(vec2(0.0, 0.0)), 1.1);
        assert!(session.gate().is_open);
        session.handle_pointer(up(vec2(0.0, 0.0)), 1.2);
        assert!(!session.gate().is_open);
        assert_eq!(session.engine().triggers(), vec![ToneCall::On, ToneCall::Off]);
    }

    #[test]
    fn press_release_press_within_one_frame() {
        let mut session = session();
        session.handle_gate(GateEvent::press(GateSource::Space), 0.0);
        session.tick(0.016);
        session.handle_gate(GateEvent::release(GateSource::Space), 0.04);
        session.handle_gate(GateEvent::press(GateSource::Space), 0.04);
        let frame = session.tick(0.042);
        assert!(frame.gate.is_open);
        assert_abs_diff_eq!(frame.gate.level_at_release, 0.8, epsilon = 1e-9);
        assert_eq!(frame.gate.released_at, 0.04);
        assert_eq!(frame.gate.opened_at, 0.04);
        assert_eq!(session.engine().inits, 1);
    }

    #[test]
    fn tap_and_hold_within_one_frame_records_the_release() {
        let mut session = session();
        let mut input = InputState::default();
        for event in input.key(GateSource::Space, true, false, true) {
            session.handle_gate(event, 0.0);
        }
        for event in input.key(GateSource::Space, false, true, false) {
            session.handle_gate(event, 1.0);
        }
        assert_abs_diff_eq!(session.gate().level_at_release, 0.6, epsilon = 1e-9);

        for event in input.key(GateSource::Space, true, true, true) {
            session.handle_gate(event, 2.0);
        }
        let frame = session.tick(2.0);
        assert!(frame.gate.is_open);
        assert_eq!(frame.gate.opened_at, 2.0);
        assert_eq!(frame.gate.released_at, 2.0);
        assert_eq!(frame.gate.level_at_release, 0.0);
    }

    #[test]
    fn reclicking_the_held_button_keeps_the_gate_open() {
        let mut session = session();
        let mut tracker = PointerTracker::default();
        let button = session.layout().gate_button;
        let center = vec2(button.x + button.w * 0.5, button.y + button.h * 0.5);
        let mut events = Vec::new();

        tracker.mouse(center, true, false, true, &mut events);
        for event in events.drain(..) {
            session.handle_pointer(event, 0.0);
        }
        assert!(session.gate().is_open);

        tracker.mouse(center, true, true, true, &mut events);
        for event in events.drain(..) {
            session.handle_pointer(event, 0.5);
        }
        assert!(session.gate().is_open);
        assert_eq!(session.gate().released_at, 0.5);
        assert_eq!(session.gate().opened_at, 0.5);

        tracker.mouse(center, false, true, false, &mut events);
        for event in events.drain(..) {
            session.handle_pointer(event, 1.0);
        }
        assert!(!session.gate().is_open);
    }

    #[test]
    fn hover_is_refreshed_when_a_grab_ends() {
        let mut session = session();
        let release = session.tick(0.0).geometry.release;
        let probe = release - vec2(2.0, 2.0);
        session.handle_pointer(moved(probe), 0.0);
        assert_eq!(session.tick(0.0).hovered, DragTarget::Release);

        session.handle_pointer(down(probe), 0.0);
        assert_eq!(session.dragging(), DragTarget::Release);
        assert_eq!(session.tick(0.0).hovered, DragTarget::None);
        session.handle_pointer(up(vec2(0.0, 0.0)), 0.0);
        assert_eq!(session.tick(0.0).hovered, DragTarget::None);

        session.handle_pointer(down(probe), 0.0);
        session.handle_pointer(up(probe), 0.0);
        assert_eq!(session.tick(0.0).hovered, DragTarget::Release);
    }

    #[test]
    fn gate_press_uses_latest_slider_values() {
        let mut session = session();
        let track = session.layout().slider_track(SliderId::Attack);
        session.handle_pointer(down(vec2(track.x + track.w, track.y)), 0.0);
        session.handle_pointer(up(vec2(track.x + track.w, track.y)), 0.0);
        session.handle_gate(GateEvent::press(GateSource::KeyZ), 0.0);
        let configured = session.engine().calls.iter().find_map(|call| match call {
            ToneCall::Configure(params) => Some(*params),
            _ => None,
        });
        assert_eq!(configured.map(|p| p.attack), Some(2.0));
    }

    #[test]
    fn hover_reports_handle_under_pointer() {
        let mut session = session();
        let frame = session.tick(0.0);
        session.handle_pointer(moved(frame.geometry.release - vec2(2.0, 2.0)), 0.0);
        assert_eq!(session.tick(0.0).hovered, DragTarget::Release);
        session.handle_pointer(moved(vec2(0.0, 0.0)), 0.0);
        assert_eq!(session.tick(0.0).hovered, DragTarget::None);
    }
}
