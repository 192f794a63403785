//! Turns macroquad's per-frame mouse, touch and keyboard state into the
//! abstract events the session consumes.

use macroquad::prelude::*;

use crate::gate::{GateEdge, GateEvent, GateSource};

const GATE_KEYS: [(KeyCode, GateSource); 2] =
    [(KeyCode::Space, GateSource::Space), (KeyCode::Z, GateSource::KeyZ)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub position: Vec2,
    pub phase: PointerPhase,
}

impl PointerEvent {
    fn new(position: Vec2, phase: PointerPhase) -> Self {
        Self { position, phase }
    }
}

/// Follows the one pointer that drives the panel: the left mouse button, or
/// the first finger down. While a finger is tracked the mouse is ignored.
#[derive(Debug, Default)]
pub struct PointerTracker {
    touch_id: Option<u64>,
    last_position: Option<Vec2>,
    mouse_down: bool,
}

impl PointerTracker {
    /// `pressed`, `released` and `down` are the left button's state for this frame.
    pub fn mouse(
        &mut self,
        position: Vec2,
        pressed: bool,
        released: bool,
        down: bool,
        events: &mut Vec<PointerEvent>,
    ) {
        let was_down = std::mem::replace(&mut self.mouse_down, down);
        if self.touch_id.is_some() {
            return;
        }
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            events.push(PointerEvent::new(position, PointerPhase::Move));
        }
        for edge in key_edges(was_down, pressed, released, down) {
            let phase = match edge {
                GateEdge::Press => PointerPhase::Down,
                GateEdge::Release => PointerPhase::Up,
            };
            events.push(PointerEvent::new(position, phase));
        }
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2, events: &mut Vec<PointerEvent>) {
        match (self.touch_id, phase) {
            (None, TouchPhase::Started) => {
                self.touch_id = Some(id);
                self.last_position = Some(position);
                events.push(PointerEvent::new(position, PointerPhase::Down));
            }
            (Some(active), TouchPhase::Moved) if active == id => {
                self.last_position = Some(position);
                events.push(PointerEvent::new(position, PointerPhase::Move));
            }
            (Some(active), TouchPhase::Ended | TouchPhase::Cancelled) if active == id => {
                self.touch_id = None;
                events.push(PointerEvent::new(position, PointerPhase::Up));
            }
            _ => {}
        }
    }
}

/// Orders the edges of a button seen both pressed and released in one frame.
/// The state at the start of the frame decides which edge came first, and the
/// state at the end decides whether a trailing edge follows.
pub fn key_edges(was_down: bool, pressed: bool, released: bool, down: bool) -> Vec<GateEdge> {
    match (pressed, released) {
        (false, false) => Vec::new(),
        (true, false) => vec![GateEdge::Press],
        (false, true) => vec![GateEdge::Release],
        (true, true) if was_down => {
            let mut edges = vec![GateEdge::Release, GateEdge::Press];
            if !down {
                edges.push(GateEdge::Release);
            }
            edges
        }
        (true, true) => {
            let mut edges = vec![GateEdge::Press, GateEdge::Release];
            if down {
                edges.push(GateEdge::Press);
            }
            edges
        }
    }
}

#[derive(Debug, Default)]
pub struct FrameInput {
    pub pointer: Vec<PointerEvent>,
    pub gate: Vec<GateEvent>,
}

#[derive(Debug, Default)]
pub struct InputState {
    tracker: PointerTracker,
    keys_down: Vec<GateSource>,
}

impl InputState {
    pub fn poll(&mut self) -> FrameInput {
        let mut frame = FrameInput::default();

        for touch in touches() {
            self.tracker
                .touch(touch.id, touch.phase, touch.position, &mut frame.pointer);
        }
        let (x, y) = mouse_position();
        self.tracker.mouse(
            vec2(x, y),
            is_mouse_button_pressed(MouseButton::Left),
            is_mouse_button_released(MouseButton::Left),
            is_mouse_button_down(MouseButton::Left),
            &mut frame.pointer,
        );

        for (code, source) in GATE_KEYS {
            let edges = self.key(
                source,
                is_key_pressed(code),
                is_key_released(code),
                is_key_down(code),
            );
            frame.gate.extend(edges);
        }
        frame
    }

    /// Gate events for one key this frame, ordered against the key's state
    /// at the end of the previous frame.
    pub fn key(&mut self, source: GateSource, pressed: bool, released: bool, down: bool) -> Vec<GateEvent> {
        let was_down = self.keys_down.contains(&source);
        self.keys_down.retain(|held| *held != source);
        if down {
            self.keys_down.push(source);
        }
        key_edges(was_down, pressed, released, down)
            .into_iter()
            .map(|edge| GateEvent { source, edge })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(events: &[PointerEvent]) -> Vec<PointerPhase> {
        events.iter().map(|event| event.phase).collect()
    }

    #[test]
    fn mouse_click_moves_then_presses() {
        let mut tracker = PointerTracker::default();
        let mut events = Vec::new();
        tracker.mouse(vec2(10.0, 20.0), true, false, true, &mut events);
        assert_eq!(phases(&events), vec![PointerPhase::Move, PointerPhase::Down]);
        assert_eq!(events[1].position, vec2(10.0, 20.0));

        events.clear();
        tracker.mouse(vec2(10.0, 20.0), false, false, true, &mut events);
        assert!(events.is_empty());

        tracker.mouse(vec2(12.0, 20.0), false, true, false, &mut events);
        assert_eq!(phases(&events), vec![PointerPhase::Move, PointerPhase::Up]);
    }

    #[test]
    fn quick_reclick_while_held_releases_first() {
        let mut tracker = PointerTracker::default();
        let mut events = Vec::new();
        tracker.mouse(vec2(1.0, 1.0), true, false, true, &mut events);
        events.clear();
        tracker.mouse(vec2(1.0, 1.0), true, true, true, &mut events);
        assert_eq!(phases(&events), vec![PointerPhase::Up, PointerPhase::Down]);

        events.clear();
        tracker.mouse(vec2(1.0, 1.0), false, true, false, &mut events);
        tracker.mouse(vec2(1.0, 1.0), true, true, false, &mut events);
        assert_eq!(
            phases(&events),
            vec![PointerPhase::Up, PointerPhase::Down, PointerPhase::Up]
        );
    }

    #[test]
    fn first_touch_wins() {
        let mut tracker = PointerTracker::default();
        let mut events = Vec::new();
        tracker.touch(1, TouchPhase::Started, vec2(5.0, 5.0), &mut events);
        tracker.touch(2, TouchPhase::Started, vec2(50.0, 50.0), &mut events);
        tracker.touch(2, TouchPhase::Moved, vec2(60.0, 50.0), &mut events);
        tracker.touch(1, TouchPhase::Moved, vec2(6.0, 5.0), &mut events);
        tracker.touch(1, TouchPhase::Stationary, vec2(6.0, 5.0), &mut events);
        tracker.touch(1, TouchPhase::Ended, vec2(6.0, 5.0), &mut events);
        assert_eq!(
            phases(&events),
            vec![PointerPhase::Down, PointerPhase::Move, PointerPhase::Up]
        );
        assert_eq!(events[1].position, vec2(6.0, 5.0));
    }

    #[test]
    fn mouse_is_ignored_while_touching() {
        let mut tracker = PointerTracker::default();
        let mut events = Vec::new();
        tracker.touch(7, TouchPhase::Started, vec2(5.0, 5.0), &mut events);
        tracker.mouse(vec2(5.0, 5.0), true, false, true, &mut events);
        tracker.touch(7, TouchPhase::Cancelled, vec2(5.0, 5.0), &mut events);
        assert_eq!(phases(&events), vec![PointerPhase::Down, PointerPhase::Up]);

        events.clear();
        tracker.mouse(vec2(9.0, 9.0), false, true, false, &mut events);
        tracker.mouse(vec2(9.0, 9.0), true, false, true, &mut events);
        assert_eq!(
            phases(&events),
            vec![PointerPhase::Move, PointerPhase::Up, PointerPhase::Down]
        );
    }

    #[test]
    fn key_edges_follow_frame_start_state() {
        assert_eq!(key_edges(false, true, false, true), vec![GateEdge::Press]);
        assert_eq!(key_edges(true, false, true, false), vec![GateEdge::Release]);
        assert!(key_edges(true, false, false, true).is_empty());
        assert_eq!(
            key_edges(false, true, true, false),
            vec![GateEdge::Press, GateEdge::Release]
        );
        assert_eq!(
            key_edges(false, true, true, true),
            vec![GateEdge::Press, GateEdge::Release, GateEdge::Press]
        );
        assert_eq!(
            key_edges(true, true, true, true),
            vec![GateEdge::Release, GateEdge::Press]
        );
        assert_eq!(
            key_edges(true, true, true, false),
            vec![GateEdge::Release, GateEdge::Press, GateEdge::Release]
        );
    }

    #[test]
    fn key_state_carries_across_frames() {
        let mut input = InputState::default();
        assert_eq!(
            input.key(GateSource::Space, true, false, true),
            vec![GateEvent::press(GateSource::Space)]
        );
        assert!(input.key(GateSource::Space, false, false, true).is_empty());
        assert_eq!(
            input.key(GateSource::Space, true, true, true),
            vec![
                GateEvent::release(GateSource::Space),
                GateEvent::press(GateSource::Space)
            ]
        );
        assert!(input.key(GateSource::KeyZ, false, false, false).is_empty());
        assert_eq!(
            input.key(GateSource::KeyZ, true, true, true),
            vec![
                GateEvent::press(GateSource::KeyZ),
                GateEvent::release(GateSource::KeyZ),
                GateEvent::press(GateSource::KeyZ)
            ]
        );
    }
}
