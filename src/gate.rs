use crate::envelope::{EnvelopeParams, level_during_hold, level_during_release};
use crate::tone::ToneEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateSource {
    Button,
    Space,
    KeyZ,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateEdge {
    Press,
    Release,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateEvent {
    pub source: GateSource,
    pub edge: GateEdge,
}

impl GateEvent {
    pub fn press(source: GateSource) -> Self {
        Self {
            source,
            edge: GateEdge::Press,
        }
    }

    pub fn release(source: GateSource) -> Self {
        Self {
            source,
            edge: GateEdge::Release,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GateState {
    pub is_open: bool,
    pub opened_at: f64,
    pub released_at: f64,
    pub level_at_release: f64,
}

impl GateState {
    /// Level of the manually evaluated envelope at `now`.
    pub fn level(&self, now: f64, params: &EnvelopeParams) -> f64 {
        if self.is_open {
            level_during_hold(now - self.opened_at, params)
        } else {
            level_during_release(now - self.released_at, self.level_at_release, params.release)
        }
    }
}

/// Opens when the first source goes down, closes when the last one lets go.
/// A source that is already held ignores further presses, which swallows key repeat.
#[derive(Default)]
pub struct GateController {
    state: GateState,
    held: Vec<GateSource>,
}

impl GateController {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn handle<E: ToneEngine>(
        &mut self,
        event: GateEvent,
        now: f64,
        params: &EnvelopeParams,
        engine: &mut E,
    ) -> bool {
        match event.edge {
            GateEdge::Press => {
                if self.held.contains(&event.source) {
                    return false;
                }
                self.held.push(event.source);
                self.held.len() == 1 && self.press(now, params, engine)
            }
            GateEdge::Release => {
                let Some(index) = self.held.iter().position(|s| *s == event.source) else {
                    return false;
                };
                self.held.remove(index);
                self.held.is_empty() && self.release(now, params, engine)
            }
        }
    }

    pub fn press<E: ToneEngine>(&mut self, now: f64, params: &EnvelopeParams, engine: &mut E) -> bool {
        if self.state.is_open {
            return false;
        }
        engine.ensure_ready();
        if engine.is_ready() {
            engine.configure_envelope(params);
            engine.trigger_on();
        }
        self.state.is_open = true;
        self.state.opened_at = now;
        log::debug!("gate open at {now:.3}s");
        true
    }

    pub fn release<E: ToneEngine>(&mut self, now: f64, params: &EnvelopeParams, engine: &mut E) -> bool {
        if !self.state.is_open {
            return false;
        }
        if engine.is_ready() {
            engine.trigger_off();
        }
        self.state.level_at_release = level_during_hold(now - self.state.opened_at, params);
        self.state.released_at = now;
        self.state.is_open = false;
        log::debug!(
            "gate closed at {now:.3}s, level {:.3}",
            self.state.level_at_release
        );
        true
    }
}
