use macroquad::prelude::{Rect, Vec2};

use crate::envelope::{CutoffRange, EnvelopeParams};
use crate::mapping::{format_hz, hz_to_norm, norm_to_hz};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SliderId {
    Attack,
    Decay,
    Sustain,
    Release,
    CutoffMin,
    CutoffMax,
    Resonance,
}

impl SliderId {
    pub const VALUES: [SliderId; 7] = [
        SliderId::Attack,
        SliderId::Decay,
        SliderId::Sustain,
        SliderId::Release,
        SliderId::CutoffMin,
        SliderId::CutoffMax,
        SliderId::Resonance,
    ];

    pub const COUNT: usize = Self::VALUES.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            SliderId::Attack => "Attack",
            SliderId::Decay => "Decay",
            SliderId::Sustain => "Sustain",
            SliderId::Release => "Release",
            SliderId::CutoffMin => "Cutoff Min",
            SliderId::CutoffMax => "Cutoff Max",
            SliderId::Resonance => "Resonance",
        }
    }

    fn range(self) -> (i32, i32) {
        match self {
            SliderId::Attack => (0, 2_000),
            SliderId::Decay => (0, 3_000),
            SliderId::Sustain => (0, 1_000),
            SliderId::Release => (0, 4_000),
            SliderId::CutoffMin | SliderId::CutoffMax => (0, 1_000),
            SliderId::Resonance => (5, 200),
        }
    }

    fn format(self, value: i32) -> String {
        match self {
            SliderId::Attack | SliderId::Decay | SliderId::Release => {
                format!("{:.2}s", value as f64 / 1_000.0)
            }
            SliderId::Sustain => format!("{:.2}", value as f64 / 1_000.0),
            SliderId::CutoffMin | SliderId::CutoffMax => {
                format_hz(norm_to_hz(value as f64 / 1_000.0))
            }
            SliderId::Resonance => format!("Q {:.1}", value as f64 / 10.0),
        }
    }
}

/// Integer slider with a cached display label.
#[derive(Clone, Debug)]
pub struct Slider {
    id: SliderId,
    min: i32,
    max: i32,
    value: i32,
    display: String,
}

impl Slider {
    fn new(id: SliderId, value: f64) -> Self {
        let (min, max) = id.range();
        let mut slider = Self {
            id,
            min,
            max,
            value: min,
            display: String::new(),
        };
        slider.store(value);
        slider.display = id.format(slider.value);
        slider
    }

    pub fn id(&self) -> SliderId {
        self.id
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn label(&self) -> &str {
        &self.display
    }

    pub fn normalized(&self) -> f32 {
        (self.value - self.min) as f32 / (self.max - self.min).max(1) as f32
    }

    fn store(&mut self, value: f64) -> bool {
        let next = (value.round() as i32).clamp(self.min, self.max);
        let changed = next != self.value;
        self.value = next;
        changed
    }

    fn value_at(&self, x: f32, track: Rect) -> f64 {
        let t = ((x - track.x) / track.w.max(1.0)).clamp(0.0, 1.0) as f64;
        self.min as f64 + t * (self.max - self.min) as f64
    }
}

/// The numeric controls. Every write, programmatic or from the user, goes through
/// `notify`, which refreshes the label and records the change.
pub struct SliderBank {
    sliders: Vec<Slider>,
    changes: Vec<SliderId>,
}

impl SliderBank {
    pub fn new(params: &EnvelopeParams, range: &CutoffRange) -> Self {
        let sliders = SliderId::VALUES
            .iter()
            .map(|id| Slider::new(*id, 0.0))
            .collect();
        let mut bank = Self {
            sliders,
            changes: Vec::new(),
        };
        bank.push_envelope(params);
        bank.push_cutoff(range);
        bank.changes.clear();
        bank
    }

    pub fn get(&self, id: SliderId) -> &Slider {
        &self.sliders[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slider> {
        self.sliders.iter()
    }

    pub fn value(&self, id: SliderId) -> i32 {
        self.get(id).value
    }

    pub fn set_value(&mut self, id: SliderId, value: f64) {
        if self.sliders[id.index()].store(value) {
            self.notify(id);
        }
    }

    /// A user edit from a pointer on the slider track.
    pub fn set_from_pointer(&mut self, id: SliderId, position: Vec2, track: Rect) {
        let value = self.get(id).value_at(position.x, track);
        self.set_value(id, value);
    }

    pub fn take_changes(&mut self) -> Vec<SliderId> {
        std::mem::take(&mut self.changes)
    }

    fn notify(&mut self, id: SliderId) {
        let slider = &mut self.sliders[id.index()];
        slider.display = id.format(slider.value);
        if !self.changes.contains(&id) {
            self.changes.push(id);
        }
    }

    pub fn envelope_params(&self) -> EnvelopeParams {
        EnvelopeParams {
            attack: self.value(SliderId::Attack) as f64 / 1_000.0,
            decay: self.value(SliderId::Decay) as f64 / 1_000.0,
            sustain: self.value(SliderId::Sustain) as f64 / 1_000.0,
            release: self.value(SliderId::Release) as f64 / 1_000.0,
        }
    }

    pub fn push_envelope(&mut self, params: &EnvelopeParams) {
        self.set_value(SliderId::Attack, params.attack * 1_000.0);
        self.set_value(SliderId::Decay, params.decay * 1_000.0);
        self.set_value(SliderId::Sustain, params.sustain * 1_000.0);
        self.set_value(SliderId::Release, params.release * 1_000.0);
    }

    pub fn cutoff_norms(&self) -> (f64, f64) {
        (
            self.value(SliderId::CutoffMin) as f64 / 1_000.0,
            self.value(SliderId::CutoffMax) as f64 / 1_000.0,
        )
    }

    pub fn resonance_q(&self) -> f64 {
        self.value(SliderId::Resonance) as f64 / 10.0
    }

    pub fn push_cutoff(&mut self, range: &CutoffRange) {
        self.set_value(SliderId::CutoffMin, hz_to_norm(range.min_hz()) * 1_000.0);
        self.set_value(SliderId::CutoffMax, hz_to_norm(range.max_hz()) * 1_000.0);
        self.set_value(SliderId::Resonance, range.resonance_q() * 10.0);
    }
}
