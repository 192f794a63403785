use std::f32::consts::PI;

use crate::envelope::EnvelopeParams;

const BASE_FREQ: f32 = 110.0;
const PEAK_AMPLITUDE: f32 = 0.35;
const MIN_SEGMENT_SEC: f32 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
enum EnvStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-sample amplitude envelope with linear segments. Release starts from
/// wherever the level is when the gate drops.
#[derive(Clone, Debug)]
pub struct AmpEnvelope {
    params: EnvelopeParams,
    value: f32,
    release_from: f32,
    stage: EnvStage,
}

impl AmpEnvelope {
    pub fn new() -> Self {
        Self {
            params: EnvelopeParams::default(),
            value: 0.0,
            release_from: 0.0,
            stage: EnvStage::Idle,
        }
    }

    pub fn configure(&mut self, params: EnvelopeParams) {
        self.params = params.clamped();
    }

    pub fn trigger(&mut self) {
        self.stage = EnvStage::Attack;
    }

    pub fn release(&mut self) {
        if self.stage != EnvStage::Idle {
            self.release_from = self.value;
            self.stage = EnvStage::Release;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvStage::Idle
    }

    pub fn advance(&mut self, dt: f32) -> f32 {
        let attack = self.params.attack as f32;
        let decay = self.params.decay as f32;
        let sustain = self.params.sustain as f32;
        let release = self.params.release as f32;
        match self.stage {
            EnvStage::Idle => {
                self.value = 0.0;
            }
            EnvStage::Attack => {
                self.value += dt / attack.max(MIN_SEGMENT_SEC);
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                self.value -= (1.0 - sustain) * dt / decay.max(MIN_SEGMENT_SEC);
                if self.value <= sustain {
                    self.value = sustain;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {
                self.value = sustain;
            }
            EnvStage::Release => {
                self.value -= self.release_from * dt / release.max(MIN_SEGMENT_SEC);
                if self.value <= 0.0 {
                    self.value = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
        }
        self.value.clamp(0.0, 1.0)
    }
}

/// RBJ lowpass biquad, transposed direct form II.
#[derive(Clone, Copy, Debug)]
pub struct LowpassFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Default for LowpassFilter {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }
}

impl LowpassFilter {
    pub fn set_params(&mut self, cutoff_hz: f32, q: f32, sample_rate: f32) {
        let nyquist_guard = sample_rate * 0.45;
        let freq = cutoff_hz.clamp(20.0, nyquist_guard.max(20.0));
        let w0 = 2.0 * PI * freq / sample_rate.max(1.0);
        let alpha = w0.sin() / (2.0 * q.max(0.1));
        let cos_w0 = w0.cos();

        let b0 = (1.0 - cos_w0) * 0.5;
        let b1 = 1.0 - cos_w0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// One sawtooth voice through the lowpass and the amplitude envelope.
pub struct Voice {
    phase: f32,
    frequency: f32,
    sample_rate: f32,
    cutoff_hz: f32,
    resonance_q: f32,
    envelope: AmpEnvelope,
    filter: LowpassFilter,
}

impl Voice {
    pub fn new() -> Self {
        let mut voice = Self {
            phase: 0.0,
            frequency: BASE_FREQ,
            sample_rate: 44_100.0,
            cutoff_hz: 200.0,
            resonance_q: 6.0,
            envelope: AmpEnvelope::new(),
            filter: LowpassFilter::default(),
        };
        voice.refresh_filter();
        voice
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.refresh_filter();
    }

    pub fn configure_envelope(&mut self, params: EnvelopeParams) {
        self.envelope.configure(params);
    }

    pub fn gate_on(&mut self) {
        self.envelope.trigger();
    }

    pub fn gate_off(&mut self) {
        self.envelope.release();
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff_hz = hz;
        self.refresh_filter();
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.resonance_q = q;
        self.refresh_filter();
    }

    fn refresh_filter(&mut self) {
        self.filter
            .set_params(self.cutoff_hz, self.resonance_q, self.sample_rate);
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.envelope.is_idle() {
            return 0.0;
        }
        let dt = 1.0 / self.sample_rate;
        self.phase = (self.phase + self.frequency * dt).fract();
        let saw = 2.0 * (self.phase - 0.5);
        let filtered = self.filter.process(saw);
        filtered * self.envelope.advance(dt) * PEAK_AMPLITUDE
    }
}
