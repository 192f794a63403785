use crate::mapping::{MAX_HZ, MIN_HZ, lerp};

pub const MAX_ATTACK_SEC: f64 = 2.0;
pub const MAX_DECAY_SEC: f64 = 3.0;
pub const MAX_RELEASE_SEC: f64 = 4.0;
pub const MIN_RESONANCE_Q: f64 = 0.5;
pub const MAX_RESONANCE_Q: f64 = 20.0;

/// Attack, decay and release in seconds; sustain as a 0..1 ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.05,
            decay: 0.15,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

impl EnvelopeParams {
    pub fn clamped(self) -> Self {
        Self {
            attack: self.attack.clamp(0.0, MAX_ATTACK_SEC),
            decay: self.decay.clamp(0.0, MAX_DECAY_SEC),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: self.release.clamp(0.0, MAX_RELEASE_SEC),
        }
    }
}

/// Level while the gate is held: linear attack to 1, linear decay to sustain, then hold.
pub fn level_during_hold(elapsed: f64, params: &EnvelopeParams) -> f64 {
    if elapsed <= 0.0 {
        return 0.0;
    }
    if elapsed < params.attack {
        return elapsed / params.attack.max(1e-6);
    }
    let into_decay = elapsed - params.attack;
    if into_decay < params.decay {
        let progress = into_decay / params.decay.max(1e-6);
        return 1.0 - (1.0 - params.sustain) * progress;
    }
    params.sustain
}

/// Level after the gate closed, falling linearly from `start_level` over `release` seconds.
pub fn level_during_release(elapsed_since_release: f64, start_level: f64, release: f64) -> f64 {
    if elapsed_since_release <= 0.0 {
        return start_level;
    }
    if release <= 0.0 {
        return 0.0;
    }
    start_level * (1.0 - elapsed_since_release / release).max(0.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CutoffRange {
    min_hz: f64,
    max_hz: f64,
    resonance_q: f64,
}

impl Default for CutoffRange {
    fn default() -> Self {
        Self {
            min_hz: 200.0,
            max_hz: 4_000.0,
            resonance_q: 6.0,
        }
    }
}

impl CutoffRange {
    pub fn min_hz(&self) -> f64 {
        self.min_hz
    }

    pub fn max_hz(&self) -> f64 {
        self.max_hz
    }

    pub fn resonance_q(&self) -> f64 {
        self.resonance_q
    }

    /// Moves the lower edge; it is pinned to the upper edge rather than crossing it.
    pub fn set_min_hz(&mut self, hz: f64) {
        self.min_hz = hz.clamp(MIN_HZ, self.max_hz.min(MAX_HZ));
    }

    /// Moves the upper edge; it is pinned to the lower edge rather than crossing it.
    pub fn set_max_hz(&mut self, hz: f64) {
        self.max_hz = hz.clamp(self.min_hz.max(MIN_HZ), MAX_HZ);
    }

    /// Replaces both edges at once. A reversed pair collapses onto `min_hz`.
    pub fn set_span(&mut self, min_hz: f64, max_hz: f64) {
        self.min_hz = min_hz.clamp(MIN_HZ, MAX_HZ);
        self.max_hz = max_hz.clamp(self.min_hz, MAX_HZ);
    }

    pub fn set_resonance_q(&mut self, q: f64) {
        self.resonance_q = q.clamp(MIN_RESONANCE_Q, MAX_RESONANCE_Q);
    }

    pub fn cutoff_for_level(&self, level: f64) -> f64 {
        lerp(self.min_hz, self.max_hz, level.clamp(0.0, 1.0))
    }
}
