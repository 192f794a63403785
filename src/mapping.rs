pub const MIN_HZ: f64 = 20.0;
pub const MAX_HZ: f64 = 20_000.0;

const HZ_RATIO: f64 = MAX_HZ / MIN_HZ;

/// Maps a normalized position onto the 20 Hz – 20 kHz range on a log axis.
pub fn norm_to_hz(n: f64) -> f64 {
    MIN_HZ * HZ_RATIO.powf(n)
}

pub fn hz_to_norm(hz: f64) -> f64 {
    ((hz / MIN_HZ).ln() / HZ_RATIO.ln()).clamp(0.0, 1.0)
}

pub fn format_hz(hz: f64) -> String {
    if hz >= 1_000.0 {
        let decimals = if hz < 10_000.0 { 2 } else { 1 };
        format!("{:.*} kHz", decimals, hz / 1_000.0)
    } else {
        format!("{} Hz", hz.round() as i64)
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
