// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The LFE channel's fixed 120 Hz low-pass (§4.7), applied to the LFE row
//! whenever a renderer path synthesises one that was not directly coded
//! (e.g. the HOA decode's `W`-derived LFE). A direct-form-II biquad,
//! structured the same way as a hand-rolled 3-band EQ's filter core, with
//! RBJ cookbook coefficients for a fixed 120 Hz Butterworth-Q low-pass.

/// A single biquad section in Direct Form II, holding its own running
/// state so successive `process` calls across frame boundaries behave as
/// one continuous filter.
#[derive(Copy, Clone, Debug)]
pub struct BiquadFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    pub fn new() -> Self {
        BiquadFilter { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0, x1: 0.0, x2: 0.0, y1: 0.0, y2: 0.0 }
    }

    /// A 2-pole Butterworth (`Q = 1/sqrt(2)`) low-pass at `cutoff_hz` for a
    /// stream sampled at `sample_rate_hz`, via the RBJ cookbook formulas.
    pub fn low_pass(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * cutoff_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let sin_omega = omega.sin();
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        let mut f = BiquadFilter::new();
        f.set_coefficients((b0 / a0) as f32, (b1 / a0) as f32, (b2 / a0) as f32, (a1 / a0) as f32, (a2 / a0) as f32);
        f
    }

    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) {
        self.b0 = b0;
        self.b1 = b1;
        self.b2 = b2;
        self.a1 = a1;
        self.a2 = a2;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    pub fn process_buffer(&mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&s| self.process(s)).collect()
    }

    /// Clears the running state without touching the coefficients, for the
    /// per-element flush boundary §4.7 requires.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for BiquadFilter {
    fn default() -> Self {
        Self::new()
    }
}

pub const LFE_CUTOFF_HZ: f64 = 120.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_passes_through_at_unity_once_settled() {
        let mut f = BiquadFilter::low_pass(LFE_CUTOFF_HZ, 48_000.0);
        let mut last = 0.0;
        for _ in 0..2000 {
            last = f.process(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3, "settled output {last}");
    }

    #[test]
    fn reset_clears_state_but_not_coefficients() {
        let mut f = BiquadFilter::low_pass(LFE_CUTOFF_HZ, 48_000.0);
        for _ in 0..10 {
            f.process(1.0);
        }
        f.reset();
        assert_eq!(f.x1, 0.0);
        assert_eq!(f.y1, 0.0);
        assert_eq!(f.b0, BiquadFilter::low_pass(LFE_CUTOFF_HZ, 48_000.0).b0);
    }

    #[test]
    fn high_frequency_content_is_attenuated() {
        let mut f = BiquadFilter::low_pass(LFE_CUTOFF_HZ, 48_000.0);
        let n = 4096;
        let nyquist_tone: Vec<f32> =
            (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = f.process_buffer(&nyquist_tone);
        let tail_energy: f32 = out[n - 256..].iter().map(|s| s * s).sum();
        let in_energy: f32 = nyquist_tone[n - 256..].iter().map(|s| s * s).sum();
        assert!(tail_energy < in_energy * 0.1);
    }
}
