// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The true-peak meter (§4.9): a 4-phase, 12-tap polyphase FIR upsampler.
//! Each input sample is expanded to 4 oversampled values (one per phase
//! filter); the meter reports the maximum absolute value across them,
//! approximating the inter-sample peak a reconstruction filter would
//! produce. Coefficients are taken verbatim from the reference
//! implementation's `audio_true_peak_meter.c` phase-filter bank.

const NUM_PHASES: usize = 4;
const NUM_TAPS: usize = 12;

/// Fixed 4-phase, 12-tap coefficient table (§6), reproduced bit-for-bit
/// from the reference implementation.
const PHASE_FILTERS: [[f32; NUM_TAPS]; NUM_PHASES] = [
    [
        0.0017089843750,
        0.0109863281250,
        -0.0196533203125,
        0.0332031250000,
        -0.0594482421875,
        0.1373291015625,
        0.9721679687500,
        -0.1022949218750,
        0.0476074218750,
        -0.0266113281250,
        0.0148925781250,
        -0.0083007812500,
    ],
    [
        -0.0291748046875,
        0.0292968750000,
        -0.0517578125000,
        0.0891113281250,
        -0.1665039062500,
        0.4650878906250,
        0.7797851562500,
        -0.2003173828125,
        0.1015625000000,
        -0.0582275390625,
        0.0330810546875,
        -0.0189208984375,
    ],
    [
        -0.0189208984375,
        0.0330810546875,
        -0.0582275390625,
        0.1015625000000,
        -0.2003173828125,
        0.7797851562500,
        0.4650878906250,
        -0.1665039062500,
        0.0891113281250,
        -0.0517578125000,
        0.0292968750000,
        -0.0291748046875,
    ],
    [
        -0.0083007812500,
        0.0148925781250,
        -0.0266113281250,
        0.0476074218750,
        -0.1022949218750,
        0.9721679687500,
        0.1373291015625,
        -0.0594482421875,
        0.0332031250000,
        -0.0196533203125,
        0.0109863281250,
        0.0017089843750,
    ],
];

/// One channel's polyphase tap history, reset per element on flush (§4.9 —
/// the internal tap buffer must not leak state between elements sharing a
/// meter instance).
#[derive(Clone, Debug)]
pub struct TruePeakMeter {
    history: [f32; NUM_TAPS],
}

impl TruePeakMeter {
    pub fn new() -> Self {
        TruePeakMeter { history: [0.0; NUM_TAPS] }
    }

    /// Feeds one input sample, returning the maximum absolute value across
    /// the 4 oversampled phase outputs for that sample.
    pub fn next_true_peak(&mut self, sample: f32) -> f32 {
        for i in (1..NUM_TAPS).rev() {
            self.history[i] = self.history[i - 1];
        }
        self.history[0] = sample;

        let mut max_abs = 0.0f32;
        for phase in &PHASE_FILTERS {
            let mut sum = 0.0f32;
            for (h, c) in self.history.iter().zip(phase.iter()) {
                sum += h * c;
            }
            max_abs = max_abs.max(sum.abs());
        }
        max_abs
    }

    /// Feeds a whole buffer, returning the peak across all samples without
    /// retaining per-sample output — the common case for a frame-level
    /// loudness side-channel.
    pub fn process_buffer(&mut self, samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |peak, &s| peak.max(self.next_true_peak(s)))
    }

    /// Clears the tap history between elements (§4.9).
    pub fn reset(&mut self) {
        self.history = [0.0; NUM_TAPS];
    }
}

impl Default for TruePeakMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_reports_zero_peak() {
        let mut meter = TruePeakMeter::new();
        assert_eq!(meter.process_buffer(&[0.0; 32]), 0.0);
    }

    #[test]
    fn full_scale_dc_settles_to_approximately_unity() {
        let mut meter = TruePeakMeter::new();
        let samples = vec![1.0f32; 64];
        let peak = meter.process_buffer(&samples);
        assert!((peak - 1.0).abs() < 0.05, "peak={peak}");
    }

    #[test]
    fn reset_clears_tap_history() {
        let mut meter = TruePeakMeter::new();
        meter.process_buffer(&[1.0; 16]);
        meter.reset();
        assert_eq!(meter.history, [0.0; NUM_TAPS]);
    }

    #[test]
    fn single_impulse_peak_matches_the_largest_single_tap_coefficient() {
        let mut meter = TruePeakMeter::new();
        let peak = meter.next_true_peak(1.0);
        // The dominant tap in phase 0/3 is ~0.97217; no other phase's
        // single-sample response at t=0 exceeds it.
        assert!((peak - 0.9721679687500).abs() < 1e-6);
    }
}
