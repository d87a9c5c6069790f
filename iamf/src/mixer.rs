// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mix engine (§4.8): sums every rendered element's output, each
//! weighted by its own element-mix gain, then scales the sum by the
//! output-mix gain. Both gains are linear amplitudes already resolved by
//! the [`crate::parameter::ParameterEngine`] (§4.3) at the sample the
//! caller is currently emitting.

use log::warn;

/// One rendered element's planar output for the current frame, alongside
/// its per-element mix gain (already converted to linear amplitude).
pub struct RenderedElement<'a> {
    pub channels: &'a [Vec<f32>],
    pub element_mix_gain: f64,
}

/// Sums `elements` into `num_channels` output channels of `num_samples`
/// each, applying `output_mix_gain` to the total. Every element must carry
/// exactly `num_channels` channels; an element whose decode fell short of
/// `num_samples` is expected to have already been zero-padded on the tail
/// by its codec adapter (§4.5) before reaching the mixer — the mixer
/// itself does not pad, only sums.
///
/// Elements are summed in the order given, matching the resolver's
/// descriptor-order guarantee (§5) — semantically irrelevant since
/// floating-point addition here is effectively commutative at the
/// precision used, but kept for bit-reproducible test fixtures.
pub fn mix(elements: &[RenderedElement<'_>], output_mix_gain: f64, num_channels: usize, num_samples: usize) -> Vec<Vec<f32>> {
    let mut out = vec![vec![0.0f32; num_samples]; num_channels];

    for element in elements {
        if element.channels.len() != num_channels {
            warn!(
                "mix engine: element carries {} channels, expected {}; skipping",
                element.channels.len(),
                num_channels
            );
            continue;
        }
        let gain = element.element_mix_gain as f32;
        for (ch, samples) in element.channels.iter().enumerate() {
            for (t, &s) in samples.iter().enumerate().take(num_samples) {
                out[ch][t] += gain * s;
            }
        }
    }

    let output_gain = output_mix_gain as f32;
    if output_gain != 1.0 {
        for channel in &mut out {
            for sample in channel.iter_mut() {
                *sample *= output_gain;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_zero_gain_element_is_silent() {
        let elem_channels = vec![vec![1.0f32; 4], vec![-1.0f32; 4]];
        let elements = [RenderedElement { channels: &elem_channels, element_mix_gain: 1.0 }];
        let out = mix(&elements, 0.0, 2, 4);
        assert!(out[0].iter().all(|&s| s == 0.0));
    }

    /// Spec scenario S1: a single stereo element at unity element- and
    /// output-mix gain, silent input, produces silent output.
    #[test]
    fn s1_scenario_unity_gain_silence_passes_through_silent() {
        let elem_channels = vec![vec![0.0f32; 960], vec![0.0f32; 960]];
        let elements = [RenderedElement { channels: &elem_channels, element_mix_gain: 1.0 }];
        let out = mix(&elements, 1.0, 2, 960);
        assert!(out[0].iter().all(|&s| s == 0.0));
        assert!(out[1].iter().all(|&s| s == 0.0));
    }

    /// Spec scenario S2: output-mix gain of -6 dB applied to a full-scale
    /// input yields ~0.501187 amplitude.
    #[test]
    fn s2_scenario_output_mix_gain_attenuates_full_scale_input() {
        let elem_channels = vec![vec![1.0f32; 4], vec![1.0f32; 4]];
        let elements = [RenderedElement { channels: &elem_channels, element_mix_gain: 1.0 }];
        let gain = iamf_core::units::q7_8_to_linear(-1536); // -6 dB
        let out = mix(&elements, gain, 2, 4);
        for &s in &out[0] {
            assert!((s - 0.501_187).abs() < 1e-4, "s={s}");
        }
    }

    #[test]
    fn two_elements_sum_their_gained_contributions() {
        let a = vec![vec![1.0f32; 2]];
        let b = vec![vec![1.0f32; 2]];
        let elements =
            [RenderedElement { channels: &a, element_mix_gain: 0.5 }, RenderedElement { channels: &b, element_mix_gain: 0.25 }];
        let out = mix(&elements, 1.0, 1, 2);
        assert!((out[0][0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn mismatched_channel_count_element_is_skipped_not_panicking() {
        let wrong = vec![vec![1.0f32; 2]]; // only 1 channel, expecting 2
        let elements = [RenderedElement { channels: &wrong, element_mix_gain: 1.0 }];
        let out = mix(&elements, 1.0, 2, 2);
        assert!(out[0].iter().all(|&s| s == 0.0));
        assert!(out[1].iter().all(|&s| s == 0.0));
    }
}
