// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The output stage (§4.9): applies an audio frame's `trim_start`/
//! `trim_end`, quantises float PCM to int16/24/32 with the saturating,
//! dither-free, round-half-to-even kernels in
//! [`iamf_core::audio::sample`], and interleaves the result for a caller
//! expecting packed PCM. [`true_peak`] hosts the optional side-channel
//! true-peak meter, which reads the pre-quantisation float stream and
//! never perturbs it.

pub mod true_peak;

use iamf_core::audio::sample::{i24_to_le_bytes, quantise_i16, quantise_i24, quantise_i32};
use iamf_core::audio::PlanarAudio;

/// The integer PCM width the output stage quantises to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    S16,
    S24,
    S32,
}

/// Drops `trim_start` samples from the head and `trim_end` samples from
/// the tail of every channel in `audio`, per the audio frame's trim fields
/// (§3 `AudioFrame`, exercised by S5). Trim amounts exceeding the buffer's
/// length saturate to an empty channel rather than panicking — a
/// pathological trim value is a decode-error condition the caller
/// discovers from the empty result, not a panic.
pub fn apply_trim(audio: &mut PlanarAudio, trim_start: u64, trim_end: u64) {
    for channel in &mut audio.channels {
        let len = channel.len();
        let start = (trim_start as usize).min(len);
        let end = (trim_end as usize).min(len - start);
        let keep_end = len - end;
        if start >= keep_end {
            channel.clear();
        } else {
            channel.drain(keep_end..);
            channel.drain(..start);
        }
    }
}

/// Interleaves `planar`'s channels into one little-endian byte buffer at
/// `format`'s width, quantising each float sample on the way.
pub fn quantise_interleave(planar: &PlanarAudio, format: SampleFormat) -> Vec<u8> {
    let num_channels = planar.num_channels();
    let num_samples = planar.num_samples();
    let bytes_per_sample = match format {
        SampleFormat::S16 => 2,
        SampleFormat::S24 => 3,
        SampleFormat::S32 => 4,
    };
    let mut out = Vec::with_capacity(num_channels * num_samples * bytes_per_sample);

    for t in 0..num_samples {
        for channel in &planar.channels {
            let x = channel[t];
            match format {
                SampleFormat::S16 => out.extend(quantise_i16(x).to_le_bytes()),
                SampleFormat::S24 => out.extend(i24_to_le_bytes(quantise_i24(x))),
                SampleFormat::S32 => out.extend(quantise_i32(x).to_le_bytes()),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar(channels: Vec<Vec<f32>>) -> PlanarAudio {
        PlanarAudio { channels }
    }

    #[test]
    fn apply_trim_drops_head_and_tail() {
        let mut audio = planar(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        apply_trim(&mut audio, 2, 1);
        assert_eq!(audio.channels[0], vec![3.0, 4.0]);
    }

    #[test]
    fn apply_trim_saturates_to_empty_when_trim_exceeds_length() {
        let mut audio = planar(vec![vec![1.0, 2.0]]);
        apply_trim(&mut audio, 10, 10);
        assert_eq!(audio.channels[0], Vec::<f32>::new());
    }

    /// Spec scenario S5: 240 samples trimmed from the start before
    /// quantisation.
    #[test]
    fn s5_scenario_trims_240_leading_samples() {
        let samples: Vec<f32> = (0..960).map(|i| i as f32 / 960.0).collect();
        let mut audio = planar(vec![samples.clone()]);
        apply_trim(&mut audio, 240, 0);
        assert_eq!(audio.channels[0].len(), 720);
        assert_eq!(audio.channels[0][0], samples[240]);
    }

    #[test]
    fn quantise_interleave_s16_packs_little_endian_channel_major() {
        let audio = planar(vec![vec![1.0, -1.0], vec![0.5, -0.5]]);
        let bytes = quantise_interleave(&audio, SampleFormat::S16);
        assert_eq!(bytes.len(), 2 * 2 * 2);
        // First frame: channel 0 then channel 1.
        assert_eq!(&bytes[0..2], &32767i16.to_le_bytes());
        let ch1_sample0 = i16::from_le_bytes([bytes[2], bytes[3]]);
        assert!((f32::from(ch1_sample0) - 16384.0).abs() < 2.0);
    }

    #[test]
    fn quantise_interleave_s24_uses_3_bytes_per_sample() {
        let audio = planar(vec![vec![1.0]]);
        let bytes = quantise_interleave(&audio, SampleFormat::S24);
        assert_eq!(bytes, vec![0xFF, 0xFF, 0x7F]);
    }
}
