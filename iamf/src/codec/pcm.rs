// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The one codec adapter this runtime ships a full decode loop for:
//! uncompressed little/big-endian PCM at 16, 24, or 32 bits per sample
//! (§4.5/§6a), driven entirely by the `CodecConfig`'s
//! [`PcmCodecSpecific`] bytes.

use iamf_core::audio::sample::{float_from_i16, float_from_i24, float_from_i32};
use iamf_core::audio::PlanarAudio;
use iamf_core::errors::{Error, Result};

use crate::descriptors::codec_config::PcmCodecSpecific;

use super::{CodecPort, FrameReport};

/// Decodes one substream's interleaved raw PCM bytes into planar float
/// audio. `num_channels` comes from the owning layer's
/// `n_substreams`/`n_coupled_substreams` split, not from the codec config.
pub struct PcmAdapter {
    spec: PcmCodecSpecific,
    num_channels: usize,
}

impl PcmAdapter {
    pub fn new(spec: PcmCodecSpecific, num_channels: usize) -> Self {
        PcmAdapter { spec, num_channels }
    }

    fn bytes_per_sample(&self) -> usize {
        (self.spec.sample_size / 8) as usize
    }

    fn read_sample(&self, bytes: &[u8]) -> f32 {
        match self.spec.sample_size {
            16 => {
                let raw = if self.spec.little_endian {
                    i16::from_le_bytes([bytes[0], bytes[1]])
                } else {
                    i16::from_be_bytes([bytes[0], bytes[1]])
                };
                float_from_i16(raw)
            }
            24 => {
                let b = if self.spec.little_endian {
                    [bytes[0], bytes[1], bytes[2], if bytes[2] & 0x80 != 0 { 0xFF } else { 0x00 }]
                } else {
                    [if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 }, bytes[0], bytes[1], bytes[2]]
                };
                let raw = if self.spec.little_endian {
                    i32::from_le_bytes(b)
                } else {
                    i32::from_be_bytes(b)
                };
                float_from_i24(raw)
            }
            32 => {
                let raw = if self.spec.little_endian {
                    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
                } else {
                    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
                };
                float_from_i32(raw)
            }
            other => unreachable!("PcmCodecSpecific::parse rejects sample_size={other}"),
        }
    }
}

impl CodecPort for PcmAdapter {
    fn decode(&mut self, payload: &[u8], num_samples: usize) -> Result<(PlanarAudio, FrameReport)> {
        let bytes_per_sample = self.bytes_per_sample();
        let frame_bytes = bytes_per_sample * self.num_channels;
        if frame_bytes == 0 {
            return Err(Error::InvalidState("pcm adapter configured with zero channels"));
        }

        let decodable_samples = payload.len() / frame_bytes;
        let samples_decoded = decodable_samples.min(num_samples);

        let mut channels = vec![Vec::with_capacity(num_samples); self.num_channels];
        for t in 0..samples_decoded {
            let frame_offset = t * frame_bytes;
            for (c, channel) in channels.iter_mut().enumerate() {
                let offset = frame_offset + c * bytes_per_sample;
                channel.push(self.read_sample(&payload[offset..offset + bytes_per_sample]));
            }
        }

        let shortfall = num_samples - samples_decoded;
        for channel in &mut channels {
            channel.resize(num_samples, 0.0);
        }

        Ok((PlanarAudio { channels }, FrameReport { samples_decoded, shortfall }))
    }

    fn reset(&mut self) {
        // Stateless: every frame decodes independently of the last.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(little_endian: bool, sample_size: u8) -> PcmCodecSpecific {
        PcmCodecSpecific { little_endian, sample_size, sample_rate: 48_000 }
    }

    #[test]
    fn decodes_16_bit_little_endian_stereo() {
        let mut adapter = PcmAdapter::new(spec(true, 16), 2);
        // Two frames: (L=0.5, R=-0.5), (L=1.0 clipped repr, R=0.0)
        let l0 = (0.5f32 * 32768.0) as i16;
        let r0 = (-0.5f32 * 32768.0) as i16;
        let mut bytes = Vec::new();
        bytes.extend(l0.to_le_bytes());
        bytes.extend(r0.to_le_bytes());
        bytes.extend(0i16.to_le_bytes());
        bytes.extend(0i16.to_le_bytes());

        let (planar, report) = adapter.decode(&bytes, 2).unwrap();
        assert_eq!(report.samples_decoded, 2);
        assert_eq!(report.shortfall, 0);
        assert!((planar.channels[0][0] - 0.5).abs() < 1e-3);
        assert!((planar.channels[1][0] - (-0.5)).abs() < 1e-3);
    }

    #[test]
    fn short_payload_reports_shortfall_and_zero_fills() {
        let mut adapter = PcmAdapter::new(spec(true, 16), 1);
        let bytes = 0i16.to_le_bytes().to_vec(); // only one sample's worth
        let (planar, report) = adapter.decode(&bytes, 4).unwrap();
        assert_eq!(report.samples_decoded, 1);
        assert_eq!(report.shortfall, 3);
        assert_eq!(planar.channels[0].len(), 4);
        assert_eq!(planar.channels[0][1], 0.0);
    }

    #[test]
    fn decodes_24_bit_big_endian_mono_round_trip() {
        let mut adapter = PcmAdapter::new(spec(false, 24), 1);
        // 0x123456 as a positive 24-bit big-endian sample.
        let bytes = vec![0x12, 0x34, 0x56];
        let (planar, _) = adapter.decode(&bytes, 1).unwrap();
        let expected = iamf_core::audio::sample::float_from_i24(0x00123456);
        assert!((planar.channels[0][0] - expected).abs() < 1e-9);
    }

    #[test]
    fn decodes_32_bit_little_endian_inverted_sign() {
        let mut adapter = PcmAdapter::new(spec(true, 32), 1);
        let bytes = (-2_147_483_648i32).to_le_bytes().to_vec();
        let (planar, _) = adapter.decode(&bytes, 1).unwrap();
        assert!((planar.channels[0][0] - 1.0).abs() < 1e-6);
    }
}
