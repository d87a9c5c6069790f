// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

/// The four-character codec tag. Only the four values IAMF defines are
/// accepted; anything else is `InvalidValue`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Aac,
    Opus,
    Flac,
    Pcm,
}

impl CodecId {
    fn from_tag(tag: [u8; 4]) -> Result<CodecId> {
        match &tag {
            b"mp4a" => Ok(CodecId::Aac),
            b"Opus" => Ok(CodecId::Opus),
            b"fLaC" => Ok(CodecId::Flac),
            b"ipcm" => Ok(CodecId::Pcm),
            _ => Err(Error::InvalidValue("codec_config.four_cc")),
        }
    }
}

/// A `CodecConfig` descriptor: unique `id`, immutable once created (only a
/// byte-identical redundant OBU may "replace" it — see
/// [`crate::descriptors::database`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecConfig {
    pub id: u64,
    pub codec_id: CodecId,
    pub samples_per_frame: u64,
    pub roll_distance: i16,
    pub decoder_specific_bytes: Vec<u8>,
}

impl CodecConfig {
    /// Parses a `CodecConfig` descriptor payload.
    pub fn parse<R: ReadBytes>(r: &mut R) -> Result<CodecConfig> {
        let id = r.read_leb128()?;
        let mut tag = [0u8; 4];
        r.read_buf_exact(&mut tag)?;
        let codec_id = CodecId::from_tag(tag)?;
        let samples_per_frame = r.read_leb128()?;
        let roll_distance = r.read_be_i16()?;

        let mut decoder_specific_bytes = Vec::with_capacity(r.bytes_remaining());
        while r.bytes_remaining() > 0 {
            decoder_specific_bytes.push(r.read_byte()?);
        }

        Ok(CodecConfig { id, codec_id, samples_per_frame, roll_distance, decoder_specific_bytes })
    }
}

/// PCM-specific decoder bytes, per §4.5/§6: `flags(1) | sample_size(1) |
/// sample_rate(4 BE)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PcmCodecSpecific {
    pub little_endian: bool,
    pub sample_size: u8,
    pub sample_rate: u32,
}

impl PcmCodecSpecific {
    pub fn parse(bytes: &[u8]) -> Result<PcmCodecSpecific> {
        if bytes.len() < 6 {
            return Err(Error::Malformed("ipcm decoder_specific_bytes too short"));
        }
        let flags = bytes[0];
        let sample_size = bytes[1];
        if !matches!(sample_size, 16 | 24 | 32) {
            return Err(Error::InvalidValue("ipcm.sample_size"));
        }
        let sample_rate = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Ok(PcmCodecSpecific { little_endian: flags & 1 != 0, sample_size, sample_rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_core::io::BufReader;

    #[test]
    fn parses_ipcm_codec_config() {
        // id=0, "ipcm", samples_per_frame=960, roll_distance=0, cspec=6 bytes.
        let mut bytes = vec![0u8]; // leb128 id = 0
        bytes.extend(b"ipcm");
        bytes.push(0xC0); // leb128 960 low byte (continuation)
        bytes.push(0x07); // leb128 960 high byte
        bytes.extend(0i16.to_be_bytes());
        bytes.extend([0, 16, 0, 0, 0xBB, 0x80]); // cspec: BE, 16-bit, 48000 Hz

        let mut r = BufReader::new(&bytes);
        let cfg = CodecConfig::parse(&mut r).unwrap();
        assert_eq!(cfg.codec_id, CodecId::Pcm);
        assert_eq!(cfg.samples_per_frame, 960);
        assert_eq!(cfg.roll_distance, 0);

        let pcm = PcmCodecSpecific::parse(&cfg.decoder_specific_bytes).unwrap();
        assert!(!pcm.little_endian);
        assert_eq!(pcm.sample_size, 16);
        assert_eq!(pcm.sample_rate, 48000);
    }

    #[test]
    fn rejects_unknown_four_cc() {
        let mut bytes = vec![0u8];
        bytes.extend(b"xxxx");
        let mut r = BufReader::new(&bytes);
        assert!(matches!(CodecConfig::parse(&mut r), Err(Error::InvalidValue(_))));
    }
}
