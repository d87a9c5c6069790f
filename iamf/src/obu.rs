// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The OBU reader: splits a byte span into Open Bitstream Units. Stateless
//! and type-agnostic per the spec — it does not validate that `ObuType` is
//! a value this runtime knows how to interpret; that is the descriptor
//! layer's job.

use iamf_core::errors::{Error, Result};
use iamf_core::io::{BufReader, ReadBytes};

/// The 5-bit OBU type tag. Unknown values round-trip through
/// `ObuType::Reserved` rather than failing the reader (framing must not
/// require semantic knowledge of the payload).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObuType {
    IaSequenceHeader,
    CodecConfig,
    AudioElement,
    MixPresentation,
    ParameterBlock,
    TemporalDelimiter,
    /// `AudioFrame` carries its substream id out-of-band (in the low 5
    /// bits of the type tag itself, per IAMF's `audio_frame_id0`..`id17`
    /// shorthand forms) when `substream_id` is `Some`; a bare
    /// `audio_frame` OBU that carries an explicit leb128 substream id in
    /// its payload uses `None`.
    AudioFrame { substream_id: Option<u8> },
    Reserved(u8),
}

impl ObuType {
    fn from_tag(tag: u8) -> ObuType {
        match tag {
            0 => ObuType::IaSequenceHeader,
            1 => ObuType::ParameterBlock,
            2 => ObuType::TemporalDelimiter,
            3 => ObuType::CodecConfig,
            4 => ObuType::AudioElement,
            5 => ObuType::MixPresentation,
            6 => ObuType::AudioFrame { substream_id: None },
            // 7..=24 are the audio_frame_id0..audio_frame_id17 shorthand
            // forms, each implicitly carrying its substream id.
            t @ 7..=24 => ObuType::AudioFrame { substream_id: Some(t - 7) },
            other => ObuType::Reserved(other),
        }
    }
}

/// One parsed OBU: its type, trim metadata (if any), extension bytes (if
/// any), and a reader scoped to exactly its payload span.
pub struct Obu<'a> {
    pub obu_type: ObuType,
    pub is_redundant: bool,
    pub trim_start: u64,
    pub trim_end: u64,
    pub extension: &'a [u8],
    pub payload: BufReader<'a>,
}

/// Splits a byte span into a sequence of OBUs. Constructed once over the
/// whole span fed to the decoder so far; `next_obu` is called repeatedly
/// until it reports [`Error::NeedMoreData`] (not enough bytes remain to
/// frame another OBU) at which point the caller should feed more bytes and
/// resume from the reader's current position.
pub struct ObuReader<'a> {
    reader: BufReader<'a>,
}

impl<'a> ObuReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ObuReader { reader: BufReader::new(buf) }
    }

    /// Absolute byte offset of the reader's cursor into the original span.
    pub fn pos(&self) -> usize {
        self.reader.pos()
    }

    /// Reads the next OBU, or `Ok(None)` if the span is exhausted exactly
    /// at an OBU boundary (clean end of input, not an error).
    ///
    /// header = 5-bit type | 1-bit redundant | 1-bit trimming | 1-bit
    /// extension; then leb128 payload_size. If trimming: leb128 trim_end,
    /// leb128 trim_start (this wire order, end before start, must be
    /// preserved by any round-trip encoder). If extension: leb128
    /// ext_size, opaque ext_bytes. The payload then spans
    /// `payload_size - consumed(trim + ext)` bytes.
    pub fn next_obu(&mut self) -> Result<Option<Obu<'a>>> {
        if self.reader.is_empty() {
            return Ok(None);
        }

        let header_byte = self.reader.read_byte()?;
        let type_tag = header_byte >> 3;
        let is_redundant = header_byte & 0b0000_0100 != 0;
        let has_trimming = header_byte & 0b0000_0010 != 0;
        let has_extension = header_byte & 0b0000_0001 != 0;

        let payload_size = self
            .reader
            .read_leb128()
            .map_err(|_| Error::Truncated)?;

        let mut remaining = self.reader.split_at(payload_size as usize)?;

        let (trim_end, trim_start) = if has_trimming {
            let trim_end = remaining.read_leb128()?;
            let trim_start = remaining.read_leb128()?;
            (trim_end, trim_start)
        } else {
            (0, 0)
        };

        let extension: &'a [u8] = if has_extension {
            let ext_size = remaining.read_leb128()? as usize;
            let ext_reader = remaining.split_at(ext_size)?;
            ext_reader.remaining_slice()
        } else {
            &[]
        };

        Ok(Some(Obu {
            obu_type: ObuType::from_tag(type_tag),
            is_redundant,
            trim_start,
            trim_end,
            extension,
            payload: remaining,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leb128(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn reads_a_plain_obu_with_no_trim_or_extension() {
        let mut bytes = vec![0b0000_0000]; // type 0 (IaSequenceHeader)
        let payload = vec![1, 2, 3, 4];
        bytes.extend(leb128(payload.len() as u64));
        bytes.extend(&payload);

        let mut r = ObuReader::new(&bytes);
        let obu = r.next_obu().unwrap().unwrap();
        assert_eq!(obu.obu_type, ObuType::IaSequenceHeader);
        assert_eq!(obu.payload.remaining_slice(), &payload[..]);
        assert!(r.next_obu().unwrap().is_none());
    }

    #[test]
    fn reads_trim_fields_in_end_then_start_wire_order() {
        // type = CodecConfig (3), trimming flag set.
        let mut bytes = vec![(3u8 << 3) | 0b0000_0010];
        let mut inner = Vec::new();
        inner.extend(leb128(5)); // trim_end
        inner.extend(leb128(7)); // trim_start
        inner.extend(&[0xAA, 0xBB]); // remaining payload
        bytes.extend(leb128(inner.len() as u64));
        bytes.extend(&inner);

        let mut r = ObuReader::new(&bytes);
        let obu = r.next_obu().unwrap().unwrap();
        assert_eq!(obu.trim_end, 5);
        assert_eq!(obu.trim_start, 7);
        assert_eq!(obu.payload.remaining_slice(), &[0xAA, 0xBB]);
    }

    #[test]
    fn reads_extension_bytes() {
        let mut bytes = vec![(4u8 << 3) | 0b0000_0001]; // AudioElement, extension flag
        let mut inner = Vec::new();
        inner.extend(leb128(3)); // ext_size
        inner.extend(&[0x01, 0x02, 0x03]); // ext bytes
        inner.extend(&[0xFF]); // remaining payload
        bytes.extend(leb128(inner.len() as u64));
        bytes.extend(&inner);

        let mut r = ObuReader::new(&bytes);
        let obu = r.next_obu().unwrap().unwrap();
        assert_eq!(obu.extension, &[0x01, 0x02, 0x03]);
        assert_eq!(obu.payload.remaining_slice(), &[0xFF]);
    }

    #[test]
    fn audio_frame_id0_shorthand_carries_substream_id() {
        let mut bytes = vec![7u8 << 3]; // tag 7 -> audio_frame_id0
        bytes.extend(leb128(0));
        let mut r = ObuReader::new(&bytes);
        let obu = r.next_obu().unwrap().unwrap();
        assert_eq!(obu.obu_type, ObuType::AudioFrame { substream_id: Some(0) });
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut r = ObuReader::new(&[]);
        assert!(r.next_obu().unwrap().is_none());

        let bytes = vec![0u8]; // type byte with no leb128 size to follow
        let mut r = ObuReader::new(&bytes);
        assert!(matches!(r.next_obu(), Err(Error::Truncated)));
    }

    #[test]
    fn s5_scenario_trims_start_samples_and_shrinks_payload() {
        // S5: 17-byte OBU payload, trimming=1, trim_start=240, trim_end=0.
        // leb128(0) is 1 byte, leb128(240) is 2 bytes (240 > 127), so the
        // remaining decodable-audio payload is 17 - 1 - 2 = 14 bytes.
        assert_eq!(leb128(0).len(), 1);
        assert_eq!(leb128(240).len(), 2);

        let mut bytes = vec![(6u8 << 3) | 0b0000_0010]; // AudioFrame, trimming
        let mut inner = Vec::new();
        inner.extend(leb128(0)); // trim_end
        inner.extend(leb128(240)); // trim_start
        inner.extend(std::iter::repeat(0u8).take(14)); // remaining payload
        assert_eq!(inner.len(), 17);
        bytes.extend(leb128(inner.len() as u64));
        bytes.extend(&inner);

        let mut r = ObuReader::new(&bytes);
        let obu = r.next_obu().unwrap().unwrap();
        assert_eq!(obu.trim_start, 240);
        assert_eq!(obu.payload.remaining_slice().len(), 14);
    }
}
