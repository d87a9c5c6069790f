// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parameter definitions and time-varying parameter values.
//!
//! A [`ParameterBase`] is declared inline inside the `AudioElement` or
//! `MixPresentation` descriptor that owns it (IAMF has no standalone
//! parameter-definition OBU). It fixes the parameter's id, sample rate, and
//! whether its timeline is carved up by the descriptor itself
//! (`obu-defined`) or by the `ParameterBlock`s that arrive later
//! (`stream-defined`). [`ParameterEngine`] accumulates `ParameterBlock`s
//! against a `ParameterBase` and answers `value_at(sample)` queries.

pub mod engine;
pub mod segment;

pub use engine::{ParameterBlock, ParameterEngine};
pub use segment::{
    DemixingSegment, MixGainAnimation, MixGainSegment, ParameterType, ReconGainSegment, Segment,
};

use iamf_core::errors::Result;
use iamf_core::io::ReadBytes;

/// How a parameter's segment durations are determined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterMode {
    /// The descriptor itself fixes `duration`, `n_segments`, and (unless
    /// every segment shares `const_subblock_duration`) each segment's
    /// individual length. `ParameterBlock`s for this parameter must not
    /// repeat this framing.
    ObuDefined {
        duration: u64,
        n_segments: u64,
        const_subblock_duration: u64,
        subblock_durations: Vec<u64>,
    },
    /// Each `ParameterBlock` carries its own framing.
    StreamDefined,
}

/// A parameter declaration, inlined inside the descriptor that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterBase {
    pub parameter_id: u64,
    pub parameter_rate: u64,
    pub ty: ParameterType,
    pub mode: ParameterMode,
    /// `DefaultDemixingInfoParameterData.default_w` (`DemixingMode` only):
    /// the `w`-index a fresh [`crate::render::demixer::Demixer`] for this
    /// parameter's audio element should start from, before any
    /// `ParameterBlock` has stepped it. `None` for every other parameter
    /// type.
    pub default_w: Option<u8>,
}

impl ParameterBase {
    pub fn parse<R: ReadBytes>(r: &mut R, ty: ParameterType) -> Result<ParameterBase> {
        let parameter_id = r.read_leb128()?;
        let parameter_rate = r.read_leb128()?;
        let obu_defined = r.read_u8()? != 0;

        let mode = if obu_defined {
            let duration = r.read_leb128()?;
            let n_segments = r.read_leb128()?;
            let const_subblock_duration = r.read_leb128()?;
            let subblock_durations = if const_subblock_duration == 0 {
                let mut v = Vec::with_capacity(n_segments as usize);
                for _ in 0..n_segments {
                    v.push(r.read_leb128()?);
                }
                v
            } else {
                Vec::new()
            };
            ParameterMode::ObuDefined {
                duration,
                n_segments,
                const_subblock_duration,
                subblock_durations,
            }
        } else {
            ParameterMode::StreamDefined
        };

        // `default_demixing_info_parameter_data`: `dmixp_mode` (3 bits) +
        // reserved, then `default_w` (top 4 bits of the second byte) +
        // reserved. Only `DemixingMode` parameters carry this extension.
        let default_w = if ty == ParameterType::DemixingMode {
            let _dmixp_mode_byte = r.read_u8()?;
            let w_byte = r.read_u8()?;
            Some(w_byte >> 4)
        } else {
            None
        };

        Ok(ParameterBase { parameter_id, parameter_rate, ty, mode, default_w })
    }

    /// Segment interval lengths declared by an `ObuDefined` mode, expanding
    /// the constant-duration shorthand. Empty for `StreamDefined` (the
    /// blocks themselves carry interval lengths).
    pub fn obu_defined_intervals(&self) -> Vec<u64> {
        match &self.mode {
            ParameterMode::StreamDefined => Vec::new(),
            ParameterMode::ObuDefined { n_segments, const_subblock_duration, subblock_durations, .. } => {
                if *const_subblock_duration != 0 {
                    vec![*const_subblock_duration; *n_segments as usize]
                } else {
                    subblock_durations.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamf_core::io::BufReader;

    #[test]
    fn parses_stream_defined_base() {
        let bytes = [0u8, 48, 0]; // id=0, rate=48, obu_defined=false
        let mut r = BufReader::new(&bytes);
        let base = ParameterBase::parse(&mut r, ParameterType::MixGain).unwrap();
        assert_eq!(base.mode, ParameterMode::StreamDefined);
        assert!(base.obu_defined_intervals().is_empty());
    }

    #[test]
    fn parses_obu_defined_base_with_constant_subblock_duration() {
        // id=1, rate=48, obu_defined=true, duration=20, n_segments=2, const=10,
        // default_demixing_info_parameter_data=[dmixp_mode byte, default_w byte]
        let bytes = [1u8, 48, 1, 20, 2, 10, 0, 0];
        let mut r = BufReader::new(&bytes);
        let base = ParameterBase::parse(&mut r, ParameterType::DemixingMode).unwrap();
        assert_eq!(base.obu_defined_intervals(), vec![10, 10]);
    }

    #[test]
    fn only_demixing_mode_parameters_carry_a_default_w() {
        let bytes = [0u8, 48, 0];
        let mut r = BufReader::new(&bytes);
        let base = ParameterBase::parse(&mut r, ParameterType::MixGain).unwrap();
        assert_eq!(base.default_w, None);
    }

    #[test]
    fn parses_default_w_from_the_top_nibble() {
        // id=2, rate=48, obu_defined=false, dmixp_mode byte=0, default_w byte=(7 << 4)
        let bytes = [2u8, 48, 0, 0, 0b0111_0000];
        let mut r = BufReader::new(&bytes);
        let base = ParameterBase::parse(&mut r, ParameterType::DemixingMode).unwrap();
        assert_eq!(base.default_w, Some(7));
    }
}
