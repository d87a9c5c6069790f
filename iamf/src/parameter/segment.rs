// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

/// The kind of parameter a [`super::ParameterBase`]/[`ParameterBlock`]
/// carries — selects which `Segment` variant its blocks use.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    MixGain,
    DemixingMode,
    ReconGain,
}

/// A mix-gain animation shape. Gains are Q7.8 dB, converted to linear
/// amplitude by the parameter engine, not by the segment itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MixGainAnimation {
    Step { g: i16 },
    Linear { g0: i16, g1: i16 },
    /// `t_ctrl` is a Q0.8 fixed-point fraction in `[0, 1]` selecting where
    /// along the segment the control point's influence is centred.
    Bezier { g0: i16, g1: i16, ctrl: i16, t_ctrl_q0_8: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MixGainSegment {
    pub interval: u64,
    pub anim: MixGainAnimation,
}

impl MixGainSegment {
    pub fn parse<R: ReadBytes>(r: &mut R, interval: u64) -> Result<MixGainSegment> {
        let kind = r.read_u8()?;
        let anim = match kind {
            0 => MixGainAnimation::Step { g: r.read_be_i16()? },
            1 => {
                let g0 = r.read_be_i16()?;
                let g1 = r.read_be_i16()?;
                MixGainAnimation::Linear { g0, g1 }
            }
            2 => {
                let g0 = r.read_be_i16()?;
                let g1 = r.read_be_i16()?;
                let ctrl = r.read_be_i16()?;
                let t_ctrl_q0_8 = r.read_u8()?;
                MixGainAnimation::Bezier { g0, g1, ctrl, t_ctrl_q0_8 }
            }
            _ => return Err(Error::InvalidValue("mix_gain_segment.animation_type")),
        };
        Ok(MixGainSegment { interval, anim })
    }
}

/// Demixing modes 0,1,2,4,5,6 are valid weights into the mix-factors table;
/// 3 and 7 are reserved/invalid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DemixingSegment {
    pub interval: u64,
    pub mode: u8,
}

impl DemixingSegment {
    pub fn parse<R: ReadBytes>(r: &mut R, interval: u64) -> Result<DemixingSegment> {
        let mode = r.read_u8()?;
        if mode == 3 || mode == 7 || mode > 7 {
            return Err(Error::InvalidValue("demixing_segment.mode"));
        }
        Ok(DemixingSegment { interval, mode })
    }
}

/// `bitmap` flags which of the layer's output channels carry a recon-gain
/// scalar; `scalars` holds one Q0.8 value (in `[0, 1]`) per set bit, in
/// ascending bit-index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconGainSegment {
    pub interval: u64,
    pub bitmap: u32,
    pub scalars: Vec<u8>,
}

impl ReconGainSegment {
    pub fn parse<R: ReadBytes>(r: &mut R, interval: u64) -> Result<ReconGainSegment> {
        let bitmap = r.read_be_u32()?;
        let n = bitmap.count_ones() as usize;
        let mut scalars = Vec::with_capacity(n);
        for _ in 0..n {
            scalars.push(r.read_u8()?);
        }
        Ok(ReconGainSegment { interval, bitmap, scalars })
    }

    /// Linear scalar (`[0, 1]`) for the given bit index, or `1.0` (no
    /// compensation) if that channel is not flagged in this segment.
    pub fn scalar_for_bit(&self, bit: u32) -> f64 {
        if self.bitmap & (1 << bit) == 0 {
            return 1.0;
        }
        let rank = (self.bitmap & ((1 << bit) - 1)).count_ones() as usize;
        f64::from(self.scalars[rank]) / 255.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    MixGain(MixGainSegment),
    Demixing(DemixingSegment),
    ReconGain(ReconGainSegment),
}

impl Segment {
    pub fn interval(&self) -> u64 {
        match self {
            Segment::MixGain(s) => s.interval,
            Segment::Demixing(s) => s.interval,
            Segment::ReconGain(s) => s.interval,
        }
    }

    pub fn parse<R: ReadBytes>(r: &mut R, ty: ParameterType, interval: u64) -> Result<Segment> {
        Ok(match ty {
            ParameterType::MixGain => Segment::MixGain(MixGainSegment::parse(r, interval)?),
            ParameterType::DemixingMode => Segment::Demixing(DemixingSegment::parse(r, interval)?),
            ParameterType::ReconGain => Segment::ReconGain(ReconGainSegment::parse(r, interval)?),
        })
    }
}
