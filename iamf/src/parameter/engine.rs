// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, VecDeque};

use iamf_core::errors::{Error, Result};
use iamf_core::io::ReadBytes;

use super::segment::{MixGainAnimation, ParameterType, ReconGainSegment, Segment};
use super::{ParameterBase, ParameterMode};

/// One arrival of segments for a parameter id. `segments` is in the wire
/// order the block declared; the engine appends them onto the parameter's
/// timeline at its current write cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterBlock {
    pub parameter_id: u64,
    pub segments: Vec<Segment>,
}

impl ParameterBlock {
    /// Parses a `ParameterBlock` OBU payload against the `base` it was
    /// declared under. `StreamDefined` parameters carry their own framing
    /// inline (duration / n_segments / const_subblock_duration, mirroring
    /// the shape `ParameterBase::parse` reads); `ObuDefined` parameters
    /// reuse the interval list fixed at declaration time.
    pub fn parse<R: ReadBytes>(r: &mut R, base: &ParameterBase) -> Result<ParameterBlock> {
        let parameter_id = r.read_leb128()?;

        let intervals: Vec<u64> = match &base.mode {
            ParameterMode::ObuDefined { .. } => base.obu_defined_intervals(),
            ParameterMode::StreamDefined => {
                let _duration = r.read_leb128()?;
                let n_segments = r.read_leb128()?;
                let const_subblock_duration = r.read_leb128()?;
                if const_subblock_duration != 0 {
                    vec![const_subblock_duration; n_segments as usize]
                } else {
                    let mut v = Vec::with_capacity(n_segments as usize);
                    for _ in 0..n_segments {
                        v.push(r.read_leb128()?);
                    }
                    v
                }
            }
        };

        let mut segments = Vec::with_capacity(intervals.len());
        for interval in intervals {
            segments.push(Segment::parse(r, base.ty, interval)?);
        }

        Ok(ParameterBlock { parameter_id, segments })
    }
}

struct Track {
    ty: ParameterType,
    /// `(start_sample, end_sample, segment)`, in ascending time order.
    segments: VecDeque<(u64, u64, Segment)>,
    write_cursor: u64,
}

/// Holds one timeline per parameter id and answers `value_at` queries by
/// interpolating within the segment that covers the requested sample.
pub struct ParameterEngine {
    tracks: HashMap<u64, Track>,
}

impl ParameterEngine {
    pub fn new() -> Self {
        ParameterEngine { tracks: HashMap::new() }
    }

    pub fn append_block(&mut self, block: ParameterBlock, ty: ParameterType) {
        let track = self.tracks.entry(block.parameter_id).or_insert_with(|| Track {
            ty,
            segments: VecDeque::new(),
            write_cursor: 0,
        });
        for seg in block.segments {
            let start = track.write_cursor;
            let end = start + seg.interval();
            track.write_cursor = end;
            track.segments.push_back((start, end, seg));
        }
    }

    /// Drops segments whose end predates `emitted_sample`, the most
    /// recently produced output sample. Keeps at least the latest segment
    /// so `value_at` can still serve a "hold last value" query.
    pub fn gc(&mut self, emitted_sample: u64) {
        for track in self.tracks.values_mut() {
            while track.segments.len() > 1 && track.segments[0].1 < emitted_sample {
                track.segments.pop_front();
            }
        }
    }

    fn find(&self, id: u64, sample: u64) -> Result<(&Track, &(u64, u64, Segment))> {
        let track = self.tracks.get(&id).ok_or(Error::NoParameter)?;
        let hit = track
            .segments
            .iter()
            .find(|(start, end, _)| sample >= *start && sample < *end)
            .or_else(|| track.segments.back());
        match hit {
            Some(entry) => Ok((track, entry)),
            None => Err(Error::NoParameter),
        }
    }

    /// Linear amplitude (not dB) for the `MixGain` parameter `id` at
    /// `sample`. Interpolation happens in Q7.8 dB space, then the result is
    /// converted with `10^(db/20)`.
    pub fn mix_gain_at(&self, id: u64, sample: u64) -> Result<f64> {
        let (_, (start, end, seg)) = self.find(id, sample)?;
        let db_q7_8 = match seg {
            Segment::MixGain(mg) => mix_gain_db_at(mg.anim, *start, *end, sample),
            _ => return Err(Error::InvalidState("parameter id is not a mix-gain parameter")),
        };
        Ok(iamf_core::units::q7_8_to_linear(db_q7_8))
    }

    pub fn demixing_mode_at(&self, id: u64, sample: u64) -> Result<u8> {
        let (_, (_, _, seg)) = self.find(id, sample)?;
        match seg {
            Segment::Demixing(d) => Ok(d.mode),
            _ => Err(Error::InvalidState("parameter id is not a demixing parameter")),
        }
    }

    pub fn recon_gain_scalar_at(&self, id: u64, sample: u64, bit: u32) -> Result<f64> {
        let (_, (_, _, seg)) = self.find(id, sample)?;
        match seg {
            Segment::ReconGain(rg) => Ok(rg.scalar_for_bit(bit)),
            _ => Err(Error::InvalidState("parameter id is not a recon-gain parameter")),
        }
    }

    /// The whole recon-gain segment covering `sample`, for callers (the
    /// demixer's per-transition methods) that need every flagged channel's
    /// scalar at once rather than one bit at a time.
    pub fn recon_gain_segment_at(&self, id: u64, sample: u64) -> Result<&ReconGainSegment> {
        let (_, (_, _, seg)) = self.find(id, sample)?;
        match seg {
            Segment::ReconGain(rg) => Ok(rg),
            _ => Err(Error::InvalidState("parameter id is not a recon-gain parameter")),
        }
    }
}

impl Default for ParameterEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the Q7.8 dB value of a mix-gain animation at `sample`, which
/// must lie in `[start, end)`.
fn mix_gain_db_at(anim: MixGainAnimation, start: u64, end: u64, sample: u64) -> i16 {
    match anim {
        MixGainAnimation::Step { g } => g,
        MixGainAnimation::Linear { g0, g1 } => {
            let tau = normalized_position(start, end, sample);
            lerp(f64::from(g0), f64::from(g1), tau).round() as i16
        }
        MixGainAnimation::Bezier { g0, g1, ctrl, t_ctrl_q0_8 } => {
            let tau = normalized_position(start, end, sample);
            let t_ctrl = f64::from(t_ctrl_q0_8) / 255.0;
            let alpha = solve_bezier_parameter(t_ctrl, tau);
            let one_minus = 1.0 - alpha;
            let g = one_minus * one_minus * f64::from(g0)
                + 2.0 * one_minus * alpha * f64::from(ctrl)
                + alpha * alpha * f64::from(g1);
            g.round() as i16
        }
    }
}

fn normalized_position(start: u64, end: u64, sample: u64) -> f64 {
    let span = (end - start).max(1) as f64;
    ((sample - start) as f64 / span).clamp(0.0, 1.0)
}

/// Solves `x(alpha) = tau` for the quadratic Bezier `x(alpha) = (1-alpha)^2
/// * 0 + 2(1-alpha) * alpha * t_ctrl + alpha^2 * 1`, i.e. `(1 - 2 *
/// t_ctrl) * alpha^2 + 2 * t_ctrl * alpha - tau = 0`, and returns the root
/// in `[0, 1]`.
fn solve_bezier_parameter(t_ctrl: f64, tau: f64) -> f64 {
    let a = 1.0 - 2.0 * t_ctrl;
    if a.abs() < 1e-12 {
        // t_ctrl == 0.5: x(alpha) reduces to alpha itself.
        return tau.clamp(0.0, 1.0);
    }
    let b = 2.0 * t_ctrl;
    let c = -tau;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return tau.clamp(0.0, 1.0);
    }
    let sqrt_d = discriminant.sqrt();
    let r1 = (-b + sqrt_d) / (2.0 * a);
    let r2 = (-b - sqrt_d) / (2.0 * a);
    for root in [r1, r2] {
        if (0.0..=1.0).contains(&root) {
            return root;
        }
    }
    tau.clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::segment::{DemixingSegment, MixGainSegment, ReconGainSegment};

    fn seg(interval: u64, g0: i16, g1: i16) -> Segment {
        Segment::MixGain(MixGainSegment { interval, anim: MixGainAnimation::Linear { g0, g1 } })
    }

    /// Spec scenario S3: three linear segments of 480 samples each.
    #[test]
    fn s3_scenario_linear_mix_gain_timeline() {
        let mut engine = ParameterEngine::new();
        let block = ParameterBlock {
            parameter_id: 1,
            segments: vec![
                seg(480, 0, 0x0600),
                seg(480, 0x0600, 0x0600),
                seg(480, 0x0600, 0),
            ],
        };
        engine.append_block(block, ParameterType::MixGain);

        assert!((engine.mix_gain_at(1, 0).unwrap() - 1.0).abs() < 1e-6);
        assert!((engine.mix_gain_at(1, 480).unwrap() - 1.995262).abs() < 1e-3);
        assert!((engine.mix_gain_at(1, 720).unwrap() - 1.995262).abs() < 1e-3);
        // sample 1440 is the first instant of a segment that does not
        // exist; `find` holds the last known segment, which ends at g1=0.
        assert!((engine.mix_gain_at(1, 1439).unwrap() - 1.0).abs() < 1e-2);
    }

    #[test]
    fn step_segment_is_idempotent_at_zero_db() {
        let mut engine = ParameterEngine::new();
        let block = ParameterBlock {
            parameter_id: 2,
            segments: vec![Segment::MixGain(MixGainSegment {
                interval: 100,
                anim: MixGainAnimation::Step { g: 0 },
            })],
        };
        engine.append_block(block, ParameterType::MixGain);
        assert!((engine.mix_gain_at(2, 50).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn demixing_mode_lookup() {
        let mut engine = ParameterEngine::new();
        let block = ParameterBlock {
            parameter_id: 3,
            segments: vec![Segment::Demixing(DemixingSegment { interval: 10, mode: 1 })],
        };
        engine.append_block(block, ParameterType::DemixingMode);
        assert_eq!(engine.demixing_mode_at(3, 5).unwrap(), 1);
    }

    #[test]
    fn missing_parameter_id_is_no_parameter() {
        let engine = ParameterEngine::new();
        assert!(matches!(engine.mix_gain_at(99, 0), Err(Error::NoParameter)));
    }

    #[test]
    fn gc_keeps_at_least_the_latest_segment() {
        let mut engine = ParameterEngine::new();
        let block = ParameterBlock {
            parameter_id: 4,
            segments: vec![seg(10, 0, 0), seg(10, 0, 0)],
        };
        engine.append_block(block, ParameterType::MixGain);
        engine.gc(1000);
        assert!(engine.mix_gain_at(4, 1000).is_ok());
    }

    #[test]
    fn bezier_with_centred_control_point_reduces_to_linear() {
        let alpha = solve_bezier_parameter(0.5, 0.25);
        assert!((alpha - 0.25).abs() < 1e-9);
    }
}
