// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The demixing mode → mix-factors table (§4.3, §4.6) and the `w`-index
//! table (§4.6a). Demixing mode values 0,1,2,4,5,6 each select a row of
//! `(alpha, beta, gamma, delta, w_idx_offset)`; 3 and 7 are reserved and
//! rejected at the segment-parsing layer ([`crate::parameter::segment`]).
//!
//! The per-mode rows below, including the `{1.0, 0.866, 0.707}` constants
//! and the `w_idx_offset` signs, are copied verbatim from `mix_factors_mat`
//! in the reference and are not renormalized or re-derived.

/// One demixing mode's static coefficients, used by [`super::demixer::Demixer`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MixFactors {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    /// Signed step applied to the running `w`-index on every frame this
    /// mode is active (§4.6a).
    pub w_idx_offset: i8,
}

/// Looks up the mix-factors row for a (validated, non-reserved) demixing
/// mode. Reproduces `mix_factors_mat` verbatim. Panics on 3/7/>7 — callers
/// must reject those at parse time first
/// ([`crate::parameter::segment::DemixingSegment::parse`]).
pub fn mix_factors_for_mode(mode: u8) -> MixFactors {
    match mode {
        0 => MixFactors { alpha: 1.0, beta: 1.0, gamma: 0.707, delta: 0.707, w_idx_offset: -1 },
        1 => MixFactors { alpha: 0.707, beta: 0.707, gamma: 0.707, delta: 0.707, w_idx_offset: -1 },
        2 => MixFactors { alpha: 1.0, beta: 0.866, gamma: 0.866, delta: 0.866, w_idx_offset: -1 },
        4 => MixFactors { alpha: 1.0, beta: 1.0, gamma: 0.707, delta: 0.707, w_idx_offset: 1 },
        5 => MixFactors { alpha: 0.707, beta: 0.707, gamma: 0.707, delta: 0.707, w_idx_offset: 1 },
        6 => MixFactors { alpha: 1.0, beta: 0.866, gamma: 0.866, delta: 0.866, w_idx_offset: 1 },
        other => panic!("demixing mode {other} is reserved; reject at parse time"),
    }
}

/// Number of entries in the `w`-index ladder, `w_idx ∈ [0, W_IDX_MAX]`.
pub const W_IDX_MAX: i32 = 10;

/// Maps a `w`-index to its linear weight: a monotonic ladder from 0.0 to
/// 1.0 in steps of `1/W_IDX_MAX` (§4.6a — this concrete table is this
/// port's resolution of an otherwise-external lookup in the reference).
pub fn w_for_idx(idx: i32) -> f64 {
    f64::from(idx.clamp(0, W_IDX_MAX)) / f64::from(W_IDX_MAX)
}

/// Steps the running `w`-index by `offset`, clamping to `[0, W_IDX_MAX]`.
pub fn calc_w_idx(idx: i32, offset: i8) -> i32 {
    (idx + i32::from(offset)).clamp(0, W_IDX_MAX)
}
