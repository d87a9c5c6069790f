// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample quantisation kernels: float → fixed-width PCM, dither-free,
//! saturating, round-half-to-even. These are the reference (scalar) form
//! the output stage's interleave pass calls; a SIMD specialisation would
//! sit beside `quantise_i16`/`quantise_i24`/`quantise_i32`, not wrap them.

/// Rounds `x` to the nearest integer, ties to even (banker's rounding),
/// matching IEEE 754 `roundTiesToEven` rather than `f32::round`'s
/// round-half-away-from-zero.
#[inline]
fn round_ties_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Quantises a float sample in `[-1.0, 1.0)` to a signed 16-bit integer.
/// `round(clamp(x * 2^15, -2^15, 2^15 - 1))`.
#[inline]
pub fn quantise_i16(x: f32) -> i16 {
    let scaled = round_ties_even(f64::from(x) * 32768.0);
    scaled.clamp(-32768.0, 32767.0) as i16
}

/// Quantises a float sample to a signed 24-bit integer, returned sign
/// extended into an `i32`. `round(clamp(x * 2^23, -2^23, 2^23 - 1))`.
#[inline]
pub fn quantise_i24(x: f32) -> i32 {
    let scaled = round_ties_even(f64::from(x) * 8_388_608.0);
    scaled.clamp(-8_388_608.0, 8_388_607.0) as i32
}

/// Serialises a 24-bit sample (already in `[-2^23, 2^23-1]`) as 3
/// little-endian bytes.
#[inline]
pub fn i24_to_le_bytes(sample: i32) -> [u8; 3] {
    let bytes = sample.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
}

/// Quantises a float sample to a signed 32-bit integer using the
/// reference's inverted-sign convention: `round(x * -2^31)`, saturating at
/// `±(2^31 - 1)`.
///
/// Whether the sign inversion is an intentional phase flip or a latent bug
/// in the reference implementation is an open question this port does not
/// resolve (see DESIGN.md); the byte-for-byte behavior is preserved and
/// pinned down by a conformance test.
#[inline]
pub fn quantise_i32(x: f32) -> i32 {
    let scaled = round_ties_even(f64::from(x) * -2_147_483_648.0);
    scaled.clamp(-2_147_483_648.0, 2_147_483_647.0) as i32
}

/// Converts an `i16` sample back to the `[-1.0, 1.0)` float domain, the
/// inverse used by the PCM codec adapter and by round-trip tests.
#[inline]
pub fn float_from_i16(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts a sign-extended 24-bit sample (as produced by
/// [`i24_to_le_bytes`]'s inverse) back to the float domain.
#[inline]
pub fn float_from_i24(sample: i32) -> f32 {
    sample as f32 / 8_388_608.0
}

/// Converts a raw `i32` PCM sample back to the float domain, inverting
/// [`quantise_i32`]'s sign convention so a decode-then-encode round trip is
/// the identity rather than a phase flip.
#[inline]
pub fn float_from_i32(sample: i32) -> f32 {
    sample as f32 / -2_147_483_648.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantise_i16_round_trips_exactly_away_from_saturation() {
        for x in -32768i32..32767 {
            let f = float_from_i16(x as i16);
            assert_eq!(quantise_i16(f), x as i16, "x={}", x);
        }
    }

    #[test]
    fn quantise_i16_saturates_at_full_scale() {
        assert_eq!(quantise_i16(1.0), 32767);
        assert_eq!(quantise_i16(-1.0), -32768);
        assert_eq!(quantise_i16(2.0), 32767);
        assert_eq!(quantise_i16(-2.0), -32768);
    }

    #[test]
    fn quantise_i16_ties_round_to_even() {
        // 0.5 / 32768 lands exactly on a .5 boundary after scaling for
        // certain values; verify the banker's-rounding helper directly.
        assert_eq!(round_ties_even(0.5), 0.0);
        assert_eq!(round_ties_even(1.5), 2.0);
        assert_eq!(round_ties_even(2.5), 2.0);
        assert_eq!(round_ties_even(-0.5), 0.0);
        assert_eq!(round_ties_even(-1.5), -2.0);
    }

    #[test]
    fn quantise_i24_saturates_and_packs_le() {
        let q = quantise_i24(1.0);
        assert_eq!(q, 8_388_607);
        assert_eq!(i24_to_le_bytes(q), [0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn float_from_i24_inverts_quantise_i24_away_from_saturation() {
        let f = 0.25f32;
        let q = quantise_i24(f);
        assert!((float_from_i24(q) - f).abs() < 1e-6);
    }

    #[test]
    fn float_from_i32_inverts_quantise_i32_sign_flip() {
        assert!((float_from_i32(-2_147_483_648) - 1.0).abs() < 1e-6);
        assert!((float_from_i32(0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn quantise_i32_uses_inverted_sign_convention() {
        // Positive full scale maps to the most-negative i32, per the
        // reference's `-2^31` multiplier.
        assert_eq!(quantise_i32(1.0), -2_147_483_648);
        assert_eq!(quantise_i32(-1.0), 2_147_483_647);
        assert_eq!(quantise_i32(0.0), 0);
    }
}
