// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Q7.8 fixed-point helpers. Mix-gain, output-gain and loudness metadata
//! are all carried on the wire as signed Q7.8 values (8 fractional bits of
//! a decibel quantity); this module is the single place that converts
//! between the wire encoding and the `f64` domain the parameter engine and
//! renderer operate in.

/// Decodes a raw Q7.8 wire value (a signed 16-bit integer where the low 8
/// bits are the fraction) into its decibel value.
#[inline]
pub fn q7_8_to_db(raw: i16) -> f64 {
    f64::from(raw) / 256.0
}

/// Encodes a decibel value into its raw Q7.8 wire representation,
/// truncating toward zero as the reference encoder does.
#[inline]
pub fn db_to_q7_8(db: f64) -> i16 {
    (db * 256.0) as i16
}

/// Converts a decibel value to a linear amplitude scalar: `10^(db/20)`.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Converts a raw Q7.8 wire value directly to a linear amplitude scalar.
#[inline]
pub fn q7_8_to_linear(raw: i16) -> f64 {
    db_to_linear(q7_8_to_db(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_db_is_unity_gain() {
        assert_eq!(q7_8_to_linear(0), 1.0);
    }

    #[test]
    fn minus_six_db_is_about_half_gain() {
        // -6 dB Q7.8 = -0x0600 = -1536
        let linear = q7_8_to_linear(-1536);
        assert!((linear - 0.501_187).abs() < 1e-5, "linear={linear}");
    }

    #[test]
    fn six_db_doubles_amplitude_to_within_rounding() {
        let linear = q7_8_to_linear(0x0600);
        assert!((linear - 1.995_262).abs() < 1e-4, "linear={linear}");
    }
}
