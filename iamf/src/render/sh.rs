// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Real spherical-harmonics basis for H2M ambisonics decode (§4.7). An
//! `AudioElementConf::Ambisonics` source carries `(order + 1)^2` ACN-indexed
//! channels in SN3D normalization; decoding to a loudspeaker layout is a
//! single static matrix whose row `o`, column `acn` entry is the basis
//! function for channel `acn` evaluated at output speaker `o`'s direction.

/// Decomposes an ACN (Ambisonic Channel Number) index into its spherical
/// harmonic degree `l` and order `m` (`-l <= m <= l`), per the standard
/// `acn = l^2 + l + m` relation.
pub fn acn_to_lm(acn: usize) -> (i32, i32) {
    let l = (acn as f64).sqrt().floor() as i32;
    let m = acn as i32 - l * l - l;
    (l, m)
}

/// SN3D-normalized real spherical harmonic `Y_l^m` evaluated at azimuth
/// `phi` (radians, 0 = front, positive = left, matching
/// [`crate::layout::position_angle`]) and elevation `theta` (radians,
/// positive = up).
///
/// Orders 0 and 1 use their closed forms directly (ACN 0..=3: W, Y, Z, X);
/// order >= 2 falls back to the general associated-Legendre expansion,
/// which reduces to the same closed forms at l <= 1.
pub fn real_sh(l: i32, m: i32, phi: f64, theta: f64) -> f64 {
    if l == 0 {
        return 1.0;
    }
    if l == 1 {
        return match m {
            -1 => phi.sin() * theta.cos(), // Y (left)
            0 => theta.sin(),              // Z (up)
            1 => phi.cos() * theta.cos(),  // X (front)
            _ => unreachable!("|m| <= l"),
        };
    }
    let am = m.unsigned_abs() as usize;
    let x = theta.sin(); // sin(elevation) plays the role of cos(polar angle)
    let p = associated_legendre(l as usize, am, x);
    let norm = sn3d_normalization(l as usize, am);
    let azimuthal = if m >= 0 { (am as f64 * phi).cos() } else { (am as f64 * phi).sin() };
    norm * p * azimuthal
}

/// Unnormalized associated Legendre polynomial `P_l^m(x)` via the standard
/// three-term recurrence, used only for `l >= 2` (first-order and below
/// use the closed forms in [`real_sh`]).
fn associated_legendre(l: usize, m: usize, x: f64) -> f64 {
    let mut pmm = 1.0f64;
    if m > 0 {
        let somx2 = ((1.0 - x * x).max(0.0)).sqrt();
        let mut fact = 1.0;
        for _ in 0..m {
            pmm *= -fact * somx2;
            fact += 2.0;
        }
    }
    if l == m {
        return pmm;
    }
    let mut pmmp1 = x * (2.0 * m as f64 + 1.0) * pmm;
    if l == m + 1 {
        return pmmp1;
    }
    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = ((2.0 * ll as f64 - 1.0) * x * pmmp1 - (ll as f64 + m as f64 - 1.0) * pmm) / (ll as f64 - m as f64);
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|v| v as f64).product::<f64>().max(1.0)
}

/// SN3D normalization constant for degree `l`, order `|m|`.
fn sn3d_normalization(l: usize, m: usize) -> f64 {
    let delta = if m == 0 { 1.0 } else { 0.0 };
    (((2.0 - delta) * factorial(l - m)) / factorial(l + m)).sqrt()
}

/// Builds the `num_directions x (order+1)^2` decode matrix for an
/// ambisonics source of the given `order`, rendering to loudspeakers at
/// `directions` (azimuth, elevation radians, as returned by
/// [`crate::layout::position_angle`]).
pub fn decode_matrix(order: u32, directions: &[(f64, f64)]) -> super::matrix::Matrix {
    let num_channels = ((order + 1) * (order + 1)) as usize;
    let mut matrix = super::matrix::Matrix::zeros(directions.len(), num_channels);
    for (row, &(phi, theta)) in directions.iter().enumerate() {
        for acn in 0..num_channels {
            let (l, m) = acn_to_lm(acn);
            matrix.set(row, acn, real_sh(l, m, phi, theta));
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acn_indices_decompose_correctly() {
        assert_eq!(acn_to_lm(0), (0, 0));
        assert_eq!(acn_to_lm(1), (1, -1));
        assert_eq!(acn_to_lm(2), (1, 0));
        assert_eq!(acn_to_lm(3), (1, 1));
        assert_eq!(acn_to_lm(4), (2, -2));
        assert_eq!(acn_to_lm(8), (2, 2));
    }

    #[test]
    fn order_zero_is_a_constant_omnidirectional_gain() {
        assert_eq!(real_sh(0, 0, 0.0, 0.0), 1.0);
        assert_eq!(real_sh(0, 0, 1.2, -0.4), 1.0);
    }

    #[test]
    fn front_direction_has_unit_x_channel() {
        // phi=0, theta=0 is straight ahead: the X channel (ACN 3) should
        // read its maximum of 1.0, Y and Z near zero.
        assert!((real_sh(1, 1, 0.0, 0.0) - 1.0).abs() < 1e-9);
        assert!(real_sh(1, -1, 0.0, 0.0).abs() < 1e-9);
        assert!(real_sh(1, 0, 0.0, 0.0).abs() < 1e-9);
    }

    #[test]
    fn second_order_matches_first_order_closed_form_limit_at_low_degree() {
        // Sanity check that the general recurrence path used for l>=2
        // doesn't NaN or blow up near the poles.
        let v = real_sh(2, 0, 0.3, std::f64::consts::FRAC_PI_2 - 1e-6);
        assert!(v.is_finite());
    }

    #[test]
    fn decode_matrix_has_expected_shape() {
        let directions = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        let m = decode_matrix(1, &directions);
        assert_eq!(m.num_outputs, 4);
        assert_eq!(m.num_inputs, 4);
    }
}
