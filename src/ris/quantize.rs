//
// Copyright (c) 2020-2022 science+computing ag and other contributors
//
// This program and the accompanying materials are made
// available under the terms of the Eclipse Public License 2.0
// which is available at https://www.eclipse.org/legal/epl-2.0/
//
// SPDX-License-Identifier: EPL-2.0
//

use ndarray::Array2;

/// The wrap-boundary bin convention this crate resolves (SPEC_FULL.md §4.4 op 2,
/// §9 Open Question 1): `pi` shares a bin with values just below it.
pub const QUANTIZATION_BIN_CONVENTION: &str = "pi_shares_bin_with_values_below";

/// `quantize(PhaseMap, bits) -> PhaseMap` (SPEC_FULL.md §4.4 op 2).
///
/// `bits == 0` is the identity (continuous phase). Otherwise `2^bits` uniform
/// bins over `[-pi, pi)`, each phase mapped to its bin center; the lowest bin
/// center is `-pi + pi/2^bits`.
pub fn quantize(phase: &Array2<f64>, bits: u8) -> Array2<f64> {
    if bits == 0 {
        return phase.clone();
    }

    let levels = 1u32 << bits;
    let two_pi = 2.0 * std::f64::consts::PI;
    let bin_width = two_pi / levels as f64;

    phase.mapv(|phi| {
        // wrap into [-pi, pi) first so pi and values just below it land in
        // the same bin (the Open Question resolution, see QUANTIZATION_BIN_CONVENTION).
        let wrapped = phi - two_pi * ((phi + std::f64::consts::PI) / two_pi).floor();
        let wrapped = if wrapped >= std::f64::consts::PI {
            wrapped - two_pi
        } else {
            wrapped
        };

        let mut bin = (((wrapped + std::f64::consts::PI) / bin_width).floor()) as i64;
        bin = bin.rem_euclid(levels as i64);

        -std::f64::consts::PI + (bin as f64 + 0.5) * bin_width
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bits_is_identity() {
        let phase = Array2::from_shape_vec((1, 3), vec![0.1, -1.5, 3.0]).unwrap();
        let quantized = quantize(&phase, 0);
        assert_eq!(phase, quantized);
    }

    #[test]
    fn quantize_is_idempotent() {
        let phase = Array2::from_shape_vec(
            (1, 6),
            vec![-3.1, -1.0, 0.0, 0.5, 1.5, 3.1],
        )
        .unwrap();
        let once = quantize(&phase, 2);
        let twice = quantize(&once, 2);
        assert_eq!(once, twice);
    }

    #[test]
    fn one_bit_yields_two_levels() {
        let phase = Array2::from_shape_vec((1, 4), vec![0.1, 1.0, -0.1, -2.0]).unwrap();
        let quantized = quantize(&phase, 1);
        let half_pi = std::f64::consts::FRAC_PI_2;
        for &v in quantized.iter() {
            assert!((v - half_pi).abs() < 1e-9 || (v + half_pi).abs() < 1e-9);
        }
    }
}
