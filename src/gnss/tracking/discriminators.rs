
use std::f64::consts;

use num_complex::Complex;

/// Normalized noncoherent early-minus-late envelope discriminator [chips].
///
/// Positive when the early envelope is stronger, i.e. when the local code lags the incoming code and has to be advanced.
/// The `1 - d` factor makes the slope unity for an ideal triangular correlation peak, so the output reads directly as the
/// code phase error within the linear region.  Returns zero when both envelopes vanish.
pub fn dll_nc_e_minus_l_normalized(early:Complex<f64>, late:Complex<f64>, early_late_space_chips:f64) -> f64 {
	let e:f64 = early.norm();
	let l:f64 = late.norm();
	if e + l == 0.0 { 0.0 } else { (1.0 - early_late_space_chips) * (e - l) / (e + l) }
}

/// Two-quadrant arctangent Costas discriminator [cycles], insensitive to 180° data bit transitions.  Returns zero when
/// the in-phase prompt is zero.
pub fn pll_cloop_two_quadrant_atan(prompt:Complex<f64>) -> f64 {
	if prompt.re == 0.0 { 0.0 } else { (prompt.im / prompt.re).atan() / (2.0 * consts::PI) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn code_discriminator_sign_and_scale() {
		let strong = Complex::new(0.75, 0.0);
		let weak = Complex::new(0.25, 0.0);

		assert_eq!(dll_nc_e_minus_l_normalized(strong, strong, 0.5), 0.0);
		assert_eq!(dll_nc_e_minus_l_normalized(strong, weak, 0.5), 0.25);
		assert_eq!(dll_nc_e_minus_l_normalized(weak, strong, 0.5), -0.25);

		// Envelope only: carrier phase rotation has no effect
		let rot = Complex::from_polar(1.0, 1.1);
		assert!((dll_nc_e_minus_l_normalized(strong * rot, weak * rot, 0.5) - 0.25).abs() < 1.0e-12);
	}

	#[test]
	fn code_discriminator_tracks_triangle() {
		// Ideal correlation triangle R(t) = 1 - |t|, local code lagging by `err` chips
		let d:f64 = 0.5;
		for &err in [-0.2_f64, -0.05, 0.0, 0.1, 0.25].iter() {
			let early = Complex::new(1.0 - (err - d).abs(), 0.0);
			let late  = Complex::new(1.0 - (err + d).abs(), 0.0);
			let out = dll_nc_e_minus_l_normalized(early, late, d);
			assert!((out - err).abs() < 1.0e-12, "{} != {}", out, err);
		}
	}

	#[test]
	fn zero_inputs() {
		assert_eq!(dll_nc_e_minus_l_normalized(Complex::new(0.0, 0.0), Complex::new(0.0, 0.0), 0.5), 0.0);
		assert_eq!(pll_cloop_two_quadrant_atan(Complex::new(0.0, 3.0)), 0.0);
	}

	#[test]
	fn carrier_discriminator_ignores_bit_sign() {
		let phase = 0.3_f64;
		let p = Complex::from_polar(100.0, phase);
		assert!((pll_cloop_two_quadrant_atan(p) - phase / (2.0 * consts::PI)).abs() < 1.0e-12);
		assert!((pll_cloop_two_quadrant_atan(-p) - phase / (2.0 * consts::PI)).abs() < 1.0e-12);
		assert!(pll_cloop_two_quadrant_atan(Complex::new(1.0, -1.0)) < 0.0);
	}
}
