
use num_complex::Complex;
use num_traits::Zero;

use super::config::ConfigError;
use super::replica::Replica;

/// Ordered code delays [chips] of the correlator taps, prompt in the centre.  Fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TapSet {
	offsets: Vec<f64>,
}

impl TapSet {

	/// Requires an odd number (at least 3) of strictly ascending offsets, symmetric about a zero prompt,
	/// with every other offset inside (0, 1) chip in magnitude
	pub fn new(offsets:Vec<f64>) -> Result<Self, ConfigError> {
		let n = offsets.len();
		if n < 3 || n % 2 == 0 { return Err(ConfigError::TapSet("need an odd number of taps, at least 3")); }
		if offsets.iter().any(|x| !x.is_finite()) { return Err(ConfigError::TapSet("non-finite offset")); }
		if offsets.windows(2).any(|w| w[0] >= w[1]) { return Err(ConfigError::TapSet("offsets must be strictly ascending")); }
		if offsets[n / 2] != 0.0 { return Err(ConfigError::TapSet("centre tap must have zero offset")); }

		for (i, x) in offsets.iter().enumerate() {
			if i != n / 2 && !(x.abs() > 0.0 && x.abs() < 1.0) { return Err(ConfigError::TapOffset(*x)); }
		}

		for i in 0..n / 2 {
			if (offsets[i] + offsets[n - 1 - i]).abs() > 1.0e-12 { return Err(ConfigError::TapSet("offsets must be symmetric about the prompt")); }
		}

		Ok(Self { offsets })
	}

	pub fn early_prompt_late_offsets(spacing_chips:f64) -> Vec<f64> { vec![-spacing_chips, 0.0, spacing_chips] }

	pub fn early_prompt_late(spacing_chips:f64) -> Result<Self, ConfigError> {
		Self::new(Self::early_prompt_late_offsets(spacing_chips))
	}

	pub fn offsets(&self) -> &[f64] { &self.offsets }
	pub fn len(&self) -> usize { self.offsets.len() }
	pub fn is_empty(&self) -> bool { self.offsets.is_empty() }

	pub fn prompt_idx(&self) -> usize { self.offsets.len() / 2 }
	pub fn early_idx(&self) -> usize { self.prompt_idx() - 1 }
	pub fn late_idx(&self) -> usize { self.prompt_idx() + 1 }

	/// Distance between the early (or late) tap and the prompt
	pub fn early_late_space_chips(&self) -> f64 { self.offsets[self.late_idx()] }

}

/// One complex correlation sum per tap, in tap order
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
	pub sums: Vec<Complex<f64>>,
	prompt_idx: usize,
}

impl Correlation {
	pub fn early(&self)  -> Complex<f64> { self.sums[self.prompt_idx - 1] }
	pub fn prompt(&self) -> Complex<f64> { self.sums[self.prompt_idx] }
	pub fn late(&self)   -> Complex<f64> { self.sums[self.prompt_idx + 1] }
}

/// Computes `Σ sample[i] · conj(replica_tap[i])` for every tap, where each tap's replica is its code chip times the
/// carrier phasor.  The carrier is wiped off once per sample and shared by all taps; the code is real so needs no conjugate.
/// Only the overlapping span is used if `samples` and `replica` differ in length.
pub fn correlate(samples:&[Complex<f64>], replica:&Replica, taps:&TapSet) -> Correlation {
	let mut sums:Vec<Complex<f64>> = vec![Complex::zero(); taps.len()];

	for (i, (x, c)) in samples.iter().zip(replica.carrier.iter()).enumerate() {
		let baseband = x * c.conj();
		for (sum, code) in sums.iter_mut().zip(replica.code.iter()) {
			*sum += baseband * code[i];
		}
	}

	Correlation { sums, prompt_idx: taps.prompt_idx() }
}
