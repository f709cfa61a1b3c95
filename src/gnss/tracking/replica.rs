
use std::f64::consts;

use num_complex::Complex;

use crate::utils;
use super::correlator::TapSet;

/// Local code NCO state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeState {
	/// Always within [0, code length)
	pub phase_chips: f64,
	pub freq_chips_per_sec: f64,
}

/// Local carrier NCO state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierState {
	/// Accumulated since tracking started; never wrapped
	pub phase_rad: f64,
	pub doppler_hz: f64,
	/// Nominal (intermediate) frequency plus Doppler
	pub freq_hz: f64,
}

impl CodeState {
	pub fn phase_step_chips(&self, fs:f64) -> f64 { self.freq_chips_per_sec / fs }
}

impl CarrierState {
	pub fn phase_step_rad(&self, fs:f64) -> f64 { 2.0 * consts::PI * self.freq_hz / fs }
}

/// Per-tap code chips and per-sample carrier phasors for one span of input samples
#[derive(Debug, Clone, Default)]
pub struct Replica {
	pub code: Vec<Vec<f64>>,
	pub carrier: Vec<Complex<f64>>,
}

impl Replica {
	pub fn len(&self) -> usize { self.carrier.len() }
	pub fn is_empty(&self) -> bool { self.carrier.is_empty() }
}

/// Fills `out` with the replica for `n_samples` samples starting at the given code and carrier state.
///
/// Tap offsets are code delays: the chip used by tap `d` at sample `i` is `floor(phase + i*step - d)` modulo the code length,
/// so negative offsets are early and positive offsets are late.  Both ramps are computed from the sample index rather than
/// by repeated addition, and the carrier ramp starts from the accumulated phase reduced modulo 2π, so the replica does not
/// degrade as the accumulated phase grows.
pub fn generate_into(out:&mut Replica, local_code:&[f64], code:&CodeState, carrier:&CarrierState, taps:&TapSet, fs:f64, n_samples:usize) {
	let len = local_code.len();
	let code_step = code.phase_step_chips(fs);
	let carrier_step = carrier.phase_step_rad(fs);
	let carrier_start = carrier.phase_rad.rem_euclid(2.0 * consts::PI);

	out.code.resize(taps.len(), vec![]);
	for (tap, offset) in out.code.iter_mut().zip(taps.offsets().iter()) {
		tap.clear();
		tap.extend((0..n_samples).map(|i| {
			local_code[utils::wrap_floor(code.phase_chips + (i as f64) * code_step - offset, len)]
		}));
	}

	out.carrier.clear();
	out.carrier.extend((0..n_samples).map(|i| Complex::from_polar(1.0, carrier_start + (i as f64) * carrier_step)));
}

pub fn generate(local_code:&[f64], code:&CodeState, carrier:&CarrierState, taps:&TapSet, fs:f64, n_samples:usize) -> Replica {
	let mut out = Replica::default();
	generate_into(&mut out, local_code, code, carrier, taps, fs, n_samples);
	out
}
