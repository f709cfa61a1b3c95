
use std::f64::consts;

pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;
	fn initialize(&mut self);

}

pub const DAMPING_RATIO:f64 = consts::FRAC_1_SQRT_2;

// Loop gain constants; the carrier loop uses the quarter-gain form of tau1
pub const CODE_LOOP_GAIN:f64 = 1.0;
pub const CARRIER_LOOP_GAIN:f64 = 0.25;

/// Proportional-plus-integral filter in the bilinear form used by 2nd-order DLLs and PLLs.
///
/// The natural frequency is derived from the noise bandwidth and damping ratio, then
///   tau1 = k / wn^2,  tau2 = 2 zeta / wn
///   y[n] = y[n-1] + (tau2/tau1) (x[n] - x[n-1]) + (x[n] + x[n-1]) (T / (2 tau1))
/// where T is the update period.  The output has units of [input units / sec].
#[derive(Debug, Clone, PartialEq)]
pub struct SecondOrderLoopFilter {
	c1: f64,
	c2: f64,
	prev_error: f64,
	nco: f64,
}

impl SecondOrderLoopFilter {

	pub fn new(bw_hz:f64, update_period_sec:f64, gain:f64) -> Self {
		let zeta = DAMPING_RATIO;
		let wn   = (bw_hz * 8.0 * zeta) / (4.0 * zeta * zeta + 1.0);
		let tau1 = gain / (wn * wn);
		let tau2 = (2.0 * zeta) / wn;

		Self { c1: tau2 / tau1, c2: update_period_sec / (2.0 * tau1), prev_error: 0.0, nco: 0.0 }
	}

	pub fn proportional_gain(&self) -> f64 { self.c1 }
	pub fn integral_gain(&self) -> f64 { self.c2 }

}

impl ScalarFilter for SecondOrderLoopFilter {

	fn apply(&mut self, x:f64) -> f64 {
		self.nco += self.c1 * (x - self.prev_error) + self.c2 * (x + self.prev_error);
		self.prev_error = x;
		self.nco
	}

	fn initialize(&mut self) {
		self.prev_error = 0.0;
		self.nco = 0.0;
	}

}

/// DLL filter: code error [chips] in, code frequency correction [chips/sec] out
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLoopFilter(SecondOrderLoopFilter);

impl CodeLoopFilter {
	pub fn new(bw_hz:f64, update_period_sec:f64) -> Self {
		Self(SecondOrderLoopFilter::new(bw_hz, update_period_sec, CODE_LOOP_GAIN))
	}
	pub fn inner(&self) -> &SecondOrderLoopFilter { &self.0 }
}

impl ScalarFilter for CodeLoopFilter {
	fn apply(&mut self, x:f64) -> f64 { self.0.apply(x) }
	fn initialize(&mut self) { self.0.initialize() }
}

/// PLL filter: carrier phase error [cycles] in, Doppler correction [Hz] out
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierLoopFilter(SecondOrderLoopFilter);

impl CarrierLoopFilter {
	pub fn new(bw_hz:f64, update_period_sec:f64) -> Self {
		Self(SecondOrderLoopFilter::new(bw_hz, update_period_sec, CARRIER_LOOP_GAIN))
	}
	pub fn inner(&self) -> &SecondOrderLoopFilter { &self.0 }
}

impl ScalarFilter for CarrierLoopFilter {
	fn apply(&mut self, x:f64) -> f64 { self.0.apply(x) }
	fn initialize(&mut self) { self.0.initialize() }
}
