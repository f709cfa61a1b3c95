
use std::collections::VecDeque;

use num_complex::Complex;

use super::config::Cn0Estimator;

pub const MIN_CN0_DB_HZ:f64 = 0.0;
pub const MAX_CN0_DB_HZ:f64 = 100.0;

fn clamp_cn0(cn0:f64) -> f64 {
	if cn0.is_nan() { MIN_CN0_DB_HZ } else { cn0.max(MIN_CN0_DB_HZ).min(MAX_CN0_DB_HZ) }
}

/// Signal-to-noise variance CN0 estimator [dB-Hz].  Uses |I| for the signal amplitude, so data bit sign flips
/// do not bias it.  Always finite.
pub fn cn0_svn_estimator(prompt_buffer:&VecDeque<Complex<f64>>, coh_integration_time_s:f64) -> f64 {
	if prompt_buffer.is_empty() { return MIN_CN0_DB_HZ; }
	let n:f64 = prompt_buffer.len() as f64;
	let p_sig:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.re.abs() ).sum();
		(sum / n).powi(2)
	};
	let p_tot:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.norm_sqr()).sum();
		sum / n
	};

	if p_sig <= 0.0 { return MIN_CN0_DB_HZ; }
	if p_tot - p_sig <= 0.0 { return MAX_CN0_DB_HZ; }

	let snr = p_sig / (p_tot - p_sig);
	clamp_cn0(10.0 * snr.log10() - 10.0 * coh_integration_time_s.log10())
}

/// Narrowband-wideband power ratio CN0 estimator [dB-Hz] over consecutive blocks of `block_len` prompts.  Prompts
/// that do not fill a whole block are ignored.  Always finite.
pub fn cn0_nwpr_estimator(prompt_buffer:&VecDeque<Complex<f64>>, block_len:usize, coh_integration_time_s:f64) -> f64 {
	if block_len < 2 { return MIN_CN0_DB_HZ; }

	let prompts:Vec<Complex<f64>> = prompt_buffer.iter().cloned().collect();
	let ratios:Vec<f64> = prompts.chunks_exact(block_len).filter_map(|block| {
		let nbp:f64 = block.iter().sum::<Complex<f64>>().norm_sqr();
		let wbp:f64 = block.iter().map(|c| c.norm_sqr()).sum();
		if wbp > 0.0 { Some(nbp / wbp) } else { None }
	}).collect();
	if ratios.is_empty() { return MIN_CN0_DB_HZ; }

	let m:f64 = block_len as f64;
	let mu:f64 = ratios.iter().sum::<f64>() / (ratios.len() as f64);

	if mu <= 1.0 { return MIN_CN0_DB_HZ; }
	if mu >= m { return MAX_CN0_DB_HZ; }

	clamp_cn0(10.0 * ((mu - 1.0) / (m - mu) / coh_integration_time_s).log10())
}

/// Narrowband difference over narrowband power, approximately cos(2φ) for a residual phase error φ.  Each prompt is
/// multiplied by the sign of its in-phase part first, which removes data bits before the coherent sums.  Returns zero
/// when the narrowband power is zero.
pub fn carrier_lock_detector(prompt_buffer:&VecDeque<Complex<f64>>) -> f64 {
	let sign = |c:&Complex<f64>| if c.re > 0.0 { 1.0 } else if c.re < 0.0 { -1.0 } else { 0.0 };
	let tmp_sum_i:f64 = prompt_buffer.iter().map(|c| c.re * sign(c)).sum();
	let tmp_sum_q:f64 = prompt_buffer.iter().map(|c| c.im * sign(c)).sum();
	let nbp:f64 = tmp_sum_i * tmp_sum_i + tmp_sum_q * tmp_sum_q;
	let nbd:f64 = tmp_sum_i * tmp_sum_i - tmp_sum_q * tmp_sum_q;
	if nbp == 0.0 { 0.0 } else { nbd / nbp }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockStatus {
	/// Fewer prompts than the window holds; no test has been made
	Warmup,
	Locked,
	/// Consecutive failed epochs so far, below the limit
	Failing(u32),
	/// Reported once, on the epoch where the consecutive failures reach the limit
	LockLost,
}

/// Sliding-window CN0 and carrier lock monitor fed with one prompt per epoch
#[derive(Debug, Clone)]
pub struct LockDetector {
	window: usize,
	estimator: Cn0Estimator,
	coh_integration_time_s: f64,
	carrier_lock_threshold: f64,
	min_valid_cn0_db_hz: f64,
	max_lock_fail: u32,
	prompt_buffer: VecDeque<Complex<f64>>,
	lock_fail_count: u32,
	last_cn0_db_hz: f64,
	last_carrier_lock_test: f64,
}

impl LockDetector {

	pub fn new(window:usize, estimator:Cn0Estimator, coh_integration_time_s:f64, carrier_lock_threshold:f64, min_valid_cn0_db_hz:f64, max_lock_fail:u32) -> Self {
		Self { window, estimator, coh_integration_time_s, carrier_lock_threshold, min_valid_cn0_db_hz, max_lock_fail,
			prompt_buffer: VecDeque::with_capacity(window + 1), lock_fail_count: 0, last_cn0_db_hz: 0.0, last_carrier_lock_test: 0.0 }
	}

	pub fn last_cn0_db_hz(&self) -> f64 { self.last_cn0_db_hz }
	pub fn last_carrier_lock_test(&self) -> f64 { self.last_carrier_lock_test }
	pub fn lock_fail_count(&self) -> u32 { self.lock_fail_count }

	pub fn update(&mut self, prompt:Complex<f64>) -> LockStatus {
		self.prompt_buffer.push_back(prompt);
		while self.prompt_buffer.len() > self.window { self.prompt_buffer.pop_front(); }
		if self.prompt_buffer.len() < self.window { return LockStatus::Warmup; }

		self.last_cn0_db_hz = match self.estimator {
			Cn0Estimator::Snv => cn0_svn_estimator(&self.prompt_buffer, self.coh_integration_time_s),
			Cn0Estimator::Nwpr{ block_len } => cn0_nwpr_estimator(&self.prompt_buffer, block_len, self.coh_integration_time_s),
		};
		self.last_carrier_lock_test = carrier_lock_detector(&self.prompt_buffer);

		let pass = (self.last_carrier_lock_test >= self.carrier_lock_threshold) && (self.last_cn0_db_hz >= self.min_valid_cn0_db_hz);
		if pass {
			self.lock_fail_count = 0;
			LockStatus::Locked
		} else {
			self.lock_fail_count = self.lock_fail_count.saturating_add(1);
			if self.lock_fail_count == self.max_lock_fail { LockStatus::LockLost }
			else { LockStatus::Failing(self.lock_fail_count) }
		}
	}

	pub fn reset(&mut self) {
		self.prompt_buffer.clear();
		self.lock_fail_count = 0;
		self.last_cn0_db_hz = 0.0;
		self.last_carrier_lock_test = 0.0;
	}

}
