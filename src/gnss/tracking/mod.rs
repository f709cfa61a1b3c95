
use std::path::Path;

use log::{debug, error, info, trace, warn};
use num_complex::Complex;

use crate::filters::{CarrierLoopFilter, CodeLoopFilter, ScalarFilter};
use crate::gnss::common::tracking::{AcquisitionEstimate, TrackingEpoch};
use crate::gnss::signals::SignalId;
use crate::utils;
use crate::DigSigProcErr;

pub mod config;
pub mod correlator;
pub mod discriminators;
pub mod dump;
pub mod lock_detectors;
pub mod replica;


use self::config::{ConfigError, TrackingConfig};
use self::correlator::TapSet;
use self::dump::{DumpError, DumpRecord, DumpSink};
use self::lock_detectors::{LockDetector, LockStatus};
use self::replica::{CarrierState, CodeState, Replica};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
	Idle,
	PullIn,
	Tracking,
	LockLost,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingResult {
	NotReady,
	Ok(TrackingEpoch),
	/// The epoch on which lock was declared lost, already marked invalid
	LossOfLock(TrackingEpoch),
	Err(DigSigProcErr),
}

/// Outcome of one call to `Tracking::work`
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
	pub consumed: usize,
	pub result: TrackingResult,
}

impl Work {
	pub fn produced(&self) -> usize {
		match self.result {
			TrackingResult::Ok(_) | TrackingResult::LossOfLock(_) => 1,
			_ => 0,
		}
	}
}

/// DLL/PLL tracking of one satellite signal on one channel.
///
/// Sample accounting is absolute: every sample offered and consumed in any state advances `sample_counter`, so
/// acquisition estimates stamped against the input stream stay meaningful however long the channel sat idle.
pub struct Tracking {
	config: TrackingConfig,
	signal: SignalId,
	sat: u32,
	local_code: Vec<f64>,
	taps: TapSet,
	code_length_chips: f64,
	channel_id: u32,
	state: TrackingState,
	loss_reason: Option<DigSigProcErr>,
	sample_counter: u64,
	acq_doppler_hz: f64,
	code: CodeState,
	carrier: CarrierState,
	code_filter: CodeLoopFilter,
	carrier_filter: CarrierLoopFilter,
	lock_detector: LockDetector,
	replica: Replica,
	dump: Option<DumpSink>,
}

impl Tracking {

	/// Validates the configuration and the local code.  A dump file named in the configuration that cannot be opened
	/// is logged and tracking goes ahead without it; check `dump_enabled` afterwards.
	pub fn new(config:TrackingConfig, signal:SignalId, sat:u32, local_code:Vec<f64>) -> Result<Self, ConfigError> {
		config.validate()?;
		if local_code.len() != config.code_length_chips {
			return Err(ConfigError::LocalCodeLength{ expected: config.code_length_chips, got: local_code.len() });
		}

		let taps = TapSet::new(config.tap_offsets_chips.clone())?;
		let period = config.code_period_sec();

		let dump = match &config.dump_filename {
			Some(path) => match DumpSink::create(path) {
				Ok(sink) => Some(sink),
				Err(e) => {
					warn!("{} {}: {}; continuing without dump", signal.system_name(), sat, e);
					None
				}
			},
			None => None,
		};

		let code = CodeState{ phase_chips: 0.0, freq_chips_per_sec: config.code_rate_chips_per_sec };
		let carrier = CarrierState{ phase_rad: 0.0, doppler_hz: 0.0, freq_hz: config.intermediate_freq_hz };

		Ok(Self {
			code_length_chips: config.code_length_chips as f64,
			code_filter: CodeLoopFilter::new(config.dll_bw_hz, period),
			carrier_filter: CarrierLoopFilter::new(config.pll_bw_hz, period),
			lock_detector: LockDetector::new(config.cn0_window, config.cn0_estimator, period,
				config.carrier_lock_threshold, config.min_valid_cn0_db_hz, config.max_lock_fail),
			config, signal, sat, local_code, taps,
			channel_id: 0, state: TrackingState::Idle, loss_reason: None, sample_counter: 0, acq_doppler_hz: 0.0,
			code, carrier, replica: Replica::default(), dump,
		})
	}

	/// Uses the ranging code from the signal catalogue
	pub fn from_signal(config:TrackingConfig, signal:SignalId, sat:u32) -> Result<Self, ConfigError> {
		let local_code = signal.local_code(sat).ok_or(ConfigError::UnknownSatellite(sat))?;
		Self::new(config, signal, sat, local_code)
	}

	pub fn enable_dump<P: AsRef<Path>>(&mut self, path:P) -> Result<(), DumpError> {
		self.dump = Some(DumpSink::create(path)?);
		Ok(())
	}

	pub fn state(&self) -> TrackingState { self.state }
	pub fn channel_id(&self) -> u32 { self.channel_id }
	pub fn signal(&self) -> SignalId { self.signal }
	pub fn sat(&self) -> u32 { self.sat }
	pub fn config(&self) -> &TrackingConfig { &self.config }
	pub fn sample_counter(&self) -> u64 { self.sample_counter }
	pub fn code_state(&self) -> CodeState { self.code }
	pub fn carrier_state(&self) -> CarrierState { self.carrier }
	pub fn last_cn0_db_hz(&self) -> f64 { self.lock_detector.last_cn0_db_hz() }
	pub fn last_carrier_lock_test(&self) -> f64 { self.lock_detector.last_carrier_lock_test() }
	pub fn lock_fail_count(&self) -> u32 { self.lock_detector.lock_fail_count() }
	pub fn loss_reason(&self) -> Option<DigSigProcErr> { self.loss_reason }

	/// False when no dump was configured, when it could not be opened, or once a write to it has failed
	pub fn dump_enabled(&self) -> bool { self.dump.as_ref().map_or(false, |d| d.is_enabled()) }

	pub fn assign_channel(&mut self, channel_id:u32) {
		debug!("{} {} assigned to channel {}", self.signal.system_name(), self.sat, channel_id);
		self.channel_id = channel_id;
	}

	/// Nominal code rate, scaled by the carrier Doppler when the RF carrier is known
	fn aided_code_freq(&self, doppler_hz:f64) -> f64 {
		match self.config.rf_carrier_hz {
			Some(rf) => self.config.code_rate_chips_per_sec * (1.0 + doppler_hz / rf),
			None => self.config.code_rate_chips_per_sec,
		}
	}

	/// Seeds the replicas from an acquisition estimate.  The code phase at the next sample to be consumed is
	/// extrapolated from the estimate's stamp, so the first epoch ends on a code period boundary and spans between
	/// half and one and a half periods.  Not allowed once lock has been lost.
	pub fn start_tracking(&mut self, acq:AcquisitionEstimate) -> Result<(), DigSigProcErr> {
		if self.state == TrackingState::LockLost {
			return Err(DigSigProcErr::Other("lock was lost; a new tracking instance is needed"));
		}
		if !utils::all_finite(&[acq.code_phase_samples, acq.doppler_hz]) {
			return Err(DigSigProcErr::NumericDivergence("acquisition estimate"));
		}

		let code_freq = self.aided_code_freq(acq.doppler_hz);
		let step = code_freq / self.config.fs;
		let samples_since_boundary = (self.sample_counter as f64) - ((acq.sample_stamp as f64) + acq.code_phase_samples);

		self.acq_doppler_hz = acq.doppler_hz;
		self.code = CodeState{ phase_chips: utils::wrap(samples_since_boundary * step, self.code_length_chips), freq_chips_per_sec: code_freq };
		self.carrier = CarrierState{ phase_rad: 0.0, doppler_hz: acq.doppler_hz, freq_hz: self.config.intermediate_freq_hz + acq.doppler_hz };

		self.code_filter.initialize();
		self.carrier_filter.initialize();
		self.lock_detector.reset();
		self.state = TrackingState::PullIn;

		info!("{} {} channel {}: tracking from sample {} with Doppler {:.1} [Hz], code phase {:.3} [chips]",
			self.signal.system_name(), self.sat, self.channel_id, self.sample_counter, acq.doppler_hz, self.code.phase_chips);

		Ok(())
	}

	/// Leaves tracking and flushes the dump.  Samples offered afterwards are drained.
	pub fn stop(&mut self) {
		if self.state != TrackingState::LockLost { self.state = TrackingState::Idle; }
		if let Some(d) = self.dump.as_mut() { d.flush(); }
		debug!("{} {} channel {} stopped at sample {}", self.signal.system_name(), self.sat, self.channel_id, self.sample_counter);
	}

	/// Samples consumed by the next epoch, ending it on the local code period boundary nearest a full period away
	fn epoch_samples(&self) -> usize {
		let step = self.code.phase_step_chips(self.config.fs);
		let residual = utils::signed_residual(self.code.phase_chips, self.code_length_chips);
		let n = ((self.code_length_chips - residual) / step).round();
		if n < 1.0 { 1 } else { n as usize }
	}

	/// `None` while idle or after lock is lost; any number of samples is then accepted and discarded
	pub fn samples_required(&self) -> Option<usize> {
		match self.state {
			TrackingState::PullIn | TrackingState::Tracking => Some(self.epoch_samples()),
			TrackingState::Idle | TrackingState::LockLost => None,
		}
	}

	/// Processes at most one epoch from the front of `samples`.  With too few samples nothing is consumed and nothing
	/// changes, so the same call can be repeated once more samples are available.
	pub fn work(&mut self, samples:&[Complex<f64>]) -> Work {
		match self.state {
			TrackingState::Idle => {
				self.sample_counter += samples.len() as u64;
				Work{ consumed: samples.len(), result: TrackingResult::NotReady }
			},
			TrackingState::LockLost => {
				self.sample_counter += samples.len() as u64;
				let e = self.loss_reason.unwrap_or(DigSigProcErr::LossOfLock);
				Work{ consumed: samples.len(), result: TrackingResult::Err(e) }
			},
			TrackingState::PullIn | TrackingState::Tracking => {
				let n = self.epoch_samples();
				if samples.len() < n {
					return Work{ consumed: 0, result: TrackingResult::NotReady };
				}
				let result = self.process_epoch(&samples[..n]);
				Work{ consumed: n, result }
			}
		}
	}

	fn process_epoch(&mut self, samples:&[Complex<f64>]) -> TrackingResult {
		let n = samples.len();
		let fs = self.config.fs;
		let pull_in = self.state == TrackingState::PullIn;
		let sample_idx = self.sample_counter;
		let start_code = self.code;
		let start_carrier = self.carrier;

		replica::generate_into(&mut self.replica, &self.local_code, &self.code, &self.carrier, &self.taps, fs, n);
		let corr = correlator::correlate(samples, &self.replica, &self.taps);
		let prompt = corr.prompt();

		let code_error = discriminators::dll_nc_e_minus_l_normalized(corr.early(), corr.late(), self.taps.early_late_space_chips());
		let carrier_error = discriminators::pll_cloop_two_quadrant_atan(prompt);

		// Advance both NCOs to the end of the epoch; the code keeps its fractional remainder
		self.code.phase_chips = utils::wrap(self.code.phase_chips + (n as f64) * self.code.phase_step_chips(fs), self.code_length_chips);
		self.carrier.phase_rad += (n as f64) * self.carrier.phase_step_rad(fs);
		self.sample_counter += n as u64;

		// Close the loops
		self.carrier.doppler_hz = self.acq_doppler_hz + self.carrier_filter.apply(carrier_error);
		self.carrier.freq_hz = self.config.intermediate_freq_hz + self.carrier.doppler_hz;
		self.code.freq_chips_per_sec = self.aided_code_freq(self.carrier.doppler_hz) + self.code_filter.apply(code_error);

		let diverged:Option<&'static str> = if !utils::all_finite(&[prompt.re, prompt.im]) { Some("correlator") }
			else if !utils::all_finite(&[code_error, carrier_error]) { Some("discriminator") }
			else if !utils::all_finite(&[self.carrier.phase_rad, self.carrier.doppler_hz]) { Some("carrier loop") }
			else if !(utils::all_finite(&[self.code.phase_chips, self.code.freq_chips_per_sec]) && self.code.freq_chips_per_sec > 0.0) { Some("code loop") }
			else { None };

		let status = if pull_in || diverged.is_some() { None } else { Some(self.lock_detector.update(prompt)) };

		let lost = diverged.is_some() || status == Some(LockStatus::LockLost);
		let epoch = TrackingEpoch {
			channel_id: self.channel_id,
			signal: self.signal,
			sat: self.sat,
			sample_idx,
			samples_in_epoch: n,
			code_phase_chips: start_code.phase_chips,
			code_phase_samples: utils::signed_residual(start_code.phase_chips, self.code_length_chips) / start_code.phase_step_chips(fs),
			code_freq_chips_per_sec: self.code.freq_chips_per_sec,
			carrier_phase_rad: start_carrier.phase_rad,
			carrier_doppler_hz: self.carrier.doppler_hz,
			prompt_i: prompt.re,
			prompt_q: prompt.im,
			cn0_db_hz: self.lock_detector.last_cn0_db_hz(),
			carrier_lock_test: self.lock_detector.last_carrier_lock_test(),
			valid: !pull_in && !lost,
			pull_in,
		};

		if let Some(d) = self.dump.as_mut() {
			d.write(&DumpRecord {
				prompt_i: prompt.re, prompt_q: prompt.im,
				code_error_chips: code_error, carrier_error_cycles: carrier_error,
				code_freq_chips_per_sec: epoch.code_freq_chips_per_sec, carrier_doppler_hz: epoch.carrier_doppler_hz,
				cn0_db_hz: epoch.cn0_db_hz, carrier_lock_test: epoch.carrier_lock_test,
				sat: self.sat, sample_counter: sample_idx,
			});
		}

		trace!("{} {} ch {} @ {}: Ep={:.4} Ec={:.5} fc={:.3} fd={:.3} cn0={:.1}", self.signal.system_name(), self.sat, self.channel_id,
			sample_idx, code_error, carrier_error, epoch.code_freq_chips_per_sec, epoch.carrier_doppler_hz, epoch.cn0_db_hz);

		if let Some(what) = diverged {
			error!("{} {} channel {}: non-finite value in {} at sample {}", self.signal.system_name(), self.sat, self.channel_id, what, sample_idx);
			self.enter_lock_lost(DigSigProcErr::NumericDivergence(what));
			return TrackingResult::LossOfLock(epoch);
		}

		match status {
			Some(LockStatus::LockLost) => {
				warn!("{} {} channel {}: loss of lock at sample {} (CN0 {:.1} [dB-Hz], lock test {:.3})", self.signal.system_name(),
					self.sat, self.channel_id, sample_idx, epoch.cn0_db_hz, epoch.carrier_lock_test);
				self.enter_lock_lost(DigSigProcErr::LossOfLock);
				TrackingResult::LossOfLock(epoch)
			},
			Some(LockStatus::Failing(1)) => {
				debug!("{} {} channel {}: lock test failing at sample {}", self.signal.system_name(), self.sat, self.channel_id, sample_idx);
				TrackingResult::Ok(epoch)
			},
			_ => {
				if pull_in {
					debug!("{} {} channel {}: pull-in complete, {} samples", self.signal.system_name(), self.sat, self.channel_id, n);
					self.state = TrackingState::Tracking;
				}
				TrackingResult::Ok(epoch)
			},
		}
	}

	fn enter_lock_lost(&mut self, reason:DigSigProcErr) {
		self.state = TrackingState::LockLost;
		self.loss_reason = Some(reason);
		if let Some(d) = self.dump.as_mut() { d.flush(); }
	}

}
