
use serde::{Serialize, Deserialize};

use crate::gnss::signals::SignalId;

/// Coarse estimates handed over by acquisition to start tracking
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AcquisitionEstimate {
	/// Samples from `sample_stamp` to the start of a code period
	pub code_phase_samples: f64,
	pub doppler_hz: f64,
	/// Absolute index of the sample the estimate refers to
	pub sample_stamp: u64,
}

/// One synchronized observable, produced once per completed code period.  Owned by the receiver once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEpoch {
	pub channel_id: u32,
	pub signal: SignalId,
	pub sat: u32,
	/// Absolute index of the first sample of this epoch
	pub sample_idx: u64,
	pub samples_in_epoch: usize,
	/// Local code phase at `sample_idx`, in [0, code length)
	pub code_phase_chips: f64,
	/// Same phase as a signed distance from the nearest code boundary; within half a sample of zero once pulled in
	pub code_phase_samples: f64,
	/// Loop estimates after this epoch's update
	pub code_freq_chips_per_sec: f64,
	/// Accumulated local carrier phase at `sample_idx`
	pub carrier_phase_rad: f64,
	pub carrier_doppler_hz: f64,
	pub prompt_i: f64,
	pub prompt_q: f64,
	pub cn0_db_hz: f64,
	pub carrier_lock_test: f64,
	pub valid: bool,
	pub pull_in: bool,
}

impl TrackingEpoch {
	pub fn system_name(&self) -> &'static str { self.signal.system_name() }
}
