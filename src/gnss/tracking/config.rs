
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::gnss::signals::{glonass_l1_ca, SignalId};
use super::correlator::TapSet;

pub const DEFAULT_DLL_BW_HZ:f64 = 2.0;
pub const DEFAULT_PLL_BW_HZ:f64 = 20.0;
pub const DEFAULT_EARLY_LATE_SPACE_CHIPS:f64 = 0.5;

pub const DEFAULT_CN0_WINDOW:usize = 20;
pub const DEFAULT_CARRIER_LOCK_THRESHOLD:f64 = 0.85;
pub const DEFAULT_MIN_VALID_CN0_DB_HZ:f64 = 25.0;
pub const DEFAULT_MAX_LOCK_FAIL:u32 = 50;
/// Divides the 20 ms data bit, so at most one block per bit straddles a transition
pub const DEFAULT_NWPR_BLOCK_LEN:usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
	#[error("sampling frequency must be positive and finite, got {0}")]
	SampleRate(f64),
	#[error("code length must be at least one chip")]
	CodeLength,
	#[error("code rate must be positive and finite, got {0}")]
	CodeRate(f64),
	#[error("sampling frequency {fs} is below the code rate {rate}")]
	Undersampled { fs:f64, rate:f64 },
	#[error("local code has {got} chips, expected {expected}")]
	LocalCodeLength { expected:usize, got:usize },
	#[error("no local code for satellite {0}")]
	UnknownSatellite(u32),
	#[error("invalid tap set: {0}")]
	TapSet(&'static str),
	#[error("tap offset {0} outside (0, 1) chip")]
	TapOffset(f64),
	#[error("{loop_name} bandwidth must be positive and finite, got {bw_hz}")]
	Bandwidth { loop_name:&'static str, bw_hz:f64 },
	#[error("CN0 window must hold at least 2 epochs, got {0}")]
	Cn0Window(usize),
	#[error("NWPR block length {block_len} must be at least 2 and divide the CN0 window {window}")]
	NwprBlock { block_len:usize, window:usize },
	#[error("carrier lock threshold must lie in (-1, 1], got {0}")]
	LockThreshold(f64),
	#[error("lock failure limit must be at least 1")]
	LockFailLimit,
	#[error("frequency channel {0} outside the assigned range")]
	FrequencyChannel(i32),
}

/// CN0 estimator applied over the sliding prompt window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Cn0Estimator {
	/// Narrowband-wideband power ratio over consecutive blocks of `block_len` prompts
	Nwpr { block_len:usize },
	/// Signal-to-noise variance.  Insensitive to data bit transitions, but with a noise-only floor near 27 dB-Hz
	Snv,
}

impl Default for Cn0Estimator {
	fn default() -> Self { Cn0Estimator::Nwpr{ block_len: DEFAULT_NWPR_BLOCK_LEN } }
}

fn default_taps() -> Vec<f64> { TapSet::early_prompt_late_offsets(DEFAULT_EARLY_LATE_SPACE_CHIPS) }
fn default_dll_bw() -> f64 { DEFAULT_DLL_BW_HZ }
fn default_pll_bw() -> f64 { DEFAULT_PLL_BW_HZ }
fn default_cn0_window() -> usize { DEFAULT_CN0_WINDOW }
fn default_lock_threshold() -> f64 { DEFAULT_CARRIER_LOCK_THRESHOLD }
fn default_min_cn0() -> f64 { DEFAULT_MIN_VALID_CN0_DB_HZ }
fn default_max_lock_fail() -> u32 { DEFAULT_MAX_LOCK_FAIL }

/// Fixed at construction; a tracker never sees its configuration change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
	pub fs: f64,
	pub code_length_chips: usize,
	pub code_rate_chips_per_sec: f64,
	#[serde(default = "default_taps")]
	pub tap_offsets_chips: Vec<f64>,
	#[serde(default = "default_dll_bw")]
	pub dll_bw_hz: f64,
	#[serde(default = "default_pll_bw")]
	pub pll_bw_hz: f64,

	/// Nominal carrier at baseband, e.g. the FDMA offset of a GLONASS channel
	#[serde(default)]
	pub intermediate_freq_hz: f64,
	/// RF carrier used to aid the code loop with the carrier Doppler; no aiding when absent
	#[serde(default)]
	pub rf_carrier_hz: Option<f64>,

	#[serde(default)]
	pub cn0_estimator: Cn0Estimator,
	#[serde(default = "default_cn0_window")]
	pub cn0_window: usize,
	#[serde(default = "default_lock_threshold")]
	pub carrier_lock_threshold: f64,
	#[serde(default = "default_min_cn0")]
	pub min_valid_cn0_db_hz: f64,
	#[serde(default = "default_max_lock_fail")]
	pub max_lock_fail: u32,

	#[serde(default)]
	pub dump_filename: Option<String>,
}

impl TrackingConfig {

	pub fn new(fs:f64, code_length_chips:usize, tap_offsets_chips:Vec<f64>, dll_bw_hz:f64, pll_bw_hz:f64) -> Self {
		// Unless told otherwise the code is assumed to repeat every millisecond
		let code_rate_chips_per_sec = (code_length_chips as f64) * 1.0e3;
		Self { fs, code_length_chips, code_rate_chips_per_sec, tap_offsets_chips, dll_bw_hz, pll_bw_hz,
			intermediate_freq_hz: 0.0, rf_carrier_hz: None,
			cn0_estimator: Cn0Estimator::default(), cn0_window: DEFAULT_CN0_WINDOW,
			carrier_lock_threshold: DEFAULT_CARRIER_LOCK_THRESHOLD, min_valid_cn0_db_hz: DEFAULT_MIN_VALID_CN0_DB_HZ,
			max_lock_fail: DEFAULT_MAX_LOCK_FAIL, dump_filename: None }
	}

	pub fn for_signal(fs:f64, signal:SignalId) -> Self {
		let p = signal.params();
		let mut cfg = Self::new(fs, p.code_length_chips, default_taps(), DEFAULT_DLL_BW_HZ, DEFAULT_PLL_BW_HZ);
		cfg.code_rate_chips_per_sec = p.code_rate_chips_per_sec;
		cfg.rf_carrier_hz = Some(p.carrier_hz);
		cfg
	}

	pub fn gps_l1_ca(fs:f64) -> Self { Self::for_signal(fs, SignalId::GpsL1Ca) }

	/// GLONASS L1 C/A on frequency channel `k`, with the front end centred on the channel-0 carrier
	pub fn glonass_l1_ca(fs:f64, k:i32) -> Result<Self, ConfigError> {
		Self::for_signal(fs, SignalId::GlonassL1Ca).with_frequency_channel(k)
	}

	/// Moves the carrier and its baseband offset to GLONASS frequency channel `k`
	pub fn with_frequency_channel(mut self, k:i32) -> Result<Self, ConfigError> {
		let rf = glonass_l1_ca::carrier_hz(k).ok_or(ConfigError::FrequencyChannel(k))?;
		self.rf_carrier_hz = Some(rf);
		self.intermediate_freq_hz = glonass_l1_ca::intermediate_frequency_hz(k).ok_or(ConfigError::FrequencyChannel(k))?;
		Ok(self)
	}

	pub fn with_dump(mut self, filename:&str) -> Self { self.dump_filename = Some(filename.to_string()); self }

	/// Duration of one code period at the nominal code rate, which is also the loop update period
	pub fn code_period_sec(&self) -> f64 { (self.code_length_chips as f64) / self.code_rate_chips_per_sec }

	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.fs.is_finite() && self.fs > 0.0) { return Err(ConfigError::SampleRate(self.fs)); }
		if self.code_length_chips == 0 { return Err(ConfigError::CodeLength); }
		if !(self.code_rate_chips_per_sec.is_finite() && self.code_rate_chips_per_sec > 0.0) {
			return Err(ConfigError::CodeRate(self.code_rate_chips_per_sec));
		}
		if self.fs < self.code_rate_chips_per_sec {
			return Err(ConfigError::Undersampled{ fs: self.fs, rate: self.code_rate_chips_per_sec });
		}

		TapSet::new(self.tap_offsets_chips.clone())?;

		for &(loop_name, bw_hz) in [("DLL", self.dll_bw_hz), ("PLL", self.pll_bw_hz)].iter() {
			if !(bw_hz.is_finite() && bw_hz > 0.0) { return Err(ConfigError::Bandwidth{ loop_name, bw_hz }); }
		}

		if self.cn0_window < 2 { return Err(ConfigError::Cn0Window(self.cn0_window)); }
		if let Cn0Estimator::Nwpr{ block_len } = self.cn0_estimator {
			if block_len < 2 || self.cn0_window % block_len != 0 {
				return Err(ConfigError::NwprBlock{ block_len, window: self.cn0_window });
			}
		}
		if !(self.carrier_lock_threshold > -1.0 && self.carrier_lock_threshold <= 1.0) {
			return Err(ConfigError::LockThreshold(self.carrier_lock_threshold));
		}
		if self.max_lock_fail == 0 { return Err(ConfigError::LockFailLimit); }

		Ok(())
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> TrackingConfig { TrackingConfig::new(4.1e6, 1000, vec![-0.5, 0.0, 0.5], 2.0, 20.0) }

	#[test]
	fn defaults_validate() {
		assert_eq!(base().validate(), Ok(()));
		assert_eq!(TrackingConfig::gps_l1_ca(4.0e6).validate(), Ok(()));
		assert_eq!(TrackingConfig::glonass_l1_ca(6.625e6, -3).unwrap().validate(), Ok(()));
	}

	#[test]
	fn rejects_bad_bandwidth() {
		let mut cfg = base();
		cfg.dll_bw_hz = 0.0;
		assert_eq!(cfg.validate(), Err(ConfigError::Bandwidth{ loop_name: "DLL", bw_hz: 0.0 }));

		let mut cfg = base();
		cfg.pll_bw_hz = -5.0;
		assert_eq!(cfg.validate(), Err(ConfigError::Bandwidth{ loop_name: "PLL", bw_hz: -5.0 }));
	}

	#[test]
	fn rejects_taps_outside_one_chip() {
		let mut cfg = base();
		cfg.tap_offsets_chips = vec![-1.2, 0.0, 1.2];
		assert_eq!(cfg.validate(), Err(ConfigError::TapOffset(-1.2)));
	}

	#[test]
	fn rejects_undersampling_and_bad_windows() {
		let mut cfg = base();
		cfg.fs = 0.5e6;
		assert!(matches!(cfg.validate(), Err(ConfigError::Undersampled{ .. })));

		let mut cfg = base();
		cfg.cn0_estimator = Cn0Estimator::Nwpr{ block_len: 3 };
		assert_eq!(cfg.validate(), Err(ConfigError::NwprBlock{ block_len: 3, window: 20 }));

		let mut cfg = base();
		cfg.max_lock_fail = 0;
		assert_eq!(cfg.validate(), Err(ConfigError::LockFailLimit));
	}

	#[test]
	fn glonass_channel_plan() {
		let cfg = TrackingConfig::glonass_l1_ca(6.625e6, 2).unwrap();
		assert_eq!(cfg.intermediate_freq_hz, 1.125e6);
		assert_eq!(cfg.rf_carrier_hz, Some(1.603125e9));
		assert_eq!(cfg.code_length_chips, 511);
		assert_eq!(TrackingConfig::glonass_l1_ca(6.625e6, 9), Err(ConfigError::FrequencyChannel(9)));

		// A configuration loaded without a channel picks up the offset afterwards
		let mut loaded = TrackingConfig::for_signal(6.625e6, SignalId::GlonassL1Ca);
		loaded.dll_bw_hz = 1.0;
		let cfg = loaded.with_frequency_channel(-7).unwrap();
		assert_eq!(cfg.intermediate_freq_hz, -7.0 * 562.5e3);
		assert_eq!(cfg.rf_carrier_hz, Some(1.602e9 - 7.0 * 562.5e3));
		assert_eq!(cfg.dll_bw_hz, 1.0);
	}

	#[test]
	fn deserializes_with_defaults() {
		let cfg:TrackingConfig = serde_json::from_str(r#"{ "fs": 4.1e6, "code_length_chips": 1000, "code_rate_chips_per_sec": 1.0e6 }"#).unwrap();
		assert_eq!(cfg.tap_offsets_chips, vec![-0.5, 0.0, 0.5]);
		assert_eq!(cfg.cn0_window, DEFAULT_CN0_WINDOW);
		assert_eq!(cfg.cn0_estimator, Cn0Estimator::Nwpr{ block_len: DEFAULT_NWPR_BLOCK_LEN });
		assert_eq!(cfg.rf_carrier_hz, None);
		assert_eq!(cfg.validate(), Ok(()));

		let cfg:TrackingConfig = serde_json::from_str(r#"{ "fs": 4.1e6, "code_length_chips": 1000, "code_rate_chips_per_sec": 1.0e6,
			"cn0_estimator": "Snv" }"#).unwrap();
		assert_eq!(cfg.cn0_estimator, Cn0Estimator::Snv);

		let cfg:TrackingConfig = serde_json::from_str(r#"{ "fs": 4.1e6, "code_length_chips": 1000, "code_rate_chips_per_sec": 1.0e6,
			"cn0_estimator": { "Nwpr": { "block_len": 10 } } }"#).unwrap();
		assert_eq!(cfg.cn0_estimator, Cn0Estimator::Nwpr{ block_len: 10 });
	}
}
