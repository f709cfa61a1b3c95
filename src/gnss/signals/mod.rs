
use serde::{Serialize, Deserialize};

pub mod glonass_l1_ca;
pub mod gps_l1_ca;

/// Identifies one ranging signal of one constellation; indexes the read-only [`SIGNALS`] table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
	GpsL1Ca,
	GlonassL1Ca,
}

#[derive(Debug)]
pub struct SignalParameters {
	pub id: SignalId,
	pub system_name: &'static str,
	pub system_code: char,
	pub signal_name: &'static str,
	pub code_length_chips: usize,
	pub code_rate_chips_per_sec: f64,
	pub carrier_hz: f64,
	/// Generates the bipolar (+1/-1) spreading code for a satellite, or None if the satellite number is out of range
	pub code: fn(u32) -> Option<Vec<f64>>,
}

impl SignalParameters {
	pub fn code_period_sec(&self) -> f64 { (self.code_length_chips as f64) / self.code_rate_chips_per_sec }
}

pub static SIGNALS:[SignalParameters; 2] = [
	SignalParameters {
		id: SignalId::GpsL1Ca,
		system_name: "GPS",
		system_code: 'G',
		signal_name: "1C",
		code_length_chips: gps_l1_ca::CODE_LENGTH,
		code_rate_chips_per_sec: gps_l1_ca::CHIPS_PER_SEC,
		carrier_hz: gps_l1_ca::CARRIER_HZ,
		code: gps_l1_ca::prn_bipolar,
	},
	SignalParameters {
		id: SignalId::GlonassL1Ca,
		system_name: "Glonass",
		system_code: 'R',
		signal_name: "1G",
		code_length_chips: glonass_l1_ca::CODE_LENGTH,
		code_rate_chips_per_sec: glonass_l1_ca::CHIPS_PER_SEC,
		carrier_hz: glonass_l1_ca::CARRIER_HZ,
		code: glonass_l1_ca::code_bipolar,
	},
];

impl SignalId {

	pub fn params(self) -> &'static SignalParameters {
		match self {
			SignalId::GpsL1Ca     => &SIGNALS[0],
			SignalId::GlonassL1Ca => &SIGNALS[1],
		}
	}

	pub fn system_name(self) -> &'static str { self.params().system_name }

	pub fn local_code(self, sat:u32) -> Option<Vec<f64>> { (self.params().code)(sat) }

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn table_is_indexed_by_id() {
		for p in SIGNALS.iter() {
			assert_eq!(p.id.params().system_code, p.system_code);
		}
		assert_eq!(SignalId::GlonassL1Ca.system_name(), "Glonass");
		assert_eq!(SignalId::GpsL1Ca.params().system_code, 'G');
	}

	#[test]
	fn code_periods() {
		assert!((SignalId::GpsL1Ca.params().code_period_sec() - 1.0e-3).abs() < 1.0e-12);
		assert!((SignalId::GlonassL1Ca.params().code_period_sec() - 1.0e-3).abs() < 1.0e-12);
	}

	#[test]
	fn local_code_lengths_match_table() {
		let gps = SignalId::GpsL1Ca.local_code(7).unwrap();
		assert_eq!(gps.len(), SignalId::GpsL1Ca.params().code_length_chips);
		let glo = SignalId::GlonassL1Ca.local_code(1).unwrap();
		assert_eq!(glo.len(), SignalId::GlonassL1Ca.params().code_length_chips);
		assert!(SignalId::GpsL1Ca.local_code(0).is_none());
	}
}
