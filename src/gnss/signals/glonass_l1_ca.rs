
pub const CODE_LENGTH:usize = 511;
pub const CHIPS_PER_SEC:f64 = 511.0e3;
pub const CARRIER_HZ:f64 = 1.602e9;

/// Spacing between adjacent FDMA frequency channels
pub const CHANNEL_SPACING_HZ:f64 = 562.5e3;
pub const MIN_FREQUENCY_CHANNEL:i32 = -7;
pub const MAX_FREQUENCY_CHANNEL:i32 = 6;

/// Maximal-length code from a 9-stage register with feedback 1 + x^5 + x^9, seeded with all ones and read from stage 7.
/// Every satellite transmits the same code; they are separated in frequency.
pub fn code_bool() -> Vec<bool> {
	let mut reg:[bool; 9] = [true; 9];
	(0..CODE_LENGTH).map(|_| {
		let chip = reg[6];
		let fb = reg[4] ^ reg[8];
		reg.rotate_right(1);
		reg[0] = fb;
		chip
	}).collect()
}

/// The satellite number is accepted for symmetry with CDMA signals; any slot 1..=24 maps to the same code
pub fn code_bipolar(slot:u32) -> Option<Vec<f64>> {
	if slot < 1 || slot > 24 { return None; }
	Some(code_bool().iter().map(|b| if *b { -1.0 } else { 1.0 }).collect())
}

/// RF carrier for frequency channel `k`, or None outside the assigned channel range
pub fn carrier_hz(k:i32) -> Option<f64> {
	if k < MIN_FREQUENCY_CHANNEL || k > MAX_FREQUENCY_CHANNEL { None }
	else { Some(CARRIER_HZ + (k as f64) * CHANNEL_SPACING_HZ) }
}

/// Baseband offset of channel `k` when the front end is centred on 1602 MHz
pub fn intermediate_frequency_hz(k:i32) -> Option<f64> {
	carrier_hz(k).map(|f| f - CARRIER_HZ)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn leading_chips() {
		let chips:Vec<u8> = code_bool()[..9].iter().map(|b| *b as u8).collect();
		assert_eq!(chips, vec![1, 1, 1, 1, 1, 1, 1, 0, 0]);
	}

	#[test]
	fn m_sequence_autocorrelation() {
		let code = code_bipolar(1).unwrap();
		assert_eq!(code.iter().filter(|c| **c < 0.0).count(), 256);

		for shift in 1..CODE_LENGTH {
			let r:f64 = (0..CODE_LENGTH).map(|i| code[i] * code[(i + shift) % CODE_LENGTH]).sum();
			assert_eq!(r, -1.0, "shift {}", shift);
		}
	}

	#[test]
	fn fdma_plan() {
		assert_eq!(carrier_hz(0), Some(1.602e9));
		assert_eq!(intermediate_frequency_hz(-7), Some(-7.0 * 562.5e3));
		assert!((carrier_hz(6).unwrap() - 1.605375e9).abs() < 1.0e-3);
		assert!(carrier_hz(7).is_none());
		assert!(code_bipolar(0).is_none());
	}
}
