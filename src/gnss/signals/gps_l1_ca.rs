
pub const CODE_LENGTH:usize = 1023;
pub const CHIPS_PER_SEC:f64 = 1.023e6;
pub const CARRIER_HZ:f64 = 1.57542e9;

// G2 phase selector taps (1-based register stages) for PRN 1 through 32
const G2_TAPS:[(usize, usize); 32] = [
	(2, 6), (3, 7), (4, 8), (5, 9), (1, 9), (2, 10), (1, 8), (2, 9),
	(3, 10), (2, 3), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9, 10),
	(1, 4), (2, 5), (3, 6), (4, 7), (5, 8), (6, 9), (1, 3), (4, 6),
	(5, 7), (6, 8), (7, 9), (8, 10), (1, 6), (2, 7), (3, 8), (4, 9),
];

/// C/A Gold code chips as logic levels
pub fn prn_bool(prn:u32) -> Option<Vec<bool>> {
	if prn < 1 || prn as usize > G2_TAPS.len() { return None; }
	let (s1, s2) = G2_TAPS[(prn - 1) as usize];

	let mut g1:[bool; 10] = [true; 10];
	let mut g2:[bool; 10] = [true; 10];

	let chips = (0..CODE_LENGTH).map(|_| {
		let chip = g1[9] ^ g2[s1 - 1] ^ g2[s2 - 1];

		let fb1 = g1[2] ^ g1[9];
		let fb2 = g2[1] ^ g2[2] ^ g2[5] ^ g2[7] ^ g2[8] ^ g2[9];
		g1.rotate_right(1);
		g2.rotate_right(1);
		g1[0] = fb1;
		g2[0] = fb2;

		chip
	}).collect();

	Some(chips)
}

pub fn prn_bipolar(prn:u32) -> Option<Vec<f64>> {
	prn_bool(prn).map(|chips| chips.iter().map(|b| if *b { -1.0 } else { 1.0 }).collect())
}
