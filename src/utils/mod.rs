
/// Wraps `x` into `[0, modulus)`.  Values that land exactly on `modulus` after floating-point rounding are folded to zero.
pub fn wrap(x:f64, modulus:f64) -> f64 {
	let ans = x.rem_euclid(modulus);
	if ans >= modulus { 0.0 } else { ans }
}

/// Index of the chip containing phase `x` (in chips) for a code of `len` chips
pub fn wrap_floor(x:f64, len:usize) -> usize {
	(x.floor().rem_euclid(len as f64) as usize) % len
}

/// Maps a phase in `[0, modulus)` to the signed distance from the nearest period boundary, i.e. `(-modulus/2, modulus/2]`
pub fn signed_residual(x:f64, modulus:f64) -> f64 {
	if x > 0.5 * modulus { x - modulus } else { x }
}

pub fn all_finite(xs:&[f64]) -> bool { xs.iter().all(|x| x.is_finite()) }
