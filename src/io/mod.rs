
use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};
use num_complex::Complex;

pub const BUFFER_SIZE:usize = 2048;

/// Bytes in one interleaved I/Q sample
const SAMPLE_BYTES:usize = 4;

/// Reads interleaved little-endian i16 I/Q pairs and hands them out in chunks of up to `chunk_len` complex samples.
/// A trailing partial sample at the end of the input is dropped.
pub struct IqFileSource<S: Read> {
	src: S,
	chunk_len: usize,
	bytes: Vec<u8>,
	carry: usize,
	samples_read: u64,
}

impl<S: Read> IqFileSource<S> {

	pub fn new(src:S) -> Self { Self::with_chunk_len(src, BUFFER_SIZE) }

	pub fn with_chunk_len(src:S, chunk_len:usize) -> Self {
		let chunk_len = chunk_len.max(1);
		Self { src, chunk_len, bytes: vec![0u8; chunk_len * SAMPLE_BYTES], carry: 0, samples_read: 0 }
	}

	/// Absolute index of the next sample to be returned
	pub fn samples_read(&self) -> u64 { self.samples_read }

	/// Skips `n` samples, returning how many were actually available
	pub fn skip_samples(&mut self, n:u64) -> io::Result<u64> {
		let mut skipped:u64 = 0;
		while skipped < n {
			let want = ((n - skipped) as usize).min(self.chunk_len);
			match self.read_samples(want)? {
				Some(chunk) => skipped += chunk.len() as u64,
				None => break,
			}
		}
		Ok(skipped)
	}

	/// Reads the next chunk; `Ok(None)` once the input is exhausted
	pub fn read_chunk(&mut self) -> io::Result<Option<Vec<Complex<f64>>>> {
		let n = self.chunk_len;
		self.read_samples(n)
	}

	fn read_samples(&mut self, n:usize) -> io::Result<Option<Vec<Complex<f64>>>> {
		let want = n * SAMPLE_BYTES;
		let mut filled = self.carry;
		while filled < want {
			match self.src.read(&mut self.bytes[filled..want]) {
				Ok(0) => break,
				Ok(k) => filled += k,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(e),
			}
		}

		let whole = filled / SAMPLE_BYTES;
		if whole == 0 {
			self.carry = 0;
			return Ok(None);
		}

		let chunk:Vec<Complex<f64>> = self.bytes[..whole * SAMPLE_BYTES].chunks_exact(SAMPLE_BYTES).map(|b| {
			let re = LittleEndian::read_i16(&b[0..2]);
			let im = LittleEndian::read_i16(&b[2..4]);
			Complex{ re: re as f64, im: im as f64 }
		}).collect();

		// Keep a partial sample for the next read in case more bytes turn up
		let rest = filled - whole * SAMPLE_BYTES;
		self.bytes.copy_within(whole * SAMPLE_BYTES..filled, 0);
		self.carry = rest;

		self.samples_read += whole as u64;
		Ok(Some(chunk))
	}

}
