
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
	#[error("unable to open dump file {path}: {source}")]
	Open { path:String, source:io::Error },
	#[error("dump I/O error: {0}")]
	Io(#[from] io::Error),
	#[error("dump ends with a partial record of {0} bytes")]
	Truncated(usize),
}

/// Per-epoch diagnostic values.  Stored as eight f64 values, the satellite number as u32 and the absolute sample
/// counter as u64, all little-endian, with no padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DumpRecord {
	pub prompt_i: f64,
	pub prompt_q: f64,
	pub code_error_chips: f64,
	pub carrier_error_cycles: f64,
	pub code_freq_chips_per_sec: f64,
	pub carrier_doppler_hz: f64,
	pub cn0_db_hz: f64,
	pub carrier_lock_test: f64,
	pub sat: u32,
	pub sample_counter: u64,
}

impl DumpRecord {

	pub const SIZE_BYTES:usize = 8*8 + 4 + 8;

	pub fn to_bytes(&self) -> [u8; Self::SIZE_BYTES] {
		let mut buffer = [0u8; Self::SIZE_BYTES];
		let values = [self.prompt_i, self.prompt_q, self.code_error_chips, self.carrier_error_cycles,
			self.code_freq_chips_per_sec, self.carrier_doppler_hz, self.cn0_db_hz, self.carrier_lock_test];
		LittleEndian::write_f64_into(&values, &mut buffer[0..64]);
		LittleEndian::write_u32(&mut buffer[64..68], self.sat);
		LittleEndian::write_u64(&mut buffer[68..76], self.sample_counter);
		buffer
	}

	pub fn from_bytes(buffer:&[u8; Self::SIZE_BYTES]) -> Self {
		let mut values = [0.0f64; 8];
		LittleEndian::read_f64_into(&buffer[0..64], &mut values);
		Self {
			prompt_i: values[0], prompt_q: values[1],
			code_error_chips: values[2], carrier_error_cycles: values[3],
			code_freq_chips_per_sec: values[4], carrier_doppler_hz: values[5],
			cn0_db_hz: values[6], carrier_lock_test: values[7],
			sat: LittleEndian::read_u32(&buffer[64..68]),
			sample_counter: LittleEndian::read_u64(&buffer[68..76]),
		}
	}

	/// One `write_all` per record, so a buffered writer never holds part of a record when a write fails
	pub fn write_to<W: Write>(&self, w:&mut W) -> io::Result<()> {
		w.write_all(&self.to_bytes())
	}

	/// Reads the next record; `Ok(None)` at a clean end of input
	pub fn read_from<R: Read>(r:&mut R) -> Result<Option<Self>, DumpError> {
		let mut buffer = [0u8; Self::SIZE_BYTES];
		let mut filled:usize = 0;
		while filled < Self::SIZE_BYTES {
			match r.read(&mut buffer[filled..]) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(e.into()),
			}
		}

		match filled {
			0 => Ok(None),
			Self::SIZE_BYTES => Ok(Some(Self::from_bytes(&buffer))),
			partial => Err(DumpError::Truncated(partial)),
		}
	}

	pub fn read_all<P: AsRef<Path>>(path:P) -> Result<Vec<Self>, DumpError> {
		let mut reader = BufReader::new(File::open(path)?);
		let mut ans:Vec<Self> = vec![];
		while let Some(rec) = Self::read_from(&mut reader)? { ans.push(rec); }
		Ok(ans)
	}

}

/// Destination for dump records.  The first write failure disables it for good; tracking never sees the error.
pub struct DumpSink {
	writer: Option<Box<dyn Write + Send>>,
	records_written: u64,
}

impl DumpSink {

	pub fn create<P: AsRef<Path>>(path:P) -> Result<Self, DumpError> {
		let path = path.as_ref();
		let file = File::create(path).map_err(|source| DumpError::Open{ path: path.display().to_string(), source })?;
		debug!("Dump file {} opened", path.display());
		Ok(Self::from_writer(Box::new(BufWriter::new(file))))
	}

	pub fn from_writer(writer:Box<dyn Write + Send>) -> Self { Self { writer: Some(writer), records_written: 0 } }

	pub fn is_enabled(&self) -> bool { self.writer.is_some() }
	pub fn records_written(&self) -> u64 { self.records_written }

	pub fn write(&mut self, rec:&DumpRecord) {
		if let Some(w) = self.writer.as_mut() {
			match rec.write_to(w) {
				Ok(()) => self.records_written += 1,
				Err(e) => {
					warn!("Dump write failed after {} records, dump disabled: {}", self.records_written, e);
					self.writer = None;
				}
			}
		}
	}

	pub fn flush(&mut self) {
		if let Some(w) = self.writer.as_mut() {
			if let Err(e) = w.flush() {
				warn!("Dump flush failed, dump disabled: {}", e);
				self.writer = None;
			}
		}
	}

}

impl Drop for DumpSink {
	fn drop(&mut self) { self.flush(); }
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::sync::{Arc, Mutex};

	fn record(k:u64) -> DumpRecord {
		DumpRecord { prompt_i: 1.5e4 + (k as f64), prompt_q: -12.25, code_error_chips: 0.01, carrier_error_cycles: -0.002,
			code_freq_chips_per_sec: 511.0e3 + 0.3, carrier_doppler_hz: -1250.5, cn0_db_hz: 44.1, carrier_lock_test: 0.97,
			sat: 7, sample_counter: 6_625_000 * k }
	}

	#[derive(Clone, Default)]
	struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

	impl Write for SharedBuffer {
		fn write(&mut self, buf:&[u8]) -> io::Result<usize> {
			self.0.lock().map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?.extend_from_slice(buf);
			Ok(buf.len())
		}
		fn flush(&mut self) -> io::Result<()> { Ok(()) }
	}

	struct FailAfter(usize);

	impl Write for FailAfter {
		fn write(&mut self, buf:&[u8]) -> io::Result<usize> {
			if self.0 < buf.len() { return Err(io::Error::new(io::ErrorKind::Other, "disk full")); }
			self.0 -= buf.len();
			Ok(buf.len())
		}
		fn flush(&mut self) -> io::Result<()> { Ok(()) }
	}

	/// Accepts up to `left` bytes, then refuses any write that would not fit
	struct Limited { inner:SharedBuffer, left:usize }

	impl Write for Limited {
		fn write(&mut self, buf:&[u8]) -> io::Result<usize> {
			if buf.len() > self.left { return Err(io::Error::new(io::ErrorKind::Other, "disk full")); }
			self.left -= buf.len();
			self.inner.write(buf)
		}
		fn flush(&mut self) -> io::Result<()> { Ok(()) }
	}

	#[test]
	fn layout_is_fixed() {
		let rec = record(3);
		let bytes = rec.to_bytes();
		assert_eq!(bytes.len(), 76);
		assert_eq!(&bytes[0..8], &rec.prompt_i.to_le_bytes());
		assert_eq!(&bytes[64..68], &7u32.to_le_bytes());
		assert_eq!(&bytes[68..76], &(6_625_000u64 * 3).to_le_bytes());

		let mut streamed:Vec<u8> = vec![];
		rec.write_to(&mut streamed).unwrap();
		assert_eq!(&streamed[..], &bytes[..]);
	}

	#[test]
	fn reads_back_in_order() {
		let buffer = SharedBuffer::default();
		{
			let mut sink = DumpSink::from_writer(Box::new(buffer.clone()));
			for k in 0..5 { sink.write(&record(k)); }
			assert_eq!(sink.records_written(), 5);
		}

		let bytes = buffer.0.lock().unwrap().clone();
		let mut cursor = io::Cursor::new(bytes);
		for k in 0..5 { assert_eq!(DumpRecord::read_from(&mut cursor).unwrap(), Some(record(k))); }
		assert!(DumpRecord::read_from(&mut cursor).unwrap().is_none());
	}

	#[test]
	fn partial_record_is_an_error() {
		let mut cursor = io::Cursor::new(record(1).to_bytes()[..40].to_vec());
		assert!(matches!(DumpRecord::read_from(&mut cursor), Err(DumpError::Truncated(40))));
	}

	#[test]
	fn write_failure_disables_sink() {
		let mut sink = DumpSink::from_writer(Box::new(FailAfter(100)));
		for k in 0..10 { sink.write(&record(k)); }
		assert!(!sink.is_enabled());
		assert_eq!(sink.records_written(), 1);
	}

	#[test]
	fn failed_write_leaves_only_whole_records() {
		let buffer = SharedBuffer::default();
		{
			let limited = Limited{ inner: buffer.clone(), left: 2 * DumpRecord::SIZE_BYTES - 10 };
			let mut sink = DumpSink::from_writer(Box::new(limited));
			for k in 0..4 { sink.write(&record(k)); }
			assert!(!sink.is_enabled());
		}

		let bytes = buffer.0.lock().unwrap().clone();
		assert_eq!(bytes.len(), DumpRecord::SIZE_BYTES);
		let mut cursor = io::Cursor::new(bytes);
		assert_eq!(DumpRecord::read_from(&mut cursor).unwrap(), Some(record(0)));
		assert!(DumpRecord::read_from(&mut cursor).unwrap().is_none());
	}

	#[test]
	fn unopenable_path() {
		let path = std::env::temp_dir().join("no_such_dir_for_dump").join("trk.dat");
		assert!(matches!(DumpSink::create(&path), Err(DumpError::Open{ .. })));
	}
}
