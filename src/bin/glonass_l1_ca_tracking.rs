
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, App};
use colored::*;
use log::info;
use num_complex::Complex;

use rust_radio_tracking::gnss::common::tracking::{AcquisitionEstimate, TrackingEpoch};
use rust_radio_tracking::gnss::signals::SignalId;
use rust_radio_tracking::gnss::tracking::{Tracking, TrackingResult};
use rust_radio_tracking::gnss::tracking::config::TrackingConfig;
use rust_radio_tracking::io::IqFileSource;

fn main() -> Result<(), Box<dyn Error>> {

	env_logger::init();

	let matches = App::new("GLONASS L1 CA Tracking")
		.version("0.1.0")
		.about("Takes IQ samples centered on 1602 MHz and produces DLL/PLL tracking results for one GLONASS L1 CA satellite")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename, interleaved little-endian i16 I/Q")
			.required(true).takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("freq_channel")
			.short("k").long("freq_channel")
			.help("FDMA frequency channel number, -7 through 6")
			.takes_value(true).required(true).allow_hyphen_values(true))
		.arg(Arg::with_name("slot")
			.short("n").long("slot")
			.help("Orbital slot number, only used to label the output")
			.takes_value(true).default_value("1"))
		.arg(Arg::with_name("code_phase_samples")
			.short("c").long("code_phase_samples")
			.help("Acquisition code phase [samples from the start of the file]")
			.takes_value(true).required(true))
		.arg(Arg::with_name("doppler_hz")
			.short("d").long("doppler_hz")
			.help("Acquisition Doppler [Hz]")
			.takes_value(true).required(true).allow_hyphen_values(true))
		.arg(Arg::with_name("config")
			.long("config")
			.help("JSON tracking configuration; the sample rate and frequency channel given here still apply")
			.takes_value(true))
		.arg(Arg::with_name("dump")
			.long("dump")
			.help("Binary per-epoch dump file")
			.takes_value(true))
		.arg(Arg::with_name("max_records")
			.short("m").long("max_records")
			.takes_value(true))
		.get_matches();

	// Parse mandatory fields
	let fname:&str = matches.value_of("filename").ok_or("filename is required")?;
	let fs:f64     = matches.value_of("sample_rate_sps").ok_or("sample_rate_sps is required")?.parse()?;
	let k:i32      = matches.value_of("freq_channel").ok_or("freq_channel is required")?.parse()?;
	let slot:u32   = matches.value_of("slot").unwrap_or("1").parse()?;
	let acq = AcquisitionEstimate {
		code_phase_samples: matches.value_of("code_phase_samples").ok_or("code_phase_samples is required")?.parse()?,
		doppler_hz: matches.value_of("doppler_hz").ok_or("doppler_hz is required")?.parse()?,
		sample_stamp: 0,
	};

	// Parse optional fields
	let opt_max_records:Option<usize> = match matches.value_of("max_records") {
		Some(s) => Some(s.parse()?),
		None => None,
	};

	let mut cfg:TrackingConfig = match matches.value_of("config") {
		Some(path) => {
			let mut loaded:TrackingConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
			loaded.fs = fs;
			loaded.with_frequency_channel(k)?
		},
		None => TrackingConfig::glonass_l1_ca(fs, k)?,
	};
	if let Some(path) = matches.value_of("dump") { cfg = cfg.with_dump(path); }
	let dump_requested = cfg.dump_filename.is_some();

	eprintln!("Tracking GLONASS L1 CA slot {} on channel {:+} in {} at {} [samples/sec], max_records={:?}", slot, k, &fname, &fs, &opt_max_records);

	let mut trk = Tracking::from_signal(cfg, SignalId::GlonassL1Ca, slot)?;
	let dump_opened = trk.dump_enabled();
	if dump_requested && !dump_opened { eprintln!("{}", "Dump file unavailable, continuing without it".red()); }
	trk.assign_channel(0);
	trk.start_tracking(acq)?;

	let mut src = IqFileSource::new(BufReader::new(File::open(fname)?));
	let mut buffer:Vec<Complex<f64>> = vec![];
	let mut all_results:Vec<TrackingEpoch> = vec![];

	// A read error ends the run with an error rather than passing for the end of the file
	'outer_trk: while let Some(chunk) = src.read_chunk()? {
		buffer.extend(chunk);

		loop {
			let w = trk.work(&buffer);
			buffer.drain(..w.consumed);

			match w.result {
				TrackingResult::Ok(epoch) => {
					let line = format!("{:9.2} [Hz], {:12.3} [chips/sec], {:5.1} [dB-Hz], {:6.3}", epoch.carrier_doppler_hz,
						epoch.code_freq_chips_per_sec, epoch.cn0_db_hz, epoch.carrier_lock_test);
					if epoch.pull_in      { eprintln!("{:10}: PullIn   {}", epoch.sample_idx, line.yellow()); }
					else if epoch.valid   { eprintln!("{:10}: Tracking {}", epoch.sample_idx, line.green()); }
					else                  { eprintln!("{:10}: Invalid  {}", epoch.sample_idx, line.red()); }
					all_results.push(epoch);
					if let Some(max_records) = opt_max_records {
						if all_results.len() >= max_records { break 'outer_trk; }
					}
				},
				TrackingResult::LossOfLock(epoch) => {
					eprintln!("{:10}: {}", epoch.sample_idx, format!("Loss of lock, {:?}", trk.loss_reason()).red());
					all_results.push(epoch);
					break 'outer_trk;
				},
				TrackingResult::NotReady => break,
				TrackingResult::Err(_) => break 'outer_trk,
			}
		}
	}

	trk.stop();
	if dump_opened && !trk.dump_enabled() { eprintln!("{}", "Dump incomplete, a write to it failed".red()); }
	info!("{} epochs, {} samples consumed", all_results.len(), trk.sample_counter());

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&all_results)?);

	Ok(())
}
