
use log::{debug, warn};
use num_complex::Complex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gnss::common::tracking::{AcquisitionEstimate, TrackingEpoch};
use crate::gnss::tracking::{Tracking, TrackingResult};
use crate::DigSigProcErr;

pub const CHANNEL_CAPACITY:usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingControl {
	AssignChannel(u32),
	StartTracking(AcquisitionEstimate),
	Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
	Epoch(TrackingEpoch),
	/// Follows the (invalid) epoch on which lock was lost; nothing more comes from the channel until it is restarted
	LossOfLock { channel_id:u32, sat:u32, sample_idx:u64, reason:DigSigProcErr },
}

/// One tracking channel running as a task.  Sample buffers go in through `tx_input` in stream order, with no gaps;
/// control messages are applied before the next input buffer is used.
pub struct Block {
	pub tx_control: mpsc::Sender<TrackingControl>,
	pub tx_input:   mpsc::Sender<Vec<Complex<f64>>>,
	pub rx_output:  mpsc::Receiver<ChannelMessage>,
	pub handles:    Vec<JoinHandle<Result<(), &'static str>>>,
}

impl Block {

	pub fn from(trk:Tracking) -> Self {

		let (tx_control, mut rx_control) = mpsc::channel::<TrackingControl>(CHANNEL_CAPACITY);
		let (tx_input,   mut rx_input)   = mpsc::channel::<Vec<Complex<f64>>>(CHANNEL_CAPACITY);
		let (tx_output,  rx_output)      = mpsc::channel::<ChannelMessage>(CHANNEL_CAPACITY);

		let handle:JoinHandle<Result<(), &'static str>> = tokio::spawn(async move {

			let mut owned_trk = trk;
			let mut buffer:Vec<Complex<f64>> = vec![];

			while let Some(t) = rx_input.recv().await {

				// Interleaving control handling with input handling keeps all tracking state inside this task
				while let Ok(c) = rx_control.try_recv() {
					match c {
						TrackingControl::AssignChannel(id) => owned_trk.assign_channel(id),
						TrackingControl::StartTracking(acq) => {
							if let Err(e) = owned_trk.start_tracking(acq) { warn!("Channel {}: start refused: {}", owned_trk.channel_id(), e); }
						},
						TrackingControl::Stop => owned_trk.stop(),
					}
				}

				buffer.extend(t);

				loop {
					let w = owned_trk.work(&buffer);
					buffer.drain(..w.consumed);

					match w.result {
						TrackingResult::Ok(epoch) => {
							tx_output.send(ChannelMessage::Epoch(epoch)).await.map_err(|_| "Unable to send output")?;
						},
						TrackingResult::LossOfLock(epoch) => {
							let (channel_id, sat, sample_idx) = (epoch.channel_id, epoch.sat, epoch.sample_idx);
							let reason = owned_trk.loss_reason().unwrap_or(DigSigProcErr::LossOfLock);
							tx_output.send(ChannelMessage::Epoch(epoch)).await.map_err(|_| "Unable to send output")?;
							tx_output.send(ChannelMessage::LossOfLock{ channel_id, sat, sample_idx, reason }).await.map_err(|_| "Unable to send output")?;
						},
						TrackingResult::NotReady | TrackingResult::Err(_) => break,
					}
				}

			}

			owned_trk.stop();
			debug!("Channel {} task finished at sample {}", owned_trk.channel_id(), owned_trk.sample_counter());

			Ok(())
		});

		let handles = vec![handle];

		Block{ tx_control, tx_input, rx_output, handles }
	}

	/// Closes the inputs and waits for the task, which stops tracking and flushes the dump on its way out
	pub async fn shutdown(self) -> Result<(), &'static str> {

		let Block{ tx_control, tx_input, rx_output:_, handles } = self;

		drop(tx_control);
		drop(tx_input);

		for handle in handles {
			handle.await.map_err(|_| "Block task panicked or was cancelled")??;
		}

		Ok(())
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	use std::f64::consts;

	use rand::prelude::*;

	use crate::gnss::signals::SignalId;
	use crate::gnss::tracking::config::TrackingConfig;

	const FS:f64 = 4.1e6;

	fn signal(code:&[f64], n:usize, delay_chips:f64, doppler_hz:f64) -> Vec<Complex<f64>> {
		(0..n).map(|i| {
			let t = i as f64;
			let chip = (t * 1.0e6 / FS - delay_chips).floor() as i64;
			Complex::from_polar(code[chip.rem_euclid(code.len() as i64) as usize], 2.0 * consts::PI * doppler_hz * t / FS)
		}).collect()
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn streams_epochs_in_order() {
		let mut rng = StdRng::seed_from_u64(21);
		let code:Vec<f64> = (0..1000).map(|_| if rng.gen::<bool>() { 1.0 } else { -1.0 }).collect();
		let x = signal(&code, 4100 * 105, 42.25, 150.0);

		let cfg = TrackingConfig::new(FS, 1000, vec![-0.5, 0.0, 0.5], 2.0, 20.0);
		let trk = Tracking::new(cfg, SignalId::GlonassL1Ca, 5, code).unwrap();

		let Block{ tx_control, tx_input, mut rx_output, handles } = Block::from(trk);
		tx_control.send(TrackingControl::AssignChannel(2)).await.unwrap();
		tx_control.send(TrackingControl::StartTracking(AcquisitionEstimate{ code_phase_samples: 42.25 * 4.1, doppler_hz: 145.0, sample_stamp: 0 })).await.unwrap();

		let feeder = tokio::spawn(async move {
			for chunk in x.chunks(3001) { tx_input.send(chunk.to_vec()).await.unwrap(); }
		});

		let mut epochs:Vec<TrackingEpoch> = vec![];
		while let Some(msg) = rx_output.recv().await {
			match msg {
				ChannelMessage::Epoch(e) => epochs.push(e),
				other => panic!("Unexpected {:?}", other),
			}
		}

		feeder.await.unwrap();
		for handle in handles { handle.await.unwrap().unwrap(); }
		drop(tx_control);

		assert!(epochs.len() >= 100);
		assert!(epochs.iter().all(|e| e.channel_id == 2 && e.sat == 5));
		for w in epochs.windows(2) { assert_eq!(w[1].sample_idx, w[0].sample_idx + w[0].samples_in_epoch as u64); }
		assert!((epochs.last().unwrap().carrier_doppler_hz - 150.0).abs() < 2.0);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn reports_loss_of_lock_once() {
		let mut rng = StdRng::seed_from_u64(22);
		let code:Vec<f64> = (0..1000).map(|_| if rng.gen::<bool>() { 1.0 } else { -1.0 }).collect();
		let mut x = signal(&code, 4100 * 40, 10.0, 0.0);
		x.extend(vec![Complex::new(0.0, 0.0); 4100 * 40]);

		let mut cfg = TrackingConfig::new(FS, 1000, vec![-0.5, 0.0, 0.5], 2.0, 20.0);
		cfg.max_lock_fail = 5;
		let trk = Tracking::new(cfg, SignalId::GlonassL1Ca, 5, code).unwrap();

		let mut block = Block::from(trk);
		block.tx_control.send(TrackingControl::StartTracking(AcquisitionEstimate{ code_phase_samples: 41.0, doppler_hz: 0.0, sample_stamp: 0 })).await.unwrap();

		let tx_input = block.tx_input;
		let feeder = tokio::spawn(async move {
			for chunk in x.chunks(10_000) { tx_input.send(chunk.to_vec()).await.unwrap(); }
		});

		let mut losses:usize = 0;
		let mut after_loss:usize = 0;
		while let Some(msg) = block.rx_output.recv().await {
			match msg {
				ChannelMessage::LossOfLock{ reason, .. } => { losses += 1; assert_eq!(reason, DigSigProcErr::LossOfLock); },
				ChannelMessage::Epoch(_) => if losses > 0 { after_loss += 1 },
			}
		}

		assert_eq!((losses, after_loss), (1, 0));
		feeder.await.unwrap();
		for handle in block.handles { handle.await.unwrap().unwrap(); }
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn idle_block_shuts_down() {
		let cfg = TrackingConfig::new(FS, 1000, vec![-0.5, 0.0, 0.5], 2.0, 20.0);
		let trk = Tracking::new(cfg, SignalId::GlonassL1Ca, 5, vec![1.0; 1000]).unwrap();

		let mut block = Block::from(trk);
		block.tx_control.send(TrackingControl::AssignChannel(7)).await.unwrap();
		block.tx_input.send(vec![Complex::new(1.0, 0.0); 50_000]).await.unwrap();
		block.tx_control.send(TrackingControl::Stop).await.unwrap();

		assert!(block.rx_output.try_recv().is_err());
		assert_eq!(block.shutdown().await, Ok(()));
	}
}
