
pub mod block;

pub mod filters;
pub mod io;
pub mod gnss;

pub mod utils;

use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum DigSigProcErr {
	#[error("loss of lock")]
	LossOfLock,
	/// A phase, frequency, or discriminator value became NaN or infinite
	#[error("non-finite value in {0}")]
	NumericDivergence(&'static str),
	#[error("{0}")]
	Other(&'static str),
}
