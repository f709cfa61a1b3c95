
pub mod common;

/// Spreading codes and the read-only signal catalogue
pub mod signals;

/// This module contains functionality related to tracking signals after acquisition
pub mod tracking;
