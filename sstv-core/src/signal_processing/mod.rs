//! Signal processing primitives for the decode pipeline
//!
//! `filters` holds the FIR design and convolution shared by the analysis
//! chain; `demodulation` turns real audio into the instantaneous-frequency
//! stream every later stage consumes.

pub mod demodulation;
pub mod filters;

pub use demodulation::FmDemodulator;
