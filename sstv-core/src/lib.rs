//! SSTV streaming decode engine
//!
//! Turns amateur-radio slow-scan television audio into raster images:
//! quadrature FM demodulation, VIS header detection, sync location, and
//! time-based line decoding for the PD120, PD180 and Robot36 modes, all
//! behind a single-threaded controller with a synchronous observer.
//!
//! The typical entry point is [`SstvDecoder`]: construct it for a sample
//! rate, feed audio through [`SstvDecoder::push_samples`] (or hand over a
//! whole recording with [`SstvDecoder::decode_all`]) and read rows out of
//! the [`PixelBuffer`] as they arrive.

pub mod audio_file;
pub mod channel;
pub mod decoder;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod image;
pub mod intake;
pub mod modes;
pub mod options;
pub mod pcm;
pub mod scan;
pub mod signal_gen;
pub mod signal_processing;
pub mod sync;
pub mod vis;

pub use decoder::{SstvDecoder, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use errors::{AudioLoadError, DecodeError, Result};
pub use events::{DecodeObserver, DecoderState};
pub use image::PixelBuffer;
pub use modes::{ComponentLayout, ModeDescriptor, SstvMode};
pub use options::DecodingOptions;
