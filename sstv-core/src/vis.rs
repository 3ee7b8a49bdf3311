//! VIS header detection
//!
//! The mode identifier precedes image data as a 1900 Hz leader, a 1200 Hz
//! break-plus-start interval, then eight 30 ms data bits (LSB first,
//! 1100 Hz = 0, 1300 Hz = 1) and a stop bit. Detection runs over the
//! demodulated frequency stream: a windowed mean tracks the leader run and
//! per-bit means classify the payload.

use crate::modes::{vis_code_name, SstvMode};

pub const LEADER_HZ: f64 = 1900.0;
pub const LEADER_TOLERANCE_HZ: f64 = 100.0;
pub const BIT_ZERO_HZ: f64 = 1100.0;
pub const BIT_ONE_HZ: f64 = 1300.0;
pub const BIT_TOLERANCE_HZ: f64 = 50.0;
pub const BIT_MS: f64 = 30.0;
/// Break plus start bit, both at 1200 Hz, consumed but not decoded.
pub const BREAK_AND_START_MS: f64 = 60.0;
/// Headers are only searched for within the first 30 s of audio.
pub const MAX_SCAN_SECONDS: f64 = 30.0;
/// Re-attempts allowed after a partial match before giving up.
pub const MAX_ATTEMPTS: usize = 5;

const LEADER_WINDOW_MS: f64 = 10.0;
// 200 ms of the nominal 300 ms leader must hold the tone.
const LEADER_MIN_WINDOWS: usize = 20;
// A frequency this far below the leader marks its falling edge.
const LEADER_EXIT_HZ: f64 = 1600.0;
const BREAK_HZ: f64 = 1200.0;
const BREAK_TOLERANCE_HZ: f64 = 100.0;

/// A successfully read header. `mode` is `None` for codes the detector can
/// name but the engine cannot decode (PD240, PD50, PD160).
#[derive(Clone, Debug, PartialEq)]
pub struct VisDetection {
    pub vis_code: u8,
    pub mode: Option<SstvMode>,
    pub mode_name: &'static str,
    /// First sample after the stop bit, where image framing can begin.
    pub start_sample: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VisOutcome {
    Found(VisDetection),
    /// No conclusive header yet, but the scan window is not exhausted.
    NeedMoreSamples,
    /// All attempts failed or the scan cap was reached without a header.
    Exhausted,
}

enum HeaderRead {
    Code { vis_code: u8, start_sample: usize },
    Ambiguous,
    Truncated,
}

#[derive(Clone, Debug)]
pub struct VisDetector {
    sample_rate: f64,
}

impl VisDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
        }
    }

    fn ms_samples(&self, ms: f64) -> usize {
        (ms * self.sample_rate / 1000.0).round() as usize
    }

    /// Scan the frequency stream for a VIS header. Deterministic: the same
    /// stream always yields the same outcome, and a `Found` result never
    /// changes once returned for a prefix.
    pub fn detect(&self, frequencies: &[f32]) -> VisOutcome {
        let cap = (MAX_SCAN_SECONDS * self.sample_rate) as usize;
        let scan_len = frequencies.len().min(cap);
        let capped = frequencies.len() >= cap;

        let mut cursor = 0;
        let mut attempts = 0;
        while attempts < MAX_ATTEMPTS {
            let Some(leader_end) = self.find_leader(&frequencies[..scan_len], cursor) else {
                return if capped {
                    VisOutcome::Exhausted
                } else {
                    VisOutcome::NeedMoreSamples
                };
            };

            match self.read_header(frequencies, leader_end) {
                HeaderRead::Code {
                    vis_code,
                    start_sample,
                } => {
                    if let Some(mode) = SstvMode::from_vis_code(vis_code) {
                        return VisOutcome::Found(VisDetection {
                            vis_code,
                            mode: Some(mode),
                            mode_name: mode.name(),
                            start_sample,
                        });
                    }
                    if let Some(mode_name) = vis_code_name(vis_code) {
                        return VisOutcome::Found(VisDetection {
                            vis_code,
                            mode: None,
                            mode_name,
                            start_sample,
                        });
                    }
                    // Unrecognised code: likely bit errors, try again
                    attempts += 1;
                    cursor = leader_end;
                }
                HeaderRead::Ambiguous => {
                    attempts += 1;
                    cursor = leader_end;
                }
                HeaderRead::Truncated => return VisOutcome::NeedMoreSamples,
            }
        }
        VisOutcome::Exhausted
    }

    /// Find the falling edge of the next leader tone at or after `cursor`.
    fn find_leader(&self, frequencies: &[f32], cursor: usize) -> Option<usize> {
        let window = self.ms_samples(LEADER_WINDOW_MS).max(1);
        let mut run = 0usize;
        let mut position = cursor;
        while position + window <= frequencies.len() {
            let mean = mean(&frequencies[position..position + window]);
            if (mean - LEADER_HZ).abs() <= LEADER_TOLERANCE_HZ {
                run += 1;
            } else if run >= LEADER_MIN_WINDOWS {
                // The tone just ended inside this window; refine to sample
                // resolution.
                let exit = frequencies[position..position + window]
                    .iter()
                    .position(|&f| (f as f64) < LEADER_EXIT_HZ)
                    .map(|offset| position + offset)
                    .unwrap_or(position);
                return Some(exit);
            } else {
                run = 0;
            }
            position += window;
        }
        None
    }

    fn read_header(&self, frequencies: &[f32], leader_end: usize) -> HeaderRead {
        let bit = self.ms_samples(BIT_MS);
        let bits_start = leader_end + self.ms_samples(BREAK_AND_START_MS);
        let bits_end = bits_start + 8 * bit;
        if bits_end > frequencies.len() {
            return HeaderRead::Truncated;
        }

        // Sanity-check the break region before trusting the bits.
        let break_lo = leader_end + self.ms_samples(5.0);
        let break_hi = leader_end + self.ms_samples(55.0);
        let break_mean = mean(&frequencies[break_lo..break_hi]);
        if (break_mean - BREAK_HZ).abs() > BREAK_TOLERANCE_HZ {
            return HeaderRead::Ambiguous;
        }

        let mut vis_code = 0u8;
        for index in 0..8 {
            let start = bits_start + index * bit;
            // Average the central span only; the edges carry transition
            // smear from the analysis filter.
            let lo = start + bit / 5;
            let hi = start + bit * 4 / 5;
            let value = mean(&frequencies[lo..hi]);
            if (value - BIT_ONE_HZ).abs() <= BIT_TOLERANCE_HZ {
                vis_code |= 1 << index;
            } else if (value - BIT_ZERO_HZ).abs() > BIT_TOLERANCE_HZ {
                return HeaderRead::Ambiguous;
            }
        }

        HeaderRead::Code {
            vis_code,
            start_sample: bits_end + bit,
        }
    }
}

fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}
