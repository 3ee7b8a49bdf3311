//! Image sync location
//!
//! Finds the sample index of the first image-frame sync pulse after the
//! header region and reports a confidence in the lock. Candidates advance
//! in ~1 ms steps; each is judged by how many of the next ten frame slots
//! show a plausible sync pulse followed by video-band energy. An accepted
//! candidate is then fine-tuned from pulse centre to pulse leading edge.
//!
//! The density tolerances are tuned so demodulator noise does not dislodge
//! a genuine sync while narrow-band image tones cannot imitate one.

use crate::modes::ModeDescriptor;

pub const SYNC_TOLERANCE_HZ: f64 = 150.0;
pub const SYNC_DENSITY_THRESHOLD: f64 = 0.40;
/// The header region skipped before scanning.
pub const SEARCH_SKIP_SECONDS: f64 = 3.0;
/// Frame slots examined per candidate.
pub const FRAMES_TO_VALIDATE: usize = 10;

const SYNC_SAMPLE_STRIDE: usize = 20;
const EARLY_ACCEPT_RUN: usize = 6;
const MIN_VALID_FRAMES: usize = 3;
const VIDEO_CHECK_OFFSET: usize = 50;
const VIDEO_CHECK_STRIDE: usize = 100;
const VIDEO_CHECK_POINTS: usize = 10;
const VIDEO_BAND_LOW_HZ: f64 = 1400.0;
const VIDEO_BAND_HIGH_HZ: f64 = 2400.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncLock {
    pub start_sample: usize,
    /// Fraction of validated frame slots, in `[0, 1]`.
    pub confidence: f32,
}

/// Locator with overridable fine-tune geometry so new modes can adjust the
/// empirically chosen windows.
#[derive(Clone, Debug)]
pub struct SignalLocator {
    sample_rate: f64,
    pub fine_tune_radius: usize,
    pub fine_tune_step: usize,
    pub backtrack_block: usize,
}

impl SignalLocator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
            fine_tune_radius: 500,
            fine_tune_step: 10,
            backtrack_block: 50,
        }
    }

    /// Scan the frequency stream for the first image frame. `None` means
    /// zero confidence.
    pub fn locate(&self, frequencies: &[f32], mode: &ModeDescriptor) -> Option<SyncLock> {
        let frame_samples = mode.frame_samples(self.sample_rate);
        let skip = (SEARCH_SKIP_SECONDS * self.sample_rate) as usize;
        let step = ((self.sample_rate / 1000.0) as usize).max(1);
        let limit = frequencies
            .len()
            .saturating_sub(frame_samples * mode.lines_per_frame);
        if frame_samples == 0 || limit <= skip {
            return None;
        }

        let mut best: Option<(usize, f64, usize)> = None;
        let mut candidate = skip;
        while candidate < limit {
            let (valid, early, score) = self.validate_frames(frequencies, candidate, mode);
            if early {
                let start = self.fine_tune(frequencies, candidate, mode);
                return Some(SyncLock {
                    start_sample: start,
                    confidence: valid as f32 / FRAMES_TO_VALIDATE as f32,
                });
            }
            let better = match best {
                None => valid > 0,
                Some((best_valid, best_score, _)) => {
                    valid > best_valid || (valid == best_valid && score > best_score)
                }
            };
            if better {
                best = Some((valid, score, candidate));
            }
            candidate += step;
        }

        let (valid, _, start) = best?;
        if valid < MIN_VALID_FRAMES {
            return None;
        }
        let start = self.fine_tune(frequencies, start, mode);
        Some(SyncLock {
            start_sample: start,
            confidence: valid as f32 / FRAMES_TO_VALIDATE as f32,
        })
    }

    /// Whether the frame slot starting at `start` looks like a real frame:
    /// a dense sync pulse followed by video-band energy. Also used by the
    /// decode loop to notice mid-image sync loss.
    pub fn frame_is_valid(
        &self,
        frequencies: &[f32],
        start: usize,
        mode: &ModeDescriptor,
    ) -> bool {
        let sync_samples = mode.sync_samples(self.sample_rate);
        let density = self.sync_density(
            frequencies,
            start,
            sync_samples,
            SYNC_SAMPLE_STRIDE,
            mode.sync_hz,
        );
        if density < SYNC_DENSITY_THRESHOLD {
            return false;
        }

        let probe = start + sync_samples + VIDEO_CHECK_OFFSET;
        let mut in_band = 0;
        for point in 0..VIDEO_CHECK_POINTS {
            let at = probe + point * VIDEO_CHECK_STRIDE;
            if at >= frequencies.len() {
                break;
            }
            let f = f64::from(frequencies[at]);
            if (VIDEO_BAND_LOW_HZ..=VIDEO_BAND_HIGH_HZ).contains(&f) {
                in_band += 1;
            }
        }
        in_band >= VIDEO_CHECK_POINTS / 2
    }

    fn validate_frames(
        &self,
        frequencies: &[f32],
        candidate: usize,
        mode: &ModeDescriptor,
    ) -> (usize, bool, f64) {
        let frame_samples = mode.frame_samples(self.sample_rate);
        let sync_samples = mode.sync_samples(self.sample_rate);
        let mut valid = 0;
        let mut run = 0;
        let mut score = 0.0;
        for k in 0..FRAMES_TO_VALIDATE {
            let start = candidate + k * frame_samples;
            if start + frame_samples > frequencies.len() {
                break;
            }
            if self.frame_is_valid(frequencies, start, mode) {
                valid += 1;
                run += 1;
                score += self.sync_density(
                    frequencies,
                    start,
                    sync_samples,
                    SYNC_SAMPLE_STRIDE,
                    mode.sync_hz,
                );
                if run >= EARLY_ACCEPT_RUN {
                    return (valid, true, score);
                }
            } else {
                run = 0;
            }
        }
        (valid, false, score)
    }

    /// Move an accepted candidate onto the sync pulse's leading edge:
    /// search the surrounding radius for the densest window, then walk
    /// backwards block by block while the pulse continues. The walk is
    /// bounded by the pulse's own length.
    fn fine_tune(&self, frequencies: &[f32], accepted: usize, mode: &ModeDescriptor) -> usize {
        let sync_samples = mode.sync_samples(self.sample_rate);
        let lo = accepted.saturating_sub(self.fine_tune_radius);
        let hi = (accepted + self.fine_tune_radius)
            .min(frequencies.len().saturating_sub(sync_samples));

        let mut best = accepted.min(hi);
        let mut best_density = -1.0;
        let mut position = lo;
        while position <= hi {
            let density =
                self.sync_density(frequencies, position, sync_samples, 1, mode.sync_hz);
            if density > best_density {
                best_density = density;
                best = position;
            }
            position += self.fine_tune_step;
        }

        let mut moved = 0;
        while best >= self.backtrack_block && moved + self.backtrack_block <= sync_samples {
            let block = best - self.backtrack_block;
            let density =
                self.sync_density(frequencies, block, self.backtrack_block, 1, mode.sync_hz);
            if density < SYNC_DENSITY_THRESHOLD {
                break;
            }
            best = block;
            moved += self.backtrack_block;
        }
        best
    }

    fn sync_density(
        &self,
        frequencies: &[f32],
        start: usize,
        len: usize,
        stride: usize,
        sync_hz: f64,
    ) -> f64 {
        let mut hits = 0usize;
        let mut total = 0usize;
        let mut at = start;
        while at < start + len {
            if at >= frequencies.len() {
                break;
            }
            total += 1;
            if (f64::from(frequencies[at]) - sync_hz).abs() <= SYNC_TOLERANCE_HZ {
                hits += 1;
            }
            at += stride.max(1);
        }
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
