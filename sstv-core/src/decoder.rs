//! The SSTV decode controller
//!
//! Owns the whole pipeline (intake, demodulation, VIS detection, sync
//! location, frame decoding) behind one object with a state machine and a
//! synchronous observer. Everything runs on the caller's thread inside
//! `push_samples`; failures become state transitions, never panics.

use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticLevel};
use crate::errors::{DecodeError, Result};
use crate::events::{DecodeObserver, DecoderState};
use crate::image::PixelBuffer;
use crate::intake::SampleBuffer;
use crate::modes::SstvMode;
use crate::options::DecodingOptions;
use crate::scan::ScanDecoder;
use crate::signal_processing::FmDemodulator;
use crate::sync::{SignalLocator, SEARCH_SKIP_SECONDS, FRAMES_TO_VALIDATE};
use crate::vis::{VisDetector, VisOutcome, MAX_SCAN_SECONDS};

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

// VIS detection waits for at least this much buffered audio.
const MIN_VIS_SECONDS: f64 = 2.0;
// Locks below this confidence count as no lock at all.
const SYNC_CONFIDENCE_EPSILON: f32 = 1e-9;
const PROGRESS_LINE_INTERVAL: usize = 10;

/// Streaming SSTV decoder.
///
/// Feed it audio with [`push_samples`](Self::push_samples) and it advances
/// as far as the buffered data allows, or hand it everything at once with
/// [`decode_all`](Self::decode_all). Two instances are fully independent;
/// nothing here is shared or global.
pub struct SstvDecoder {
    sample_rate: u32,
    options: DecodingOptions,
    observer: Option<Box<dyn DecodeObserver>>,
    diagnostics_enabled: bool,

    intake: SampleBuffer,
    frequencies: Vec<f32>,
    demodulated_len: usize,

    demodulator: FmDemodulator,
    locator: SignalLocator,
    detector: VisDetector,

    mode: Option<SstvMode>,
    forced_mode: bool,
    image: Option<PixelBuffer>,
    state: DecoderState,
    signal_start: Option<usize>,
    next_frame: usize,
    last_confidence: Option<f32>,
    // Sample count at the last failed sync search; the locator only runs
    // again once the buffer has grown past it.
    search_watermark: usize,
    flushing: bool,
}

impl SstvDecoder {
    /// Decoder that auto-detects the mode from the VIS header.
    pub fn new(sample_rate: u32) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(DecodeError::InvalidSampleRate { rate: sample_rate });
        }
        Ok(Self {
            sample_rate,
            options: DecodingOptions::default(),
            observer: None,
            diagnostics_enabled: false,
            intake: SampleBuffer::new(),
            frequencies: Vec::new(),
            demodulated_len: 0,
            demodulator: FmDemodulator::new(sample_rate),
            locator: SignalLocator::new(sample_rate),
            detector: VisDetector::new(sample_rate),
            mode: None,
            forced_mode: false,
            image: None,
            state: DecoderState::Idle,
            signal_start: None,
            next_frame: 0,
            last_confidence: None,
            search_watermark: 0,
            flushing: false,
        })
    }

    /// Decoder with a caller-forced mode; VIS detection is skipped.
    pub fn new_with_mode(mode: SstvMode, sample_rate: u32) -> Result<Self> {
        let mut decoder = Self::new(sample_rate)?;
        decoder.install_mode(mode);
        decoder.forced_mode = true;
        Ok(decoder)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn mode(&self) -> Option<SstvMode> {
        self.mode
    }

    /// Confidence of the most recent sync lock, if any.
    pub fn sync_confidence(&self) -> Option<f32> {
        self.last_confidence
    }

    pub fn options(&self) -> &DecodingOptions {
        &self.options
    }

    /// Mutable options; setters clamp, so the value stays in range.
    pub fn options_mut(&mut self) -> &mut DecodingOptions {
        &mut self.options
    }

    pub fn set_options(&mut self, options: DecodingOptions) {
        self.options = options;
    }

    pub fn set_observer(&mut self, observer: Box<dyn DecodeObserver>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn DecodeObserver>> {
        self.observer.take()
    }

    /// Turn on `emitted_diagnostic` events.
    pub fn enable_diagnostics(&mut self) {
        self.diagnostics_enabled = true;
    }

    /// The pixel buffer, present from the moment a mode is known. Partial
    /// reads are meaningful: rows at or beyond `lines_written` are zero.
    pub fn image(&self) -> Option<&PixelBuffer> {
        self.image.as_ref()
    }

    pub fn lines_written(&self) -> usize {
        self.image.as_ref().map_or(0, PixelBuffer::lines_written)
    }

    /// Force a mode, resetting everything except sample rate, observer and
    /// options.
    pub fn set_mode(&mut self, mode: SstvMode) {
        self.reset();
        self.install_mode(mode);
        self.forced_mode = true;
    }

    /// As `set_mode`, by case-insensitive name. An unrecognised name is a
    /// protocol error: the decoder transitions to `Error(UnknownMode)` and
    /// the same error is returned for convenience.
    pub fn set_mode_by_name(&mut self, name: &str) -> Result<()> {
        match SstvMode::from_name(name) {
            Some(mode) => {
                self.set_mode(mode);
                Ok(())
            }
            None => {
                let error = DecodeError::UnknownMode {
                    name: name.to_string(),
                };
                self.fail(error.clone());
                Err(error)
            }
        }
    }

    /// Clear all accumulated data and return to `Idle`. Sample rate,
    /// observer and options survive; buffer capacity is kept. Idempotent.
    pub fn reset(&mut self) {
        self.intake.reset();
        self.frequencies.clear();
        self.demodulated_len = 0;
        self.mode = None;
        self.forced_mode = false;
        self.image = None;
        self.signal_start = None;
        self.next_frame = 0;
        self.last_confidence = None;
        self.search_watermark = 0;
        self.flushing = false;
        self.state = DecoderState::Idle;
    }

    /// As `reset`, but the current mode (and its forced flag) survives.
    pub fn reset_keeping_mode(&mut self) {
        let mode = self.mode;
        let forced = self.forced_mode;
        self.reset();
        self.mode = mode;
        self.forced_mode = forced;
    }

    /// Append audio and advance the state machine as far as the buffered
    /// data permits. In terminal states samples are silently discarded.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if self.state.is_terminal() {
            return;
        }
        self.intake.push(samples);
        self.drive();
    }

    /// Declare the stream finished. Gates that normally wait for more
    /// audio are relaxed, trailing frequencies become final, and if the
    /// decode still cannot finish the state becomes the matching terminal
    /// error.
    pub fn flush(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.drain();
        if self.state.is_terminal() {
            return;
        }
        let error = self.exhaustion_error();
        self.fail(error);
    }

    /// One-shot decode: reset, push everything, drain. Returns the
    /// finished buffer on completion, the decode error if the engine
    /// failed, and a partial buffer if the audio simply ran out mid-image.
    pub fn decode_all(&mut self, samples: &[f32]) -> Result<PixelBuffer> {
        if self.forced_mode {
            self.reset_keeping_mode();
        } else {
            self.reset();
        }
        self.push_samples(samples);
        self.drain();
        match &self.state {
            DecoderState::Complete => match self.image.as_ref() {
                Some(buffer) => Ok(buffer.clone()),
                None => Err(DecodeError::InsufficientSamples),
            },
            DecoderState::Error { error } => Err(error.clone()),
            _ => match self.image.as_ref() {
                Some(buffer) if buffer.lines_written() > 0 => Ok(buffer.clone()),
                _ => Err(DecodeError::InsufficientSamples),
            },
        }
    }

    /// Overall progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let height = self.mode.map_or(0, |m| m.descriptor().height);
        let fraction = if height > 0 {
            self.lines_written() as f32 / height as f32
        } else {
            0.0
        };
        match &self.state {
            DecoderState::Idle => 0.0,
            DecoderState::DetectingVis => 0.05,
            DecoderState::SearchingSync | DecoderState::SyncLost { .. } => 0.1,
            DecoderState::SyncLocked { .. } => 0.15,
            DecoderState::Decoding { .. } => 0.15 + 0.85 * fraction,
            DecoderState::Complete => 1.0,
            DecoderState::Error { .. } => fraction.min(1.0),
        }
    }

    // ---- driver -----------------------------------------------------------

    fn drive(&mut self) {
        loop {
            let advanced = match &self.state {
                DecoderState::Idle => self.enter_front_state(),
                DecoderState::DetectingVis => self.step_vis(),
                DecoderState::SearchingSync => self.step_search(),
                DecoderState::Decoding { .. } => self.step_decode(),
                DecoderState::SyncLost { at_line } => {
                    let at_line = *at_line;
                    self.step_sync_lost(at_line)
                }
                DecoderState::SyncLocked { .. }
                | DecoderState::Complete
                | DecoderState::Error { .. } => false,
            };
            if !advanced {
                break;
            }
        }
    }

    /// Drive with end-of-stream gating but without forcing a terminal
    /// state; used by `flush` and `decode_all`.
    fn drain(&mut self) {
        self.flushing = true;
        self.drive();
        self.flushing = false;
    }

    fn enter_front_state(&mut self) -> bool {
        if self.mode.is_some() {
            self.ensure_image();
            self.set_state(DecoderState::SearchingSync);
        } else {
            self.set_state(DecoderState::DetectingVis);
            if let Some(observer) = self.observer.as_mut() {
                observer.began_vis_detection();
            }
        }
        true
    }

    fn step_vis(&mut self) -> bool {
        let min_samples = (MIN_VIS_SECONDS * f64::from(self.sample_rate)) as usize;
        if self.intake.len() < min_samples {
            return false;
        }
        self.refresh_frequencies();

        let scan_cap = (MAX_SCAN_SECONDS * f64::from(self.sample_rate)) as usize;
        let settled = self.settled_len().min(scan_cap);
        let outcome = self.detector.detect(&self.frequencies[..settled]);

        match outcome {
            VisOutcome::Found(detection) => {
                self.diag(
                    DiagnosticLevel::Info,
                    DiagnosticCategory::General,
                    "VIS header decoded",
                    vec![
                        ("code", format!("{:#04x}", detection.vis_code)),
                        ("mode", detection.mode_name.to_string()),
                        ("start_sample", detection.start_sample.to_string()),
                    ],
                );
                if let Some(observer) = self.observer.as_mut() {
                    observer.detected_vis_code(detection.vis_code, detection.mode_name);
                }
                match detection.mode {
                    Some(mode) => self.install_mode(mode),
                    None => {
                        // Identified but not decodable here; fall back
                        self.diag(
                            DiagnosticLevel::Warning,
                            DiagnosticCategory::General,
                            "mode not decodable, defaulting to PD120",
                            vec![("mode", detection.mode_name.to_string())],
                        );
                        self.install_mode(SstvMode::Pd120);
                    }
                }
                self.set_state(DecoderState::SearchingSync);
                true
            }
            VisOutcome::NeedMoreSamples if !self.flushing && settled < scan_cap => false,
            VisOutcome::NeedMoreSamples | VisOutcome::Exhausted => {
                // Weak signals often mangle the header; default and let the
                // sync search decide whether there is an image at all.
                self.diag(
                    DiagnosticLevel::Warning,
                    DiagnosticCategory::General,
                    "VIS detection failed, defaulting to PD120",
                    vec![],
                );
                if let Some(observer) = self.observer.as_mut() {
                    observer.failed_vis_detection();
                }
                self.install_mode(SstvMode::Pd120);
                self.set_state(DecoderState::SearchingSync);
                true
            }
        }
    }

    fn step_search(&mut self) -> bool {
        let Some(mode) = self.mode else {
            return false;
        };
        let desc = mode.descriptor();
        let sample_rate = f64::from(self.sample_rate);
        let ready = (SEARCH_SKIP_SECONDS * sample_rate) as usize
            + FRAMES_TO_VALIDATE * desc.frame_samples(sample_rate);
        if !self.flushing && self.intake.len() < ready {
            return false;
        }
        if self.intake.len() <= self.search_watermark {
            return false;
        }
        self.refresh_frequencies();

        let settled = self.settled_len();
        let lock = self.locator.locate(&self.frequencies[..settled], desc);
        match lock {
            Some(lock) if lock.confidence >= SYNC_CONFIDENCE_EPSILON => {
                self.diag(
                    DiagnosticLevel::Info,
                    DiagnosticCategory::Sync,
                    "sync locked",
                    vec![
                        ("start_sample", lock.start_sample.to_string()),
                        ("confidence", format!("{:.2}", lock.confidence)),
                    ],
                );
                self.last_confidence = Some(lock.confidence);
                self.signal_start = Some(lock.start_sample);
                self.next_frame = 0;
                if let Some(observer) = self.observer.as_mut() {
                    observer.locked_sync(lock.confidence);
                }
                self.set_state(DecoderState::SyncLocked {
                    confidence: lock.confidence,
                });
                self.set_state(DecoderState::Decoding {
                    line: self.lines_written(),
                    total_lines: desc.height,
                });
                true
            }
            _ => {
                self.diag(
                    DiagnosticLevel::Warning,
                    DiagnosticCategory::Sync,
                    "no sync found in buffered audio",
                    vec![("searched_samples", settled.to_string())],
                );
                self.search_watermark = self.intake.len();
                if let Some(observer) = self.observer.as_mut() {
                    observer.lost_sync();
                }
                let at_line = self.lines_written();
                self.set_state(DecoderState::SyncLost { at_line });
                true
            }
        }
    }

    fn step_decode(&mut self) -> bool {
        let (Some(mode), Some(start)) = (self.mode, self.signal_start) else {
            return false;
        };
        let desc = mode.descriptor();
        let sample_rate = f64::from(self.sample_rate);
        let scan = ScanDecoder::new(mode, self.sample_rate);
        let frame_samples = desc.frame_samples(sample_rate);
        let frames_total = desc.frames_per_image();

        self.refresh_frequencies();
        let settled = self.settled_len();

        while self.next_frame < frames_total {
            let frame_start = start + self.next_frame * frame_samples;
            if frame_start + frame_samples > settled {
                // Await more samples
                return false;
            }

            if !self.locator.frame_is_valid(&self.frequencies, frame_start, desc) {
                let at_line = self.lines_written();
                self.diag(
                    DiagnosticLevel::Warning,
                    DiagnosticCategory::Sync,
                    "sync pulse missing mid-decode",
                    vec![
                        ("frame", self.next_frame.to_string()),
                        ("at_line", at_line.to_string()),
                    ],
                );
                self.search_watermark = self.intake.len();
                if let Some(observer) = self.observer.as_mut() {
                    observer.lost_sync();
                }
                self.set_state(DecoderState::SyncLost { at_line });
                return true;
            }

            let Some(rows) =
                scan.decode_frame(&self.frequencies, start, self.next_frame, &self.options)
            else {
                return false;
            };
            for (row_index, row) in rows.iter().enumerate() {
                let y = self.next_frame * desc.lines_per_frame + row_index;
                if let Some(image) = self.image.as_mut() {
                    image.set_row(y, row);
                }
                if let Some(observer) = self.observer.as_mut() {
                    observer.decoded_line(y as u32, desc.height as u32);
                }
                let lines = self.lines_written();
                self.state = DecoderState::Decoding {
                    line: lines,
                    total_lines: desc.height,
                };
                if lines % PROGRESS_LINE_INTERVAL == 0 || lines == desc.height {
                    let progress = self.progress();
                    if let Some(observer) = self.observer.as_mut() {
                        observer.updated_progress(progress);
                    }
                }
            }
            self.next_frame += 1;
        }

        if self.lines_written() >= desc.height {
            self.diag(
                DiagnosticLevel::Info,
                DiagnosticCategory::Decoding,
                "image complete",
                vec![("lines", desc.height.to_string())],
            );
            self.set_state(DecoderState::Complete);
            if let Some(observer) = self.observer.as_mut() {
                if let Some(image) = self.image.as_ref() {
                    observer.completed_image(image);
                }
                observer.updated_progress(1.0);
            }
            return true;
        }
        false
    }

    fn step_sync_lost(&mut self, at_line: usize) -> bool {
        let Some(mode) = self.mode else {
            return false;
        };
        let height = mode.descriptor().height;
        let limit = self.options.sync_recovery_threshold() * height as f64;
        if (self.lines_written() as f64) < limit {
            self.diag(
                DiagnosticLevel::Info,
                DiagnosticCategory::Sync,
                "retrying sync search",
                vec![("at_line", at_line.to_string())],
            );
            self.signal_start = None;
            self.next_frame = 0;
            self.set_state(DecoderState::SearchingSync);
            true
        } else {
            self.fail(DecodeError::SyncLost { at_line });
            true
        }
    }

    // ---- internals --------------------------------------------------------

    fn install_mode(&mut self, mode: SstvMode) {
        let desc = mode.descriptor();
        self.mode = Some(mode);
        self.image = Some(PixelBuffer::new(desc.width, desc.height));
        self.signal_start = None;
        self.next_frame = 0;
    }

    fn ensure_image(&mut self) {
        if self.image.is_none() {
            if let Some(mode) = self.mode {
                let desc = mode.descriptor();
                self.image = Some(PixelBuffer::new(desc.width, desc.height));
            }
        }
    }

    /// Recompute the frequency stream from the full sample buffer if new
    /// audio has arrived since the last pass.
    fn refresh_frequencies(&mut self) {
        if self.demodulated_len != self.intake.len() {
            self.demodulator
                .demodulate_into(self.intake.view(), &mut self.frequencies);
            self.demodulated_len = self.intake.len();
            self.diag(
                DiagnosticLevel::Debug,
                DiagnosticCategory::Demodulation,
                "frequency stream rebuilt",
                vec![("samples", self.demodulated_len.to_string())],
            );
        }
    }

    /// Length of the frequency prefix that can no longer change when more
    /// audio arrives. While flushing the whole stream is final.
    fn settled_len(&self) -> usize {
        if self.flushing {
            self.frequencies.len()
        } else {
            self.demodulator.settled_len(self.frequencies.len())
        }
    }

    fn exhaustion_error(&self) -> DecodeError {
        match (&self.state, self.mode) {
            (DecoderState::Decoding { .. } | DecoderState::SyncLost { .. }, Some(mode)) => {
                DecodeError::EndOfStream {
                    lines_decoded: self.lines_written(),
                    total_lines: mode.descriptor().height,
                }
            }
            (_, Some(mode)) if self.lines_written() > 0 => DecodeError::EndOfStream {
                lines_decoded: self.lines_written(),
                total_lines: mode.descriptor().height,
            },
            (DecoderState::SearchingSync, Some(_)) => DecodeError::SyncNotFound,
            _ => DecodeError::InsufficientSamples,
        }
    }

    fn fail(&mut self, error: DecodeError) {
        self.diag(
            DiagnosticLevel::Error,
            DiagnosticCategory::Decoding,
            "decode failed",
            vec![("error", error.to_string())],
        );
        self.set_state(DecoderState::Error {
            error: error.clone(),
        });
        if let Some(observer) = self.observer.as_mut() {
            observer.encountered_error(&error);
        }
    }

    fn set_state(&mut self, state: DecoderState) {
        self.state = state;
        if let Some(observer) = self.observer.as_mut() {
            observer.changed_state(&self.state);
        }
    }

    fn diag(
        &mut self,
        level: DiagnosticLevel,
        category: DiagnosticCategory,
        message: &str,
        details: Vec<(&'static str, String)>,
    ) {
        if !self.diagnostics_enabled {
            return;
        }
        let diagnostic = Diagnostic {
            level,
            category,
            message: message.to_string(),
            details,
            timestamp_secs: self.intake.len() as f64 / f64::from(self.sample_rate),
        };
        if let Some(observer) = self.observer.as_mut() {
            observer.emitted_diagnostic(&diagnostic);
        }
    }
}
