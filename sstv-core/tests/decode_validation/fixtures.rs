//! Shared fixtures: synthetic transmissions and a recording observer.

use std::cell::RefCell;
use std::rc::Rc;

use sstv_core::diagnostics::Diagnostic;
use sstv_core::modes::SstvMode;
use sstv_core::signal_gen::{append_pd_frame, append_robot36_frame, append_vis_header, ToneWriter};
use sstv_core::{DecodeError, DecodeObserver, DecoderState, PixelBuffer};

/// A PD120 transmission without a VIS header: a 1900 Hz carrier until the
/// 3 s mark, then `frames` mid-gray frames. `broken_from` replaces sync
/// pulses with carrier from that frame index on.
pub fn pd120_signal(frames: usize, broken_from: Option<usize>) -> Vec<f32> {
    let mut writer = ToneWriter::new(48_000);
    writer.tone(1900.0, 3000.0);
    for index in 0..frames {
        if broken_from.is_some_and(|from| index >= from) {
            // No sync pulse: the whole frame rides at carrier
            writer.tone(1900.0, 508.48);
        } else {
            append_pd_frame(&mut writer, SstvMode::Pd120, [1900.0; 4]);
        }
    }
    writer.finish()
}

/// A complete Robot36 transmission at 24 kHz: quiet, VIS header, a short
/// carrier gap so the stop bit does not touch the first sync pulse, then
/// every frame white on the even line and black on the odd.
pub fn robot36_transmission() -> Vec<f32> {
    let mut writer = ToneWriter::new(24_000);
    writer.silence(2040.0);
    append_vis_header(&mut writer, 0x08);
    writer.tone(1900.0, 330.0);
    let frames = SstvMode::Robot36.descriptor().frames_per_image();
    for _ in 0..frames {
        append_robot36_frame(&mut writer, [2300.0, 1500.0], [1900.0, 1900.0]);
    }
    writer.finish()
}

/// Observer that records every callback as a compact line, shared through
/// an `Rc` so the test keeps a handle after moving it into the decoder.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub events: Rc<RefCell<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn push(&self, line: String) {
        self.events.borrow_mut().push(line);
    }
}

impl DecodeObserver for RecordingObserver {
    fn began_vis_detection(&mut self) {
        self.push("began_vis".into());
    }

    fn detected_vis_code(&mut self, code: u8, mode_name: &str) {
        self.push(format!("vis {code:#04x} {mode_name}"));
    }

    fn failed_vis_detection(&mut self) {
        self.push("vis_failed".into());
    }

    fn locked_sync(&mut self, confidence: f32) {
        self.push(format!("locked {confidence:.1}"));
    }

    fn lost_sync(&mut self) {
        self.push("lost_sync".into());
    }

    fn decoded_line(&mut self, line_number: u32, total_lines: u32) {
        self.push(format!("line {line_number}/{total_lines}"));
    }

    fn updated_progress(&mut self, progress: f32) {
        self.push(format!("progress {progress:.2}"));
    }

    fn completed_image(&mut self, image: &PixelBuffer) {
        self.push(format!("complete {}x{}", image.width(), image.height()));
    }

    fn changed_state(&mut self, state: &DecoderState) {
        let name = match state {
            DecoderState::Idle => "Idle",
            DecoderState::DetectingVis => "DetectingVis",
            DecoderState::SearchingSync => "SearchingSync",
            DecoderState::SyncLocked { .. } => "SyncLocked",
            DecoderState::Decoding { .. } => "Decoding",
            DecoderState::SyncLost { .. } => "SyncLost",
            DecoderState::Complete => "Complete",
            DecoderState::Error { .. } => "Error",
        };
        self.push(format!("state {name}"));
    }

    fn encountered_error(&mut self, error: &DecodeError) {
        self.push(format!("error {error}"));
    }

    fn emitted_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.push(format!("diag {} {}", diagnostic.level, diagnostic.category));
    }
}
