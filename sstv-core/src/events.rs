//! Decoder state and the observer contract
//!
//! All callbacks fire synchronously on the thread driving `push_samples`;
//! the engine never creates a background context. Observers wanting to hop
//! threads (e.g. for UI updates) do so themselves.

use crate::diagnostics::Diagnostic;
use crate::errors::DecodeError;
use crate::image::PixelBuffer;

/// Lifecycle state of a decode. `Complete` and `Error` are terminal; the
/// only way out of them is `reset`.
#[derive(Clone, Debug, PartialEq)]
pub enum DecoderState {
    Idle,
    DetectingVis,
    SearchingSync,
    SyncLocked { confidence: f32 },
    Decoding { line: usize, total_lines: usize },
    SyncLost { at_line: usize },
    Complete,
    Error { error: DecodeError },
}

impl DecoderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecoderState::Complete | DecoderState::Error { .. })
    }
}

/// Fire-and-forget observer. Every method has a no-op default so callers
/// implement only what they care about. The engine tolerates arbitrary
/// observer work between events.
pub trait DecodeObserver {
    fn began_vis_detection(&mut self) {}

    fn detected_vis_code(&mut self, _code: u8, _mode_name: &str) {}

    fn failed_vis_detection(&mut self) {}

    fn locked_sync(&mut self, _confidence: f32) {}

    fn lost_sync(&mut self) {}

    /// One call per written image row.
    fn decoded_line(&mut self, _line_number: u32, _total_lines: u32) {}

    fn updated_progress(&mut self, _progress: f32) {}

    /// Read-only view of the finished buffer; copy it out if it needs to
    /// outlive the callback.
    fn completed_image(&mut self, _image: &PixelBuffer) {}

    fn changed_state(&mut self, _state: &DecoderState) {}

    fn encountered_error(&mut self, _error: &DecodeError) {}

    /// Opt-in structured diagnostics; only fires after
    /// `SstvDecoder::enable_diagnostics`.
    fn emitted_diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}
