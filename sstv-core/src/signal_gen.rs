//! Test-signal synthesis
//!
//! Phase-continuous tone sequencing for building SSTV headers and frames
//! in tests and benches. The writer tracks a fractional time cursor so
//! segment boundaries never accumulate rounding drift: a PD120 frame is
//! 24407 samples at 48 kHz whether it is built from one segment or six.

use std::f64::consts::TAU;

use crate::modes::{ComponentLayout, SstvMode};

#[derive(Clone, Debug)]
pub struct ToneWriter {
    sample_rate: f64,
    phase: f64,
    cursor: f64,
    samples: Vec<f32>,
}

impl ToneWriter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
            phase: 0.0,
            cursor: 0.0,
            samples: Vec::new(),
        }
    }

    /// Append a sine tone, continuing the running phase.
    pub fn tone(&mut self, freq_hz: f64, duration_ms: f64) -> &mut Self {
        self.cursor += duration_ms * self.sample_rate / 1000.0;
        let target = self.cursor.round() as usize;
        let omega = TAU * freq_hz / self.sample_rate;
        while self.samples.len() < target {
            self.samples.push(self.phase.sin() as f32);
            self.phase += omega;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
        self
    }

    pub fn silence(&mut self, duration_ms: f64) -> &mut Self {
        self.cursor += duration_ms * self.sample_rate / 1000.0;
        let target = self.cursor.round() as usize;
        self.samples.resize(target, 0.0);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn finish(self) -> Vec<f32> {
        self.samples
    }
}

/// Append a complete VIS header: leader, break, start bit, eight data bits
/// (LSB first), stop bit.
pub fn append_vis_header(writer: &mut ToneWriter, vis_code: u8) {
    writer.tone(1900.0, 300.0);
    writer.tone(1200.0, 30.0); // break
    writer.tone(1200.0, 30.0); // start bit
    for bit in 0..8 {
        let hz = if vis_code >> bit & 1 == 1 { 1300.0 } else { 1100.0 };
        writer.tone(hz, 30.0);
    }
    writer.tone(1200.0, 30.0); // stop bit
}

/// Append one PD-mode frame with flat per-component frequencies.
pub fn append_pd_frame(writer: &mut ToneWriter, mode: SstvMode, components_hz: [f64; 4]) {
    let desc = mode.descriptor();
    let ComponentLayout::Pd { component_ms } = desc.layout else {
        panic!("{} is not a PD mode", desc.name);
    };
    writer.tone(desc.sync_hz, desc.sync_pulse_ms);
    writer.tone(1500.0, desc.porch_ms);
    for hz in components_hz {
        writer.tone(hz, component_ms);
    }
}

/// Append one Robot36 frame: two lines with flat luma and chroma tones.
/// `luma_hz` and `chroma_hz` are `[even, odd]`; the even chroma slot is Cr,
/// the odd one Cb.
pub fn append_robot36_frame(writer: &mut ToneWriter, luma_hz: [f64; 2], chroma_hz: [f64; 2]) {
    let desc = SstvMode::Robot36.descriptor();
    let ComponentLayout::Robot36 {
        luma_ms,
        separator_ms,
        chroma_porch_ms,
        chroma_ms,
    } = desc.layout
    else {
        unreachable!("Robot36 layout");
    };
    for line in 0..2 {
        writer.tone(desc.sync_hz, desc.sync_pulse_ms);
        writer.tone(1500.0, desc.porch_ms);
        writer.tone(luma_hz[line], luma_ms);
        writer.tone(1500.0, separator_ms);
        writer.tone(1900.0, chroma_porch_ms);
        writer.tone(chroma_hz[line], chroma_ms);
    }
}
