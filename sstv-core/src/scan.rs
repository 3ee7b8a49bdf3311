//! Frame decoding
//!
//! Maps frequency-over-time slices of a frame onto pixel components using
//! fractional sample positions, then converts Y/Cb/Cr to RGB. One generic
//! routine is parameterised by the mode's component layout, so adding a
//! mode means adding a descriptor, not a decoder.

use crate::modes::{ComponentLayout, ModeDescriptor, SstvMode};
use crate::options::DecodingOptions;

/// Decodes whole frames of one mode at one sample rate.
#[derive(Clone, Debug)]
pub struct ScanDecoder {
    mode: SstvMode,
    sample_rate: f64,
}

impl ScanDecoder {
    pub fn new(mode: SstvMode, sample_rate: u32) -> Self {
        Self {
            mode,
            sample_rate: f64::from(sample_rate),
        }
    }

    pub fn mode(&self) -> SstvMode {
        self.mode
    }

    pub fn frame_samples(&self) -> usize {
        self.mode.descriptor().frame_samples(self.sample_rate)
    }

    fn ms_samples(&self, ms: f64) -> f64 {
        ms * self.sample_rate / 1000.0
    }

    /// Decode frame `frame_index` of the image anchored at `signal_start`.
    /// Returns `lines_per_frame` rows of interleaved RGB, or `None` while
    /// the frame window extends past the available frequencies.
    pub fn decode_frame(
        &self,
        frequencies: &[f32],
        signal_start: usize,
        frame_index: usize,
        options: &DecodingOptions,
    ) -> Option<Vec<Vec<f32>>> {
        let desc = self.mode.descriptor();
        let frame_samples = desc.frame_samples(self.sample_rate);
        let frame_start = signal_start + frame_index * frame_samples;
        if frame_start + frame_samples > frequencies.len() {
            return None;
        }

        let even_line = frame_index * desc.lines_per_frame;
        let even_offset = options.line_offset_samples(even_line, self.sample_rate);
        let odd_offset = options.line_offset_samples(even_line + 1, self.sample_rate);
        // Shared chrominance straddles both lines, so it takes their mean.
        let chroma_offset = 0.5 * (even_offset + odd_offset);

        let base = frame_start as f64;
        let (y0, y1, cb, cr) = match desc.layout {
            ComponentLayout::Pd { component_ms } => {
                let component = self.ms_samples(component_ms);
                let video = base + self.ms_samples(desc.sync_pulse_ms + desc.porch_ms);
                let y0 = self.sample_component(frequencies, video, component, even_offset, desc);
                let cr = self.sample_component(
                    frequencies,
                    video + component,
                    component,
                    chroma_offset,
                    desc,
                );
                let cb = self.sample_component(
                    frequencies,
                    video + 2.0 * component,
                    component,
                    chroma_offset,
                    desc,
                );
                let y1 = self.sample_component(
                    frequencies,
                    video + 3.0 * component,
                    component,
                    odd_offset,
                    desc,
                );
                (y0, y1, cb, cr)
            }
            ComponentLayout::Robot36 {
                luma_ms,
                separator_ms,
                chroma_porch_ms,
                chroma_ms,
            } => {
                let line = self.ms_samples(desc.frame_duration_ms) / 2.0;
                let pre = self.ms_samples(desc.sync_pulse_ms + desc.porch_ms);
                let luma = self.ms_samples(luma_ms);
                let chroma_at = pre + luma + self.ms_samples(separator_ms + chroma_porch_ms);
                let chroma = self.ms_samples(chroma_ms);

                let y0 = self.sample_component(frequencies, base + pre, luma, even_offset, desc);
                let cr = self.sample_component(
                    frequencies,
                    base + chroma_at,
                    chroma,
                    chroma_offset,
                    desc,
                );
                let y1 = self.sample_component(
                    frequencies,
                    base + line + pre,
                    luma,
                    odd_offset,
                    desc,
                );
                let cb = self.sample_component(
                    frequencies,
                    base + line + chroma_at,
                    chroma,
                    chroma_offset,
                    desc,
                );
                (y0, y1, cb, cr)
            }
        };

        let mut even = Vec::with_capacity(desc.width * 3);
        let mut odd = Vec::with_capacity(desc.width * 3);
        for x in 0..desc.width {
            even.extend_from_slice(&ycbcr_to_rgb(y0[x], cb[x], cr[x]));
            odd.extend_from_slice(&ycbcr_to_rgb(y1[x], cb[x], cr[x]));
        }
        Some(vec![even, odd])
    }

    /// Decode the single line `line_index`, for callers that think in lines
    /// rather than frames. The containing frame is decoded with
    /// `frame_index = line_index / lines_per_frame` and the requested row
    /// selected out, so the output is bit-identical to the frame pathway;
    /// the two lines of a frame only share offsets when phase/skew make
    /// them equal, which is the documented convention.
    pub fn decode_line(
        &self,
        frequencies: &[f32],
        signal_start: usize,
        line_index: usize,
        options: &DecodingOptions,
    ) -> Option<Vec<f32>> {
        let per_frame = self.mode.descriptor().lines_per_frame;
        let rows = self.decode_frame(frequencies, signal_start, line_index / per_frame, options)?;
        rows.into_iter().nth(line_index % per_frame)
    }

    /// Sample `width` pixels from the component spanning fractional sample
    /// positions `[start, start + span)`, mapping frequency onto the video
    /// swing.
    fn sample_component(
        &self,
        frequencies: &[f32],
        start: f64,
        span: f64,
        offset_samples: f64,
        desc: &ModeDescriptor,
    ) -> Vec<f32> {
        let width = desc.width;
        let per_pixel = span / width as f64;
        let swing = desc.white_hz - desc.black_hz;
        let max_position = (frequencies.len() - 1) as f64;

        (0..width)
            .map(|x| {
                let position = (start + offset_samples + (x as f64 + 0.5) * per_pixel)
                    .clamp(0.0, max_position);
                let below = position.floor() as usize;
                let above = position.ceil() as usize;
                let t = position - below as f64;
                let frequency =
                    (1.0 - t) * f64::from(frequencies[below]) + t * f64::from(frequencies[above]);
                (((frequency - desc.black_hz) / swing).clamp(0.0, 1.0)) as f32
            })
            .collect()
    }
}

/// ITU-R BT.601 conversion with chrominance centred on 0.5; all channels
/// clamp to `[0, 1]`.
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [f32; 3] {
    let cb = cb - 0.5;
    let cr = cr - 0.5;
    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]
}
