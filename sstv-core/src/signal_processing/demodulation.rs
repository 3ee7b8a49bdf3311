//! Quadrature FM demodulation
//!
//! Converts real audio into one instantaneous frequency per input sample:
//! mix against a 1900 Hz quadrature oscillator, lowpass the I/Q pair, then
//! discriminate by the phase difference of consecutive baseband samples.

use num_complex::Complex;
use std::f64::consts::TAU;

use crate::signal_processing::filters;

/// Centre of the SSTV video band.
pub const VIDEO_CENTRE_HZ: f64 = 1900.0;
/// Analysis lowpass cutoff; the video band spans roughly ±700 Hz of centre.
pub const LOWPASS_CUTOFF_HZ: f64 = 1000.0;
/// Analysis filter length. Odd, so the group delay is integral.
pub const FIR_TAPS: usize = 127;

// Below this baseband magnitude the phase is numerically meaningless and
// the discriminator reports the band centre instead.
const MAGNITUDE_FLOOR: f64 = 1e-10;

#[derive(Clone, Debug)]
pub struct FmDemodulator {
    sample_rate: f64,
    taps: Vec<f64>,
}

impl FmDemodulator {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = f64::from(sample_rate);
        Self {
            taps: filters::design_lowpass(FIR_TAPS, LOWPASS_CUTOFF_HZ, sample_rate),
            sample_rate,
        }
    }

    /// Group delay of the analysis filter, in samples. Frequencies within
    /// this distance of either end of the stream are edge-filled.
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Number of leading frequencies that can no longer change when more
    /// audio is appended to a stream of `total` samples.
    pub fn settled_len(&self, total: usize) -> usize {
        total.saturating_sub(self.group_delay())
    }

    /// One frequency (Hz) per input sample.
    pub fn demodulate(&self, samples: &[f32]) -> Vec<f32> {
        let mut frequencies = Vec::new();
        self.demodulate_into(samples, &mut frequencies);
        frequencies
    }

    /// As `demodulate`, reusing the output allocation.
    pub fn demodulate_into(&self, samples: &[f32], frequencies: &mut Vec<f32>) {
        frequencies.clear();
        let n = samples.len();
        if n == 0 {
            return;
        }

        let warm = self.group_delay();
        if n < 2 * warm + 3 {
            // Too short for a single settled discriminator step.
            frequencies.resize(n, VIDEO_CENTRE_HZ as f32);
            return;
        }

        // Complex downconversion by e^{-j w n}; the negated sine puts the
        // video band at baseband with positive frequency meaning "above
        // centre".
        let omega = TAU * VIDEO_CENTRE_HZ / self.sample_rate;
        let mut phase = 0.0f64;
        let mut baseband = Vec::with_capacity(n);
        for &sample in samples {
            let s = f64::from(sample);
            baseband.push(Complex::new(s * phase.cos(), -s * phase.sin()));
            phase += omega;
            if phase >= TAU {
                phase -= TAU;
            }
        }

        let filtered = filters::convolve_centered_complex(&baseband, &self.taps);

        frequencies.resize(n, 0.0);
        let first_valid = warm + 1;
        let last_valid = n - 1 - warm;
        let scale = self.sample_rate / TAU;
        for i in first_valid..=last_valid {
            let rotation = filtered[i - 1].conj() * filtered[i];
            frequencies[i] = if rotation.norm() < MAGNITUDE_FLOOR {
                VIDEO_CENTRE_HZ as f32
            } else {
                (VIDEO_CENTRE_HZ + rotation.arg() * scale) as f32
            };
        }

        // Edge fill keeps the stream one-to-one with the input.
        let head = frequencies[first_valid];
        for value in &mut frequencies[..first_valid] {
            *value = head;
        }
        let tail = frequencies[last_valid];
        for value in &mut frequencies[last_valid + 1..] {
            *value = tail;
        }
    }
}
