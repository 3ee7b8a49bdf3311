//! FIR filter design and convolution
//!
//! Windowed-sinc lowpass design with a Blackman window, normalised to unit
//! DC gain so the passband carries through unscaled. Tap counts must be odd:
//! the filter is then linear-phase with an integral group delay of
//! `(taps - 1) / 2` samples, which the demodulator compensates for.

use num_complex::Complex;
use std::f64::consts::PI;

/// Design a lowpass FIR by the windowed-sinc method.
pub fn design_lowpass(num_taps: usize, cutoff_hz: f64, sample_rate: f64) -> Vec<f64> {
    assert!(num_taps % 2 == 1, "tap count must be odd for linear phase");
    assert!(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0);

    let fc = cutoff_hz / sample_rate;
    let mid = (num_taps / 2) as f64;
    let span = (num_taps - 1) as f64;

    let mut taps = Vec::with_capacity(num_taps);
    for i in 0..num_taps {
        let n = i as f64 - mid;
        let sinc = if n == 0.0 {
            2.0 * PI * fc
        } else {
            (2.0 * PI * fc * n).sin() / n
        };
        let window = 0.42 - 0.5 * (2.0 * PI * i as f64 / span).cos()
            + 0.08 * (4.0 * PI * i as f64 / span).cos();
        taps.push(sinc * window);
    }

    // Unit DC gain
    let sum: f64 = taps.iter().sum();
    if sum.abs() > 1e-12 {
        for tap in &mut taps {
            *tap /= sum;
        }
    }
    taps
}

/// Centred convolution with zero padding at the boundaries; output length
/// equals input length, so the kernel's group delay is already compensated.
pub fn convolve_centered(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let mid = kernel.len() / 2;
    let mut output = vec![0.0; n];
    for (i, out) in output.iter_mut().enumerate() {
        let lo = i.saturating_sub(mid);
        let hi = (i + kernel.len() - mid).min(n);
        let mut acc = 0.0;
        for j in lo..hi {
            acc += signal[j] * kernel[j + mid - i];
        }
        *out = acc;
    }
    output
}

/// Centred convolution of a complex signal with a real kernel.
pub fn convolve_centered_complex(signal: &[Complex<f64>], kernel: &[f64]) -> Vec<Complex<f64>> {
    let n = signal.len();
    let mid = kernel.len() / 2;
    let mut output = vec![Complex::new(0.0, 0.0); n];
    for (i, out) in output.iter_mut().enumerate() {
        let lo = i.saturating_sub(mid);
        let hi = (i + kernel.len() - mid).min(n);
        let mut acc = Complex::new(0.0, 0.0);
        for j in lo..hi {
            acc += signal[j] * kernel[j + mid - i];
        }
        *out = acc;
    }
    output
}
