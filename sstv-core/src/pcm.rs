//! PCM sample conversion
//!
//! Callers feed the engine normalised mono `f32`; these helpers cover the
//! supported wire formats and channel downmix.

/// 16-bit signed PCM to `[-1, 1)`.
pub fn from_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&v| v as f32 / 32_768.0).collect()
}

/// 8-bit unsigned PCM to `[-1, 1)`.
pub fn from_u8(samples: &[u8]) -> Vec<f32> {
    samples.iter().map(|&v| (v as f32 - 128.0) / 128.0).collect()
}

/// 64-bit float samples, narrowed.
pub fn from_f64(samples: &[f64]) -> Vec<f32> {
    samples.iter().map(|&v| v as f32).collect()
}

/// Interleaved multi-channel audio to mono by arithmetic mean. Trailing
/// samples that do not fill a whole frame are dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    assert!(channels > 0, "channel count must be positive");
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
