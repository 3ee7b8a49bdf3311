//! Channel impairment for robustness tests
//!
//! AWGN over audio with an injected RNG so test runs are reproducible.
//! Nothing in the decode path uses randomness; this lives in the crate so
//! integration tests and benches share it.

use rand::Rng;
use rand_distr::StandardNormal;

/// Add white Gaussian noise with the given standard deviation.
pub fn add_noise<R: Rng>(samples: &[f32], noise_std: f64, rng: &mut R) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| {
            let noise: f64 = rng.sample(StandardNormal);
            sample + (noise * noise_std) as f32
        })
        .collect()
}

/// Noise standard deviation for a target SNR against a unit-power signal.
pub fn snr_to_noise_std(snr_db: f64) -> f64 {
    (1.0 / 10.0_f64.powf(snr_db / 10.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn noise_is_deterministic_with_a_seed() {
        let audio = vec![0.1_f32, -0.2, 0.3];
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        assert_eq!(
            add_noise(&audio, 0.05, &mut rng_a),
            add_noise(&audio, 0.05, &mut rng_b)
        );
    }

    #[test]
    fn zero_std_preserves_the_signal() {
        let audio = vec![0.5_f32, -0.5];
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(add_noise(&audio, 0.0, &mut rng), audio);
    }

    #[test]
    fn snr_conversion_is_monotonic() {
        assert!(snr_to_noise_std(10.0) < snr_to_noise_std(0.0));
        assert!((snr_to_noise_std(0.0) - 1.0).abs() < 1e-12);
    }
}
