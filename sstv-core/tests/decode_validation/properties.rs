//! Property checks over the option and DSP surfaces.

use proptest::prelude::*;
use sstv_core::options::DecodingOptions;
use sstv_core::pcm;
use sstv_core::signal_processing::FmDemodulator;

proptest! {
    #[test]
    fn phase_offset_always_lands_in_range(value in -1e6f64..1e6) {
        let mut options = DecodingOptions::new();
        options.set_phase_offset_ms(value);
        prop_assert!((-50.0..=50.0).contains(&options.phase_offset_ms()));
    }

    #[test]
    fn skew_always_lands_in_range(value in -1e6f64..1e6) {
        let mut options = DecodingOptions::new();
        options.set_skew_ms_per_line(value);
        prop_assert!((-1.0..=1.0).contains(&options.skew_ms_per_line()));
    }

    #[test]
    fn recovery_threshold_always_lands_in_range(value in -1e6f64..1e6) {
        let mut options = DecodingOptions::new();
        options.set_sync_recovery_threshold(value);
        prop_assert!((0.0..=1.0).contains(&options.sync_recovery_threshold()));
    }

    #[test]
    fn demodulation_preserves_length(samples in prop::collection::vec(-1.0f32..1.0, 0..400)) {
        let demod = FmDemodulator::new(48_000);
        prop_assert_eq!(demod.demodulate(&samples).len(), samples.len());
    }

    #[test]
    fn settled_prefix_never_changes_under_append(split in 300usize..1800) {
        // A deterministic wobbly signal; the prefix up to the settled
        // length must demodulate identically with or without the tail.
        let full: Vec<f32> = (0..2000)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                (t * 1900.0 * std::f32::consts::TAU + (t * 40.0).sin()).sin()
            })
            .collect();
        let demod = FmDemodulator::new(48_000);
        let prefix = demod.demodulate(&full[..split]);
        let whole = demod.demodulate(&full);
        let settled = demod.settled_len(split);
        prop_assert_eq!(&prefix[..settled], &whole[..settled]);
    }

    #[test]
    fn downmix_always_averages_whole_frames(
        frames in prop::collection::vec(-1.0f32..1.0, 0..64),
        channels in 1usize..4,
    ) {
        let interleaved: Vec<f32> = frames
            .iter()
            .flat_map(|&v| std::iter::repeat(v).take(channels))
            .collect();
        let mono = pcm::downmix(&interleaved, channels);
        prop_assert_eq!(mono.len(), frames.len());
        for (a, b) in mono.iter().zip(&frames) {
            prop_assert!((a - b).abs() < 1e-6);
        }
    }
}
