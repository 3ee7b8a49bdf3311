//! Controller end-to-end decodes over synthesised transmissions.

use crate::fixtures::{pd120_signal, robot36_transmission, RecordingObserver};
use sstv_core::{DecodeError, DecoderState, SstvDecoder, SstvMode};

#[test]
fn pd120_without_header_defaults_and_decodes_partially() {
    let audio = pd120_signal(12, None);
    let observer = RecordingObserver::new();
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.set_observer(Box::new(observer.clone()));

    let image = decoder.decode_all(&audio).expect("partial image");
    assert_eq!(decoder.mode(), Some(SstvMode::Pd120));
    assert_eq!(image.lines_written(), 24);

    // Mid-gray content away from component boundaries
    for y in 0..image.lines_written() {
        let row = image.row(y);
        for x in 8..632 {
            for &channel in &row[x * 3..x * 3 + 3] {
                assert!((channel - 0.5).abs() < 0.02, "row {y} pixel {x}: {channel}");
            }
        }
    }

    let log = observer.log();
    assert!(log.iter().any(|line| line == "vis_failed"));
    assert!(log.iter().any(|line| line.starts_with("locked")));
    let confidence = decoder.sync_confidence().expect("locked");
    assert!((confidence - 0.6).abs() < 1e-3);
}

#[test]
fn robot36_transmission_completes_end_to_end() {
    let audio = robot36_transmission();
    let observer = RecordingObserver::new();
    let mut decoder = SstvDecoder::new(24_000).unwrap();
    decoder.set_observer(Box::new(observer.clone()));

    let image = decoder.decode_all(&audio).expect("complete image");
    assert_eq!(*decoder.state(), DecoderState::Complete);
    assert_eq!(decoder.mode(), Some(SstvMode::Robot36));
    assert_eq!(image.lines_written(), 240);
    assert_eq!(image.data().len(), 320 * 240 * 3);

    // Even lines white, odd lines black, judged away from boundaries
    for y in 0..240 {
        let row = image.row(y);
        for x in 32..288 {
            let pixel = &row[x * 3..x * 3 + 3];
            if y % 2 == 0 {
                assert!(
                    pixel.iter().all(|&v| v >= 0.9),
                    "row {y} pixel {x}: {pixel:?}"
                );
            } else {
                assert!(
                    pixel.iter().all(|&v| v <= 0.1),
                    "row {y} pixel {x}: {pixel:?}"
                );
            }
        }
    }

    let log = observer.log();
    assert!(log.iter().any(|line| line == "vis 0x08 Robot36"));
    assert!(log.iter().any(|line| line == "complete 320x240"));
    assert!(log.iter().any(|line| line == "progress 1.00"));
}

#[test]
fn sync_loss_below_threshold_retries_and_returns_partial() {
    let audio = pd120_signal(12, Some(6));
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    let image = decoder.decode_all(&audio).expect("partial image");
    assert_eq!(image.lines_written(), 12);
    assert!(!decoder.state().is_terminal());
}

#[test]
fn sync_loss_with_zero_threshold_is_fatal() {
    let audio = pd120_signal(12, Some(6));
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.options_mut().set_sync_recovery_threshold(0.0);
    let result = decoder.decode_all(&audio);
    assert_eq!(result, Err(DecodeError::SyncLost { at_line: 12 }));
    assert!(decoder.state().is_terminal());
    // The partial image stays readable in the terminal state
    assert_eq!(decoder.image().unwrap().lines_written(), 12);
}

#[test]
fn sync_loss_with_full_threshold_always_retries() {
    let audio = pd120_signal(12, Some(6));
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.options_mut().set_sync_recovery_threshold(1.0);
    let image = decoder.decode_all(&audio).expect("partial image");
    assert_eq!(image.lines_written(), 12);
    assert!(!decoder.state().is_terminal());
}

#[test]
fn flush_mid_image_reports_end_of_stream() {
    let audio = pd120_signal(12, None);
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.push_samples(&audio);
    decoder.flush();
    assert_eq!(
        *decoder.state(),
        DecoderState::Error {
            error: DecodeError::EndOfStream {
                lines_decoded: 24,
                total_lines: 496,
            }
        }
    );
    assert_eq!(decoder.image().unwrap().lines_written(), 24);
}

#[test]
fn flush_without_any_sync_reports_sync_not_found() {
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    let mut writer = sstv_core::signal_gen::ToneWriter::new(48_000);
    writer.tone(1900.0, 9000.0);
    decoder.push_samples(&writer.finish());
    decoder.flush();
    assert_eq!(
        *decoder.state(),
        DecoderState::Error {
            error: DecodeError::SyncNotFound
        }
    );
}

#[test]
fn too_short_audio_is_insufficient() {
    let mut writer = sstv_core::signal_gen::ToneWriter::new(48_000);
    writer.tone(1900.0, 1000.0);
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    let result = decoder.decode_all(&writer.finish());
    assert_eq!(result, Err(DecodeError::InsufficientSamples));
}

#[test]
fn diagnostics_only_fire_when_enabled() {
    let audio = pd120_signal(12, None);

    let silent = RecordingObserver::new();
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.set_observer(Box::new(silent.clone()));
    let _ = decoder.decode_all(&audio);
    assert!(!silent.log().iter().any(|line| line.starts_with("diag")));

    let chatty = RecordingObserver::new();
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.set_observer(Box::new(chatty.clone()));
    decoder.enable_diagnostics();
    let _ = decoder.decode_all(&audio);
    assert!(chatty.log().iter().any(|line| line.starts_with("diag")));
}

#[test]
fn mild_channel_noise_does_not_break_the_decode() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sstv_core::channel::{add_noise, snr_to_noise_std};

    let clean = pd120_signal(12, None);
    let mut rng = StdRng::seed_from_u64(1701);
    let noisy = add_noise(&clean, snr_to_noise_std(25.0), &mut rng);

    let mut decoder = SstvDecoder::new(48_000).unwrap();
    let image = decoder.decode_all(&noisy).expect("partial image");
    assert_eq!(image.lines_written(), 24);
    for y in [0, 11, 23] {
        let row = image.row(y);
        for x in 8..632 {
            for &channel in &row[x * 3..x * 3 + 3] {
                assert!(
                    (channel - 0.5).abs() < 0.1,
                    "row {y} pixel {x}: {channel}"
                );
            }
        }
    }
}

#[test]
fn forced_mode_skips_vis_detection() {
    let audio = pd120_signal(12, None);
    let observer = RecordingObserver::new();
    let mut decoder = SstvDecoder::new_with_mode(SstvMode::Pd120, 48_000).unwrap();
    decoder.set_observer(Box::new(observer.clone()));
    let image = decoder.decode_all(&audio).expect("partial image");
    assert_eq!(image.lines_written(), 24);
    let log = observer.log();
    assert!(!log.iter().any(|line| line == "began_vis"));
    assert!(!log.iter().any(|line| line.starts_with("vis")));
}
