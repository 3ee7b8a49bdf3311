//! Streaming equivalences: chunked pushes, batch decode, event ordering.

use crate::fixtures::{pd120_signal, RecordingObserver};
use sstv_core::{DecoderState, SstvDecoder};

#[test]
fn chunked_pushes_match_a_single_push() {
    let audio = pd120_signal(12, None);

    let mut single = SstvDecoder::new(48_000).unwrap();
    single.push_samples(&audio);

    let mut chunked = SstvDecoder::new(48_000).unwrap();
    for chunk in audio.chunks(10_007) {
        chunked.push_samples(chunk);
    }

    assert_eq!(single.state(), chunked.state());
    assert_eq!(single.lines_written(), chunked.lines_written());
    assert_eq!(single.progress(), chunked.progress());
    let image_single = single.image().expect("buffer");
    let image_chunked = chunked.image().expect("buffer");
    assert_eq!(image_single.data(), image_chunked.data());

    // The last buffered frame is held back until its frequencies settle
    assert_eq!(single.lines_written(), 22);
    assert!(matches!(single.state(), DecoderState::Decoding { .. }));
}

#[test]
fn decode_all_matches_incremental_content() {
    let audio = pd120_signal(12, None);

    let mut batch = SstvDecoder::new(48_000).unwrap();
    let image = batch.decode_all(&audio).expect("partial image");

    let mut streamed = SstvDecoder::new(48_000).unwrap();
    for chunk in audio.chunks(25_013) {
        streamed.push_samples(chunk);
    }
    streamed.flush();

    // flush turns exhaustion into a terminal error, but the pixels match
    let streamed_image = streamed.image().expect("buffer");
    assert_eq!(image.lines_written(), streamed_image.lines_written());
    assert_eq!(image.data(), streamed_image.data());
}

#[test]
fn decode_all_is_repeatable() {
    let audio = pd120_signal(12, None);
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    let first = decoder.decode_all(&audio).expect("partial image");
    let second = decoder.decode_all(&audio).expect("partial image");
    assert_eq!(first, second);
}

#[test]
fn events_fire_in_lifecycle_order() {
    let audio = pd120_signal(12, None);
    let observer = RecordingObserver::new();
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.set_observer(Box::new(observer.clone()));
    for chunk in audio.chunks(48_000) {
        decoder.push_samples(chunk);
    }

    let log = observer.log();
    let position = |needle: &str| {
        log.iter()
            .position(|line| line.starts_with(needle))
            .unwrap_or_else(|| panic!("missing event {needle:?} in {log:?}"))
    };

    let detecting = position("state DetectingVis");
    let began = position("began_vis");
    let failed = position("vis_failed");
    let searching = position("state SearchingSync");
    let locked = position("locked");
    let sync_locked = position("state SyncLocked");
    let decoding = position("state Decoding");
    let first_line = position("line 0/496");
    let progress = position("progress");

    assert!(detecting < began);
    assert!(began < failed);
    assert!(failed < searching);
    assert!(searching < locked);
    assert!(locked < sync_locked);
    assert!(sync_locked < decoding);
    assert!(decoding < first_line);
    assert!(first_line < progress);
}

#[test]
fn rows_become_readable_while_streaming() {
    let audio = pd120_signal(12, None);

    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.push_samples(&audio[..400_000]);
    // Ten frames have settled by now; the image is partially readable
    assert_eq!(decoder.lines_written(), 20);
    let early_row = decoder.image().unwrap().row(0).to_vec();

    decoder.push_samples(&audio[400_000..]);
    assert_eq!(decoder.lines_written(), 22);
    // Already-written rows do not change as more audio arrives
    assert_eq!(decoder.image().unwrap().row(0), &early_row[..]);
}

#[test]
fn terminal_state_ignores_further_audio() {
    let audio = pd120_signal(12, None);
    let mut decoder = SstvDecoder::new(48_000).unwrap();
    decoder.push_samples(&audio);
    decoder.flush();
    let state = decoder.state().clone();
    let lines = decoder.lines_written();

    decoder.push_samples(&audio);
    assert_eq!(*decoder.state(), state);
    assert_eq!(decoder.lines_written(), lines);
}
