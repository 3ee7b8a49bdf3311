//! Audio recording loader
//!
//! The WAV-parsing collaborator around the engine: probe a file with
//! symphonia, decode whatever codec it holds, downmix to mono and resample
//! to the decoder's rate. The engine itself only ever sees normalised mono
//! `f32` at a fixed rate.

use std::fs::File;
use std::path::Path;

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::errors::AudioLoadError;
use crate::pcm;

/// Load a recording as mono samples at `target_sample_rate`.
pub fn load_recording(path: &Path, target_sample_rate: u32) -> Result<Vec<f32>, AudioLoadError> {
    let display = path.to_string_lossy().into_owned();
    let file = File::open(path).map_err(|e| AudioLoadError::Open {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let stream = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioLoadError::Decode {
            path: display.clone(),
            reason: format!("unrecognised format: {e}"),
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioLoadError::Decode {
            path: display.clone(),
            reason: "no audio track".into(),
        })?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioLoadError::Decode {
            path: display.clone(),
            reason: "unknown sample rate".into(),
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioLoadError::Decode {
            path: display.clone(),
            reason: e.to_string(),
        })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break, // end of stream
        };
        if packet.track_id() != track_id {
            continue;
        }
        let Ok(decoded) = decoder.decode(&packet) else {
            continue; // skip corrupt packets
        };
        let spec = *decoded.spec();
        let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        interleaved.copy_interleaved_ref(decoded);
        samples.extend(pcm::downmix(interleaved.samples(), spec.channels.count()));
    }

    if samples.is_empty() {
        return Err(AudioLoadError::Empty { path: display });
    }

    if source_rate == target_sample_rate {
        Ok(samples)
    } else {
        resample(&samples, source_rate, target_sample_rate)
    }
}

fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AudioLoadError> {
    let chunk = source_rate as usize;
    let mut resampler = FastFixedIn::<f32>::new(
        f64::from(target_rate) / f64::from(source_rate),
        1.0,
        PolynomialDegree::Linear,
        chunk,
        1,
    )
    .map_err(|e| AudioLoadError::Resample {
        reason: e.to_string(),
    })?;

    let mut output = Vec::with_capacity(
        (samples.len() as f64 * f64::from(target_rate) / f64::from(source_rate)) as usize,
    );
    let mut input = vec![Vec::with_capacity(chunk)];
    for block in samples.chunks(chunk) {
        input[0].clear();
        input[0].extend_from_slice(block);
        // The fixed-size resampler wants full chunks; pad the tail
        if input[0].len() < chunk {
            input[0].resize(chunk, 0.0);
        }
        let resampled = resampler
            .process(&input, None)
            .map_err(|e| AudioLoadError::Resample {
                reason: e.to_string(),
            })?;
        output.extend_from_slice(&resampled[0]);
    }
    Ok(output)
}
