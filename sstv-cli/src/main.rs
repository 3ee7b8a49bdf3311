use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use color_eyre::eyre::{eyre, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use sstv_core::audio_file::load_recording;
use sstv_core::diagnostics::Diagnostic;
use sstv_core::{DecodeError, DecodeObserver, PixelBuffer, SstvDecoder, SstvMode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode an SSTV recording into an image", long_about = None)]
struct Cli {
    /// Audio recording (WAV, MP3, FLAC, ...)
    input: PathBuf,

    /// Force a mode (PD120, PD180, Robot36) instead of VIS auto-detection
    #[arg(short, long)]
    mode: Option<String>,

    /// Output image path
    #[arg(short, long, default_value = "decoded.png")]
    out: PathBuf,

    /// Decode sample rate; the recording is resampled to this
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Horizontal phase correction in milliseconds
    #[arg(long, default_value_t = 0.0)]
    phase_offset_ms: f64,

    /// Per-line skew correction in milliseconds
    #[arg(long, default_value_t = 0.0)]
    skew_ms_per_line: f64,

    /// Fraction of lines below which a sync loss is retried
    #[arg(long, default_value_t = 0.5)]
    sync_recovery_threshold: f64,

    /// Print a JSON report to stdout
    #[arg(long)]
    json: bool,

    /// Show engine diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct DecodeReport {
    input: String,
    output: String,
    mode: Option<String>,
    width: usize,
    height: usize,
    lines_decoded: usize,
    total_lines: usize,
    sync_confidence: Option<f32>,
    complete: bool,
    decoded_at: DateTime<Utc>,
}

/// Renders engine events as a progress bar and optional diagnostics.
struct ConsoleObserver {
    bar: ProgressBar,
    verbose: bool,
}

impl ConsoleObserver {
    fn new(verbose: bool) -> Self {
        let bar = ProgressBar::new(1);
        bar.set_style(
            ProgressStyle::with_template("{msg:18} [{bar:40.cyan/blue}] {pos}/{len} lines")
                .expect("static template")
                .progress_chars("=> "),
        );
        bar.set_message("listening");
        Self { bar, verbose }
    }
}

impl DecodeObserver for ConsoleObserver {
    fn began_vis_detection(&mut self) {
        self.bar.set_message("detecting VIS");
    }

    fn detected_vis_code(&mut self, code: u8, mode_name: &str) {
        self.bar.set_message(format!("{mode_name} ({code:#04x})"));
    }

    fn failed_vis_detection(&mut self) {
        self.bar.set_message("no VIS, assuming PD120");
    }

    fn locked_sync(&mut self, confidence: f32) {
        self.bar
            .set_message(format!("locked ({:.0}%)", confidence * 100.0));
    }

    fn lost_sync(&mut self) {
        self.bar.set_message("searching sync");
    }

    fn decoded_line(&mut self, line_number: u32, total_lines: u32) {
        self.bar.set_length(u64::from(total_lines));
        self.bar.set_position(u64::from(line_number) + 1);
    }

    fn completed_image(&mut self, _image: &PixelBuffer) {
        self.bar.finish_with_message("complete");
    }

    fn encountered_error(&mut self, error: &DecodeError) {
        self.bar.abandon_with_message(format!("failed: {error}"));
    }

    fn emitted_diagnostic(&mut self, diagnostic: &Diagnostic) {
        if self.verbose {
            self.bar.suspend(|| eprintln!("{diagnostic}"));
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let samples = load_recording(&args.input, args.sample_rate)
        .wrap_err_with(|| format!("failed to load {}", args.input.display()))?;

    let mut decoder = match &args.mode {
        Some(name) => {
            let mode = SstvMode::from_name(name)
                .ok_or_else(|| eyre!("unknown mode {name:?}; expected PD120, PD180 or Robot36"))?;
            SstvDecoder::new_with_mode(mode, args.sample_rate)?
        }
        None => SstvDecoder::new(args.sample_rate)?,
    };
    decoder.options_mut().set_phase_offset_ms(args.phase_offset_ms);
    decoder
        .options_mut()
        .set_skew_ms_per_line(args.skew_ms_per_line);
    decoder
        .options_mut()
        .set_sync_recovery_threshold(args.sync_recovery_threshold);
    decoder.set_observer(Box::new(ConsoleObserver::new(args.verbose)));
    if args.verbose {
        decoder.enable_diagnostics();
    }

    let result = decoder.decode_all(&samples);
    let complete = matches!(decoder.state(), sstv_core::DecoderState::Complete);
    let buffer = match result {
        Ok(buffer) => buffer,
        Err(error) => {
            // A failed decode may still hold usable lines
            match decoder.image() {
                Some(partial) if partial.lines_written() > 0 => {
                    eprintln!("decode failed ({error}), writing partial image");
                    partial.clone()
                }
                _ => return Err(error).wrap_err("decode produced no image"),
            }
        }
    };

    write_png(&buffer, &args.out)
        .wrap_err_with(|| format!("failed to write {}", args.out.display()))?;

    if args.json {
        let report = DecodeReport {
            input: args.input.display().to_string(),
            output: args.out.display().to_string(),
            mode: decoder.mode().map(|m| m.name().to_string()),
            width: buffer.width(),
            height: buffer.height(),
            lines_decoded: buffer.lines_written(),
            total_lines: buffer.height(),
            sync_confidence: decoder.sync_confidence(),
            complete,
            decoded_at: Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "{} lines of {} decoded into {}",
            buffer.lines_written(),
            buffer.height(),
            args.out.display()
        );
    }

    Ok(())
}

fn write_png(buffer: &PixelBuffer, path: &std::path::Path) -> Result<()> {
    let rgb = buffer.to_rgb8();
    let image = image::RgbImage::from_raw(buffer.width() as u32, buffer.height() as u32, rgb)
        .ok_or_else(|| eyre!("pixel buffer size mismatch"))?;
    image.save(path)?;
    Ok(())
}
