//! Structured diagnostics
//!
//! The engine's only logging surface: opt-in records routed through the
//! observer's `emitted_diagnostic`. Nothing here touches stderr or global
//! state; rendering is the caller's concern.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Debug => write!(f, "DEBUG"),
            DiagnosticLevel::Info => write!(f, "INFO"),
            DiagnosticLevel::Warning => write!(f, "WARN"),
            DiagnosticLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Sync,
    Demodulation,
    Decoding,
    Timing,
    General,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Sync => write!(f, "SYNC"),
            DiagnosticCategory::Demodulation => write!(f, "DEMOD"),
            DiagnosticCategory::Decoding => write!(f, "DECODE"),
            DiagnosticCategory::Timing => write!(f, "TIMING"),
            DiagnosticCategory::General => write!(f, "GENERAL"),
        }
    }
}

/// One diagnostic record. `timestamp_secs` is the audio clock (seconds of
/// audio accumulated when the record was emitted), so runs are reproducible
/// sample-for-sample.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub category: DiagnosticCategory,
    pub message: String,
    pub details: Vec<(&'static str, String)>,
    pub timestamp_secs: f64,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:9.3}] {} {}: {}",
            self.timestamp_secs, self.level, self.category, self.message
        )?;
        for (key, value) in &self.details {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}
