//! The record→transcribe session core.
//!
//! One session is: drain the capture buffer, validate what was recorded,
//! write it to a temporary WAV, hand that to the transcriber, and reduce
//! the segments to a single trimmed line of text. Both the daemon and the
//! single-shot recorder drive this module; they differ only in how many
//! sessions they run and how they report the outcome.

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::audio::{CHANNELS, MIN_RECORDING_SAMPLES, SAMPLE_RATE};
use crate::transcribe::{Transcriber, collect_text};

/// Ways a recording session can fail without taking the process down.
///
/// The `Display` forms are the protocol messages emitted to the host.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not open microphone: {0:#}")]
    CaptureOpen(anyhow::Error),
    #[error("No audio was recorded.")]
    NoAudio,
    #[error("Recording too short.")]
    TooShort,
    #[error("Empty transcription.")]
    EmptyTranscription,
    #[error("Transcription failed: {0:#}")]
    Transcription(anyhow::Error),
}

/// Check that a drained recording is worth transcribing.
///
/// Returns the total sample count on success.
pub fn validate_recording(chunks: &[Vec<i16>]) -> Result<usize, SessionError> {
    if chunks.is_empty() {
        return Err(SessionError::NoAudio);
    }

    let samples: usize = chunks.iter().map(Vec::len).sum();
    if samples < MIN_RECORDING_SAMPLES {
        return Err(SessionError::TooShort);
    }

    Ok(samples)
}

/// Transcribe a validated recording.
///
/// Concatenates the chunks in arrival order into a temporary WAV file,
/// invokes the transcriber on it, and joins the segment texts. The WAV is
/// deleted on every exit path; deletion failures are ignored.
pub fn transcribe_recording(
    chunks: &[Vec<i16>],
    transcriber: &mut dyn Transcriber,
) -> Result<String, SessionError> {
    let samples: Vec<i16> = chunks.iter().flatten().copied().collect();

    // NamedTempFile removes the file when dropped, including on the error
    // paths below and on unwind.
    let wav = write_temp_wav(&samples).map_err(SessionError::Transcription)?;

    let segments = transcriber
        .transcribe(wav.path())
        .map_err(SessionError::Transcription)?;

    let text = collect_text(&segments);
    if text.is_empty() {
        return Err(SessionError::EmptyTranscription);
    }

    debug!(samples = samples.len(), chars = text.len(), "Session transcribed");

    Ok(text)
}

/// Write samples to a uniquely-named temporary 16 kHz mono 16-bit WAV.
fn write_temp_wav(samples: &[i16]) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("dictado_")
        .suffix(".wav")
        .tempfile()
        .context("Failed to create temporary WAV file")?;

    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(file.path(), spec)
        .context("Failed to create WAV writer")?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .context("Failed to write audio data")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(file)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
