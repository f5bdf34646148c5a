//! Single-shot microphone recorder.
//!
//! One session for the process lifetime: open the microphone, announce
//! `READY`, block until the host sends any line, then validate and
//! transcribe. Recoverable failures are reported on stderr with the
//! prefixes the host matches on (`ERROR_AUDIO:`, `ERROR_EMPTY:`,
//! `ERROR_TOO_SHORT:`); the transcript itself goes to stdout.
//!
//! Unlike the daemon, the model is loaded lazily - only once a recording
//! has passed validation is the (slow) model load worth paying for.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::audio::{CaptureBackend, CaptureBuffer, CaptureStream};
use crate::session::{SessionError, transcribe_recording, validate_recording};
use crate::transcribe::Transcriber;

/// Protocol prefix for a recoverable failure, if it has one.
///
/// Transcription invocation failures have none; they propagate as plain
/// process failures.
fn prefix(err: &SessionError) -> Option<&'static str> {
    match err {
        SessionError::CaptureOpen(_) => Some("ERROR_AUDIO"),
        SessionError::NoAudio | SessionError::EmptyTranscription => Some("ERROR_EMPTY"),
        SessionError::TooShort => Some("ERROR_TOO_SHORT"),
        SessionError::Transcription(_) => None,
    }
}

/// Record one utterance and print its transcription.
///
/// Returns `Err` for every failed session; callers map that to a non-zero
/// exit. Failures carrying a protocol prefix have already been reported on
/// `errput` when this returns.
pub fn run<R: BufRead, W: Write, E: Write>(
    mut input: R,
    mut output: W,
    mut errput: E,
    backend: &mut dyn CaptureBackend,
    load: impl FnOnce() -> Result<Box<dyn Transcriber>>,
) -> Result<()> {
    let buffer = CaptureBuffer::new();

    let stream = match backend.open(buffer.clone()) {
        Ok(stream) => stream,
        Err(e) => return Err(report(&mut errput, SessionError::CaptureOpen(e))?),
    };

    // Signal the host: ready to record.
    writeln!(output, "READY").context("Failed to write READY")?;
    output.flush().context("Failed to flush output")?;

    // Any line (or end-of-input) is the stop signal.
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read stop signal")?;

    stream.stop();
    let chunks = buffer.drain();
    info!(chunks = chunks.len(), "Recording stopped");

    if let Err(err) = validate_recording(&chunks) {
        return Err(report(&mut errput, err)?);
    }

    let mut transcriber = load()?;

    match transcribe_recording(&chunks, transcriber.as_mut()) {
        Ok(text) => {
            writeln!(output, "{text}").context("Failed to write transcript")?;
            output.flush().context("Failed to flush output")?;
            Ok(())
        }
        Err(SessionError::Transcription(e)) => Err(e.context("Transcription failed")),
        Err(err) => Err(report(&mut errput, err)?),
    }
}

/// Write the prefixed error line for a recoverable failure, then hand the
/// error back for the caller to return.
fn report(errput: &mut impl Write, err: SessionError) -> Result<anyhow::Error> {
    if let Some(prefix) = prefix(&err) {
        writeln!(errput, "{prefix}: {err}").context("Failed to write error line")?;
        errput.flush().context("Failed to flush stderr")?;
    }
    Ok(err.into())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
