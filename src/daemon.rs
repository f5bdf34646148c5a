//! The long-lived session daemon.
//!
//! Drives the line protocol on stdin/stdout:
//!
//! ```text
//! out: LOADING
//! out: READY
//! in:  START
//! out: RECORDING
//! in:  STOP
//! out: RESULT:<text>   (or ERROR:<message>)
//! ```
//!
//! Every emitted line is flushed immediately; the host updates its UI from
//! individual lines. A failed session returns the loop to the idle state,
//! never takes the process down. End-of-input always means "shut down
//! cleanly", stopping any in-progress capture first.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::audio::{CaptureBackend, CaptureBuffer, CaptureStream};
use crate::session::{SessionError, transcribe_recording, validate_recording};
use crate::transcribe::Transcriber;

/// What the protocol loop should do after a session concludes.
enum Flow {
    Continue,
    Shutdown,
}

/// Run the daemon protocol until end-of-input.
///
/// `load` is invoked once, between the `LOADING` and `READY` markers. If it
/// fails, the error is reported on the output stream and returned; the
/// daemon never serves sessions without a model.
pub fn run<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    backend: &mut dyn CaptureBackend,
    load: impl FnOnce() -> Result<Box<dyn Transcriber>>,
) -> Result<()> {
    emit(&mut output, "LOADING")?;

    let mut transcriber = match load() {
        Ok(transcriber) => transcriber,
        Err(e) => {
            emit(&mut output, &format!("ERROR:{e:#}"))?;
            return Err(e.context("Model load failed"));
        }
    };

    emit(&mut output, "READY")?;
    info!("Daemon ready");

    let mut line = String::new();
    loop {
        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read command")?;
        if read == 0 {
            info!("Input closed while idle, shutting down");
            return Ok(());
        }

        let command = line.trim();
        if command != "START" {
            // Stray input while idle is tolerated; hosts have timing slop.
            if !command.is_empty() {
                debug!(command, "Ignoring input while idle");
            }
            continue;
        }

        match run_session(&mut input, &mut output, backend, transcriber.as_mut())? {
            Flow::Continue => {}
            Flow::Shutdown => return Ok(()),
        }
    }
}

/// Run one recording session: open capture, wait for `STOP`, drain,
/// validate, transcribe, and emit exactly one terminal line.
fn run_session<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    backend: &mut dyn CaptureBackend,
    transcriber: &mut dyn Transcriber,
) -> Result<Flow> {
    let buffer = CaptureBuffer::new();

    let stream = match backend.open(buffer.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            let err = SessionError::CaptureOpen(e);
            emit(output, &format!("ERROR:{err}"))?;
            return Ok(Flow::Continue);
        }
    };

    emit(output, "RECORDING")?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read command")?;
        if read == 0 {
            // A closed host pipe must not leave the capture device open.
            info!("Input closed while recording, stopping capture");
            stream.stop();
            return Ok(Flow::Shutdown);
        }

        let command = line.trim();
        if command == "STOP" {
            break;
        }
        if !command.is_empty() {
            debug!(command, "Ignoring input while recording");
        }
    }

    stream.stop();
    let chunks = buffer.drain();
    debug!(chunks = chunks.len(), "Capture stopped");

    let terminal = match validate_recording(&chunks)
        .and_then(|_| transcribe_recording(&chunks, transcriber))
    {
        Ok(text) => format!("RESULT:{text}"),
        Err(err) => format!("ERROR:{err}"),
    };
    emit(output, &terminal)?;

    Ok(Flow::Continue)
}

/// Write one protocol line and flush; the host depends on line-by-line
/// delivery.
fn emit(output: &mut impl Write, line: &str) -> Result<()> {
    writeln!(output, "{line}").context("Failed to write protocol line")?;
    output.flush().context("Failed to flush output")
}

#[cfg(test)]
#[path = "daemon_test.rs"]
mod tests;
