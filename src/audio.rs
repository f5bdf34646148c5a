//! Microphone capture for dictado.
//!
//! The capture subsystem delivers fixed-size chunks of 16 kHz mono i16
//! samples through a callback running on a cpal-managed thread. The only
//! state shared with the session loop is the [`CaptureBuffer`] sink.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Sample rate the speech model expects.
pub const SAMPLE_RATE: u32 = 16_000;

/// Capture channel count. Recordings are mono.
pub const CHANNELS: u16 = 1;

/// Frames per capture chunk: 100 ms at 16 kHz.
pub const CHUNK_FRAMES: u32 = SAMPLE_RATE / 10;

/// Minimum viable recording length in seconds.
pub const MIN_RECORDING_SECS: f32 = 0.3;

/// Minimum viable recording length in samples.
pub const MIN_RECORDING_SAMPLES: usize = (SAMPLE_RATE as f32 * MIN_RECORDING_SECS) as usize;

/// Thread-safe ordered sink for audio chunks.
///
/// The capture callback appends while the session loop may drain; a single
/// mutex around the chunk list keeps appends and the final drain atomic.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    chunks: Mutex<Vec<Vec<i16>>>,
}

impl CaptureBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy a chunk into the buffer. The callback's slice is only valid for
    /// the duration of the call, so the copy is mandatory.
    pub fn append(&self, chunk: &[i16]) {
        self.lock().push(chunk.to_vec());
    }

    /// Take all chunks appended so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Vec<i16>> {
        std::mem::take(&mut *self.lock())
    }

    /// Total number of samples currently buffered.
    pub fn sample_count(&self) -> usize {
        self.lock().iter().map(Vec::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<i16>>> {
        // A poisoned lock means a callback panicked mid-append; the chunks
        // already stored are still intact.
        match self.chunks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// An open capture stream. Dropping it via `stop` releases the device.
pub trait CaptureStream {
    fn stop(self: Box<Self>);
}

/// Something that can open a capture stream feeding a [`CaptureBuffer`].
pub trait CaptureBackend {
    fn open(&mut self, sink: Arc<CaptureBuffer>) -> Result<Box<dyn CaptureStream>>;
}

/// Capture backend for the default system microphone.
#[derive(Debug, Default)]
pub struct Microphone;

impl CaptureBackend for Microphone {
    fn open(&mut self, sink: Arc<CaptureBuffer>) -> Result<Box<dyn CaptureStream>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available")?;

        // The recording format is fixed: 16 kHz mono i16 in 100 ms chunks.
        // A device that cannot provide it fails the session, not the process.
        let config = cpal::StreamConfig {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            buffer_size: cpal::BufferSize::Fixed(CHUNK_FRAMES),
        };

        let err_fn = |err| tracing::warn!(error = %err, "Audio stream error");

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _| sink.append(data),
                err_fn,
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        Ok(Box::new(MicrophoneStream { stream }))
    }
}

struct MicrophoneStream {
    stream: cpal::Stream,
}

impl CaptureStream for MicrophoneStream {
    fn stop(self: Box<Self>) {
        let _ = self.stream.pause();
        drop(self);
    }
}

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
