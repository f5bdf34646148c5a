//! Speech-to-text transcription.
//!
//! This module provides a trait abstraction for the transcription backend
//! and the whisper.cpp implementation.

use std::path::Path;

use anyhow::Result;

mod whisper;

pub use whisper::WhisperTranscriber;

/// A unit of transcribed text with timing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Speech-to-text transcriber.
///
/// Implementations take a 16 kHz mono 16-bit PCM WAV file and return the
/// recognized segments in the order they were produced. Loading the model
/// happens at construction; `transcribe` may block for an unbounded time.
pub trait Transcriber: Send {
    fn transcribe(&mut self, audio: &Path) -> Result<Vec<Segment>>;
}

/// Concatenate segment texts with no separator and trim the result.
pub fn collect_text(segments: &[Segment]) -> String {
    let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
    joined.trim().to_string()
}
