//! Whisper transcription backend.
//!
//! Uses whisper.cpp via whisper-rs for speech-to-text.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{Segment, Transcriber};
use crate::audio::SAMPLE_RATE;

/// Whisper speech-to-text transcriber.
///
/// The underlying WhisperContext is leaked intentionally - the model stays
/// loaded for the process lifetime. This avoids complex self-referential
/// struct patterns while allowing the state to be reused across sessions.
pub struct WhisperTranscriber {
    state: WhisperState,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Arguments
    /// * `model_path` - Path to the Whisper GGML model file
    /// * `language` - Language code (e.g., "es", "en") or None for auto-detect
    pub fn new(model_path: impl AsRef<Path>, language: Option<String>) -> Result<Self> {
        info!(
            path = %model_path.as_ref().display(),
            language = ?language,
            "Loading Whisper model"
        );

        let ctx = WhisperContext::new_with_params(
            model_path.as_ref().to_str().context("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .context("Failed to load Whisper model")?;

        // Box and leak the context to get a 'static reference; the model is
        // never unloaded before the process exits.
        let ctx_box = Box::new(ctx);
        let ctx_ref: &'static WhisperContext = Box::leak(ctx_box);

        let state = ctx_ref
            .create_state()
            .context("Failed to create Whisper state")?;

        info!("Whisper model and state loaded");

        Ok(Self { state, language })
    }

    /// Get the configured language hint.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Read a 16 kHz mono 16-bit PCM WAV file into f32 samples.
fn read_wav_samples(path: &Path) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE || spec.channels != 1 || spec.bits_per_sample != 16 {
        anyhow::bail!(
            "Whisper expects 16kHz mono 16-bit audio, got {}Hz {}ch {}-bit",
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample
        );
    }

    reader
        .into_samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32768.0))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read audio samples")
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, audio: &Path) -> Result<Vec<Segment>> {
        let samples = read_wav_samples(audio)?;

        debug!(
            path = %audio.display(),
            samples = samples.len(),
            duration_secs = samples.len() as f32 / SAMPLE_RATE as f32,
            "Transcribing audio with Whisper"
        );

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.language.as_deref());

        // Keep whisper.cpp from writing to stdout; it belongs to the protocol.
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        self.state
            .full(params, &samples)
            .context("Whisper inference failed")?;

        let num_segments = self.state.full_n_segments();
        let mut segments = Vec::new();

        for i in 0..num_segments {
            if let Some(segment) = self.state.get_segment(i) {
                let text = segment
                    .to_str_lossy()
                    .context("Failed to decode segment text")?;
                segments.push(Segment {
                    text: text.to_string(),
                    // whisper timestamps are in centiseconds
                    start_ms: segment.start_timestamp() * 10,
                    end_ms: segment.end_timestamp() * 10,
                });
            }
        }

        debug!(segments = segments.len(), "Transcription complete");

        Ok(segments)
    }
}
