use super::*;
use crate::transcribe::Segment;
use std::path::{Path, PathBuf};

fn seg(text: &str) -> Segment {
    Segment {
        text: text.to_string(),
        start_ms: 0,
        end_ms: 0,
    }
}

/// Transcriber that inspects the WAV it is handed while the file exists.
struct ProbingTranscriber {
    result: Option<Result<Vec<Segment>, String>>,
    seen_path: Option<PathBuf>,
    seen_spec: Option<hound::WavSpec>,
    seen_samples: Vec<i16>,
}

impl ProbingTranscriber {
    fn returning(result: Result<Vec<Segment>, String>) -> Self {
        Self {
            result: Some(result),
            seen_path: None,
            seen_spec: None,
            seen_samples: Vec::new(),
        }
    }
}

impl Transcriber for ProbingTranscriber {
    fn transcribe(&mut self, audio: &Path) -> anyhow::Result<Vec<Segment>> {
        let reader = hound::WavReader::open(audio).expect("temp WAV should exist and parse");
        self.seen_spec = Some(reader.spec());
        self.seen_samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        self.seen_path = Some(audio.to_path_buf());

        self.result
            .take()
            .expect("transcribe called twice")
            .map_err(|msg| anyhow::anyhow!(msg))
    }
}

#[test]
fn validate_rejects_empty_recording() {
    assert!(matches!(
        validate_recording(&[]),
        Err(SessionError::NoAudio)
    ));
}

#[test]
fn validate_rejects_recording_below_threshold() {
    let chunks = vec![vec![0i16; MIN_RECORDING_SAMPLES - 1]];
    assert!(matches!(
        validate_recording(&chunks),
        Err(SessionError::TooShort)
    ));
}

#[test]
fn validate_accepts_recording_at_threshold() {
    let chunks = vec![vec![0i16; MIN_RECORDING_SAMPLES]];
    assert_eq!(validate_recording(&chunks).unwrap(), MIN_RECORDING_SAMPLES);
}

#[test]
fn validate_sums_samples_across_chunks() {
    let chunks = vec![vec![0i16; 1600]; 3];
    assert_eq!(validate_recording(&chunks).unwrap(), 4800);
}

#[test]
fn error_messages_match_the_protocol() {
    assert_eq!(SessionError::NoAudio.to_string(), "No audio was recorded.");
    assert_eq!(SessionError::TooShort.to_string(), "Recording too short.");
    assert_eq!(
        SessionError::EmptyTranscription.to_string(),
        "Empty transcription."
    );
    assert_eq!(
        SessionError::Transcription(anyhow::anyhow!("boom")).to_string(),
        "Transcription failed: boom"
    );
}

#[test]
fn transcribe_writes_wav_with_the_contract_header() {
    let chunks = vec![vec![1i16, 2, 3], vec![4, 5]];
    let mut transcriber = ProbingTranscriber::returning(Ok(vec![seg("ok")]));

    transcribe_recording(&chunks, &mut transcriber).unwrap();

    let spec = transcriber.seen_spec.unwrap();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, CHANNELS);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
}

#[test]
fn transcribe_concatenates_chunks_in_arrival_order() {
    let chunks = vec![vec![10i16, 20], vec![30], vec![40, 50]];
    let mut transcriber = ProbingTranscriber::returning(Ok(vec![seg("ok")]));

    transcribe_recording(&chunks, &mut transcriber).unwrap();

    assert_eq!(transcriber.seen_samples, vec![10, 20, 30, 40, 50]);
}

#[test]
fn temp_wav_is_deleted_after_success() {
    let chunks = vec![vec![0i16; 100]];
    let mut transcriber = ProbingTranscriber::returning(Ok(vec![seg("ok")]));

    transcribe_recording(&chunks, &mut transcriber).unwrap();

    let path = transcriber.seen_path.unwrap();
    assert!(!path.exists(), "temp WAV left behind: {}", path.display());
}

#[test]
fn temp_wav_is_deleted_after_transcriber_failure() {
    let chunks = vec![vec![0i16; 100]];
    let mut transcriber = ProbingTranscriber::returning(Err("model exploded".to_string()));

    let err = transcribe_recording(&chunks, &mut transcriber).unwrap_err();
    assert!(matches!(err, SessionError::Transcription(_)));
    assert_eq!(err.to_string(), "Transcription failed: model exploded");

    let path = transcriber.seen_path.unwrap();
    assert!(!path.exists(), "temp WAV left behind: {}", path.display());
}

#[test]
fn segment_texts_are_joined_and_trimmed() {
    let chunks = vec![vec![0i16; 100]];
    let mut transcriber =
        ProbingTranscriber::returning(Ok(vec![seg(" Hola"), seg(" mundo. ")]));

    let text = transcribe_recording(&chunks, &mut transcriber).unwrap();
    assert_eq!(text, "Hola mundo.");
}

#[test]
fn whitespace_only_segments_are_an_empty_transcription() {
    let chunks = vec![vec![0i16; 100]];
    let mut transcriber = ProbingTranscriber::returning(Ok(vec![seg("  "), seg("\n")]));

    assert!(matches!(
        transcribe_recording(&chunks, &mut transcriber),
        Err(SessionError::EmptyTranscription)
    ));
}

#[test]
fn no_segments_at_all_is_an_empty_transcription() {
    let chunks = vec![vec![0i16; 100]];
    let mut transcriber = ProbingTranscriber::returning(Ok(vec![]));

    assert!(matches!(
        transcribe_recording(&chunks, &mut transcriber),
        Err(SessionError::EmptyTranscription)
    ));
}
