use super::*;

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use crate::audio::CaptureStream;
use crate::transcribe::Segment;

fn seg(text: &str) -> Segment {
    Segment {
        text: text.to_string(),
        start_ms: 0,
        end_ms: 0,
    }
}

fn second_of_audio() -> Vec<Vec<i16>> {
    vec![vec![0i16; 1600]; 10]
}

struct StubStream {
    stopped: Arc<AtomicBool>,
}

impl CaptureStream for StubStream {
    fn stop(self: Box<Self>) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

struct ScriptedCapture {
    script: VecDeque<Result<Vec<Vec<i16>>>>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedCapture {
    fn new(script: Vec<Result<Vec<Vec<i16>>>>) -> Self {
        Self {
            script: script.into(),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl CaptureBackend for ScriptedCapture {
    fn open(&mut self, sink: Arc<CaptureBuffer>) -> Result<Box<dyn CaptureStream>> {
        match self.script.pop_front().expect("unexpected capture open") {
            Ok(chunks) => {
                for chunk in &chunks {
                    sink.append(chunk);
                }
                Ok(Box::new(StubStream {
                    stopped: self.stopped.clone(),
                }))
            }
            Err(e) => Err(e),
        }
    }
}

struct ScriptedTranscriber {
    result: Option<Result<Vec<Segment>>>,
}

impl Transcriber for ScriptedTranscriber {
    fn transcribe(&mut self, _audio: &Path) -> Result<Vec<Segment>> {
        self.result.take().expect("unexpected transcribe call")
    }
}

struct Harness {
    result: Result<()>,
    output: Vec<String>,
    errput: Vec<String>,
    loader_ran: bool,
    capture_stopped: bool,
}

fn run_record(
    input: &str,
    capture: Vec<Result<Vec<Vec<i16>>>>,
    transcription: Option<Result<Vec<Segment>>>,
) -> Harness {
    let mut backend = ScriptedCapture::new(capture);
    let stopped = backend.stopped.clone();
    let loader_ran = Arc::new(AtomicBool::new(false));
    let loader_flag = loader_ran.clone();

    let mut output = Vec::new();
    let mut errput = Vec::new();
    let result = run(
        Cursor::new(input.to_string()),
        &mut output,
        &mut errput,
        &mut backend,
        move || {
            loader_flag.store(true, Ordering::SeqCst);
            Ok(Box::new(ScriptedTranscriber {
                result: transcription,
            }))
        },
    );

    let to_lines = |bytes: Vec<u8>| {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    };

    Harness {
        result,
        output: to_lines(output),
        errput: to_lines(errput),
        loader_ran: loader_ran.load(Ordering::SeqCst),
        capture_stopped: stopped.load(Ordering::SeqCst),
    }
}

#[test]
fn announces_ready_then_prints_the_transcript() {
    let h = run_record(
        "\n",
        vec![Ok(second_of_audio())],
        Some(Ok(vec![seg(" Hola mundo.")])),
    );

    assert!(h.result.is_ok());
    assert_eq!(h.output, vec!["READY", "Hola mundo."]);
    assert!(h.errput.is_empty());
    assert!(h.capture_stopped);
}

#[test]
fn capture_open_failure_reports_error_audio_without_ready() {
    let h = run_record("\n", vec![Err(anyhow!("device busy"))], None);

    assert!(h.result.is_err());
    assert!(h.output.is_empty());
    assert_eq!(
        h.errput,
        vec!["ERROR_AUDIO: Could not open microphone: device busy"]
    );
    assert!(!h.loader_ran);
}

#[test]
fn empty_recording_reports_error_empty() {
    let h = run_record("\n", vec![Ok(vec![])], None);

    assert!(h.result.is_err());
    assert_eq!(h.output, vec!["READY"]);
    assert_eq!(h.errput, vec!["ERROR_EMPTY: No audio was recorded."]);
}

#[test]
fn short_recording_reports_error_too_short() {
    let h = run_record("\n", vec![Ok(vec![vec![0i16; 1600]; 2])], None);

    assert!(h.result.is_err());
    assert_eq!(h.errput, vec!["ERROR_TOO_SHORT: Recording too short."]);
}

#[test]
fn model_is_loaded_only_after_validation_passes() {
    let invalid = run_record("\n", vec![Ok(vec![])], None);
    assert!(!invalid.loader_ran);

    let valid = run_record(
        "\n",
        vec![Ok(second_of_audio())],
        Some(Ok(vec![seg("ok")])),
    );
    assert!(valid.loader_ran);
}

#[test]
fn empty_transcription_maps_to_error_empty() {
    let h = run_record(
        "\n",
        vec![Ok(second_of_audio())],
        Some(Ok(vec![seg("  ")])),
    );

    assert!(h.result.is_err());
    assert_eq!(h.errput, vec!["ERROR_EMPTY: Empty transcription."]);
}

#[test]
fn transcription_failure_propagates_without_a_prefix() {
    let h = run_record(
        "\n",
        vec![Ok(second_of_audio())],
        Some(Err(anyhow!("inference blew up"))),
    );

    assert!(h.result.is_err());
    assert!(h.errput.is_empty());
    let err = h.result.unwrap_err();
    assert!(format!("{err:#}").contains("inference blew up"));
}

#[test]
fn end_of_input_counts_as_the_stop_signal() {
    let h = run_record("", vec![Ok(second_of_audio())], Some(Ok(vec![seg("ok")])));

    assert!(h.result.is_ok());
    assert_eq!(h.output, vec!["READY", "ok"]);
    assert!(h.capture_stopped);
}

#[test]
fn session_errors_are_downcastable_for_exit_mapping() {
    let h = run_record("\n", vec![Ok(vec![])], None);

    let err = h.result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::NoAudio)
    ));
}
