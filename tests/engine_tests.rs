// Integration tests for the transcript engine state machine.
//
// A scripted capture stands in for the streaming recognizer so the tests can
// drive partial/final results, end-of-capture, and every error kind.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use roomcast::transcript::{
    AssistantError, AssistantResponder, CannedResponder, CaptureError, EngineError,
    RecognitionErrorKind, RecognitionEvent, RecognitionState, SpeechCapture, TranscriptEngine,
    ASSISTANT_SPEAKER, FALLBACK_REPLY,
};
use tokio::sync::{mpsc, Mutex};

/// Capture whose event stream is driven by the test
struct ScriptedCapture {
    supported: bool,
    start_error: Mutex<Option<CaptureError>>,
    fail_restarts: AtomicBool,
    tx: Mutex<Option<mpsc::Sender<RecognitionEvent>>>,
    starts: AtomicUsize,
}

impl ScriptedCapture {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            start_error: Mutex::new(None),
            fail_restarts: AtomicBool::new(false),
            tx: Mutex::new(None),
            starts: AtomicUsize::new(0),
        })
    }

    fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            start_error: Mutex::new(None),
            fail_restarts: AtomicBool::new(false),
            tx: Mutex::new(None),
            starts: AtomicUsize::new(0),
        })
    }

    fn failing(error: CaptureError) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            start_error: Mutex::new(Some(error)),
            fail_restarts: AtomicBool::new(false),
            tx: Mutex::new(None),
            starts: AtomicUsize::new(0),
        })
    }

    async fn sender(&self) -> mpsc::Sender<RecognitionEvent> {
        self.tx.lock().await.clone().expect("capture not started")
    }

    fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechCapture for ScriptedCapture {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn start(&self) -> Result<mpsc::Receiver<RecognitionEvent>, CaptureError> {
        if let Some(error) = self.start_error.lock().await.take() {
            return Err(error);
        }
        if self.starts.load(Ordering::SeqCst) > 0 && self.fail_restarts.load(Ordering::SeqCst) {
            return Err(CaptureError::Failed("already running".to_string()));
        }

        self.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        *self.tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) {
        self.tx.lock().await.take();
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Responder that answers immediately
struct EchoResponder;

#[async_trait::async_trait]
impl AssistantResponder for EchoResponder {
    async fn respond(&self, message: &str, _context: &[String]) -> Result<String, AssistantError> {
        Ok(format!("You said: {}", message))
    }
}

/// Responder that always fails
struct FailingResponder;

#[async_trait::async_trait]
impl AssistantResponder for FailingResponder {
    async fn respond(&self, _message: &str, _context: &[String]) -> Result<String, AssistantError> {
        Err(AssistantError::Request("connection refused".to_string()))
    }
}

fn engine_with(capture: Arc<ScriptedCapture>) -> TranscriptEngine {
    TranscriptEngine::with_recognizer(capture, Arc::new(EchoResponder), "You")
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn partial_results_buffer_without_appending() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_partial("hel").await;
    engine.handle_partial("hello").await;
    engine.handle_partial("hello").await; // idempotent

    assert_eq!(engine.interim(), Some("hello".to_string()));
    assert!(engine.transcript().is_empty());
}

#[tokio::test]
async fn final_result_appends_and_clears_interim() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_partial("hello wor").await;
    engine.handle_final("hello world").await;

    assert_eq!(engine.interim(), None);

    let transcript = engine.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, "You");
    assert_eq!(transcript[0].text, "hello world");
}

#[tokio::test]
async fn finals_append_in_call_order() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_final("first").await;
    engine.handle_partial("tentative").await;
    engine.handle_final("second").await;
    engine.handle_final("third").await;

    let texts: Vec<String> = engine.transcript().iter().map(|e| e.text.clone()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    assert_eq!(engine.interim(), None);
}

#[tokio::test]
async fn stop_clears_interim_and_returns_to_idle() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();
    assert_eq!(engine.state(), RecognitionState::Listening);

    engine.handle_partial("half a thou").await;
    engine.stop().await;

    assert_eq!(engine.state(), RecognitionState::Idle);
    assert_eq!(engine.interim(), None);
}

#[tokio::test]
async fn late_event_after_stop_is_discarded() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    // Hold a sender clone so the in-flight channel outlives stop()
    let tx = capture.sender().await;

    tx.send(RecognitionEvent::Final("before stop".to_string()))
        .await
        .unwrap();
    settle().await;
    assert_eq!(engine.entry_count(), 1);

    engine.stop().await;

    tx.send(RecognitionEvent::Final("after stop".to_string()))
        .await
        .unwrap();
    settle().await;

    assert_eq!(engine.entry_count(), 1, "late final must not append");
    assert_eq!(engine.state(), RecognitionState::Idle);
}

#[tokio::test]
async fn results_after_stop_via_public_api_are_discarded() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();
    engine.stop().await;

    engine.handle_partial("ghost").await;
    engine.handle_final("ghost").await;

    assert!(engine.transcript().is_empty());
    assert_eq!(engine.interim(), None);
}

#[tokio::test]
async fn trigger_phrase_appends_assistant_reply() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_final("hello hey assistant can you help").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let transcript = engine.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].speaker, "You");
    assert_eq!(transcript[0].text, "hello hey assistant can you help");
    assert_eq!(transcript[1].speaker, ASSISTANT_SPEAKER);
    assert!(!transcript[1].text.is_empty());
}

#[tokio::test]
async fn trigger_is_case_insensitive() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_final("HEY ASSISTANT what time is it").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine.entry_count(), 2);
}

#[tokio::test]
async fn no_trigger_no_reply() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_final("just a normal remark").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let transcript = engine.transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript.iter().all(|e| e.speaker != ASSISTANT_SPEAKER));
}

#[tokio::test]
async fn each_trigger_yields_exactly_one_reply() {
    let engine = engine_with(ScriptedCapture::new());
    engine.start().await.unwrap();

    engine.handle_final("hey assistant first").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.handle_final("hey assistant second").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let replies = engine
        .transcript()
        .iter()
        .filter(|e| e.speaker == ASSISTANT_SPEAKER)
        .count();
    assert_eq!(replies, 2);
}

#[tokio::test]
async fn canned_responder_answers_after_fixed_delay() {
    let capture = ScriptedCapture::new();
    let engine =
        TranscriptEngine::with_recognizer(capture, Arc::new(CannedResponder), "You");
    engine.start().await.unwrap();

    engine.handle_final("hey assistant").await;

    // The reply is scheduled, not immediate
    assert_eq!(engine.entry_count(), 1);

    tokio::time::sleep(Duration::from_millis(800)).await;
    let transcript = engine.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].speaker, ASSISTANT_SPEAKER);
}

#[tokio::test]
async fn assistant_failure_appends_fallback_reply() {
    let capture = ScriptedCapture::new();
    let engine =
        TranscriptEngine::with_recognizer(capture, Arc::new(FailingResponder), "You");
    engine.start().await.unwrap();

    engine.handle_final("hey assistant are you there").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let transcript = engine.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].speaker, ASSISTANT_SPEAKER);
    assert_eq!(transcript[1].text, FALLBACK_REPLY);
}

#[tokio::test]
async fn unsupported_capture_fails_start() {
    let engine = engine_with(ScriptedCapture::unsupported());

    let err = engine.start().await.unwrap_err();
    assert!(matches!(err, EngineError::Unsupported));
    assert_eq!(engine.state(), RecognitionState::Errored);
    assert!(engine.last_warning().is_some());
}

#[tokio::test]
async fn permission_denied_fails_start() {
    let engine = engine_with(ScriptedCapture::failing(CaptureError::PermissionDenied));

    let err = engine.start().await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied));
    assert_eq!(engine.state(), RecognitionState::Errored);
}

#[tokio::test]
async fn no_speech_timeout_restarts_silently() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Error(RecognitionErrorKind::NoSpeechTimeout))
        .await
        .unwrap();

    // Restart happens after a fixed one-second delay
    tokio::time::sleep(Duration::from_millis(1300)).await;

    assert_eq!(engine.state(), RecognitionState::Listening);
    assert_eq!(capture.start_count(), 2);
    assert_eq!(engine.last_warning(), None, "no user-visible error");
}

#[tokio::test]
async fn permission_denied_event_is_terminal() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Error(RecognitionErrorKind::PermissionDenied))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1300)).await;

    assert_eq!(engine.state(), RecognitionState::Errored);
    assert_eq!(capture.start_count(), 1, "no automatic restart");
    assert!(engine.last_warning().unwrap().contains("Microphone"));
}

#[tokio::test]
async fn network_error_warns_but_keeps_listening() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Error(RecognitionErrorKind::Network))
        .await
        .unwrap();
    settle().await;

    assert_eq!(engine.state(), RecognitionState::Listening);
    assert!(engine.last_warning().unwrap().contains("Network"));
}

#[tokio::test]
async fn aborted_never_surfaces_as_error() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Error(RecognitionErrorKind::Aborted))
        .await
        .unwrap();
    settle().await;

    assert_eq!(engine.state(), RecognitionState::Listening);
    assert_eq!(engine.last_warning(), None);
}

#[tokio::test]
async fn other_error_is_terminal_without_message() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Error(RecognitionErrorKind::Other))
        .await
        .unwrap();
    settle().await;

    assert_eq!(engine.state(), RecognitionState::Errored);
    assert_eq!(engine.last_warning(), None);
}

#[tokio::test]
async fn unexpected_end_restarts_once() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Ended).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(engine.state(), RecognitionState::Listening);
    assert_eq!(capture.start_count(), 2);
}

#[tokio::test]
async fn failed_restart_is_swallowed() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();
    capture.fail_restarts.store(true, Ordering::SeqCst);

    let tx = capture.sender().await;
    tx.send(RecognitionEvent::Ended).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    // The single attempt failed quietly; no panic, no retry storm
    assert_eq!(capture.start_count(), 1);
    assert!(engine.transcript().is_empty());
}

#[tokio::test]
async fn ended_after_stop_does_not_restart() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));
    engine.start().await.unwrap();

    let tx = capture.sender().await;
    engine.stop().await;
    tx.send(RecognitionEvent::Ended).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(engine.state(), RecognitionState::Idle);
    assert_eq!(capture.start_count(), 1);
}

#[tokio::test]
async fn engine_can_stop_and_start_again() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));

    engine.start().await.unwrap();
    engine.handle_final("round one").await;
    engine.stop().await;

    engine.start().await.unwrap();
    engine.handle_final("round two").await;

    let texts: Vec<String> = engine.transcript().iter().map(|e| e.text.clone()).collect();
    assert_eq!(texts, vec!["round one", "round two"]);
    assert_eq!(capture.start_count(), 2);
}

#[tokio::test]
async fn start_while_listening_is_a_no_op() {
    let capture = ScriptedCapture::new();
    let engine = engine_with(Arc::clone(&capture));

    engine.start().await.unwrap();
    engine.start().await.unwrap();

    assert_eq!(capture.start_count(), 1);
    assert_eq!(engine.state(), RecognitionState::Listening);
}

#[tokio::test]
async fn stop_is_safe_when_never_started() {
    let engine = engine_with(ScriptedCapture::new());
    engine.stop().await;
    assert_eq!(engine.state(), RecognitionState::Idle);
}
