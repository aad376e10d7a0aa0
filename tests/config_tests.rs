// Tests for configuration loading.

use roomcast::config::{AssistantMode, Config, TranscriptSourceConfig};

#[test]
fn loads_a_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roomcast.toml");
    std::fs::write(
        &path,
        r#"
[service]
name = "roomcast-test"

[service.http]
bind = "0.0.0.0"
port = 4000

[nats]
url = "nats://nats.internal:4222"

[credentials]
api_key = "key"
api_secret = "secret"
issuer_url = "http://localhost:4000"

[assistant]
mode = "remote"
url = "http://localhost:5000/api/assistant"

[transcript]
source = "captions"
speaker_label = "Me"

[media]
backend = "virtual"
"#,
    )
    .unwrap();

    let cfg = Config::load(dir.path().join("roomcast").to_str().unwrap()).unwrap();

    assert_eq!(cfg.service.name, "roomcast-test");
    assert_eq!(cfg.service.http.port, 4000);
    assert_eq!(cfg.nats.url, "nats://nats.internal:4222");
    assert_eq!(cfg.assistant.mode, AssistantMode::Remote);
    assert_eq!(
        cfg.assistant.url.as_deref(),
        Some("http://localhost:5000/api/assistant")
    );
    assert_eq!(cfg.transcript.source, TranscriptSourceConfig::Captions);
    assert_eq!(cfg.transcript.speaker_label, "Me");
}

#[test]
fn missing_file_is_an_error() {
    assert!(Config::load("/nonexistent/roomcast").is_err());
}

#[test]
fn defaults_are_sensible() {
    let cfg = Config::default();

    assert_eq!(cfg.transcript.speaker_label, "You");
    assert_eq!(cfg.transcript.source, TranscriptSourceConfig::Recognizer);
    assert_eq!(cfg.assistant.mode, AssistantMode::Canned);
    assert_eq!(cfg.media.backend, "virtual");
}
