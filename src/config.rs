use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub credentials: CredentialsConfig,
    pub assistant: AssistantConfig,
    pub transcript: TranscriptConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Public API key handed to clients alongside their token
    pub api_key: String,
    /// Signing secret, never leaves the issuer
    pub api_secret: String,
    /// Where the bootstrapper fetches tokens (usually this service itself)
    pub issuer_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub mode: AssistantMode,
    /// Assistant endpoint, required when mode = "remote"
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    Canned,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptConfig {
    pub source: TranscriptSourceConfig,
    /// Speaker label for locally recognized speech
    pub speaker_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSourceConfig {
    Recognizer,
    Captions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub backend: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "roomcast".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 3100,
                },
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
            },
            credentials: CredentialsConfig {
                api_key: String::new(),
                api_secret: String::new(),
                issuer_url: "http://127.0.0.1:3100".to_string(),
            },
            assistant: AssistantConfig {
                mode: AssistantMode::Canned,
                url: None,
            },
            transcript: TranscriptConfig {
                source: TranscriptSourceConfig::Recognizer,
                speaker_label: "You".to_string(),
            },
            media: MediaConfig {
                backend: "virtual".to_string(),
            },
        }
    }
}
