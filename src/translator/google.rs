use crate::config::Translation;
use crate::error::TranslationError;
use crate::translator::Translator;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Keyless endpoint used by the Google Translate web widget.
const WEB_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
/// Cloud Translation API v2, used when an API key is configured.
const CLOUD_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Clone)]
pub struct GoogleTranslator {
    http: reqwest::Client,
    source: String,
    target: String,
    api_key: Option<String>,
}

impl fmt::Debug for GoogleTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleTranslator")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("cloud_api", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GoogleTranslator {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let http = reqwest::Client::builder()
            .user_agent("tg-dualpost/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            source: source.into(),
            target: target.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_config(cfg: &Translation) -> Result<Self, TranslationError> {
        Self::new(
            cfg.source_lang.clone(),
            cfg.target_lang.clone(),
            cfg.api_key.clone(),
            Duration::from_secs(cfg.timeout_seconds),
        )
    }

    async fn translate_web(&self, text: &str) -> Result<String, TranslationError> {
        let resp = self
            .http
            .get(WEB_ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslationError::Request(format!("HTTP {}: {}", status, body)));
        }
        let value: Value = resp.json().await?;
        parse_web_response(&value)
    }

    async fn translate_cloud(&self, text: &str, key: &str) -> Result<String, TranslationError> {
        let body = json!({
            "q": [text],
            "source": self.source,
            "target": self.target,
            "format": "text",
        });
        let resp = self
            .http
            .post(CLOUD_ENDPOINT)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslationError::Request(format!("HTTP {}: {}", status, body)));
        }
        let value: Value = resp.json().await?;
        parse_cloud_response(&value)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        debug!(chars = text.chars().count(), "translating leaf");
        let translated = match self.api_key.as_deref() {
            Some(key) => self.translate_cloud(text, key).await?,
            None => self.translate_web(text).await?,
        };
        if translated.trim().is_empty() {
            return Err(TranslationError::Empty);
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// The web endpoint answers with nested arrays; the first element holds
/// `[translated, original, ...]` segments that concatenate to the full text.
fn parse_web_response(value: &Value) -> Result<String, TranslationError> {
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Response("missing segment array".into()))?;
    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    Ok(text)
}

fn parse_cloud_response(value: &Value) -> Result<String, TranslationError> {
    value["data"]["translations"]
        .get(0)
        .and_then(|t| t["translatedText"].as_str())
        .map(str::to_owned)
        .ok_or_else(|| TranslationError::Response("missing data.translations[0].translatedText".into()))
}
