//! OpenAI Responses API backend (`POST {base_url}/responses`).
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use super::Backend;
use crate::compile::response_format;
use crate::config::OpenAiConfig;
use crate::error::BackendError;
use crate::path_de::from_str_with_path;

// error bodies can be large HTML pages; keep log lines and messages bounded
const MAX_ERROR_BODY: usize = 2_000;

#[derive(Debug)]
pub struct OpenAiBackend {
    client: reqwest::blocking::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig { &self.config }

    fn respond(&self, operation: &'static str, body: &Value) -> Result<String, BackendError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(BackendError::MissingApiKey)?;
        let url = format!("{}/responses", self.config.base_url);

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .map_err(|source| BackendError::Transport { operation, source })?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|source| BackendError::Transport { operation, source })?;

        tracing::info!(
            operation,
            model = %self.config.model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend call finished"
        );

        if !status.is_success() {
            return Err(BackendError::Status {
                operation,
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        from_str_with_path::<ResponsesReply>(&text)?.into_text()
    }
}

impl Backend for OpenAiBackend {
    fn infer_text(&self, prompt: &str) -> Result<String, BackendError> {
        self.respond("text", &text_request(&self.config.model, prompt))
    }

    fn infer_json(&self, prompt: &str, document: &Value, name: &str) -> Result<Value, BackendError> {
        let body = structured_request(&self.config.model, prompt, document, name);
        let text = self.respond("structured", &body)?;
        serde_json::from_str(&text).map_err(|e| {
            BackendError::Decode(format!("structured output is not valid JSON: {e}"))
        })
    }
}

fn text_request(model: &str, prompt: &str) -> Value {
    json!({ "model": model, "input": prompt })
}

fn structured_request(model: &str, prompt: &str, document: &Value, name: &str) -> Value {
    json!({
        "model": model,
        "input": prompt,
        "text": { "format": response_format(document, name) },
    })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

// -------------------- reply envelope --------------------

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl ResponsesReply {
    /// Top-level `output_text` if the provider supplies it, else every
    /// `output_text` part concatenated in order.
    fn into_text(self) -> Result<String, BackendError> {
        if let Some(text) = self.output_text {
            return Ok(text);
        }
        let mut out: Option<String> = None;
        for part in self.output.into_iter().flat_map(|item| item.content) {
            match (part.kind.as_str(), part.text, part.refusal) {
                ("output_text", Some(text), _) => out.get_or_insert_with(String::new).push_str(&text),
                ("refusal", _, Some(reason)) => {
                    return Err(BackendError::Decode(format!("model refused: {reason}")));
                }
                _ => {}
            }
        }
        out.ok_or_else(|| BackendError::Decode("response did not include any output_text".into()))
    }
}

// ------------------------------- Tests ------------------------------------ //
