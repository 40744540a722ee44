//! OpenAI-compatible story generation.
//!
//! Two endpoints are supported: the Responses API, tried first, and Chat
//! Completions as a fallback.  Both are asked for the same JSON object; they
//! only differ in request layout and in how deeply the answer is wrapped in
//! the response, which the extractor deals with.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::ContentSource;
use crate::config::ProviderConfig;
use crate::error::{snippet, PublishError, Result};

const SYSTEM_PROMPT: &str =
    "You are a concise literary editor and illustration prompt-writer. Return strictly valid JSON.";

/// The instructions sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryPrompt {
    pub system: String,
    pub user: String,
}

impl StoryPrompt {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let user = format!(
            "Write a {}-{} word story in clean HTML using only <h2>, <p>, <em>. \
             Topic: {}. Tone: vivid, eerie, cinematic. \
             Also produce a one-sentence illustration prompt (no camera brands; include subject, mood, composition, light) \
             and a short natural-language title. \
             Return only a JSON object with keys: title, story_html, image_prompt.",
            config.min_words, config.max_words, config.topic
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Which endpoint a source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Responses,
    ChatCompletions,
}

impl Api {
    fn path(self) -> &'static str {
        match self {
            Api::Responses => "responses",
            Api::ChatCompletions => "chat/completions",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Api::Responses => "openai-responses",
            Api::ChatCompletions => "openai-chat",
        }
    }
}

pub struct OpenAiSource {
    api: Api,
    url: String,
    model: String,
    api_key: String,
    prompt: StoryPrompt,
    client: Client,
}

impl OpenAiSource {
    /// Create a source for `api` using the provider settings.
    ///
    /// Fails when no API key is configured or the HTTP client cannot be
    /// built.
    pub fn new(api: Api, config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PublishError::Config("an API key is required (set OPENAI_API_KEY)".into())
            })?;

        Ok(Self {
            api,
            url: format!("{}/{}", config.api_base.trim_end_matches('/'), api.path()),
            model: config.model.clone(),
            api_key,
            prompt: StoryPrompt::from_config(config),
            client: build_client(config.timeout())?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The JSON request body for this source's endpoint.
    pub fn request_body(&self) -> Value {
        match self.api {
            Api::Responses => json!({
                "model": self.model,
                "input": [
                    {"role": "system", "content": self.prompt.system},
                    {"role": "user", "content": self.prompt.user},
                ],
            }),
            Api::ChatCompletions => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": self.prompt.system},
                    {"role": "user", "content": format!("{} Return only JSON.", self.prompt.user)},
                ],
            }),
        }
    }

    fn error(&self, message: String) -> PublishError {
        PublishError::Provider {
            source_name: self.name().to_string(),
            message,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> PublishError {
        if e.is_timeout() {
            PublishError::Timeout {
                source_name: self.name().to_string(),
            }
        } else {
            self.error(e.to_string())
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PublishError::Config(format!("building HTTP client: {e}")))
}

impl ContentSource for OpenAiSource {
    fn name(&self) -> &str {
        self.api.label()
    }

    fn fetch(&self) -> Result<Value> {
        debug!(url = %self.url, model = %self.model, "requesting story");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body())
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(self.error(format!("HTTP {status}: {}", snippet(&body))));
        }

        serde_json::from_str(&body)
            .map_err(|e| self.error(format!("invalid JSON ({e}): {}", snippet(&body))))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn config(api_base: &str) -> ProviderConfig {
        ProviderConfig {
            api_base: api_base.to_string(),
            api_key: Some("sk-test".into()),
            timeout_secs: 5,
            ..ProviderConfig::default()
        }
    }

    /// Serve exactly one HTTP request with a canned status and body.
    fn one_shot_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            reader.get_mut().write_all(reply.as_bytes()).unwrap();
        });

        format!("http://{addr}/v1")
    }

    #[test]
    fn requires_api_key() {
        let mut cfg = config("http://localhost");
        cfg.api_key = None;
        assert!(matches!(
            OpenAiSource::new(Api::Responses, &cfg),
            Err(PublishError::Config(_))
        ));
    }

    #[test]
    fn endpoint_urls() {
        let cfg = config("https://api.example.com/v1/");
        let responses = OpenAiSource::new(Api::Responses, &cfg).unwrap();
        let chat = OpenAiSource::new(Api::ChatCompletions, &cfg).unwrap();
        assert_eq!(responses.url(), "https://api.example.com/v1/responses");
        assert_eq!(chat.url(), "https://api.example.com/v1/chat/completions");
        assert_eq!(responses.name(), "openai-responses");
        assert_eq!(chat.name(), "openai-chat");
    }

    #[test]
    fn request_bodies() {
        let cfg = config("https://api.example.com/v1");
        let responses = OpenAiSource::new(Api::Responses, &cfg).unwrap().request_body();
        assert_eq!(responses["model"], "gpt-5");
        assert_eq!(responses["input"][0]["role"], "system");
        assert!(responses["input"][1]["content"]
            .as_str()
            .unwrap()
            .contains("title, story_html, image_prompt"));

        let chat = OpenAiSource::new(Api::ChatCompletions, &cfg).unwrap().request_body();
        assert!(chat["messages"][1]["content"]
            .as_str()
            .unwrap()
            .ends_with("Return only JSON."));
    }

    #[test]
    fn prompt_uses_topic_and_word_range() {
        let cfg = ProviderConfig {
            topic: "a lighthouse keeper".into(),
            min_words: 100,
            max_words: 200,
            ..ProviderConfig::default()
        };
        let prompt = StoryPrompt::from_config(&cfg);
        assert!(prompt.user.contains("100-200 word story"));
        assert!(prompt.user.contains("Topic: a lighthouse keeper."));
    }

    #[test]
    fn fetch_returns_parsed_json() {
        let base = one_shot_server("200 OK", r#"{"output": {"story_html": "<p>x</p>", "image_prompt": "y"}}"#);
        let src = OpenAiSource::new(Api::Responses, &config(&base)).unwrap();
        let value = src.fetch().unwrap();
        assert_eq!(value["output"]["story_html"], "<p>x</p>");
    }

    #[test]
    fn error_status_is_reported_with_body() {
        let base = one_shot_server("401 Unauthorized", r#"{"error": "bad key"}"#);
        let src = OpenAiSource::new(Api::ChatCompletions, &config(&base)).unwrap();
        let err = src.fetch().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("401"), "{text}");
        assert!(text.contains("bad key"), "{text}");
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection but never answer.
        let handle = thread::spawn(move || {
            let conn = listener.accept();
            thread::sleep(Duration::from_secs(3));
            drop(conn);
        });

        let mut cfg = config(&format!("http://{addr}/v1"));
        cfg.timeout_secs = 1;
        let src = OpenAiSource::new(Api::Responses, &cfg).unwrap();

        let err = src.fetch().unwrap_err();
        assert!(matches!(err, PublishError::Timeout { .. }), "{err:?}");
        handle.join().unwrap();
    }
}
