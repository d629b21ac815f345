//! Streaming chat client for a local Ollama server.
//!
//! Talks to the `/api/chat` endpoint in streaming mode. The response body is
//! newline-delimited JSON; each line carries one incremental text delta, and
//! [`ReplyStream`] exposes those deltas as a blocking iterator.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One role-tagged message of a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system",
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// Blocking HTTP client bound to one Ollama server and model.
pub struct ChatClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        // No overall timeout: a reply stream legitimately stays open for as
        // long as the model keeps generating.
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Open a streaming chat completion for `messages`.
    ///
    /// # Errors
    ///
    /// Fails when the server is unreachable or rejects the request; there is
    /// no retry. A common cause is Ollama simply not running.
    pub fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ReplyStream> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };
        let response = self.client.post(&url).json(&request).send().map_err(|err| {
            if err.is_connect() {
                anyhow!(
                    "failed to connect to Ollama at {}; is Ollama running?",
                    self.base_url
                )
            } else {
                anyhow!("chat request failed: {err}")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(match serde_json::from_str::<ApiError>(&body) {
                Ok(api) => anyhow!("Ollama error: {}", api.error),
                Err(_) => anyhow!("Ollama returned HTTP {status}"),
            });
        }
        Ok(ReplyStream::from_reader(BufReader::new(response)))
    }
}

impl crate::session::ReplyGenerator for ChatClient {
    fn stream_reply(&self, messages: &[ChatMessage]) -> Result<ReplyStream> {
        self.stream_chat(messages)
    }
}

/// Finite, non-restartable stream of reply tokens.
///
/// Each `next()` blocks until the server emits another line or closes the
/// connection; a `done` chunk or EOF ends the stream for good.
pub struct ReplyStream {
    reader: Box<dyn BufRead>,
    done: bool,
}

impl ReplyStream {
    /// Wrap any line-delimited JSON source. `ChatClient` passes the live HTTP
    /// response body; tests feed an in-memory reader.
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            done: false,
        }
    }

    /// Abandon the stream before exhaustion. Dropping the underlying reader
    /// closes the connection, which stops generation server-side.
    pub fn cancel(self) {}
}

impl Iterator for ReplyStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(anyhow!("chat stream read failed: {err}")));
                }
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let chunk: ChatChunk = match serde_json::from_str(line) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.done = true;
                    return Some(Err(anyhow!("malformed chat stream line: {err}")));
                }
            };
            if let Some(error) = chunk.error {
                self.done = true;
                return Some(Err(anyhow!("Ollama error: {error}")));
            }
            if chunk.done {
                self.done = true;
            }
            match chunk.message {
                Some(msg) if !msg.content.is_empty() => return Some(Ok(msg.content)),
                _ if self.done => return None,
                _ => continue,
            }
        }
    }
}
