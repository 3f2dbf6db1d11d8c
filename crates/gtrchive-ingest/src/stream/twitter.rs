//! v1.1 streaming API client.
//!
//! Credentials are checked with `GET account/verify_credentials.json`; the
//! filtered stream is `POST statuses/filter.json` with a form-encoded
//! `track` parameter. The response body is a never-ending sequence of
//! `\r\n`-delimited JSON documents interleaved with blank keep-alive lines.

use super::backoff::{Backoff, BackoffPolicy, ReconnectReason};
use super::oauth::{Credentials, Signer, percent_encode};
use super::{StreamProvider, Subscription};
use crate::config::TwitterConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use gtrchive_core::StreamMessage;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::mpsc;

/// Tuning knobs for the streaming connection.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Capacity of the channel between the producer and the consumer.
    pub channel_capacity: usize,
    /// Reconnect when no bytes (not even keep-alives) arrive for this long.
    pub stall_timeout: Duration,
    /// Connect timeout for every request.
    pub connect_timeout: Duration,
    /// Reconnect delays.
    pub backoff: BackoffPolicy,
    /// Longest stream line kept; longer lines are dropped.
    pub max_line: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            stall_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
            max_line: DEFAULT_MAX_LINE,
        }
    }
}

/// OAuth 1.0a client for the provider's REST and streaming endpoints.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    signer: Signer,
    api_url: String,
    stream_url: String,
    options: StreamOptions,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Result<Self> {
        Self::with_options(config, StreamOptions::default())
    }

    pub fn with_options(config: &TwitterConfig, options: StreamOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gtrchive/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(options.connect_timeout)
            .build()?;

        let signer = Signer::new(Credentials {
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            access_token: config.access_token.clone(),
            access_secret: config.access_secret.clone(),
        })?;

        Ok(Self {
            http,
            signer,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            stream_url: config.stream_url.trim_end_matches('/').to_string(),
            options,
        })
    }

    fn filter_url(&self) -> String {
        format!("{}/statuses/filter.json", self.stream_url)
    }
}

#[async_trait]
impl StreamProvider for TwitterClient {
    #[tracing::instrument(skip(self))]
    async fn verify_credentials(&self) -> Result<bool> {
        let url = format!("{}/account/verify_credentials.json", self.api_url);
        let authorization = self.signer.authorization("GET", &url, &[]);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let screen_name = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|user| user.get("screen_name")?.as_str().map(str::to_owned));
            match screen_name {
                Some(name) => tracing::info!("Credentials verified for @{}", name),
                None => tracing::info!("Credentials verified"),
            }
            return Ok(true);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!("Credentials rejected with HTTP {}", status.as_u16());
            return Ok(false);
        }

        Err(Error::Api {
            status: status.as_u16(),
            body: truncate(&body, 512),
        })
    }

    async fn subscribe(&self, track: &str) -> Result<Subscription> {
        let (sender, receiver) = mpsc::channel(self.options.channel_capacity);

        let producer = FilterProducer {
            http: self.http.clone(),
            signer: self.signer.clone(),
            url: self.filter_url(),
            track: track.to_string(),
            stall_timeout: self.options.stall_timeout,
            backoff: self.options.backoff,
            max_line: self.options.max_line,
            sender,
        };

        tracing::info!("Subscribing to filtered stream: track={:?}", track);
        let handle = tokio::spawn(producer.run());

        Ok(Subscription::new(receiver, Some(handle)))
    }
}

/// How one connection attempt ended.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Transient failure; reconnect after the matching delay.
    Reconnect(ReconnectReason),
    /// The provider refused the request for good.
    Rejected(u16),
    /// The consumer dropped its end of the channel.
    ConsumerGone,
}

/// Map a non-success response status to the producer's next move.
fn classify_status(status: u16) -> Outcome {
    match status {
        420 | 429 => Outcome::Reconnect(ReconnectReason::RateLimited),
        500..=599 => Outcome::Reconnect(ReconnectReason::Http),
        other => Outcome::Rejected(other),
    }
}

struct FilterProducer {
    http: reqwest::Client,
    signer: Signer,
    url: String,
    track: String,
    stall_timeout: Duration,
    backoff: BackoffPolicy,
    max_line: usize,
    sender: mpsc::Sender<StreamMessage>,
}

impl FilterProducer {
    #[tracing::instrument(name = "stream_producer", skip(self), fields(track = %self.track))]
    async fn run(self) {
        let mut backoff = Backoff::with_policy(self.backoff);

        loop {
            let reason = match self.connect(&mut backoff).await {
                Outcome::Reconnect(reason) => reason,
                Outcome::Rejected(status) => {
                    tracing::error!("Stream request rejected with HTTP {}; giving up", status);
                    break;
                }
                Outcome::ConsumerGone => break,
            };

            let delay = backoff.next_delay(reason);
            metrics::counter!("stream_reconnects_total", "reason" => reason.as_str()).increment(1);
            tracing::warn!("Reconnecting in {:?} ({})", delay, reason.as_str());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.sender.closed() => break,
            }
        }

        tracing::info!("Stream producer stopped");
    }

    /// One connection attempt, streaming until it fails or the consumer leaves.
    async fn connect(&self, backoff: &mut Backoff) -> Outcome {
        let params = [("track", self.track.as_str())];
        let authorization = self.signer.authorization("POST", &self.url, &params);
        let body = format!("track={}", percent_encode(&self.track));

        let response = match self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Stream connection failed: {}", e);
                return Outcome::Reconnect(ReconnectReason::Network);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let outcome = classify_status(status.as_u16());
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Stream returned HTTP {}: {}", status.as_u16(), truncate(&body, 256));
            return outcome;
        }

        backoff.reset();
        metrics::counter!("stream_connects_total").increment(1);
        tracing::info!("Connected to filtered stream");

        let mut chunks = std::pin::pin!(response.bytes_stream());
        let mut lines = LineSplitter::with_max_line(self.max_line);

        loop {
            let chunk = match tokio::time::timeout(self.stall_timeout, chunks.next()).await {
                Err(_) => {
                    tracing::warn!("Stream stalled for {:?}", self.stall_timeout);
                    return Outcome::Reconnect(ReconnectReason::Network);
                }
                Ok(None) => {
                    tracing::warn!("Stream closed by provider");
                    return Outcome::Reconnect(ReconnectReason::Network);
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!("Stream read failed: {}", e);
                    return Outcome::Reconnect(ReconnectReason::Network);
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if !self.forward(&line).await {
                    return Outcome::ConsumerGone;
                }
            }
        }
    }

    /// Decode one line and hand it to the consumer. False once the consumer is gone.
    async fn forward(&self, line: &[u8]) -> bool {
        if line.iter().all(u8::is_ascii_whitespace) {
            tracing::trace!("keep-alive");
            return true;
        }

        let message = match StreamMessage::from_slice(line) {
            Ok(message) => message,
            Err(e) => {
                metrics::counter!("stream_decode_errors_total").increment(1);
                tracing::warn!("Skipping undecodable stream line: {}", e);
                return true;
            }
        };

        match &message {
            StreamMessage::Disconnect(notice) => tracing::info!(
                "Provider disconnect notice: code={} reason={}",
                notice.code,
                notice.reason
            ),
            StreamMessage::Warning(warning) => {
                tracing::warn!("Provider stall warning: {}", warning.message)
            }
            _ => {}
        }

        self.sender.send(message).await.is_ok()
    }
}

/// Default cap on a single stream line.
pub const DEFAULT_MAX_LINE: usize = 1024 * 1024;

/// Reassembles newline-terminated lines from arbitrarily split chunks.
///
/// A partial line that grows past the size cap is dropped, along with the
/// rest of it up to the next newline.
#[derive(Debug)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    /// Offset of the first byte not yet returned.
    start: usize,
    max_line: usize,
    /// Skipping the tail of an oversized line.
    discarding: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE)
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            start: 0,
            max_line,
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line without its `\n` or `\r\n` terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let unread = &self.buffer[self.start..];
            let Some(offset) = unread.iter().position(|&b| b == b'\n') else {
                if self.discarding {
                    self.clear();
                } else if unread.len() > self.max_line {
                    metrics::counter!("stream_oversized_lines_total").increment(1);
                    tracing::warn!(
                        "Dropping stream line longer than {} bytes",
                        self.max_line
                    );
                    self.clear();
                    self.discarding = true;
                }
                return None;
            };

            let line = &unread[..offset];
            self.start += offset + 1;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line = line.strip_suffix(b"\r").unwrap_or(line);
            return Some(line.to_vec());
        }
    }

    /// Bytes buffered after the last complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.start
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.start = 0;
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
