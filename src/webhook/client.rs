// src/webhook/client.rs

//! Webhook message transport.
//!
//! Speaks the webhook wire shape: POST `{url}?wait=true` to create,
//! PATCH `{url}/messages/{id}` to edit, DELETE `{url}/messages/{id}`
//! to remove. Rate limits are honored by sleeping the server-specified
//! interval (capped); server-side errors retry with exponential backoff
//! up to the configured attempt ceiling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{HttpConfig, RetryConfig};
use crate::pipeline::{EmbedSink, MessageTransport};
use crate::utils::http::create_client;

use super::Embed;

/// Handle returned for created messages in dry-run mode.
const DRY_RUN_HANDLE: &str = "DRY_RUN_MESSAGE_ID";

/// Fallback rate-limit wait when the server reply carries no interval.
const DEFAULT_RATE_LIMIT_SECS: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Webhook client implementing the publisher's transport.
pub struct WebhookClient {
    client: reqwest::Client,
    retry: RetryConfig,
    publish_delay: Duration,
    dry_run: bool,
}

impl WebhookClient {
    pub fn new(http: &HttpConfig, retry: RetryConfig, dry_run: bool) -> Result<Self> {
        Ok(Self {
            client: create_client(http)?,
            retry,
            publish_delay: Duration::from_millis(http.publish_delay_ms),
            dry_run,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry.backoff_base_ms.saturating_mul(1u64 << attempt.min(6)))
    }

    /// Wait interval demanded by a rate-limit response, capped.
    async fn rate_limit_wait(&self, response: Response) -> Duration {
        let seconds = response
            .json::<RateLimitBody>()
            .await
            .ok()
            .and_then(|b| b.retry_after)
            .unwrap_or(DEFAULT_RATE_LIMIT_SECS);
        let cap = Duration::from_millis(self.retry.rate_limit_cap_ms);
        Duration::from_secs_f64(seconds.max(0.0)).min(cap)
    }

    /// Send a request with rate-limit and server-error retries.
    ///
    /// Returns the first response that is neither a rate limit nor a
    /// server error; client errors are the caller's to interpret.
    async fn send_with_retry<F>(&self, context: &str, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let response = match build(&self.client).send().await {
                Ok(response) => response,
                Err(error) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(error.into());
                    }
                    log::warn!("Request failed for {context} (attempt {attempt}): {error}");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.retry.max_attempts {
                    return Err(AppError::publish(
                        context,
                        format!("still rate limited after {attempt} attempts"),
                    ));
                }
                let wait = self.rate_limit_wait(response).await;
                log::warn!("Rate limited on {context}, waiting {:.1}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.is_server_error() {
                if attempt >= self.retry.max_attempts {
                    return Err(AppError::publish(
                        context,
                        format!("server error {status} after {attempt} attempts"),
                    ));
                }
                log::warn!("Server error {status} on {context} (attempt {attempt})");
                tokio::time::sleep(self.backoff(attempt)).await;
                continue;
            }

            return Ok(response);
        }
    }

}

#[async_trait]
impl EmbedSink for WebhookClient {
    async fn send_embed(
        &self,
        destination: &str,
        embed: &Embed,
        content: Option<&str>,
    ) -> Result<()> {
        if self.dry_run {
            log::info!("[dry-run] Would send embed '{}'", embed.title);
            return Ok(());
        }

        let mut payload = json!({ "embeds": [embed] });
        if let Some(content) = content {
            payload["content"] = json!(content);
        }

        let url = format!("{destination}?wait=true");
        let response = self
            .send_with_retry("embed", |client| client.post(&url).json(&payload))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::publish("embed", format!("status {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for WebhookClient {
    async fn create(&self, destination: &str, content: &str) -> Result<String> {
        if self.dry_run {
            log::info!("[dry-run] Would create message ({} chars)", content.len());
            return Ok(DRY_RUN_HANDLE.to_string());
        }

        let url = format!("{destination}?wait=true");
        let payload = json!({ "content": content });
        let response = self
            .send_with_retry("create", |client| client.post(&url).json(&payload))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::publish("create", format!("status {status}")));
        }

        let message: MessageRef = response.json().await?;
        if !self.publish_delay.is_zero() {
            tokio::time::sleep(self.publish_delay).await;
        }
        Ok(message.id)
    }

    async fn edit(&self, destination: &str, handle: &str, content: &str) -> Result<bool> {
        if self.dry_run {
            log::info!("[dry-run] Would edit message {handle}");
            return Ok(true);
        }

        let url = format!("{destination}/messages/{handle}");
        let payload = json!({ "content": content });
        let response = self
            .send_with_retry("edit", |client| client.patch(&url).json(&payload))
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            // Message gone upstream or otherwise rejected; the publisher
            // falls back to creating fresh messages.
            log::warn!("Edit of {handle} rejected with status {status}");
            Ok(false)
        }
    }

    async fn delete(&self, destination: &str, handle: &str) -> Result<()> {
        if self.dry_run {
            log::info!("[dry-run] Would delete message {handle}");
            return Ok(());
        }

        let url = format!("{destination}/messages/{handle}");
        let response = self
            .send_with_retry("delete", |client| client.delete(&url))
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::publish("delete", format!("status {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;

    fn client(dry_run: bool) -> WebhookClient {
        WebhookClient::new(&HttpConfig::default(), RetryConfig::default(), dry_run).unwrap()
    }

    #[test]
    fn backoff_grows_and_saturates() {
        let client = client(false);
        assert!(client.backoff(1) < client.backoff(2));
        assert!(client.backoff(2) < client.backoff(3));
        // Shift is clamped, no panic for large attempt numbers.
        assert_eq!(client.backoff(50), client.backoff(6));
    }

    #[tokio::test]
    async fn dry_run_short_circuits_all_operations() {
        let client = client(true);

        let handle = client.create("https://wh.example/x", "body").await.unwrap();
        assert_eq!(handle, DRY_RUN_HANDLE);

        let edited = client
            .edit("https://wh.example/x", "1", "body")
            .await
            .unwrap();
        assert!(edited);

        assert!(client.delete("https://wh.example/x", "1").await.is_ok());

        let embed = Embed {
            title: "t".to_string(),
            description: "d".to_string(),
            url: None,
            color: 0,
            fields: Vec::new(),
            author: None,
            thumbnail: None,
            footer: None,
            timestamp: "2026-08-29T00:00:00+00:00".to_string(),
        };
        assert!(
            client
                .send_embed("https://wh.example/x", &embed, None)
                .await
                .is_ok()
        );
    }
}
