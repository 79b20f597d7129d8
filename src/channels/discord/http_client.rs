use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, Response, header::HeaderMap};
use serde_json::json;
use tokio::time::sleep;

use super::types::API_BASE;

const MAX_RATE_LIMIT_RETRIES: u8 = 3;

/// Thin REST client for the handful of Discord endpoints the relay uses.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl DiscordHttpClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, API_BASE)
    }

    #[must_use]
    pub fn with_api_base(bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let mut body = json!({ "content": content });
        if let Some(message_id) = reply_to {
            body["message_reference"] = json!({
                "message_id": message_id,
                "fail_if_not_exists": false,
            });
        }
        let _response = self
            .request(Method::POST, &url, Some(body))
            .await
            .context("send Discord message")?;
        Ok(())
    }

    pub async fn send_typing(&self, channel_id: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/typing", self.api_base);
        let _response = self
            .request(Method::POST, &url, None)
            .await
            .context("send Discord typing indicator")?;
        Ok(())
    }

    pub async fn set_own_nickname(&self, guild_id: &str, nickname: &str) -> Result<()> {
        let url = format!("{}/guilds/{guild_id}/members/@me", self.api_base);
        let _response = self
            .request(Method::PATCH, &url, Some(json!({ "nick": nickname })))
            .await
            .context("change Discord nickname")?;
        Ok(())
    }

    pub async fn get_gateway_bot(&self) -> Result<serde_json::Value> {
        let url = format!("{}/gateway/bot", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord gateway bot data")?;
        response
            .json()
            .await
            .context("parse Discord gateway bot JSON")
    }

    /// Fetch attachment bytes from the CDN. CDN URLs are signed, so no
    /// bot authorization header is sent.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("download Discord attachment {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Discord attachment download failed ({status})");
        }
        let bytes = response
            .bytes()
            .await
            .context("read Discord attachment body")?;
        Ok(bytes.to_vec())
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let mut request_builder = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bot {}", self.bot_token));
            if let Some(payload) = body.clone() {
                request_builder = request_builder.json(&payload);
            }

            let response = request_builder
                .send()
                .await
                .with_context(|| format!("send Discord request {} {}", method.as_str(), url))?;

            if response.status().as_u16() == 429 {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    anyhow::bail!(
                        "Discord request {} {} exceeded rate limit after {} retries",
                        method.as_str(),
                        url,
                        MAX_RATE_LIMIT_RETRIES
                    );
                }
                let retry_after = parse_retry_after(response.headers())
                    .unwrap_or_else(|| Duration::from_secs(1));
                tracing::debug!(
                    url,
                    retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                    "Discord rate limited; retrying"
                );
                sleep(retry_after).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
                anyhow::bail!(
                    "Discord request {} {} failed ({status}): {body_text}",
                    method.as_str(),
                    url
                );
            }

            return Ok(response);
        }

        anyhow::bail!(
            "Discord request {} {} failed due to rate limiting",
            method.as_str(),
            url
        )
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())?;
    if seconds <= 0.0 {
        return Some(Duration::from_secs(0));
    }
    Some(Duration::from_secs_f64(seconds))
}
