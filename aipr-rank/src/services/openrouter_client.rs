//! OpenRouter chat-completions client used for qualitative extraction
//!
//! Requests are rate limited and transient failures (network errors, 429,
//! 5xx) are retried with exponential backoff. Client errors such as a bad
//! request or an invalid key fail immediately.

use super::qualitative::{ExtractorError, QualitativeExtractor, QualitativeMetrics};
use aipr_common::models::NewsArticle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
const USER_AGENT: &str = concat!("aipr-rank/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 4000;

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    model: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ExtractorError> {
        if api_key.trim().is_empty() {
            return Err(ExtractorError::NotConfigured("empty API key".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExtractorError::NetworkError(e.to_string()))?;

        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            retry: RetryPolicy::default(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat request and return the reply text, retrying transient failures
    pub async fn complete(&self, system: &str, user: String) -> Result<String, ExtractorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut attempt = 1;
        loop {
            match self.send_once(&request).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        model = %self.model,
                        "OpenRouter request failed, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, ExtractorError> {
        self.rate_limiter.wait().await;

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("X-Title", "AI Power Rankings")
            .json(request)
            .send()
            .await
            .map_err(|e| ExtractorError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractorError::ApiError(status.as_u16(), error_message(&body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ExtractorError::ParseError("No content in response".to_string()))
    }
}

/// Prefer the `error.message` field of a JSON error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Strip a surrounding ```json fence, if any
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_metrics_reply(reply: &str) -> Result<QualitativeMetrics, ExtractorError> {
    serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| ExtractorError::ParseError(format!("Invalid metrics JSON: {}", e)))
}

const SYSTEM_PROMPT: &str = "You are an expert AI analyst specializing in developer tools and AI \
coding assistants. Extract qualitative metrics from news articles that pattern matching cannot \
capture: strategic implications, market dynamics and technical progress. Base your analysis only \
on what is stated or strongly implied in the article. Reply with a single JSON object and nothing \
else.";

fn user_prompt(article: &NewsArticle, tool_name: &str, tool_context: Option<&str>) -> String {
    format!(
        r#"Analyze this news article about {tool} and extract qualitative metrics.

Context about {tool}: {context}

Article Title: {title}
Published: {published}
Source: {source}

Content:
{content}

Return JSON with exactly these keys:
{{
  "product_launches": [{{"feature": str, "significance": "breakthrough"|"major"|"incremental", "impact": 0-10, "description": str}}],
  "partnerships": [{{"partner": str, "type": "strategic"|"integration"|"distribution"|"technology", "significance": 0-10, "description": str}}],
  "technical_milestones": [{{"achievement": str, "category": "performance"|"capability"|"scale"|"reliability", "improvement": number|null, "impact": 0-10}}],
  "sentiment": {{"overall": -1..1, "confidence": 0..1, "aspects": {{"product": -1..1, "leadership": -1..1, "competition": -1..1, "future": -1..1}}}},
  "development_activity": {{"release_cadence": "accelerating"|"steady"|"slowing"|"unknown", "feature_velocity": 0-10, "community_engagement": "increasing"|"high"|"medium"|"low"|"declining", "open_source_activity": bool|null}},
  "competitive_position": {{"mentioned_competitors": [str], "positioning": "leader"|"challenger"|"follower"|"niche"|"unclear", "differentiators": [str], "threats": [str]}},
  "key_events": [{{"event": str, "type": "funding"|"acquisition"|"leadership"|"crisis"|"expansion"|"other", "impact": "positive"|"negative"|"neutral"|"mixed", "significance": 0-10}}]
}}

Scores 0-10: 0-2 minimal, 3-4 below average, 5-6 average, 7-8 strong, 9-10 exceptional.
Sentiment -1..1: below -0.6 very negative, -0.2..0.2 neutral, above 0.6 very positive."#,
        tool = tool_name,
        context = tool_context.unwrap_or("An AI-powered developer tool"),
        title = article.title,
        published = article.published_date.to_rfc3339(),
        source = article.source.as_deref().unwrap_or("Unknown"),
        content = article.content,
    )
}

#[async_trait]
impl QualitativeExtractor for OpenRouterClient {
    async fn extract(
        &self,
        article: &NewsArticle,
        tool_name: &str,
        tool_context: Option<&str>,
    ) -> Result<QualitativeMetrics, ExtractorError> {
        let reply = self
            .complete(SYSTEM_PROMPT, user_prompt(article, tool_name, tool_context))
            .await?;
        let metrics = parse_metrics_reply(&reply)?;
        debug!(
            tool = %tool_name,
            article_id = %article.id,
            launches = metrics.product_launches.len(),
            partnerships = metrics.partnerships.len(),
            milestones = metrics.technical_milestones.len(),
            sentiment = metrics.sentiment.overall,
            "Extracted qualitative metrics"
        );
        Ok(metrics)
    }
}
