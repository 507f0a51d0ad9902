use mediasync::{ReportError, Reporter, SyncOutcome};
use tracing::{debug, info};

use crate::api::{ApiResponse, SendMessage};
use crate::message;

/// Configuration for the Telegram reporter.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
    pub api_base_url: Option<String>,
}

/// Sends run reports to a Telegram chat through the Bot API.
pub struct TelegramReporter {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramReporter {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Build a reporter and check that the bot token is accepted.
    pub async fn connect(config: TelegramConfig) -> Result<Self, ReportError> {
        let reporter = Self::new(config);
        reporter.verify().await?;
        Ok(reporter)
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or("https://api.telegram.org")
            .trim_end_matches('/')
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base(), self.config.token, method)
    }

    /// Call `getMe`, which only succeeds for a valid token.
    pub async fn verify(&self) -> Result<(), ReportError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(network_error)?;

        check(response).await?;
        debug!("telegram token accepted");
        Ok(())
    }

    /// Send `text` as a MarkdownV2 message to the configured chat.
    pub async fn send_text(&self, text: &str) -> Result<(), ReportError> {
        let body = SendMessage {
            chat_id: self.config.chat_id,
            text,
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        check(response).await?;
        info!(chat_id = self.config.chat_id, "report sent");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Reporter for TelegramReporter {
    async fn send(&self, outcome: &SyncOutcome) -> Result<(), ReportError> {
        self.send_text(&message::render(outcome)).await
    }
}

// Request URLs embed the bot token, so they never make it into errors.
fn network_error(e: reqwest::Error) -> ReportError {
    ReportError::Network(e.without_url().to_string())
}

/// Map a Bot API response to success or the API's own description.
async fn check(response: reqwest::Response) -> Result<(), ReportError> {
    let status = response.status();
    let parsed: Option<ApiResponse> = response.json().await.ok();

    match parsed {
        Some(api) if status.is_success() && api.ok => Ok(()),
        Some(ApiResponse {
            description: Some(description),
            ..
        }) => Err(ReportError::Rejected(description)),
        _ if status.is_success() => Err(ReportError::Rejected(
            "unexpected response from Bot API".into(),
        )),
        _ => Err(ReportError::Rejected(format!("HTTP {status}"))),
    }
}
