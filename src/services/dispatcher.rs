use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ChannelErrorKind, GasWatchError};
use crate::models::{FeeObservation, Network};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Threshold alert configuration. Fires when the observed base fee is
/// strictly below the threshold ("gas is cheap enough now").
#[derive(Clone)]
pub struct AlertRule {
    pub network: Network,
    pub threshold_gwei: f64,
    pub channels: Vec<Arc<dyn NotifyChannel>>,
}

/// What a firing rule tells its channels.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub fields: Vec<(String, String)>,
}

impl AlertMessage {
    pub fn threshold_crossed(observation: &FeeObservation, threshold_gwei: f64) -> Self {
        let mut fields = vec![
            (
                "Network".to_string(),
                observation.network.display_name().to_string(),
            ),
            (
                "Current Price".to_string(),
                format!("{:.2} gwei", observation.base_fee_gwei),
            ),
            (
                "Threshold".to_string(),
                format!("{:.2} gwei", threshold_gwei),
            ),
            ("Status".to_string(), "Below threshold".to_string()),
        ];
        if let Some(price) = observation.token_price_usd {
            fields.push(("Token Price".to_string(), format!("${:.2}", price)));
        }

        Self {
            title: format!("Gas Price Alert - {}", observation.network.display_name()),
            body: format!(
                "Base fee {:.2} gwei dropped below your {:.2} gwei threshold",
                observation.base_fee_gwei, threshold_gwei
            ),
            fields,
        }
    }
}

#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, message: &AlertMessage) -> Result<(), GasWatchError>;
}

/// Outcome of one rule firing into one channel. Failures are collected
/// here, never propagated as a batch-aborting error.
pub struct DispatchResult {
    pub network: Network,
    pub threshold_gwei: f64,
    pub channel: String,
    pub outcome: Result<(), GasWatchError>,
}

/// Evaluates rules against the latest observation and fans out to every
/// channel of every firing rule. Stateless: re-running the same inputs
/// dispatches again, debouncing belongs to the orchestration layer.
pub async fn evaluate_and_dispatch(
    observation: &FeeObservation,
    rules: &[AlertRule],
) -> Vec<DispatchResult> {
    let mut results = Vec::new();

    for rule in rules {
        if rule.network != observation.network {
            continue;
        }
        if observation.base_fee_gwei >= rule.threshold_gwei {
            continue;
        }

        let message = AlertMessage::threshold_crossed(observation, rule.threshold_gwei);
        for channel in &rule.channels {
            let outcome = channel.notify(&message).await;
            if let Err(e) = &outcome {
                tracing::warn!(
                    channel = channel.name(),
                    network = %rule.network,
                    error = %e,
                    "Alert delivery failed"
                );
            }
            results.push(DispatchResult {
                network: rule.network,
                threshold_gwei: rule.threshold_gwei,
                channel: channel.name().to_string(),
                outcome,
            });
        }
    }

    results
}

/// Prints the alert to stdout with a terminal bell.
pub struct ConsoleChannel;

#[async_trait]
impl NotifyChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), GasWatchError> {
        use std::io::Write;

        let mut stdout = std::io::stdout().lock();
        let mut render = || -> std::io::Result<()> {
            writeln!(stdout, "\n{}", "=".repeat(60))?;
            writeln!(stdout, "{}", message.title)?;
            writeln!(stdout, "{}", "-".repeat(60))?;
            writeln!(stdout, "{}", message.body)?;
            for (name, value) in &message.fields {
                writeln!(stdout, "  {}: {}", name, value)?;
            }
            writeln!(stdout, "{}\x07", "=".repeat(60))?;
            stdout.flush()
        };

        render().map_err(|e| GasWatchError::Channel {
            channel: "console".to_string(),
            kind: ChannelErrorKind::Io,
            message: e.to_string(),
        })
    }
}

/// OS notification via the platform notifier binary. Fails with
/// `Unavailable` when no notification daemon answers.
pub struct DesktopChannel {
    pub app_name: String,
}

impl Default for DesktopChannel {
    fn default() -> Self {
        Self {
            app_name: "gaswatch".to_string(),
        }
    }
}

impl DesktopChannel {
    fn command(&self, message: &AlertMessage) -> tokio::process::Command {
        if cfg!(target_os = "macos") {
            let mut cmd = tokio::process::Command::new("osascript");
            cmd.arg("-e").arg(format!(
                "display notification \"{}\" with title \"{}\"",
                message.body.replace('"', "'"),
                message.title.replace('"', "'")
            ));
            cmd
        } else {
            let mut cmd = tokio::process::Command::new("notify-send");
            cmd.arg("--app-name")
                .arg(&self.app_name)
                .arg(&message.title)
                .arg(&message.body);
            cmd
        }
    }
}

#[async_trait]
impl NotifyChannel for DesktopChannel {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), GasWatchError> {
        let status = self
            .command(message)
            .status()
            .await
            .map_err(|e| GasWatchError::Channel {
                channel: "desktop".to_string(),
                kind: ChannelErrorKind::Unavailable,
                message: format!("notifier unavailable: {}", e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(GasWatchError::Channel {
                channel: "desktop".to_string(),
                kind: ChannelErrorKind::Unavailable,
                message: format!("notifier exited with {}", status),
            })
        }
    }
}

/// Which webhook dialect a URL speaks, sniffed from its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookPlatform {
    Slack,
    Discord,
    Teams,
    Generic,
}

impl WebhookPlatform {
    fn detect(url: &str) -> Self {
        if url.contains("slack.com") {
            WebhookPlatform::Slack
        } else if url.contains("discord.com") || url.contains("discordapp.com") {
            WebhookPlatform::Discord
        } else if url.contains("webhook.office.com") {
            WebhookPlatform::Teams
        } else {
            WebhookPlatform::Generic
        }
    }
}

/// HTTP POST channel with per-platform payload shaping.
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
    platform: WebhookPlatform,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            http: reqwest::Client::builder()
                .timeout(WEBHOOK_TIMEOUT)
                .build()
                .unwrap_or_default(),
            platform: WebhookPlatform::detect(&url),
            url,
        }
    }

    fn payload(&self, message: &AlertMessage) -> Value {
        match self.platform {
            WebhookPlatform::Slack => {
                let mut blocks = vec![
                    json!({
                        "type": "header",
                        "text": { "type": "plain_text", "text": message.title }
                    }),
                    json!({
                        "type": "section",
                        "text": { "type": "mrkdwn", "text": message.body }
                    }),
                ];
                if !message.fields.is_empty() {
                    let fields: Vec<Value> = message
                        .fields
                        .iter()
                        .map(|(k, v)| json!({ "type": "mrkdwn", "text": format!("*{}:* {}", k, v) }))
                        .collect();
                    blocks.push(json!({ "type": "section", "fields": fields }));
                }
                json!({ "blocks": blocks })
            }
            WebhookPlatform::Discord => {
                let fields: Vec<Value> = message
                    .fields
                    .iter()
                    .map(|(k, v)| json!({ "name": k, "value": v, "inline": true }))
                    .collect();
                json!({
                    "embeds": [{
                        "title": message.title,
                        "description": message.body,
                        "color": 3066993,
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                        "fields": fields,
                    }]
                })
            }
            WebhookPlatform::Teams => {
                let facts: Vec<Value> = message
                    .fields
                    .iter()
                    .map(|(k, v)| json!({ "name": k, "value": v }))
                    .collect();
                json!({
                    "@type": "MessageCard",
                    "@context": "https://schema.org/extensions",
                    "summary": message.title,
                    "title": message.title,
                    "text": message.body,
                    "sections": [{ "facts": facts }],
                })
            }
            WebhookPlatform::Generic => {
                let fields: Value = message
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<serde_json::Map<String, Value>>()
                    .into();
                json!({
                    "title": message.title,
                    "message": message.body,
                    "fields": fields,
                })
            }
        }
    }
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<(), GasWatchError> {
        let response = self
            .http
            .post(&self.url)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| GasWatchError::Channel {
                channel: "webhook".to_string(),
                kind: ChannelErrorKind::Io,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GasWatchError::Channel {
                channel: "webhook".to_string(),
                kind: ChannelErrorKind::HttpError {
                    status: status.as_u16(),
                },
                message: format!("webhook {} answered {}", self.url, status),
            })
        }
    }
}
