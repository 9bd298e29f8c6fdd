use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::alert::AlertLevel;
use crate::config::{Config, REQUEST_TIMEOUT};
use crate::feed::Reading;
use crate::i18n::{self, Language, MessageKind};

/// Outbound channel for unsolicited messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str, silent: bool) -> Result<()>;
}

/// Sends messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    url: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}/bot{}/sendMessage", api_url, bot_token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: &str, text: &str, silent: bool) -> Result<()> {
        let silent = if silent { "true" } else { "false" };
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("chat_id", chat_id),
                ("text", text),
                ("disable_notification", silent),
            ])
            .send()
            .await
            // the request URL carries the bot token
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Telegram")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error ({}): {}", status, body);
        }
        Ok(())
    }
}

/// Formats threshold alerts and delivers them to the configured chat.
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    chat_id: Option<String>,
    language: Language,
    city: String,
    silent: bool,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            notifier,
            chat_id: config.chat_id.clone(),
            language: config.language,
            city: config.city.clone(),
            silent: config.silent,
        }
    }

    /// Send the alert for `level`. A no-op without a destination chat;
    /// delivery failures are logged and dropped.
    pub async fn dispatch(&self, level: AlertLevel, reading: &Reading) {
        let Some(chat_id) = self.chat_id.as_deref() else {
            info!(%level, pm10 = reading.pm10, "Alert not sent, no CHAT_ID configured");
            return;
        };

        let text = alert_text(self.language, level, &self.city, reading);
        match self.notifier.send(chat_id, &text, self.silent).await {
            Ok(()) => debug!(%level, chat_id, "Alert sent"),
            Err(e) => warn!("Error while sending alert: {:#}", e),
        }
    }
}

/// "<level sentence>. <summary sentence>."
pub fn alert_text(language: Language, level: AlertLevel, city: &str, reading: &Reading) -> String {
    let pm10 = reading.pm10.to_string();
    let pm25 = reading.pm25.to_string();
    let headline = i18n::render(language, MessageKind::for_alert(level), &[]);
    let summary = i18n::render(
        language,
        MessageKind::AlertSummary,
        &[("city", city), ("pm10", pm10.as_str()), ("pm25", pm25.as_str())],
    );
    format!("{}. {}.", headline, summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    use crate::config::Settings;

    /// Records every message instead of sending it.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, bool)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, chat_id: &str, text: &str, silent: bool) -> Result<()> {
            self.sent
                .lock()
                .await
                .push((chat_id.to_string(), text.to_string(), silent));
            if self.fail {
                anyhow::bail!("Telegram API error (502 Bad Gateway)");
            }
            Ok(())
        }
    }

    pub(crate) fn test_config(chat_id: Option<&str>) -> Config {
        let mut settings = Settings::default();
        settings.set("API_KEY", "waqi-token");
        settings.set("BOT_API_KEY", "123:abc");
        settings.set("CITY", "lviv");
        settings.set("SILENT", "true");
        if let Some(chat_id) = chat_id {
            settings.set("CHAT_ID", chat_id);
        }
        Config::from_settings(&settings).unwrap().0
    }

    /// Answer a single HTTP request on a local port with `status` and
    /// `body`. The handle resolves to the request line.
    pub(crate) async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let request = String::from_utf8_lossy(&request);
            request.lines().next().unwrap_or_default().to_string()
        });
        (base, handle)
    }

    fn reading(pm10: i64, pm25: i64) -> Reading {
        Reading {
            pm10,
            pm25,
            location_name: "Lviv, Ukraine".to_string(),
            location_url: "https://aqicn.org/city/ukraine/lviv".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_alert_text() {
        let text = alert_text(Language::En, AlertLevel::Unhealthy, "lviv", &reading(120, 80));
        assert_eq!(
            text,
            "Be aware, air quality reaches unhealthy levels. \
             Air Quality Index in lviv is 120 for PM10 and 80 for PM2.5."
        );

        let text = alert_text(Language::Uk, AlertLevel::Good, "lviv", &reading(60, 40));
        assert!(text.starts_with("Якість повітря повертається до хорошого рівня. "));
        assert!(text.contains("60 для PM10 та 40 для PM2.5"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_to_chat() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), &test_config(Some("-100500")));

        dispatcher.dispatch(AlertLevel::Hazardous, &reading(320, 210)).await;

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let (chat_id, text, silent) = &sent[0];
        assert_eq!(chat_id, "-100500");
        assert!(text.starts_with("Be aware, air quality reaches hazardous levels."));
        assert!(*silent);
    }

    #[tokio::test]
    async fn test_dispatch_without_chat_is_noop() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), &test_config(None));

        dispatcher.dispatch(AlertLevel::Unhealthy, &reading(120, 80)).await;

        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let dispatcher = AlertDispatcher::new(notifier.clone(), &test_config(Some("42")));

        dispatcher.dispatch(AlertLevel::Good, &reading(50, 30)).await;

        // one attempt, no retry
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_query_on_the_wire() {
        let (base, request) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let notifier = TelegramNotifier::new(&base, "123:abc").unwrap();

        notifier.send("-100500", "air is bad", true).await.unwrap();

        assert_eq!(
            request.await.unwrap(),
            "GET /bot123:abc/sendMessage?chat_id=-100500&text=air+is+bad&disable_notification=true HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_send_non_success_status() {
        let (base, request) =
            serve_once("400 Bad Request", r#"{"ok":false,"description":"chat not found"}"#).await;
        let notifier = TelegramNotifier::new(&base, "123:abc").unwrap();

        let err = notifier.send("1", "hi", false).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("400"));
        assert!(message.contains("chat not found"));
        request.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_error_hides_bot_token() {
        let notifier = TelegramNotifier::new("http://127.0.0.1:1", "999:BOTSECRET").unwrap();
        let err = notifier.send("1", "hi", false).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to send request to Telegram"));
        assert!(!message.contains("BOTSECRET"), "{}", message);
    }

    #[test]
    fn test_telegram_endpoint() {
        let notifier = TelegramNotifier::new("https://api.telegram.org", "123:abc").unwrap();
        assert_eq!(notifier.url, "https://api.telegram.org/bot123:abc/sendMessage");
    }
}
