//! Polls the notifications endpoint and feeds unseen items to the stack.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cache::FetchError;
use crate::transport::{ApiRequest, Transport};
use crate::util::lock;

use super::events::PopupEvent;
use super::model::Notification;
use super::stack::PopupStack;
use super::window::WindowSystem;

const SOURCE: &str = "notify::feed";

// Default values for feed configuration
const DEFAULT_PATH: &str = "/api/notifications";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_INITIAL_DELAY_SECS: u64 = 2;
const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub path: String,
    pub poll_interval_secs: u64,
    pub initial_delay_secs: u64,
    /// Unread notifications requested per poll.
    pub limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "unreadCount")]
    unread_count: u64,
    #[serde(default)]
    notifications: Vec<Value>,
}

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    pub unread_count: u64,
    pub shown: usize,
    /// New notifications marked seen without a popup because the poll
    /// returned more than the stack can hold.
    pub skipped: usize,
    /// Items dropped because they could not be decoded.
    pub malformed: usize,
}

/// Decode items one at a time so a single bad record does not hide the rest.
fn decode_notifications(items: Vec<Value>) -> Vec<Notification> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Notification>(item) {
            Ok(notification) => Some(notification),
            Err(error) => {
                warn!(error = %error, "Skipping malformed notification");
                None
            }
        })
        .collect()
}

pub struct NotificationFeed<T: Transport, W: WindowSystem> {
    transport: Arc<T>,
    stack: PopupStack<W>,
    config: FeedConfig,
    seen: Mutex<HashSet<String>>,
}

impl<T: Transport, W: WindowSystem> NotificationFeed<T, W> {
    pub fn new(transport: Arc<T>, stack: PopupStack<W>, config: FeedConfig) -> Self {
        Self {
            transport,
            stack,
            config,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn stack(&self) -> &PopupStack<W> {
        &self.stack
    }

    /// Show the unseen notifications, newest first, up to the stack's
    /// capacity. Every unseen notification is marked seen either way, so a
    /// burst never replays on the next poll.
    pub fn admit(&self, notifications: Vec<Notification>) -> (usize, usize) {
        let capacity = self.stack.config().max_visible;
        let fresh: Vec<Notification> = {
            let mut seen = lock::lock(&self.seen, SOURCE, "admit");
            notifications
                .into_iter()
                .filter(|notification| seen.insert(notification.id.clone()))
                .collect()
        };

        let mut shown = 0;
        for notification in fresh.iter().take(capacity) {
            if self.stack.show(notification).is_ok() {
                shown += 1;
            }
        }
        (shown, fresh.len().saturating_sub(capacity))
    }

    pub async fn poll_once(&self) -> Result<PollReport, FetchError> {
        let request = ApiRequest::get(self.config.path.clone())
            .with_query("unread", "true")
            .with_query("limit", self.config.limit.to_string());
        let body = self.transport.fetch(request).await?;
        let response: FeedResponse =
            serde_json::from_value(body).map_err(|err| FetchError::decode(err.to_string()))?;
        if !response.success {
            return Err(FetchError::upstream("notifications feed reported failure"));
        }

        let total = response.notifications.len();
        let notifications = decode_notifications(response.notifications);
        let malformed = total - notifications.len();

        let (shown, skipped) = self.admit(notifications);
        Ok(PollReport {
            unread_count: response.unread_count,
            shown,
            skipped,
            malformed,
        })
    }

    /// Poll forever. Abort the task driving this future to stop.
    pub async fn run(&self) {
        tokio::time::sleep(self.config.initial_delay()).await;
        let mut interval = tokio::time::interval(self.config.poll_interval());
        loop {
            interval.tick().await;
            match self.poll_once().await {
                Ok(report) if report.shown > 0 => {
                    info!(
                        shown = report.shown,
                        skipped = report.skipped,
                        unread = report.unread_count,
                        "Showed new notifications"
                    );
                }
                Ok(_) => {}
                // The network may simply be down.
                Err(error) => debug!(error = %error, "Notification poll failed"),
            }
        }
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), FetchError> {
        let path = format!("{}/{id}", self.config.path.trim_end_matches('/'));
        self.transport
            .fetch(ApiRequest::patch(path, json!({"read": 1})))
            .await
            .map(|_| ())
    }

    /// Mark dismissed notifications read. Failures are logged and dropped.
    pub async fn handle_event(&self, event: &PopupEvent) {
        if let PopupEvent::Dismissed { id, .. } = event
            && let Err(error) = self.mark_read(id).await
        {
            debug!(id, error = %error, "Failed to mark notification read");
        }
    }
}
