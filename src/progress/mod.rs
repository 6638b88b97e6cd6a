//! Per-client progress notification
//!
//! Observers subscribe with a client id and receive the events published for
//! that id, in order. Publishing never blocks the pipeline: when a client's
//! queue is full the event is dropped. An idle stream yields a synthetic
//! `ping` event every keepalive interval.

use crate::config::ProgressConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// State carried by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Complete,
    Failed,
}

/// Event body, tagged with its type on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Log {
        message: String,
        level: LogLevel,
    },
    Progress {
        /// Percentage in `0..=100`, when known
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
        message: String,
        status: ProgressStatus,
    },
    Ping,
}

impl EventPayload {
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            level,
        }
    }

    pub fn progress(progress: Option<u8>, message: impl Into<String>, status: ProgressStatus) -> Self {
        Self::Progress {
            progress: progress.map(|p| p.min(100)),
            message: message.into(),
            status,
        }
    }

    /// Event type name: `log`, `progress` or `ping`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Progress { .. } => "progress",
            Self::Ping => "ping",
        }
    }
}

/// An event delivered to one client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub client_id: String,

    #[serde(flatten)]
    pub payload: EventPayload,

    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(client_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            client_id: client_id.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Formats the event as a server-sent-events frame
    pub fn sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!(
            "event: {}\ndata: {}\n\n",
            self.kind(),
            serde_json::to_string(self)?
        ))
    }
}

/// Fan-out of progress events to subscribed clients
///
/// Shared behind an `Arc`; the channel map lock is never held across an
/// await point.
#[derive(Debug)]
pub struct ProgressNotifier {
    channels: Mutex<HashMap<String, mpsc::Sender<ProgressEvent>>>,
    capacity: usize,
    keepalive: Duration,
}

impl ProgressNotifier {
    pub fn new(capacity: usize, keepalive: Duration) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            keepalive,
        }
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(config.queue_capacity, config.keepalive())
    }

    /// Opens a stream for `client_id`
    ///
    /// An existing subscription for the same id is replaced; its stream ends.
    pub fn subscribe(&self, client_id: &str) -> ProgressStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels.insert(client_id.to_string(), tx).is_some() {
            tracing::debug!("Replaced existing progress subscription for {}", client_id);
        }

        ProgressStream {
            client_id: client_id.to_string(),
            rx,
            keepalive: self.keepalive,
        }
    }

    /// Removes the subscription for `client_id`; its stream ends once drained
    pub fn unsubscribe(&self, client_id: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.remove(client_id);
    }

    /// Queues an event for `client_id` without waiting
    ///
    /// Unknown clients are ignored. A full queue drops the event; a closed
    /// stream drops the subscription.
    pub fn publish(&self, client_id: &str, payload: EventPayload) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = channels.get(client_id) else {
            return;
        };

        match tx.try_send(ProgressEvent::new(client_id, payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!(
                    "Progress queue full for {}, dropping {} event",
                    client_id,
                    event.kind()
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Progress stream for {} closed, unsubscribing", client_id);
                channels.remove(client_id);
            }
        }
    }

    pub fn log(&self, client_id: &str, level: LogLevel, message: impl Into<String>) {
        self.publish(client_id, EventPayload::log(level, message));
    }

    pub fn subscriber_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Receiving side of one client's subscription
#[derive(Debug)]
pub struct ProgressStream {
    client_id: String,
    rx: mpsc::Receiver<ProgressEvent>,
    keepalive: Duration,
}

impl ProgressStream {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Waits for the next event
    ///
    /// Yields a `ping` event when nothing arrives within the keepalive
    /// interval and `None` once the subscription is gone and drained.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        match tokio::time::timeout(self.keepalive, self.rx.recv()).await {
            Ok(event) => event,
            Err(_) => Some(ProgressEvent::new(self.client_id.clone(), EventPayload::Ping)),
        }
    }
}
