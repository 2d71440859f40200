//! Tracing setup and the log forwarding layer.
//!
//! `LogForwardLayer` copies every event into a bounded channel as a
//! `LogEntry`, ready to be pushed to a websocket or any other consumer. A
//! full or closed channel drops entries; logging never blocks on it.

use std::fmt::Write as _;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::Context, prelude::*, util::TryInitError,
};

use crate::config::LoggingConfig;

/// Filter for a level name such as `INFO` or `debug`; unknown names fall
/// back to `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.trim().to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: fmt output plus, when given, forwarding.
pub fn init(config: &LoggingConfig, forward: Option<LogForwardLayer>) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt::layer())
        .with(forward)
        .try_init()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub level: String,
    pub module: String,
    /// Fully formatted line.
    pub content: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct LogForwardLayer {
    sender: mpsc::Sender<LogEntry>,
    service_prefix: Option<String>,
    include_module: bool,
}

impl LogForwardLayer {
    pub fn new(sender: mpsc::Sender<LogEntry>, config: &LoggingConfig) -> Self {
        Self {
            sender,
            service_prefix: config.service_prefix.clone(),
            include_module: config.include_module,
        }
    }

    /// Layer plus the receiving end of a channel sized by the config.
    pub fn channel(config: &LoggingConfig) -> (Self, mpsc::Receiver<LogEntry>) {
        let (sender, receiver) = mpsc::channel(config.forward_capacity.max(1));
        (Self::new(sender, config), receiver)
    }

    fn format(&self, level: &Level, module: &str, message: &str) -> String {
        let mut content = String::new();
        if let Some(prefix) = &self.service_prefix {
            let _ = write!(content, "[{prefix}] ");
        }
        let _ = write!(content, "{level}");
        if self.include_module {
            let _ = write!(content, " [{module}]");
        }
        let _ = write!(content, " {message}");
        content
    }
}

impl<S: Subscriber> Layer<S> for LogForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.finish();
        let module = metadata
            .module_path()
            .unwrap_or_else(|| metadata.target())
            .to_string();

        let entry = LogEntry {
            kind: "log".to_string(),
            level: metadata.level().to_string(),
            content: self.format(metadata.level(), &module, &message),
            module,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };
        let _ = self.sender.try_send(entry);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
